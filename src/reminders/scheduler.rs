use std::collections::HashMap;
use std::time::Duration;

use crate::effects::chimes;
use crate::error::{PagePauseError, Result};
use crate::host::Host;
use crate::scheduler::{disarm, TimerHandle, Wakeup};
use crate::store::keys;
use crate::utils::format::minutes_phrase;
use crate::utils::ids::IdGenerator;

use super::{PresentationQueue, Reminder, ReminderId, REFRESH_EVERY, SNOOZE_MINUTES};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Scheduling handles for one reminder; never persisted.
#[derive(Debug, Default)]
struct Armed {
    due: Option<TimerHandle>,
    refresh: Option<TimerHandle>,
}

/// Which button closed the reminder modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Dismiss,
    Snooze,
}

/// Live reminder set, their timers, and the presentation queue.
///
/// A reminder stays in the live set after it fires until it is dismissed,
/// snoozed or cancelled.
#[derive(Debug, Default)]
pub struct ReminderScheduler {
    reminders: Vec<Reminder>,
    armed: HashMap<ReminderId, Armed>,
    queue: PresentationQueue,
    ids: IdGenerator,
}

impl ReminderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live reminders in creation order.
    pub fn reminders(&self) -> &[Reminder] {
        &self.reminders
    }

    pub fn get(&self, id: ReminderId) -> Option<&Reminder> {
        self.reminders.iter().find(|reminder| reminder.id == id)
    }

    pub fn queue(&self) -> &PresentationQueue {
        &self.queue
    }

    pub fn is_armed(&self, id: ReminderId) -> bool {
        self.armed
            .get(&id)
            .is_some_and(|armed| armed.due.is_some() || armed.refresh.is_some())
    }

    pub fn len(&self) -> usize {
        self.reminders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reminders.is_empty()
    }

    pub fn schedule(
        &mut self,
        host: &mut Host<'_>,
        text: &str,
        delay_minutes: u32,
    ) -> Result<ReminderId> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PagePauseError::InvalidInput(
                "reminder text must not be empty".into(),
            ));
        }
        if delay_minutes < 1 {
            return Err(PagePauseError::InvalidInput(
                "reminder delay must be at least 1 minute".into(),
            ));
        }

        let id = self.insert(host, text.to_string(), delay_minutes);
        self.persist(host);
        host.effects.play_chime(chimes::CONFIRM);
        host.effects.show_notification(
            "Reminder Set! ⏰",
            &format!("I'll remind you in {}", minutes_phrase(delay_minutes)),
        );
        log_info!("reminder {id} set for {delay_minutes} min");
        Ok(id)
    }

    /// Deliver a reminder to the queue; its countdown stops.
    pub fn fire(&mut self, host: &mut Host<'_>, id: ReminderId) {
        self.disarm(host, id);
        let Some(reminder) = self.get(id).cloned() else {
            log_debug!("reminder {id} fired after removal");
            return;
        };
        log_info!("reminder {id} fired");
        host.effects.play_chime(chimes::REMINDER_FIRED);
        host.effects.show_notification("⏰ Reminder!", &reminder.text);
        self.queue.enqueue(host, reminder);
    }

    pub fn cancel(&mut self, host: &mut Host<'_>, id: ReminderId) -> Result<()> {
        if self.get(id).is_none() {
            return Err(PagePauseError::NotFound(id));
        }
        self.disarm(host, id);
        self.queue.remove(host, id);
        self.reminders.retain(|reminder| reminder.id != id);
        self.persist(host);
        log_info!("reminder {id} cancelled");
        Ok(())
    }

    /// Replace `id` with a copy due `SNOOZE_MINUTES` from now.
    pub fn snooze(&mut self, host: &mut Host<'_>, id: ReminderId) -> Result<ReminderId> {
        let original = self.get(id).cloned().ok_or(PagePauseError::NotFound(id))?;
        let snoozed = self.insert(host, original.snoozed_text(), SNOOZE_MINUTES);
        self.cancel(host, id)?;
        host.effects.play_chime(chimes::CONFIRM);
        log_info!("reminder {id} snoozed as {snoozed}");
        Ok(snoozed)
    }

    /// Resolve the reminder on screen, then show the next one after settling.
    pub fn resolve_displayed(
        &mut self,
        host: &mut Host<'_>,
        resolution: Resolution,
    ) -> Result<Option<ReminderId>> {
        let Some(id) = self.queue.displayed().map(|reminder| reminder.id) else {
            return Err(PagePauseError::InvalidInput("no reminder is displayed".into()));
        };
        match resolution {
            Resolution::Dismiss => {
                self.cancel(host, id)?;
                Ok(None)
            }
            Resolution::Snooze => self.snooze(host, id).map(Some),
        }
    }

    pub fn dismiss(&mut self, host: &mut Host<'_>) -> Result<()> {
        self.resolve_displayed(host, Resolution::Dismiss).map(|_| ())
    }

    pub fn handle(&mut self, host: &mut Host<'_>, wakeup: Wakeup) {
        match wakeup {
            Wakeup::ReminderDue(id) => {
                if let Some(armed) = self.armed.get_mut(&id) {
                    armed.due = None;
                }
                self.fire(host, id);
            }
            Wakeup::ReminderRefresh(id) => {
                if let Some(reminder) = self.get(id) {
                    let remaining = reminder.remaining_secs(host.now());
                    host.effects.reminder_countdown(reminder, remaining);
                }
            }
            Wakeup::QueueSettled => self.queue.on_settled(host),
            _ => {}
        }
    }

    /// Load the persisted set; overdue reminders fire at once in deadline
    /// order, the rest are re-armed for what is left of their delay.
    pub fn restore(&mut self, host: &mut Host<'_>) {
        let Some(saved) = host.storage.load::<Vec<Reminder>>(keys::REMINDERS) else {
            return;
        };
        self.adopt(host, saved);
    }

    /// Last-write-wins replacement after another tab rewrote the set.
    pub fn reload(&mut self, host: &mut Host<'_>, saved: Vec<Reminder>) {
        let keep: Vec<ReminderId> = saved.iter().map(|reminder| reminder.id).collect();
        let dropped: Vec<ReminderId> = self
            .reminders
            .iter()
            .map(|reminder| reminder.id)
            .filter(|id| !keep.contains(id))
            .collect();
        for id in dropped {
            self.disarm(host, id);
            self.queue.remove(host, id);
        }
        self.reminders.retain(|reminder| keep.contains(&reminder.id));
        self.adopt(host, saved);
    }

    /// Take over reminders this scheduler does not know yet. Known ones,
    /// including any waiting or on screen, keep their current state.
    fn adopt(&mut self, host: &mut Host<'_>, mut incoming: Vec<Reminder>) {
        let now = host.now();
        incoming.retain(|reminder| self.get(reminder.id).is_none() && !self.queue.contains(reminder.id));
        incoming.sort_by_key(|reminder| (reminder.deadline, reminder.id));
        let ids: Vec<ReminderId> = incoming.iter().map(|reminder| reminder.id).collect();
        for reminder in incoming {
            self.ids.observe(reminder.id);
            self.reminders.push(reminder);
        }
        self.reminders.sort_by_key(|reminder| reminder.id);

        for id in ids {
            let Some(reminder) = self.get(id) else { continue };
            if reminder.is_due(now) {
                let stale = PagePauseError::StaleRestoredState(format!(
                    "reminder {id} passed its deadline while closed"
                ));
                log_warn!("{stale}; firing now");
            }
            self.arm(host, id);
        }
    }

    fn insert(&mut self, host: &mut Host<'_>, text: String, delay_minutes: u32) -> ReminderId {
        let now = host.now();
        let id = self.ids.next(now);
        self.reminders.push(Reminder::new(id, text, delay_minutes, now));
        self.arm(host, id);
        id
    }

    /// Arm the deadline and the countdown, or fire at once when already due.
    fn arm(&mut self, host: &mut Host<'_>, id: ReminderId) {
        let Some(reminder) = self.get(id) else { return };
        let now = host.now();
        if reminder.is_due(now) {
            self.fire(host, id);
            return;
        }
        let delay = (reminder.deadline - now).to_std().unwrap_or(Duration::ZERO);
        self.disarm(host, id);
        let armed = Armed {
            due: Some(host.scheduler.after(delay, Wakeup::ReminderDue(id))),
            refresh: Some(host.scheduler.every(REFRESH_EVERY, Wakeup::ReminderRefresh(id))),
        };
        self.armed.insert(id, armed);
    }

    fn disarm(&mut self, host: &mut Host<'_>, id: ReminderId) {
        if let Some(mut armed) = self.armed.remove(&id) {
            disarm(host.scheduler, &mut armed.due);
            disarm(host.scheduler, &mut armed.refresh);
        }
    }

    fn persist(&self, host: &mut Host<'_>) {
        host.storage.save(keys::REMINDERS, &self.reminders);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::effects::Effect;
    use crate::host::testing::{t0, Rig};
    use crate::reminders::SETTLE_DELAY;
    use crate::scheduler::Scheduler;

    fn minutes(n: u64) -> Duration {
        Duration::from_secs(n * 60)
    }

    fn drive(rig: &mut Rig, reminders: &mut ReminderScheduler, by: Duration) {
        rig.advance(by, |host, wakeup| reminders.handle(host, wakeup));
    }

    #[test]
    fn rejects_empty_text_and_zero_delay() {
        let mut rig = Rig::new();
        let mut reminders = ReminderScheduler::new();
        assert!(matches!(
            reminders.schedule(&mut rig.host(), "   ", 5),
            Err(PagePauseError::InvalidInput(_))
        ));
        assert!(matches!(
            reminders.schedule(&mut rig.host(), "tea", 0),
            Err(PagePauseError::InvalidInput(_))
        ));
        assert!(reminders.is_empty());
        assert_eq!(rig.scheduler.pending(), 0);
    }

    #[test]
    fn schedule_persists_and_arms_deadline_and_refresh() {
        let mut rig = Rig::new();
        let mut reminders = ReminderScheduler::new();
        let id = reminders.schedule(&mut rig.host(), "  drink water ", 2).unwrap();

        assert_eq!(reminders.get(id).unwrap().text, "drink water");
        assert_eq!(rig.scheduler.pending(), 2);
        let saved: Vec<Reminder> = rig.storage.load(keys::REMINDERS).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].deadline, t0() + chrono::Duration::minutes(2));
        assert_eq!(rig.effects.notification_titles(), vec!["Reminder Set! ⏰"]);
    }

    #[test]
    fn fires_at_deadline_and_stops_refreshing() {
        let mut rig = Rig::new();
        let mut reminders = ReminderScheduler::new();
        let id = reminders.schedule(&mut rig.host(), "stretch", 1).unwrap();

        drive(&mut rig, &mut reminders, Duration::from_secs(59));
        assert!(rig.effects.presented_ids().is_empty());
        assert_eq!(
            rig.effects.count(|e| matches!(e, Effect::ReminderCountdown { .. })),
            59
        );

        drive(&mut rig, &mut reminders, Duration::from_secs(5));
        assert_eq!(rig.effects.presented_ids(), vec![id]);
        assert!(!reminders.is_armed(id));
        assert_eq!(rig.scheduler.pending(), 0);
        // Still live until dismissed.
        assert!(reminders.get(id).is_some());
    }

    #[test]
    fn cancel_is_synchronous_and_idempotent() {
        let mut rig = Rig::new();
        let mut reminders = ReminderScheduler::new();
        let id = reminders.schedule(&mut rig.host(), "tea", 1).unwrap();
        reminders.cancel(&mut rig.host(), id).unwrap();
        assert_eq!(
            reminders.cancel(&mut rig.host(), id),
            Err(PagePauseError::NotFound(id))
        );
        assert_eq!(rig.scheduler.pending(), 0);

        drive(&mut rig, &mut reminders, minutes(10));
        assert!(rig.effects.presented_ids().is_empty());
        let saved: Vec<Reminder> = rig.storage.load(keys::REMINDERS).unwrap();
        assert!(saved.is_empty());
    }

    #[test]
    fn queue_order_follows_arrival_while_another_is_displayed() {
        let mut rig = Rig::new();
        let mut reminders = ReminderScheduler::new();
        let c = reminders.schedule(&mut rig.host(), "C", 1).unwrap();
        drive(&mut rig, &mut reminders, minutes(1));
        assert_eq!(reminders.queue().displayed().map(|r| r.id), Some(c));

        let a = reminders.schedule(&mut rig.host(), "A", 1).unwrap();
        drive(&mut rig, &mut reminders, Duration::from_secs(30));
        let b = reminders.schedule(&mut rig.host(), "B", 1).unwrap();
        drive(&mut rig, &mut reminders, minutes(2));
        assert_eq!(reminders.queue().waiting_ids(), vec![a, b]);

        reminders.dismiss(&mut rig.host()).unwrap();
        drive(&mut rig, &mut reminders, SETTLE_DELAY);
        assert_eq!(reminders.queue().displayed().map(|r| r.id), Some(a));
        assert_eq!(reminders.queue().waiting_ids(), vec![b]);
        assert!(reminders.get(c).is_none());
    }

    #[test]
    fn snooze_replaces_displayed_with_five_minute_copy() {
        let mut rig = Rig::new();
        let mut reminders = ReminderScheduler::new();
        let original = reminders.schedule(&mut rig.host(), "read ch. 3", 1).unwrap();
        drive(&mut rig, &mut reminders, minutes(1));

        let snoozed_at = rig.clock.now();
        let snoozed = reminders
            .resolve_displayed(&mut rig.host(), Resolution::Snooze)
            .unwrap()
            .unwrap();

        assert!(reminders.get(original).is_none());
        assert!(!reminders.queue().contains(original));
        let copy = reminders.get(snoozed).unwrap();
        assert_eq!(copy.text, "read ch. 3 (snoozed)");
        assert_eq!(copy.delay_minutes, SNOOZE_MINUTES);
        assert_eq!(copy.deadline, snoozed_at + chrono::Duration::minutes(5));

        drive(&mut rig, &mut reminders, minutes(5));
        assert_eq!(rig.effects.presented_ids(), vec![original, snoozed]);
    }

    #[test]
    fn snooze_confirms_with_a_single_tone() {
        let mut rig = Rig::new();
        let mut reminders = ReminderScheduler::new();
        reminders.schedule(&mut rig.host(), "stretch", 1).unwrap();
        drive(&mut rig, &mut reminders, minutes(1));
        rig.effects.clear();

        reminders.resolve_displayed(&mut rig.host(), Resolution::Snooze).unwrap();
        let tones: Vec<Effect> = rig
            .effects
            .entries()
            .into_iter()
            .filter(|e| matches!(e, Effect::Tone(_)))
            .collect();
        assert_eq!(tones, vec![Effect::Tone(chimes::CONFIRM[0])]);
        assert!(rig.effects.notification_titles().is_empty());
    }

    #[test]
    fn resolve_without_display_is_rejected() {
        let mut rig = Rig::new();
        let mut reminders = ReminderScheduler::new();
        assert!(matches!(
            reminders.resolve_displayed(&mut rig.host(), Resolution::Dismiss),
            Err(PagePauseError::InvalidInput(_))
        ));
    }

    #[test]
    fn restore_fires_overdue_and_rearms_pending() {
        let mut rig = Rig::new();
        let overdue = Reminder::new(10, "overdue".into(), 1, t0() - chrono::Duration::minutes(5));
        let pending = Reminder::new(11, "pending".into(), 10, t0());
        rig.storage.save(keys::REMINDERS, &vec![pending.clone(), overdue.clone()]);

        let mut reminders = ReminderScheduler::new();
        reminders.restore(&mut rig.host());
        assert_eq!(rig.effects.presented_ids(), vec![10]);
        assert!(reminders.is_armed(11));

        drive(&mut rig, &mut reminders, minutes(10));
        assert_eq!(reminders.queue().waiting_ids(), vec![11]);

        let fresh = reminders.schedule(&mut rig.host(), "new", 1).unwrap();
        assert!(fresh > 11);
    }

    #[test]
    fn known_reminders_are_not_fired_again() {
        let mut rig = Rig::new();
        let mut reminders = ReminderScheduler::new();
        let shown = reminders.schedule(&mut rig.host(), "shown", 1).unwrap();
        let waiting = reminders.schedule(&mut rig.host(), "waiting", 1).unwrap();
        drive(&mut rig, &mut reminders, minutes(1));
        assert_eq!(reminders.queue().displayed().map(|r| r.id), Some(shown));
        assert_eq!(reminders.queue().waiting_ids(), vec![waiting]);
        rig.effects.clear();

        let saved = reminders.reminders().to_vec();
        reminders.reload(&mut rig.host(), saved);
        reminders.restore(&mut rig.host());

        assert!(rig.effects.entries().is_empty());
        assert_eq!(reminders.len(), 2);
        assert_eq!(reminders.queue().displayed().map(|r| r.id), Some(shown));
        assert_eq!(reminders.queue().waiting_ids(), vec![waiting]);
        assert_eq!(rig.scheduler.pending(), 0);
    }

    #[test]
    fn reload_drops_missing_and_arms_new() {
        let mut rig = Rig::new();
        let mut reminders = ReminderScheduler::new();
        let kept = reminders.schedule(&mut rig.host(), "kept", 3).unwrap();
        let gone = reminders.schedule(&mut rig.host(), "gone", 3).unwrap();

        let mut external = vec![reminders.get(kept).unwrap().clone()];
        external.push(Reminder::new(gone + 100, "other tab".into(), 2, t0()));
        reminders.reload(&mut rig.host(), external);

        let ids: Vec<ReminderId> = reminders.reminders().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![kept, gone + 100]);
        assert!(!reminders.is_armed(gone));
        assert!(reminders.is_armed(gone + 100));
        assert_eq!(rig.scheduler.pending(), 4);
    }
}
