use std::collections::VecDeque;

use crate::host::Host;
use crate::scheduler::{disarm, TimerHandle, Wakeup};

use super::{Reminder, ReminderId, SETTLE_DELAY};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// One reminder on screen, the rest held first-in first-out.
///
/// The displayed reminder is never also in `waiting`, and an id is queued
/// at most once.
#[derive(Debug, Default)]
pub struct PresentationQueue {
    displayed: Option<Reminder>,
    waiting: VecDeque<Reminder>,
    settle: Option<TimerHandle>,
}

impl PresentationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn displayed(&self) -> Option<&Reminder> {
        self.displayed.as_ref()
    }

    pub fn waiting_ids(&self) -> Vec<ReminderId> {
        self.waiting.iter().map(|reminder| reminder.id).collect()
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    pub fn contains(&self, id: ReminderId) -> bool {
        self.displayed.as_ref().is_some_and(|shown| shown.id == id)
            || self.waiting.iter().any(|reminder| reminder.id == id)
    }

    pub fn enqueue(&mut self, host: &mut Host<'_>, reminder: Reminder) {
        if self.contains(reminder.id) {
            log_debug!("reminder {} already queued", reminder.id);
            return;
        }
        if self.displayed.is_none() && self.waiting.is_empty() {
            self.present(host, reminder);
            return;
        }
        log_debug!("reminder {} waits behind {} other(s)", reminder.id, self.waiting.len());
        self.waiting.push_back(reminder);
        host.effects.update_queue_info(self.waiting.len());
    }

    /// Close the modal and arm the settle delay; returns what was shown.
    pub fn resolve_displayed(&mut self, host: &mut Host<'_>) -> Option<Reminder> {
        let resolved = self.displayed.take()?;
        host.effects.close_reminder();
        disarm(host.scheduler, &mut self.settle);
        self.settle = Some(host.scheduler.after(SETTLE_DELAY, Wakeup::QueueSettled));
        Some(resolved)
    }

    /// Drop `id` from the queue. Returns true when it was the displayed one,
    /// in which case the caller resolves it like a dismissal.
    pub fn remove(&mut self, host: &mut Host<'_>, id: ReminderId) -> bool {
        if self.displayed.as_ref().is_some_and(|shown| shown.id == id) {
            self.resolve_displayed(host);
            return true;
        }
        let before = self.waiting.len();
        self.waiting.retain(|reminder| reminder.id != id);
        if self.waiting.len() != before {
            host.effects.update_queue_info(self.waiting.len());
        }
        false
    }

    pub fn on_settled(&mut self, host: &mut Host<'_>) {
        self.settle = None;
        if self.displayed.is_some() {
            return;
        }
        if let Some(next) = self.waiting.pop_front() {
            self.present(host, next);
        }
    }

    /// Forget everything without presenting; used when the whole set is
    /// replaced from outside.
    pub fn clear(&mut self, host: &mut Host<'_>) {
        disarm(host.scheduler, &mut self.settle);
        self.waiting.clear();
        if self.displayed.take().is_some() {
            host.effects.close_reminder();
        }
    }

    fn present(&mut self, host: &mut Host<'_>, reminder: Reminder) {
        host.effects.present_reminder(&reminder, self.waiting.len());
        host.effects.update_queue_info(self.waiting.len());
        self.displayed = Some(reminder);
    }
}
