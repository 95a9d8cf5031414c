//! Composition root: one owner for every component and collaborator.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::broadcast::{StorageChange, TabLink, TabMessage};
use crate::clock::{to_chrono, Clock, ManualClock};
use crate::counter::VisitCounter;
use crate::effects::Effects;
use crate::error::{PagePauseError, Result};
use crate::host::Host;
use crate::reminders::{Reminder, ReminderId, ReminderScheduler};
use crate::scheduler::{ManualScheduler, Scheduler, Wakeup};
use crate::store::{keys, Storage};
use crate::tasks::{ReadingTask, TaskId, TaskList};
use crate::timer::{ConfigReport, PersistedTimer, SessionTimer, TimerConfig, TimerSnapshot};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Stateful components, kept apart from the collaborators so both can be
/// borrowed at once.
struct Components {
    timer: SessionTimer,
    reminders: ReminderScheduler,
    tasks: TaskList,
    counter: VisitCounter,
}

/// Active reminders and unfinished tasks, for the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCounts {
    pub reminders: usize,
    pub tasks: usize,
}

pub struct PagePause<S: Scheduler> {
    clock: Arc<dyn Clock>,
    scheduler: S,
    effects: Box<dyn Effects>,
    storage: Storage,
    parts: Components,
}

impl<S: Scheduler> PagePause<S> {
    pub fn new(
        clock: Arc<dyn Clock>,
        scheduler: S,
        effects: Box<dyn Effects>,
        storage: Storage,
        tick_interval: Duration,
        link: Option<TabLink>,
    ) -> Self {
        let storage = match &link {
            Some(link) => storage.with_broadcast(link.clone()),
            None => storage,
        };
        Self {
            clock,
            scheduler,
            effects,
            storage,
            parts: Components {
                timer: SessionTimer::new(tick_interval),
                reminders: ReminderScheduler::new(),
                tasks: TaskList::new(),
                counter: VisitCounter::new(link),
            },
        }
    }

    fn split(&mut self) -> (Host<'_>, &mut Components) {
        (
            Host {
                clock: &*self.clock,
                scheduler: &mut self.scheduler,
                effects: &mut *self.effects,
                storage: &mut self.storage,
            },
            &mut self.parts,
        )
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn into_storage(self) -> Storage {
        self.storage
    }

    /// Reload everything persisted by a previous run.
    pub fn restore(&mut self) {
        let (mut host, parts) = self.split();
        parts.tasks.restore(&mut host);
        parts.counter.restore(&mut host);
        parts.timer.restore(&mut host);
        parts.reminders.restore(&mut host);
        log_info!(
            "restored {} task(s) and {} reminder(s) from {} store",
            parts.tasks.tasks().len(),
            parts.reminders.len(),
            host.storage.backend_name()
        );
    }

    pub fn handle(&mut self, wakeup: Wakeup) {
        let (mut host, parts) = self.split();
        match wakeup {
            Wakeup::TimerTick => parts.timer.tick(&mut host),
            Wakeup::ReminderDue(_) | Wakeup::ReminderRefresh(_) | Wakeup::QueueSettled => {
                parts.reminders.handle(&mut host, wakeup)
            }
            Wakeup::BreakCardsBegin | Wakeup::BreakCardNext | Wakeup::BreakCardsEnd => {
                parts.timer.handle_card_wakeup(&mut host, wakeup)
            }
        }
    }

    // Timer

    pub fn timer_config(&self) -> &TimerConfig {
        self.parts.timer.config()
    }

    pub fn timer(&self) -> &SessionTimer {
        &self.parts.timer
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.parts.timer.snapshot(self.now())
    }

    pub fn configure(&mut self, config: TimerConfig) -> ConfigReport {
        let (mut host, parts) = self.split();
        parts.timer.configure(&mut host, config)
    }

    pub fn step_total(&mut self, up: bool) -> ConfigReport {
        let (mut host, parts) = self.split();
        parts.timer.step_total(&mut host, up)
    }

    pub fn start(&mut self) -> Result<()> {
        let (mut host, parts) = self.split();
        parts.timer.start(&mut host)
    }

    pub fn pause(&mut self) -> bool {
        let (mut host, parts) = self.split();
        parts.timer.pause(&mut host)
    }

    pub fn resume(&mut self) -> bool {
        let (mut host, parts) = self.split();
        parts.timer.resume(&mut host)
    }

    pub fn toggle_pause(&mut self) -> bool {
        let (mut host, parts) = self.split();
        parts.timer.toggle_pause(&mut host)
    }

    pub fn stop(&mut self) {
        let (mut host, parts) = self.split();
        parts.timer.stop(&mut host)
    }

    pub fn on_visibility_change(&mut self, visible: bool) {
        let (mut host, parts) = self.split();
        parts.timer.on_visibility_change(&mut host, visible)
    }

    // Reminders

    pub fn reminders(&self) -> &ReminderScheduler {
        &self.parts.reminders
    }

    pub fn remind(&mut self, text: &str, delay_minutes: u32) -> Result<ReminderId> {
        let (mut host, parts) = self.split();
        parts.reminders.schedule(&mut host, text, delay_minutes)
    }

    pub fn cancel_reminder(&mut self, id: ReminderId) -> Result<()> {
        let (mut host, parts) = self.split();
        parts.reminders.cancel(&mut host, id)
    }

    pub fn dismiss(&mut self) -> Result<()> {
        let (mut host, parts) = self.split();
        parts.reminders.dismiss(&mut host)
    }

    /// Snooze the displayed reminder; returns the replacement's id.
    pub fn snooze(&mut self) -> Result<ReminderId> {
        let (mut host, parts) = self.split();
        let displayed = parts
            .reminders
            .queue()
            .displayed()
            .map(|reminder| reminder.id)
            .ok_or_else(|| PagePauseError::InvalidInput("no reminder is displayed".into()))?;
        parts.reminders.snooze(&mut host, displayed)
    }

    // Tasks

    pub fn tasks(&self) -> &[ReadingTask] {
        self.parts.tasks.tasks()
    }

    pub fn add_task(&mut self, text: &str) -> Result<TaskId> {
        let (mut host, parts) = self.split();
        parts.tasks.add(&mut host, text)
    }

    pub fn toggle_task(&mut self, id: TaskId) -> Result<bool> {
        let (mut host, parts) = self.split();
        parts.tasks.toggle(&mut host, id)
    }

    pub fn delete_task(&mut self, id: TaskId) -> Result<()> {
        let (mut host, parts) = self.split();
        parts.tasks.delete(&mut host, id)
    }

    pub fn status_counts(&self) -> StatusCounts {
        StatusCounts {
            reminders: self.parts.reminders.len(),
            tasks: self.parts.tasks.active_count(),
        }
    }

    // Visits

    pub fn counter(&self) -> &VisitCounter {
        &self.parts.counter
    }

    pub fn record_visit(&mut self) -> u64 {
        let (mut host, parts) = self.split();
        parts.counter.record_visit(&mut host)
    }

    pub fn reset_visits(&mut self) {
        let (mut host, parts) = self.split();
        parts.counter.reset(&mut host)
    }

    pub fn export_visits(&self) -> Result<String> {
        self.parts.counter.export(self.now())
    }

    pub fn import_visits(&mut self, raw: &str) -> Result<u64> {
        let (mut host, parts) = self.split();
        parts.counter.import(&mut host, raw)
    }

    // Cross-tab

    pub fn on_tab_message(&mut self, message: TabMessage) {
        match message {
            TabMessage::CounterUpdate { count } => {
                let (mut host, parts) = self.split();
                parts.counter.on_remote_count(&mut host, count);
            }
            TabMessage::StorageChange(change) => self.on_storage_change(change),
        }
    }

    /// Reconcile with a write another tab made to the shared store. The
    /// local backend mirrors the write only when this tab took it over.
    pub fn on_storage_change(&mut self, change: StorageChange) {
        let (mut host, parts) = self.split();
        let raw = change.new_value.as_deref();
        let adopted = match change.key.as_str() {
            keys::HIT_COUNT => raw
                .and_then(|raw| raw.trim().parse::<u64>().ok())
                .is_some_and(|count| parts.counter.on_remote_count(&mut host, count)),
            keys::TASKS => match parse_or_empty::<Vec<ReadingTask>>(raw) {
                Some(tasks) => {
                    parts.tasks.replace(tasks);
                    true
                }
                None => {
                    log_warn!("ignoring unreadable task list from another tab");
                    false
                }
            },
            keys::REMINDERS => match parse_or_empty::<Vec<Reminder>>(raw) {
                Some(reminders) => {
                    parts.reminders.reload(&mut host, reminders);
                    true
                }
                None => {
                    log_warn!("ignoring unreadable reminders from another tab");
                    false
                }
            },
            // Another tab's run stays its own; only an idle blob is mirrored.
            keys::TIMER_STATE => match raw.and_then(|raw| serde_json::from_str::<PersistedTimer>(raw).ok()) {
                Some(saved) => {
                    let running = saved.is_running;
                    parts.timer.adopt_external(&mut host, saved) && !running
                }
                None => false,
            },
            other => {
                log_debug!("no reconciliation for key {other}");
                true
            }
        };
        if adopted {
            self.storage.absorb(&change);
        }
    }
}

/// A deleted key reads as an empty collection.
fn parse_or_empty<T: serde::de::DeserializeOwned + Default>(raw: Option<&str>) -> Option<T> {
    match raw {
        Some(raw) => serde_json::from_str(raw).ok(),
        None => Some(T::default()),
    }
}

impl PagePause<ManualScheduler> {
    /// Deterministic instance driven by [`PagePause::advance`].
    pub fn manual(
        start: DateTime<Utc>,
        effects: Box<dyn Effects>,
        storage: Storage,
    ) -> (Self, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start));
        let app = Self::new(
            clock.clone(),
            ManualScheduler::new(clock.clone()),
            effects,
            storage,
            Duration::from_secs(1),
            None,
        );
        (app, clock)
    }

    /// Move simulated time forward, running every wakeup that falls due at
    /// its own instant.
    pub fn advance(&mut self, by: Duration) {
        let clock = self.scheduler.clock().clone();
        let until = clock.now() + to_chrono(by);
        while let Some((due, fired)) = self.scheduler.pop_due(until) {
            clock.set(due);
            self.handle(fired.wakeup);
        }
        clock.set(until);
    }
}
