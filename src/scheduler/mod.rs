//! Deferred and periodic callbacks, expressed as [`Wakeup`] values.
//!
//! The core never holds closures. It arms a wakeup, keeps the returned
//! [`TimerHandle`], and the composition root feeds fired wakeups back into
//! `PagePause::handle`. Cancelling a handle guarantees its wakeup is never
//! delivered afterwards.

pub mod manual;
pub mod tokio_driver;

use std::time::Duration;

use crate::reminders::ReminderId;

pub use manual::ManualScheduler;
pub use tokio_driver::TokioScheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Every callback the system can arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wakeup {
    /// Countdown refresh for the running segment.
    TimerTick,
    ReminderDue(ReminderId),
    /// Once-a-second countdown refresh for a pending reminder row.
    ReminderRefresh(ReminderId),
    /// Settling delay after the displayed reminder was resolved.
    QueueSettled,
    BreakCardsBegin,
    BreakCardNext,
    BreakCardsEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub handle: TimerHandle,
    pub wakeup: Wakeup,
}

pub trait Scheduler {
    /// Deliver `wakeup` once, `delay` from now.
    fn after(&mut self, delay: Duration, wakeup: Wakeup) -> TimerHandle;

    /// Deliver `wakeup` every `period`, first delivery one period from now.
    fn every(&mut self, period: Duration, wakeup: Wakeup) -> TimerHandle;

    /// Idempotent; unknown or already-fired handles are ignored.
    fn cancel(&mut self, handle: TimerHandle);

    /// Number of armed handles.
    fn pending(&self) -> usize;
}

/// Cancel and clear a handle slot.
pub fn disarm(scheduler: &mut dyn Scheduler, slot: &mut Option<TimerHandle>) {
    if let Some(handle) = slot.take() {
        scheduler.cancel(handle);
    }
}
