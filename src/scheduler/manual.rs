use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::clock::{to_chrono, Clock, ManualClock};

use super::{Fired, Scheduler, TimerHandle, Wakeup};

const MIN_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug)]
struct Entry {
    handle: TimerHandle,
    due: DateTime<Utc>,
    period: Option<Duration>,
    wakeup: Wakeup,
    seq: u64,
}

/// Deterministic scheduler driven by a [`ManualClock`].
///
/// Nothing fires on its own; the owner pulls due wakeups with
/// [`ManualScheduler::pop_due`] and sets the clock to each due instant
/// before dispatching it.
#[derive(Debug)]
pub struct ManualScheduler {
    clock: Arc<ManualClock>,
    entries: Vec<Entry>,
    next_handle: u64,
    next_seq: u64,
}

impl ManualScheduler {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            entries: Vec::new(),
            next_handle: 1,
            next_seq: 0,
        }
    }

    pub fn clock(&self) -> &Arc<ManualClock> {
        &self.clock
    }

    /// Earliest wakeup due at or before `until`, ties broken by arming order.
    ///
    /// Periodic entries are re-armed one period later before being returned.
    pub fn pop_due(&mut self, until: DateTime<Utc>) -> Option<(DateTime<Utc>, Fired)> {
        let index = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.due <= until)
            .min_by_key(|(_, entry)| (entry.due, entry.seq))
            .map(|(index, _)| index)?;

        let due = self.entries[index].due;
        let fired = Fired {
            handle: self.entries[index].handle,
            wakeup: self.entries[index].wakeup,
        };

        match self.entries[index].period {
            Some(period) => {
                let seq = self.bump_seq();
                let entry = &mut self.entries[index];
                entry.due = due + to_chrono(period);
                entry.seq = seq;
            }
            None => {
                self.entries.remove(index);
            }
        }

        Some((due, fired))
    }

    pub fn is_armed(&self, handle: TimerHandle) -> bool {
        self.entries.iter().any(|entry| entry.handle == handle)
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn arm(&mut self, delay: Duration, period: Option<Duration>, wakeup: Wakeup) -> TimerHandle {
        let handle = TimerHandle::new(self.next_handle);
        self.next_handle += 1;
        let seq = self.bump_seq();
        self.entries.push(Entry {
            handle,
            due: self.clock.now() + to_chrono(delay),
            period,
            wakeup,
            seq,
        });
        handle
    }
}

impl Scheduler for ManualScheduler {
    fn after(&mut self, delay: Duration, wakeup: Wakeup) -> TimerHandle {
        self.arm(delay, None, wakeup)
    }

    fn every(&mut self, period: Duration, wakeup: Wakeup) -> TimerHandle {
        let period = period.max(MIN_PERIOD);
        self.arm(period, Some(period), wakeup)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.entries.retain(|entry| entry.handle != handle);
    }

    fn pending(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn scheduler() -> ManualScheduler {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        ManualScheduler::new(Arc::new(ManualClock::new(start)))
    }

    #[test]
    fn fires_in_due_then_arming_order() {
        let mut s = scheduler();
        let start = s.clock().now();
        s.after(Duration::from_secs(2), Wakeup::ReminderDue(2));
        s.after(Duration::from_secs(1), Wakeup::ReminderDue(1));
        s.after(Duration::from_secs(2), Wakeup::ReminderDue(3));

        let until = start + chrono::Duration::seconds(5);
        let order: Vec<Wakeup> = std::iter::from_fn(|| s.pop_due(until))
            .map(|(_, fired)| fired.wakeup)
            .collect();
        assert_eq!(
            order,
            vec![
                Wakeup::ReminderDue(1),
                Wakeup::ReminderDue(2),
                Wakeup::ReminderDue(3)
            ]
        );
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn periodic_entries_rearm_until_cancelled() {
        let mut s = scheduler();
        let start = s.clock().now();
        let handle = s.every(Duration::from_secs(1), Wakeup::TimerTick);

        let until = start + chrono::Duration::milliseconds(3_500);
        let mut count = 0;
        while s.pop_due(until).is_some() {
            count += 1;
        }
        assert_eq!(count, 3);
        assert!(s.is_armed(handle));

        s.cancel(handle);
        s.cancel(handle);
        assert!(!s.is_armed(handle));
        assert!(s.pop_due(until + chrono::Duration::seconds(10)).is_none());
    }
}
