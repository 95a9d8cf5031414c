use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::effects::Effects;
use crate::scheduler::Scheduler;
use crate::store::Storage;

/// Borrowed view of the injected collaborators, handed to every operation.
pub struct Host<'a> {
    pub clock: &'a dyn Clock,
    pub scheduler: &'a mut dyn Scheduler,
    pub effects: &'a mut dyn Effects,
    pub storage: &'a mut Storage,
}

impl Host<'_> {
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{DateTime, TimeZone, Utc};

    use crate::clock::{to_chrono, Clock, ManualClock};
    use crate::effects::RecordingEffects;
    use crate::scheduler::{ManualScheduler, Wakeup};
    use crate::store::Storage;

    use super::Host;

    pub fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap()
    }

    /// Owned collaborators for unit tests that drive one component.
    pub struct Rig {
        pub clock: Arc<ManualClock>,
        pub scheduler: ManualScheduler,
        pub effects: RecordingEffects,
        pub storage: Storage,
    }

    impl Rig {
        pub fn new() -> Self {
            let clock = Arc::new(ManualClock::new(t0()));
            Self {
                scheduler: ManualScheduler::new(clock.clone()),
                clock,
                effects: RecordingEffects::new(),
                storage: Storage::in_memory(),
            }
        }

        pub fn host(&mut self) -> Host<'_> {
            Host {
                clock: &*self.clock,
                scheduler: &mut self.scheduler,
                effects: &mut self.effects,
                storage: &mut self.storage,
            }
        }

        /// Move time forward, dispatching each due wakeup at its due instant.
        pub fn advance(&mut self, by: Duration, mut dispatch: impl FnMut(&mut Host<'_>, Wakeup)) {
            let until = self.clock.now() + to_chrono(by);
            while let Some((due, fired)) = self.scheduler.pop_due(until) {
                self.clock.set(due);
                let mut host = self.host();
                dispatch(&mut host, fired.wakeup);
            }
            self.clock.set(until);
        }
    }
}
