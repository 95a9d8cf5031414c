use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{Fired, Scheduler, TimerHandle, Wakeup};

struct Armed {
    token: CancellationToken,
    periodic: bool,
}

/// Scheduler backed by tokio timers.
///
/// Each handle owns a task and a `CancellationToken`. Deliveries funnel into
/// one channel that the owner drains with [`TokioScheduler::next`], so every
/// callback still runs on the owner's task. A delivery already sitting in the
/// channel when its handle is cancelled is dropped by `next`.
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<Fired>,
    rx: mpsc::UnboundedReceiver<Fired>,
    live: HashMap<TimerHandle, Armed>,
    next_handle: u64,
}

impl TokioScheduler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            live: HashMap::new(),
            next_handle: 1,
        }
    }

    /// Wait for the next live wakeup.
    ///
    /// Cancel-safe: the only await point is the channel receive.
    pub async fn next(&mut self) -> Option<Fired> {
        loop {
            let fired = self.rx.recv().await?;
            let periodic = match self.live.get(&fired.handle) {
                Some(armed) => armed.periodic,
                None => {
                    debug!("dropping stale delivery for handle {}", fired.handle.id());
                    continue;
                }
            };
            if !periodic {
                self.live.remove(&fired.handle);
            }
            return Some(fired);
        }
    }

    fn allocate(&mut self, periodic: bool) -> (TimerHandle, CancellationToken) {
        let handle = TimerHandle::new(self.next_handle);
        self.next_handle += 1;
        let token = CancellationToken::new();
        self.live.insert(
            handle,
            Armed {
                token: token.clone(),
                periodic,
            },
        );
        (handle, token)
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TokioScheduler {
    fn after(&mut self, delay: Duration, wakeup: Wakeup) -> TimerHandle {
        let (handle, token) = self.allocate(false);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = time::sleep(delay) => {
                    let _ = tx.send(Fired { handle, wakeup });
                }
            }
        });
        handle
    }

    fn every(&mut self, period: Duration, wakeup: Wakeup) -> TimerHandle {
        let (handle, token) = self.allocate(true);
        let tx = self.tx.clone();
        let period = period.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if tx.send(Fired { handle, wakeup }).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(armed) = self.live.remove(&handle) {
            armed.token.cancel();
        }
    }

    fn pending(&self) -> usize {
        self.live.len()
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, armed) in self.live.drain() {
            armed.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn one_shot_delivers_once() {
        let mut scheduler = TokioScheduler::new();
        let handle = scheduler.after(Duration::from_secs(3), Wakeup::QueueSettled);
        let fired = scheduler.next().await.unwrap();
        assert_eq!(fired.handle, handle);
        assert_eq!(fired.wakeup, Wakeup::QueueSettled);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_handle_never_delivers() {
        let mut scheduler = TokioScheduler::new();
        let doomed = scheduler.after(Duration::from_secs(1), Wakeup::ReminderDue(1));
        let kept = scheduler.after(Duration::from_secs(2), Wakeup::ReminderDue(2));
        scheduler.cancel(doomed);
        scheduler.cancel(doomed);

        let fired = scheduler.next().await.unwrap();
        assert_eq!(fired.handle, kept);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_keeps_delivering() {
        let mut scheduler = TokioScheduler::new();
        let handle = scheduler.every(Duration::from_secs(1), Wakeup::TimerTick);
        for _ in 0..3 {
            assert_eq!(scheduler.next().await.unwrap().handle, handle);
        }
        assert_eq!(scheduler.pending(), 1);
        scheduler.cancel(handle);
        assert_eq!(scheduler.pending(), 0);
    }
}
