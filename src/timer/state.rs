use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::elapsed_ms;

use super::config::{TimerConfig, MAX_SEGMENT_SECS};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Segment {
    Focus,
    Break,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", tag = "state", content = "segment")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running(Segment),
    Paused(Segment),
    /// Passed through on the way back to `Idle` when the last segment ends.
    Completed,
}

/// What finishing the current segment led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentOutcome {
    Focus { session: u32 },
    Break { number: u32, secs: u64 },
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimerState {
    pub status: TimerStatus,
    pub current_session: u32,
    pub total_sessions: u32,
    pub segment_secs: u64,
    pub remaining_secs: u64,
    /// Anchor for drift-free countdowns; combines with `paused_ms` and
    /// `pause_started_at` to compute time actually spent in the segment.
    pub segment_started_at: Option<DateTime<Utc>>,
    pub paused_ms: u64,
    pub pause_started_at: Option<DateTime<Utc>>,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            status: TimerStatus::Idle,
            current_session: 0,
            total_sessions: 0,
            segment_secs: 0,
            remaining_secs: 0,
            segment_started_at: None,
            paused_ms: 0,
            pause_started_at: None,
        }
    }
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segment(&self) -> Option<Segment> {
        match self.status {
            TimerStatus::Running(segment) | TimerStatus::Paused(segment) => Some(segment),
            TimerStatus::Idle | TimerStatus::Completed => None,
        }
    }

    /// Running or paused.
    pub fn is_active(&self) -> bool {
        self.segment().is_some()
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.status, TimerStatus::Paused(_))
    }

    pub fn is_break(&self) -> bool {
        self.segment() == Some(Segment::Break)
    }

    pub fn begin_run(&mut self, total_sessions: u32, focus_secs: u64, now: DateTime<Utc>) {
        self.total_sessions = total_sessions;
        self.current_session = 1;
        self.begin_segment(Segment::Focus, focus_secs, now);
    }

    pub fn begin_segment(&mut self, segment: Segment, secs: u64, now: DateTime<Utc>) {
        self.status = TimerStatus::Running(segment);
        self.segment_secs = secs;
        self.remaining_secs = secs;
        self.segment_started_at = Some(now);
        self.paused_ms = 0;
        self.pause_started_at = None;
    }

    /// Milliseconds spent running in this segment; paused time excluded.
    pub fn active_ms(&self, now: DateTime<Utc>) -> u64 {
        let Some(started) = self.segment_started_at else {
            return 0;
        };
        let reference = self.pause_started_at.unwrap_or(now);
        elapsed_ms(started, reference).saturating_sub(self.paused_ms)
    }

    /// Remaining time derived from timestamps, not from tick counts.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> u64 {
        self.segment_secs
            .saturating_sub(self.active_ms(now) / 1000)
    }

    pub fn recompute(&mut self, now: DateTime<Utc>) -> u64 {
        self.remaining_secs = self.remaining_at(now);
        self.remaining_secs
    }

    /// Absolute instant the running segment ends, unknown while paused.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        match (self.status, self.segment_started_at) {
            (TimerStatus::Running(_), Some(started)) => {
                let segment = ChronoDuration::try_seconds(i64::try_from(self.segment_secs).ok()?)?;
                let paused = ChronoDuration::try_milliseconds(i64::try_from(self.paused_ms).ok()?)?;
                started
                    .checked_add_signed(segment)?
                    .checked_add_signed(paused)
            }
            _ => None,
        }
    }

    /// Returns false when not running, so a second pause changes nothing.
    pub fn pause(&mut self, now: DateTime<Utc>) -> bool {
        match self.status {
            TimerStatus::Running(segment) => {
                self.status = TimerStatus::Paused(segment);
                self.pause_started_at = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Returns false without a prior pause.
    pub fn resume(&mut self, now: DateTime<Utc>) -> bool {
        match self.status {
            TimerStatus::Paused(segment) => {
                if let Some(paused_at) = self.pause_started_at.take() {
                    self.paused_ms = self.paused_ms.saturating_add(elapsed_ms(paused_at, now));
                }
                self.status = TimerStatus::Running(segment);
                true
            }
            _ => false,
        }
    }

    /// Session/break bookkeeping when the running segment reaches zero.
    pub fn complete_segment(&mut self, config: &TimerConfig, now: DateTime<Utc>) -> SegmentOutcome {
        match self.segment() {
            Some(Segment::Break) => {
                self.current_session += 1;
                if self.current_session > self.total_sessions {
                    self.status = TimerStatus::Completed;
                    return SegmentOutcome::Finished;
                }
                self.begin_segment(Segment::Focus, config.focus_secs(), now);
                SegmentOutcome::Focus {
                    session: self.current_session,
                }
            }
            Some(Segment::Focus) => {
                if config.skip_breaks || self.current_session >= self.total_sessions {
                    self.status = TimerStatus::Completed;
                    return SegmentOutcome::Finished;
                }
                let secs = config.break_secs();
                self.begin_segment(Segment::Break, secs, now);
                SegmentOutcome::Break {
                    number: self.current_session,
                    secs,
                }
            }
            None => SegmentOutcome::Finished,
        }
    }

    /// Rebuild a segment from persisted values so `remaining_at(now)`
    /// reproduces `remaining_secs`. Both lengths are capped at
    /// `MAX_SEGMENT_SECS`.
    pub fn restore_segment(
        &mut self,
        segment: Segment,
        current_session: u32,
        total_sessions: u32,
        segment_secs: u64,
        remaining_secs: u64,
        paused: bool,
        now: DateTime<Utc>,
    ) {
        let remaining_secs = remaining_secs.min(MAX_SEGMENT_SECS);
        let segment_secs = segment_secs.min(MAX_SEGMENT_SECS).max(remaining_secs);
        let spent = ChronoDuration::seconds((segment_secs - remaining_secs) as i64);
        self.current_session = current_session.max(1);
        self.total_sessions = total_sessions.max(self.current_session);
        self.status = if paused {
            TimerStatus::Paused(segment)
        } else {
            TimerStatus::Running(segment)
        };
        self.segment_secs = segment_secs;
        self.remaining_secs = remaining_secs;
        self.segment_started_at = Some(now.checked_sub_signed(spent).unwrap_or(now));
        self.paused_ms = 0;
        self.pause_started_at = paused.then_some(now);
    }

    /// Back to idle; the derived session total survives.
    pub fn reset(&mut self) {
        *self = Self {
            total_sessions: self.total_sessions,
            ..Self::default()
        };
    }
}
