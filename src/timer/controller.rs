use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::effects::chimes;
use crate::error::{PagePauseError, Result};
use crate::host::Host;
use crate::scheduler::{disarm, TimerHandle, Wakeup};
use crate::store::keys;
use crate::utils::format::{format_clock, page_title, session_label};

use super::config::{compute_schedule, ConfigWarning, Schedule, TimerConfig, MAX_SEGMENT_SECS, MAX_TOTAL_MINUTES, MIN_TOTAL_MINUTES, TOTAL_STEP_MINUTES};
use super::mindfulness::BreakCards;
use super::state::{Segment, SegmentOutcome, TimerState, TimerStatus};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Lifecycle signals for tone and notification collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "event")]
pub enum TimerEvent {
    FocusStarted { session: u32, total: u32 },
    BreakStarted { number: u32, total_breaks: u32, minutes: u32 },
    AllComplete,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub status: TimerStatus,
    pub is_break: bool,
    pub is_paused: bool,
    pub remaining_secs: u64,
    pub clock: String,
    pub title: String,
    pub segment_label: String,
    pub session_label: String,
    /// Fraction of the segment still to go, 1.0 at segment start.
    pub progress: f64,
    pub sessions: u32,
    pub breaks: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigReport {
    pub config: TimerConfig,
    pub schedule: Schedule,
    pub warnings: Vec<ConfigWarning>,
}

/// Timer blob stored under `pagepause-state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedTimer {
    #[serde(flatten)]
    pub config: TimerConfig,
    pub is_running: bool,
    pub is_paused: bool,
    pub is_break: bool,
    pub current_session: u32,
    pub total_sessions: u32,
    pub remaining_seconds: u64,
    #[serde(default)]
    pub segment_seconds: u64,
    /// Absolute end of the running segment; `None` when idle or paused.
    pub timer_end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

/// Owns the timer configuration and the single running session.
pub struct SessionTimer {
    config: TimerConfig,
    state: TimerState,
    tick: Option<TimerHandle>,
    cards: BreakCards,
    tick_interval: Duration,
}

impl SessionTimer {
    pub fn new(tick_interval: Duration) -> Self {
        let config = TimerConfig::default();
        let mut state = TimerState::new();
        state.total_sessions = compute_schedule(&config).sessions;
        Self {
            config,
            state,
            tick: None,
            cards: BreakCards::new(),
            tick_interval,
        }
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn schedule(&self) -> Schedule {
        compute_schedule(&self.config)
    }

    pub fn cards(&self) -> &BreakCards {
        &self.cards
    }

    pub fn is_ticking(&self) -> bool {
        self.tick.is_some()
    }

    /// Clamp, recompute derived counts and persist.
    ///
    /// A run in progress keeps its session total; new durations apply from
    /// the next segment on.
    pub fn configure(&mut self, host: &mut Host<'_>, requested: TimerConfig) -> ConfigReport {
        let (config, warnings) = requested.normalized();
        for warning in &warnings {
            log_warn!("timer configuration adjusted: {warning}");
            host.effects.config_warning(&warning.to_string());
        }
        self.config = config;
        let schedule = compute_schedule(&config);
        if !self.state.is_active() {
            self.state.total_sessions = schedule.sessions;
        }
        self.persist(host);
        ConfigReport {
            config,
            schedule,
            warnings,
        }
    }

    /// The ± buttons: move total by one grid step within bounds.
    pub fn step_total(&mut self, host: &mut Host<'_>, up: bool) -> ConfigReport {
        let mut next = self.config;
        next.total_minutes = if up {
            (next.total_minutes + TOTAL_STEP_MINUTES).min(MAX_TOTAL_MINUTES)
        } else {
            next.total_minutes
                .saturating_sub(TOTAL_STEP_MINUTES)
                .max(MIN_TOTAL_MINUTES)
        };
        self.configure(host, next)
    }

    pub fn start(&mut self, host: &mut Host<'_>) -> Result<()> {
        if self.state.is_active() {
            return Err(PagePauseError::AlreadyRunning);
        }
        self.config.validate()?;

        let now = host.now();
        let schedule = compute_schedule(&self.config);
        self.state.begin_run(schedule.sessions, self.config.focus_secs(), now);
        self.arm_tick(host);
        host.effects.acquire_wake_lock();
        log_info!(
            "timer started: {} session(s), {} break(s)",
            schedule.sessions,
            schedule.breaks
        );
        self.announce(
            host,
            TimerEvent::FocusStarted {
                session: 1,
                total: schedule.sessions,
            },
        );
        host.effects.timer_updated(&self.snapshot(now));
        self.persist(host);
        Ok(())
    }

    /// Recompute remaining time from timestamps; no-op unless running.
    pub fn tick(&mut self, host: &mut Host<'_>) {
        if !matches!(self.state.status, TimerStatus::Running(_)) {
            return;
        }
        let now = host.now();
        let remaining = self.state.recompute(now);
        if remaining == 0 {
            self.on_segment_complete(host);
            return;
        }
        host.effects.timer_updated(&self.snapshot(now));
        if remaining % 10 == 0 {
            self.persist(host);
        }
    }

    pub fn pause(&mut self, host: &mut Host<'_>) -> bool {
        let now = host.now();
        if !self.state.pause(now) {
            return false;
        }
        if self.state.is_break() {
            self.cards.stop(host);
        }
        log_debug!("timer paused with {}s left", self.state.remaining_at(now));
        host.effects.timer_updated(&self.snapshot(now));
        self.persist(host);
        true
    }

    pub fn resume(&mut self, host: &mut Host<'_>) -> bool {
        let now = host.now();
        if !self.state.resume(now) {
            return false;
        }
        if self.state.is_break() && self.config.eye_exercises {
            self.cards.start(host, self.state.remaining_at(now));
        }
        log_debug!("timer resumed");
        host.effects.timer_updated(&self.snapshot(now));
        self.persist(host);
        true
    }

    pub fn toggle_pause(&mut self, host: &mut Host<'_>) -> bool {
        if self.state.is_paused() {
            self.resume(host)
        } else {
            self.pause(host)
        }
    }

    /// Abandon the run without completion signals.
    pub fn stop(&mut self, host: &mut Host<'_>) {
        if !self.state.is_active() {
            return;
        }
        self.halt(host);
        self.state.reset();
        log_info!("timer stopped");
        self.persist(host);
    }

    /// The page became visible again after possible throttling.
    pub fn on_visibility_change(&mut self, host: &mut Host<'_>, visible: bool) {
        if !visible || !self.state.is_active() {
            return;
        }
        if !self.state.is_paused() {
            host.effects.acquire_wake_lock();
        }
        self.tick(host);
    }

    pub fn handle_card_wakeup(&mut self, host: &mut Host<'_>, wakeup: Wakeup) {
        if self.state.is_break() && !self.state.is_paused() {
            self.cards.handle(host, wakeup);
        }
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> TimerSnapshot {
        let schedule = self.schedule();
        let remaining = if self.state.is_active() {
            self.state.remaining_at(now)
        } else {
            0
        };
        let progress = if self.state.segment_secs == 0 {
            0.0
        } else {
            remaining as f64 / self.state.segment_secs as f64
        };
        let segment_label = match self.state.segment() {
            Some(Segment::Focus) => "Focus Session",
            Some(Segment::Break) => "Break Time",
            None => "Ready",
        };
        TimerSnapshot {
            status: self.state.status,
            is_break: self.state.is_break(),
            is_paused: self.state.is_paused(),
            remaining_secs: remaining,
            clock: format_clock(remaining),
            title: page_title(remaining),
            segment_label: segment_label.to_string(),
            session_label: session_label(
                self.state.is_break(),
                self.state.current_session,
                self.state.total_sessions,
            ),
            progress,
            sessions: schedule.sessions,
            breaks: schedule.breaks,
        }
    }

    pub fn to_persisted(&self, now: DateTime<Utc>) -> PersistedTimer {
        let active = self.state.is_active();
        PersistedTimer {
            config: self.config,
            is_running: active,
            is_paused: self.state.is_paused(),
            is_break: self.state.is_break(),
            current_session: self.state.current_session,
            total_sessions: self.state.total_sessions,
            remaining_seconds: if active { self.state.remaining_at(now) } else { 0 },
            segment_seconds: self.state.segment_secs,
            timer_end_time: self.state.deadline(),
            saved_at: Some(now),
        }
    }

    pub fn persist(&self, host: &mut Host<'_>) {
        let blob = self.to_persisted(host.now());
        host.storage.save(keys::TIMER_STATE, &blob);
    }

    /// Reload configuration and any run that was active at shutdown.
    pub fn restore(&mut self, host: &mut Host<'_>) {
        let Some(saved) = host.storage.load::<PersistedTimer>(keys::TIMER_STATE) else {
            return;
        };
        let (config, _) = saved.config.normalized();
        self.config = config;
        self.state = TimerState::new();
        self.state.total_sessions = compute_schedule(&config).sessions;

        if !saved.is_running {
            return;
        }

        if saved.segment_seconds > MAX_SEGMENT_SECS || saved.remaining_seconds > MAX_SEGMENT_SECS {
            let stale = PagePauseError::StaleRestoredState(format!(
                "segment of {}s with {}s left is out of range",
                saved.segment_seconds, saved.remaining_seconds
            ));
            log_warn!("{stale}; discarding the saved run");
            return;
        }

        let now = host.now();
        let segment = if saved.is_break {
            Segment::Break
        } else {
            Segment::Focus
        };
        let segment_secs = if saved.segment_seconds > 0 {
            saved.segment_seconds
        } else if saved.is_break {
            config.break_secs()
        } else {
            config.focus_secs()
        };

        if saved.is_paused {
            self.state.restore_segment(
                segment,
                saved.current_session,
                saved.total_sessions,
                segment_secs,
                saved.remaining_seconds,
                true,
                now,
            );
            self.arm_tick(host);
            log_info!("restored paused timer with {}s left", saved.remaining_seconds);
            return;
        }

        let remaining = saved
            .timer_end_time
            .map(|deadline| {
                let ms = (deadline - now).num_milliseconds().max(0) as u64;
                ms.div_ceil(1000)
            })
            .unwrap_or(0)
            .min(segment_secs);

        self.state.restore_segment(
            segment,
            saved.current_session,
            saved.total_sessions,
            segment_secs,
            remaining,
            false,
            now,
        );
        self.arm_tick(host);
        host.effects.acquire_wake_lock();

        if remaining == 0 {
            let stale = PagePauseError::StaleRestoredState(format!(
                "{} segment ended while the app was closed",
                if saved.is_break { "break" } else { "focus" }
            ));
            log_warn!("{stale}; completing it now");
            self.on_segment_complete(host);
            return;
        }

        let kind = if saved.is_break { "break" } else { "focus" };
        host.effects
            .show_notification("Timer Resumed", &format!("Continuing your {kind} session"));
        if saved.is_break && self.config.eye_exercises {
            self.cards.start(host, remaining);
        }
        log_info!("restored running timer with {remaining}s left");
    }

    /// Another tab rewrote the timer blob; only settings are adopted and
    /// only while no run is active here.
    /// Returns whether the configuration was taken over.
    pub fn adopt_external(&mut self, host: &mut Host<'_>, saved: PersistedTimer) -> bool {
        if self.state.is_active() {
            log_debug!("ignoring external timer change during an active run");
            return false;
        }
        let (config, _) = saved.config.normalized();
        self.config = config;
        self.state.total_sessions = compute_schedule(&config).sessions;
        host.effects.timer_updated(&self.snapshot(host.now()));
        true
    }

    fn on_segment_complete(&mut self, host: &mut Host<'_>) {
        let now = host.now();
        if self.state.is_break() {
            self.cards.stop(host);
        }
        match self.state.complete_segment(&self.config, now) {
            SegmentOutcome::Focus { session } => {
                let total = self.state.total_sessions;
                self.announce(host, TimerEvent::FocusStarted { session, total });
            }
            SegmentOutcome::Break { number, secs } => {
                let total_breaks = self.state.total_sessions.saturating_sub(1);
                self.announce(
                    host,
                    TimerEvent::BreakStarted {
                        number,
                        total_breaks,
                        minutes: self.config.break_period_minutes,
                    },
                );
                if self.config.eye_exercises {
                    self.cards.start(host, secs);
                }
            }
            SegmentOutcome::Finished => {
                self.complete(host);
                return;
            }
        }
        host.effects.timer_updated(&self.snapshot(now));
        self.persist(host);
    }

    fn complete(&mut self, host: &mut Host<'_>) {
        self.halt(host);
        self.state.status = TimerStatus::Completed;
        log_info!("all sessions complete");
        self.announce(host, TimerEvent::AllComplete);
        self.state.reset();
        self.persist(host);
    }

    fn halt(&mut self, host: &mut Host<'_>) {
        disarm(host.scheduler, &mut self.tick);
        self.cards.stop(host);
        host.effects.release_wake_lock();
    }

    fn arm_tick(&mut self, host: &mut Host<'_>) {
        disarm(host.scheduler, &mut self.tick);
        self.tick = Some(host.scheduler.every(self.tick_interval, Wakeup::TimerTick));
    }

    fn announce(&self, host: &mut Host<'_>, event: TimerEvent) {
        host.effects.timer_event(&event);
        match event {
            TimerEvent::FocusStarted { session, total } => {
                if self.config.start_focus_tone {
                    host.effects.play_chime(chimes::FOCUS_START);
                }
                if session == 1 {
                    host.effects.show_notification(
                        "Focus Session Started",
                        &format!(
                            "Let's focus for {} minutes! 📖",
                            self.config.focus_period_minutes
                        ),
                    );
                } else {
                    host.effects.show_notification(
                        "Focus Session",
                        &format!("Session {session} of {total} - Let's focus! 📖"),
                    );
                }
            }
            TimerEvent::BreakStarted { minutes, .. } => {
                if self.config.start_break_tone {
                    host.effects.play_chime(chimes::BREAK_START);
                }
                let hint = if self.config.eye_exercises {
                    " Remember to do your eye exercises! 👁️"
                } else {
                    ""
                };
                host.effects.show_notification(
                    "Break Time!",
                    &format!("Take a {minutes}-minute break.{hint}"),
                );
            }
            TimerEvent::AllComplete => {
                host.effects.play_chime(chimes::ALL_COMPLETE);
                host.effects.show_notification(
                    "Great Work! 🎉",
                    "You've completed all your focus sessions. Your eyes thank you!",
                );
            }
        }
    }
}
