use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PagePauseError, Result};

pub const MIN_TOTAL_MINUTES: u32 = 15;
pub const MAX_TOTAL_MINUTES: u32 = 240;
pub const TOTAL_STEP_MINUTES: u32 = 5;
/// No normalized segment runs longer than the whole run may.
pub const MAX_SEGMENT_SECS: u64 = MAX_TOTAL_MINUTES as u64 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerConfig {
    pub total_minutes: u32,
    #[serde(rename = "focusPeriod")]
    pub focus_period_minutes: u32,
    #[serde(rename = "breakPeriod")]
    pub break_period_minutes: u32,
    pub skip_breaks: bool,
    #[serde(default = "enabled")]
    pub start_focus_tone: bool,
    #[serde(default = "enabled")]
    pub start_break_tone: bool,
    #[serde(default = "enabled")]
    pub eye_exercises: bool,
}

fn enabled() -> bool {
    true
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            total_minutes: 50,
            focus_period_minutes: 20,
            break_period_minutes: 5,
            skip_breaks: false,
            start_focus_tone: true,
            start_break_tone: true,
            eye_exercises: true,
        }
    }
}

/// Automatic corrections applied while normalising a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigWarning {
    RaisedToMinimum { minimum: u32 },
    LoweredToMaximum { maximum: u32 },
    RaisedToFocusPeriod { focus: u32 },
    FocusPeriodRaised,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::RaisedToMinimum { minimum } => {
                write!(f, "Focus timer must be at least {minimum} minutes")
            }
            ConfigWarning::LoweredToMaximum { maximum } => {
                write!(f, "Focus timer is capped at {maximum} minutes")
            }
            ConfigWarning::RaisedToFocusPeriod { focus } => {
                write!(f, "Timer adjusted to match focus period ({focus} mins)")
            }
            ConfigWarning::FocusPeriodRaised => write!(f, "Focus period must be at least 1 minute"),
        }
    }
}

/// Sessions and breaks a configuration yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Schedule {
    pub sessions: u32,
    pub breaks: u32,
}

/// Nearest multiple of five, halves rounding up.
pub fn round_to_grid(minutes: u32) -> u32 {
    minutes.saturating_add(TOTAL_STEP_MINUTES / 2) / TOTAL_STEP_MINUTES * TOTAL_STEP_MINUTES
}

impl TimerConfig {
    /// Clamp into the valid space: focus ≥ 1, total on the 5-minute grid
    /// within [15, 240], then total raised to at least one focus period.
    pub fn normalized(mut self) -> (Self, Vec<ConfigWarning>) {
        let mut warnings = Vec::new();

        if self.focus_period_minutes == 0 {
            self.focus_period_minutes = 1;
            warnings.push(ConfigWarning::FocusPeriodRaised);
        }
        self.focus_period_minutes = self.focus_period_minutes.min(MAX_TOTAL_MINUTES);
        self.break_period_minutes = self.break_period_minutes.min(MAX_TOTAL_MINUTES);

        let mut total = round_to_grid(self.total_minutes);
        if total < MIN_TOTAL_MINUTES {
            total = MIN_TOTAL_MINUTES;
            warnings.push(ConfigWarning::RaisedToMinimum {
                minimum: MIN_TOTAL_MINUTES,
            });
        } else if total > MAX_TOTAL_MINUTES {
            total = MAX_TOTAL_MINUTES;
            warnings.push(ConfigWarning::LoweredToMaximum {
                maximum: MAX_TOTAL_MINUTES,
            });
        }
        if total < self.focus_period_minutes {
            total = self.focus_period_minutes;
            warnings.push(ConfigWarning::RaisedToFocusPeriod {
                focus: self.focus_period_minutes,
            });
        }
        self.total_minutes = total;

        (self, warnings)
    }

    /// Start-time check; unlike `normalized` this refuses instead of fixing.
    pub fn validate(&self) -> Result<()> {
        if self.total_minutes < MIN_TOTAL_MINUTES {
            return Err(PagePauseError::InvalidConfiguration(format!(
                "focus timer must be at least {MIN_TOTAL_MINUTES} minutes"
            )));
        }
        if self.focus_period_minutes == 0 || self.total_minutes < self.focus_period_minutes {
            return Err(PagePauseError::InvalidConfiguration(format!(
                "focus timer ({} mins) must be greater than or equal to focus period ({} mins)",
                self.total_minutes, self.focus_period_minutes
            )));
        }
        Ok(())
    }

    pub fn focus_secs(&self) -> u64 {
        u64::from(self.focus_period_minutes) * 60
    }

    pub fn break_secs(&self) -> u64 {
        u64::from(self.break_period_minutes) * 60
    }
}

/// Simulate a run: consume a focus period, then a break only when another
/// full focus period still fits after it.
pub fn compute_schedule(config: &TimerConfig) -> Schedule {
    let focus = config.focus_period_minutes;
    let brk = config.break_period_minutes;
    if focus == 0 {
        return Schedule::default();
    }
    if config.skip_breaks {
        return Schedule {
            sessions: config.total_minutes / focus,
            breaks: 0,
        };
    }

    let mut remaining = config.total_minutes;
    let mut schedule = Schedule::default();
    while remaining >= focus {
        remaining -= focus;
        schedule.sessions += 1;
        if remaining < brk || remaining - brk < focus {
            break;
        }
        remaining -= brk;
        schedule.breaks += 1;
    }
    schedule
}
