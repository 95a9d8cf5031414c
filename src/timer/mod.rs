pub mod config;
pub mod controller;
pub mod mindfulness;
pub mod state;

pub use config::{compute_schedule, ConfigWarning, Schedule, TimerConfig};
pub use controller::{ConfigReport, PersistedTimer, SessionTimer, TimerEvent, TimerSnapshot};
pub use mindfulness::{BreakCard, BreakCards, BREAK_CARDS};
pub use state::{Segment, SegmentOutcome, TimerState, TimerStatus};
