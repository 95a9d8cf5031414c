//! Error kinds surfaced by the timer, reminder and task operations.
//!
//! None of these are fatal: callers log them and keep the process alive.

/// Domain error for all core operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PagePauseError {
    /// Timer settings violate the minimum or ordering rules.
    #[error("invalid timer configuration: {0}")]
    InvalidConfiguration(String),
    /// Empty text or a non-positive delay.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The persistence backend could not be reached; state is memory-only.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    /// A persisted deadline had already passed when it was reloaded.
    #[error("restored state is stale: {0}")]
    StaleRestoredState(String),
    #[error("a timer run is already active")]
    AlreadyRunning,
    #[error("no item with id {0}")]
    NotFound(i64),
}

/// A convenience type alias for `Result<T, PagePauseError>`.
pub type Result<T> = std::result::Result<T, PagePauseError>;
