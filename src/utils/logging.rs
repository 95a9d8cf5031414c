//! Logging switches shared by every module.
//!
//! A module opts in by declaring its own flag and then calling the macros,
//! which are exported at the crate root:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_info, log_warn};
//!
//! log_info!("reminder {} armed", id);
//! ```
//! Flipping the flag to `false` silences the module without touching the
//! global `RUST_LOG` filter.

/// Info-level log gated on the calling module's `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Warn-level log gated on the calling module's `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Error-level log gated on the calling module's `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}

/// Debug-level log gated on the calling module's `ENABLE_LOGS`.
///
/// Used for per-tick chatter that would drown the info stream.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// Resolve the default level for `env_logger` from the debug switch.
pub fn default_level(debug: bool) -> log::LevelFilter {
    if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENABLE_LOGS: bool = false;

    #[test]
    fn disabled_macros_still_expand() {
        log_info!("hidden {}", 1);
        log_warn!("hidden");
        log_error!("hidden");
        log_debug!("hidden");
    }

    #[test]
    fn debug_switch_selects_level() {
        assert_eq!(default_level(true), log::LevelFilter::Debug);
        assert_eq!(default_level(false), log::LevelFilter::Info);
    }
}
