pub mod format;
pub mod ids;
pub mod logging;
