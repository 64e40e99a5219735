//! Utility helpers
//!
//! Logging setup and timing.

pub mod logger;
pub mod timer;

pub use logger::{init_logger, init_logger_from_env, LogLevel};
pub use timer::Timer;
