//! Logging utilities
//!
//! Installs a compact `tracing` subscriber for the engine's log output.

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::EnvConfig;

/// Log level configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert to tracing Level
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Filter directive scoped to this crate
    pub fn directive(self) -> String {
        format!("specrun={}", self.to_tracing_level())
    }
}

/// Initialize the logger with specified level. `RUST_LOG` wins when set.
/// Returns `false` if a global subscriber was already installed.
pub fn init_logger(level: LogLevel) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .is_ok()
}

/// Initialize the logger at the `SPECRUN_LOG` level, or `default` when it is
/// unset or unknown
pub fn init_logger_from_env(default: LogLevel) -> bool {
    init_logger(level_from_env(&EnvConfig::load(), default))
}

fn level_from_env(env: &EnvConfig, default: LogLevel) -> LogLevel {
    env.log_level().unwrap_or(default)
}
