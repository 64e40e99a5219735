//! Environment variable configuration
//!
//! `SPECRUN_DESCRIPTION` and `SPECRUN_TIMEOUT` override loaded values.

use std::env;

use super::EngineConfig;
use crate::utils::LogLevel;

/// Environment variable prefix
const ENV_PREFIX: &str = "SPECRUN";

/// Overrides read from the environment
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvConfig {
    /// Root description from SPECRUN_DESCRIPTION
    pub description: Option<String>,
    /// Timeout in milliseconds from SPECRUN_TIMEOUT
    pub timeout_ms: Option<u64>,
    /// Log level name from SPECRUN_LOG
    pub log: Option<String>,
}

impl EnvConfig {
    /// Load overrides from the process environment
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read overrides through `lookup`, which receives full variable names
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}_{name}"));
        Self {
            description: get("DESCRIPTION").filter(|v| !v.trim().is_empty()),
            timeout_ms: get("TIMEOUT").and_then(|v| v.trim().parse().ok()),
            log: get("LOG"),
        }
    }

    /// Check if any override is set
    pub fn has_any(&self) -> bool {
        self.description.is_some() || self.timeout_ms.is_some() || self.log.is_some()
    }

    /// Parsed SPECRUN_LOG, `None` when unset or not a known level
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log.as_deref().and_then(LogLevel::parse)
    }

    /// Apply the overrides on top of `config`
    pub fn apply(&self, mut config: EngineConfig) -> EngineConfig {
        if let Some(description) = &self.description {
            config.description = description.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        config
    }
}
