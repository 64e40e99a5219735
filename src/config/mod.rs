//! Configuration module
//!
//! Options accepted when constructing an engine.

mod env;
mod file;

pub use env::EnvConfig;
pub use file::CONFIG_LOCATIONS;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default root description
pub const DEFAULT_DESCRIPTION: &str = "root";

/// Default spec timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 6000;

/// Engine configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Description of the root node
    pub description: String,

    /// Default spec timeout in milliseconds, stored for timing collaborators
    #[serde(alias = "timeout")]
    pub timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            description: DEFAULT_DESCRIPTION.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl EngineConfig {
    /// Create a config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the default spec timeout in milliseconds
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Get the default spec timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
