//! Configuration file loading
//!
//! YAML for `.yaml`/`.yml` paths, JSON otherwise.

use anyhow::{Context, Result};
use std::path::Path;

use super::{EngineConfig, EnvConfig};

/// Configuration file locations (in order of precedence)
pub const CONFIG_LOCATIONS: &[&str] = &["./specrun.yaml", "./specrun.yml", "./specrun.json"];

impl EngineConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Load the first config file found in `dir`, or the defaults
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        match CONFIG_LOCATIONS
            .iter()
            .map(|location| dir.join(location))
            .find(|path| path.exists())
        {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Config file from `dir` (or the defaults) with environment overrides applied
    pub fn discover(dir: impl AsRef<Path>) -> Result<Self> {
        Self::discover_with(dir, &EnvConfig::load())
    }

    /// [`EngineConfig::discover`] with explicit overrides
    pub fn discover_with(dir: impl AsRef<Path>, env: &EnvConfig) -> Result<Self> {
        let config = env.apply(Self::load_from_dir(dir)?);
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            anyhow::bail!("Root description must not be empty");
        }
        if self.timeout_ms == 0 {
            anyhow::bail!("Spec timeout must be greater than zero");
        }
        Ok(())
    }
}

fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == "yaml" || ext == "yml")
        .unwrap_or(false)
}
