//! Global Configuration (~/.suiterun/config.toml)
//!
//! Handles user-level configuration stored in `~/.suiterun/config.toml`.

use crate::{read_toml, validate_parallelism, ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.suiterun/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Default settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

/// Default settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    /// Default parallelism for every project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<usize>,

    /// Suppress progress characters by default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiet: Option<bool>,

    /// Colorize console output by default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let config: Self = read_toml(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(parallelism) = self.default_parallelism() {
            validate_parallelism("defaults.parallelism", parallelism)?;
        }
        Ok(())
    }

    /// Get the global config file path (~/.suiterun/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".suiterun").join("config.toml"))
    }

    pub fn default_parallelism(&self) -> Option<usize> {
        self.defaults.as_ref().and_then(|d| d.parallelism)
    }

    pub fn default_quiet(&self) -> Option<bool> {
        self.defaults.as_ref().and_then(|d| d.quiet)
    }

    pub fn default_color(&self) -> Option<bool> {
        self.defaults.as_ref().and_then(|d| d.color)
    }
}
