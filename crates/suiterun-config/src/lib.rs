//! Suiterun Configuration System
//!
//! Provides configuration management for suiterun including:
//! - Project configuration (suiterun.toml)
//! - Global user configuration (~/.suiterun/config.toml)
//! - Configuration precedence and merging
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Global config (~/.suiterun/config.toml)
//! 2. Project config (./suiterun.toml, searched upwards)
//! 3. Environment variables (SUITERUN_*, NO_COLOR)
//! 4. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use suiterun_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("running {} suites at a time", config.parallelism());
//! ```

pub mod global;
pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Parallelism used when no layer sets one
pub const DEFAULT_PARALLELISM: usize = 4;

/// Upper bound accepted for parallelism
pub const MAX_PARALLELISM: usize = 1024;

/// Module file-stem suffix used when no layer sets one
pub const DEFAULT_MODULE_SUFFIX: &str = "tests";

/// Check a parallelism value from any layer
pub(crate) fn validate_parallelism(field: &str, value: usize) -> ConfigResult<()> {
    if value == 0 || value > MAX_PARALLELISM {
        return Err(ConfigError::invalid_value(
            field,
            format!("must be between 1 and {}, got {}", MAX_PARALLELISM, value),
        ));
    }
    Ok(())
}

/// Read and parse a TOML configuration file
pub(crate) fn read_toml<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> ConfigResult<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound(path.to_path_buf())
        } else {
            ConfigError::IoError(e)
        }
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
        file: path.to_path_buf(),
        error: e,
    })
}

// Re-export main types
pub use global::GlobalConfig;
pub use loader::{Config, ConfigLoader};
pub use project::ProjectConfig;
