//! Project Configuration (suiterun.toml)
//!
//! Handles project-level configuration stored in `suiterun.toml` at the project root.

use crate::{read_toml, validate_parallelism, ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the project configuration
pub const PROJECT_CONFIG_FILE: &str = "suiterun.toml";

/// Project configuration from suiterun.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Run settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<RunConfig>,

    /// Console output settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

/// Run settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Maximum number of suites run concurrently
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<usize>,

    /// Suppress progress characters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiet: Option<bool>,

    /// Directory run results and deployment items are written to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_dir: Option<PathBuf>,

    /// Report file written after every run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<PathBuf>,

    /// Name filters applied to every run
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,

    /// File-stem suffix that marks a test module (default: "tests")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_suffix: Option<String>,

    /// Module files or directories used when none are given
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<PathBuf>,
}

/// Console output settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Colorize console output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,

    /// Open the interactive failure browser after a failing run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interactive: Option<bool>,
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let config: Self = read_toml(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(run) = &self.run {
            if let Some(parallelism) = run.parallelism {
                validate_parallelism("run.parallelism", parallelism)?;
            }

            if let Some(suffix) = &run.module_suffix {
                if suffix.trim().is_empty() {
                    return Err(ConfigError::invalid_value(
                        "run.module_suffix",
                        "suffix cannot be empty",
                    ));
                }
            }

            if run.filters.iter().any(|f| f.is_empty()) {
                return Err(ConfigError::invalid_value(
                    "run.filters",
                    "filters cannot be empty strings",
                ));
            }
        }

        Ok(())
    }

    /// Mutable run section, created on demand
    pub fn run_mut(&mut self) -> &mut RunConfig {
        self.run.get_or_insert_with(RunConfig::default)
    }

    /// Mutable output section, created on demand
    pub fn output_mut(&mut self) -> &mut OutputConfig {
        self.output.get_or_insert_with(OutputConfig::default)
    }

    pub fn parallelism(&self) -> Option<usize> {
        self.run.as_ref().and_then(|r| r.parallelism)
    }

    pub fn quiet(&self) -> Option<bool> {
        self.run.as_ref().and_then(|r| r.quiet)
    }

    pub fn color(&self) -> Option<bool> {
        self.output.as_ref().and_then(|o| o.color)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::invalid_value("suiterun.toml", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_minimal_config() {
        let config: ProjectConfig = toml::from_str("").unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[run]
parallelism = 8
quiet = true
results_dir = "out/results"
report = "out/run.trx"
filters = ["Math", "Parser"]
module_suffix = "_spec"
paths = ["target/debug"]

[output]
color = false
interactive = true
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());

        let run = config.run.as_ref().unwrap();
        assert_eq!(run.parallelism, Some(8));
        assert_eq!(run.results_dir, Some(PathBuf::from("out/results")));
        assert_eq!(run.filters, vec!["Math", "Parser"]);
        assert_eq!(run.paths, vec![PathBuf::from("target/debug")]);
        assert_eq!(config.color(), Some(false));
        assert_eq!(config.quiet(), Some(true));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let toml = r#"
[run]
paralelism = 8
"#;
        assert!(toml::from_str::<ProjectConfig>(toml).is_err());
    }

    #[test]
    fn test_zero_parallelism_invalid() {
        let mut config = ProjectConfig::default();
        config.run_mut().parallelism = Some(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_empty_suffix_invalid() {
        let mut config = ProjectConfig::default();
        config.run_mut().module_suffix = Some("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = ProjectConfig::default();
        config.run_mut().parallelism = Some(2);
        config.output_mut().color = Some(true);

        let text = config.to_toml_string().unwrap();
        let parsed: ProjectConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
