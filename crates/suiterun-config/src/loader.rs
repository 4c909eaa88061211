//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::GlobalConfig;
use crate::project::{ProjectConfig, PROJECT_CONFIG_FILE};
use crate::{
    validate_parallelism, ConfigError, ConfigResult, DEFAULT_MODULE_SUFFIX, DEFAULT_PARALLELISM,
};
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable overriding `run.parallelism`
pub const ENV_PARALLELISM: &str = "SUITERUN_PARALLELISM";
/// Environment variable overriding `run.quiet`
pub const ENV_QUIET: &str = "SUITERUN_QUIET";
/// Environment variable overriding `run.results_dir`
pub const ENV_RESULTS_DIR: &str = "SUITERUN_RESULTS_DIR";
/// Environment variable overriding `run.module_suffix`
pub const ENV_MODULE_SUFFIX: &str = "SUITERUN_MODULE_SUFFIX";
/// Environment variables that disable colour when set
pub const ENV_NO_COLOR: &[&str] = &["NO_COLOR", "SUITERUN_NO_COLOR"];

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.suiterun/config.toml) - lowest priority
/// 2. Project config (./suiterun.toml) - overrides global
/// 3. Environment variables (SUITERUN_*) - overrides project
/// 4. CLI flags - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Project configuration, with environment overrides applied
    pub project: ProjectConfig,

    /// Global configuration
    pub global: GlobalConfig,

    /// Project root directory (where suiterun.toml was found)
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Read the global configuration from `path` instead of the home directory
    pub fn with_global_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find suiterun.toml, then loads and merges
    /// global config if it exists.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;
        let global_config = self.load_global_config()?;
        let project_config = self.apply_env_overrides(project_config)?;

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let global_config = self.load_global_config()?;
        let project_config = self.apply_env_overrides(project_config)?;

        let project_root = config_path.parent().map(|p| p.to_path_buf());

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
        })
    }

    /// Find project configuration by walking up directory tree
    ///
    /// Returns (project_root, project_config); the default config when none is found
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_CONFIG_FILE);

            if config_path.exists() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    /// Load global configuration from ~/.suiterun/config.toml
    ///
    /// A missing file or an unknown home directory yields the defaults.
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => match GlobalConfig::global_config_path() {
                Ok(path) => {
                    self.global_config_path = Some(path.clone());
                    path
                }
                Err(ConfigError::HomeNotFound) => return Ok(GlobalConfig::default()),
                Err(e) => return Err(e),
            },
        };

        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        GlobalConfig::load_from_file(&path)
    }

    /// Apply environment variable overrides to project config
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if let Ok(value) = env::var(ENV_PARALLELISM) {
            let parallelism: usize = value.trim().parse().map_err(|_| {
                ConfigError::invalid_value(
                    ENV_PARALLELISM,
                    format!("expected a positive integer, got '{}'", value),
                )
            })?;
            validate_parallelism(ENV_PARALLELISM, parallelism)?;
            config.run_mut().parallelism = Some(parallelism);
        }

        if let Ok(value) = env::var(ENV_QUIET) {
            config.run_mut().quiet = Some(parse_flag(&value));
        }

        if let Ok(value) = env::var(ENV_RESULTS_DIR) {
            if !value.is_empty() {
                config.run_mut().results_dir = Some(PathBuf::from(value));
            }
        }

        if let Ok(value) = env::var(ENV_MODULE_SUFFIX) {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid_value(
                    ENV_MODULE_SUFFIX,
                    "suffix cannot be empty",
                ));
            }
            config.run_mut().module_suffix = Some(value);
        }

        if ENV_NO_COLOR
            .iter()
            .any(|name| env::var_os(name).is_some_and(|v| !v.is_empty()))
        {
            config.output_mut().color = Some(false);
        }

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

impl Config {
    /// Effective parallelism (project > global > default)
    pub fn parallelism(&self) -> usize {
        self.project
            .parallelism()
            .or_else(|| self.global.default_parallelism())
            .unwrap_or(DEFAULT_PARALLELISM)
    }

    /// Effective quiet flag (project > global > off)
    pub fn quiet(&self) -> bool {
        self.project
            .quiet()
            .or_else(|| self.global.default_quiet())
            .unwrap_or(false)
    }

    /// Effective colour flag (project > global > on)
    pub fn color(&self) -> bool {
        self.project
            .color()
            .or_else(|| self.global.default_color())
            .unwrap_or(true)
    }

    /// Whether the interactive failure browser is enabled
    pub fn interactive(&self) -> bool {
        self.project
            .output
            .as_ref()
            .and_then(|o| o.interactive)
            .unwrap_or(false)
    }

    /// Configured results directory, resolved against the project root
    pub fn results_dir(&self) -> Option<PathBuf> {
        let dir = self.project.run.as_ref()?.results_dir.as_ref()?;
        Some(self.resolve(dir))
    }

    /// Configured report path, resolved against the project root
    pub fn report(&self) -> Option<PathBuf> {
        let report = self.project.run.as_ref()?.report.as_ref()?;
        Some(self.resolve(report))
    }

    /// Configured name filters
    pub fn filters(&self) -> &[String] {
        self.project
            .run
            .as_ref()
            .map(|r| r.filters.as_slice())
            .unwrap_or_default()
    }

    /// File-stem suffix that marks a test module
    pub fn module_suffix(&self) -> &str {
        self.project
            .run
            .as_ref()
            .and_then(|r| r.module_suffix.as_deref())
            .unwrap_or(DEFAULT_MODULE_SUFFIX)
    }

    /// Configured module locations, resolved against the project root
    pub fn module_paths(&self) -> Vec<PathBuf> {
        self.project
            .run
            .as_ref()
            .map(|r| r.paths.iter().map(|p| self.resolve(p)).collect())
            .unwrap_or_default()
    }

    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if this is a project (has suiterun.toml)
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.project_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let config_path = dir.join(PROJECT_CONFIG_FILE);
        fs::write(&config_path, content).unwrap();
        config_path
    }

    #[rstest]
    #[case("1", true)]
    #[case("true", true)]
    #[case("TRUE", true)]
    #[case("yes", true)]
    #[case("0", false)]
    #[case("false", false)]
    #[case("on", false)]
    #[case("", false)]
    fn test_parse_flag(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(parse_flag(value), expected);
    }

    fn loader(temp_dir: &TempDir) -> ConfigLoader {
        ConfigLoader::new().with_global_config_path(temp_dir.path().join("no-global.toml"))
    }

    #[test]
    #[serial]
    fn test_load_project_config() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
[run]
parallelism = 3
"#,
        );

        let config = loader(&temp_dir)
            .load_from_directory(temp_dir.path())
            .unwrap();

        assert_eq!(config.parallelism(), 3);
        assert!(config.is_project());
    }

    #[test]
    #[serial]
    fn test_find_config_in_parent() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
[run]
results_dir = "out"
"#,
        );

        let sub_dir = temp_dir.path().join("subdir");
        fs::create_dir(&sub_dir).unwrap();

        let config = loader(&temp_dir).load_from_directory(&sub_dir).unwrap();

        assert_eq!(config.project_root(), Some(temp_dir.path()));
        assert_eq!(config.results_dir(), Some(temp_dir.path().join("out")));
    }

    #[test]
    #[serial]
    fn test_no_project_config() {
        let temp_dir = TempDir::new().unwrap();

        let config = loader(&temp_dir)
            .load_from_directory(temp_dir.path())
            .unwrap();

        assert!(!config.is_project());
        assert_eq!(config.parallelism(), DEFAULT_PARALLELISM);
        assert_eq!(config.module_suffix(), "tests");
        assert!(config.filters().is_empty());
    }

    #[test]
    #[serial]
    fn test_env_override_parallelism() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
[run]
parallelism = 2
"#,
        );

        env::set_var(ENV_PARALLELISM, "12");
        let config = loader(&temp_dir).load_from_directory(temp_dir.path());
        env::remove_var(ENV_PARALLELISM);

        assert_eq!(config.unwrap().parallelism(), 12);
    }

    #[test]
    #[serial]
    fn test_env_invalid_parallelism() {
        let temp_dir = TempDir::new().unwrap();

        env::set_var(ENV_PARALLELISM, "many");
        let result = loader(&temp_dir).load_from_directory(temp_dir.path());
        env::remove_var(ENV_PARALLELISM);

        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    #[serial]
    fn test_no_color_env() {
        let temp_dir = TempDir::new().unwrap();

        env::set_var("NO_COLOR", "1");
        let config = loader(&temp_dir).load_from_directory(temp_dir.path());
        env::remove_var("NO_COLOR");

        assert!(!config.unwrap().color());
    }

    #[test]
    #[serial]
    fn test_load_from_specific_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config_file(
            temp_dir.path(),
            r#"
[run]
filters = ["Math"]
"#,
        );

        let config = loader(&temp_dir).load_from_file(&config_path).unwrap();

        assert_eq!(config.filters(), ["Math".to_string()]);
    }
}
