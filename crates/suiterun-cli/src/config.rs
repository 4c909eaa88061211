//! Effective run settings
//!
//! Command-line flags win over the layered configuration loaded by
//! `suiterun-config` (global file < project file < environment).

use crate::modules::Targets;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use suiterun_config::{Config, MAX_PARALLELISM};

/// Directory that holds one timestamped subdirectory per run
pub const RESULTS_ROOT: &str = "TestResults";

/// Flags given on the command line for a run
#[derive(Debug, Clone, Default)]
pub struct RunFlags {
    pub targets: Vec<String>,
    pub filters: Vec<String>,
    pub parallelism: Option<usize>,
    pub quiet: bool,
    pub interactive: bool,
    pub results_file: Option<PathBuf>,
    pub results_dir: Option<PathBuf>,
    pub no_color: bool,
    pub json: bool,
}

/// Everything a run needs, after merging flags and configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub paths: Vec<PathBuf>,
    pub filters: Vec<String>,
    pub parallelism: usize,
    pub quiet: bool,
    pub interactive: bool,
    pub color: bool,
    pub json: bool,
    pub results_dir: PathBuf,
    pub report: Option<PathBuf>,
    pub module_suffix: String,
}

impl Settings {
    /// Merge `flags` over `config`. Relative locations from the command line
    /// are resolved against `cwd`.
    pub fn resolve(flags: &RunFlags, config: &Config, cwd: &Path, now: DateTime<Local>) -> Self {
        let targets = Targets::parse(&flags.targets);

        let paths = if targets.paths.is_empty() {
            config.module_paths()
        } else {
            targets.paths.iter().map(|p| cwd.join(p)).collect()
        };

        let filters = if flags.filters.is_empty() {
            config.filters().to_vec()
        } else {
            flags.filters.clone()
        };

        let results_dir = flags
            .results_dir
            .as_ref()
            .map(|dir| cwd.join(dir))
            .or_else(|| config.results_dir())
            .unwrap_or_else(|| default_results_dir(cwd, now));

        let report = flags
            .results_file
            .as_ref()
            .or(targets.results_file.as_ref())
            .map(|file| cwd.join(file))
            .or_else(|| config.report());

        Self {
            paths,
            filters,
            parallelism: flags.parallelism.unwrap_or_else(|| config.parallelism()),
            quiet: flags.quiet || config.quiet(),
            interactive: flags.interactive || config.interactive(),
            color: !flags.no_color && config.color(),
            json: flags.json,
            results_dir,
            report,
            module_suffix: config.module_suffix().to_string(),
        }
    }
}

/// `TestResults/<yyyy-MM-dd-HH-mm-ss>` under `cwd`
pub fn default_results_dir(cwd: &Path, now: DateTime<Local>) -> PathBuf {
    cwd.join(RESULTS_ROOT)
        .join(now.format("%Y-%m-%d-%H-%M-%S").to_string())
}

/// Value parser for `--parallelism`
pub fn parse_parallelism(value: &str) -> Result<usize, String> {
    let parsed: usize = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if parsed == 0 || parsed > MAX_PARALLELISM {
        return Err(format!(
            "must be between 1 and {}, got {}",
            MAX_PARALLELISM, parsed
        ));
    }
    Ok(parsed)
}
