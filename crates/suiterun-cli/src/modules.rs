//! Test module enumeration
//!
//! Positional arguments name module files or directories. Directories are
//! walked recursively for files whose stem ends with the module suffix.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const TEST_CONTAINER_PREFIX: &str = "/testcontainer:";
const RESULTS_FILE_PREFIX: &str = "/resultsfile:";

/// Positional arguments split into module locations and a report path
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Targets {
    pub paths: Vec<PathBuf>,
    /// Set by a `/resultsfile:PATH` argument
    pub results_file: Option<PathBuf>,
}

impl Targets {
    /// Sort positional arguments, accepting the `/testcontainer:` and
    /// `/resultsfile:` spellings
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Self {
        let mut targets = Self::default();
        for arg in args {
            let arg = arg.as_ref();
            if let Some(path) = strip_prefix_ignore_case(arg, RESULTS_FILE_PREFIX) {
                targets.results_file = Some(PathBuf::from(path));
            } else if let Some(path) = strip_prefix_ignore_case(arg, TEST_CONTAINER_PREFIX) {
                targets.paths.push(PathBuf::from(path));
            } else {
                targets.paths.push(PathBuf::from(arg));
            }
        }
        targets
    }
}

fn strip_prefix_ignore_case<'a>(arg: &'a str, prefix: &str) -> Option<&'a str> {
    let head = arg.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        arg.get(prefix.len()..)
    } else {
        None
    }
}

/// Whether `path` names a test module under the given stem suffix
pub fn is_test_module(path: &Path, suffix: &str) -> bool {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.to_lowercase().ends_with(&suffix.to_lowercase()))
        .unwrap_or(false)
}

/// Expand files and directories into the list of module files to load.
///
/// Files named explicitly are taken as they are. Inside directories only one
/// file per module stem is kept, so build artifacts that share a stem
/// (`math_tests` and `math_tests.d`) do not register the same module twice.
/// Paths that do not exist are logged and skipped.
pub fn enumerate(paths: &[PathBuf], suffix: &str) -> Vec<PathBuf> {
    let mut modules = Vec::new();
    let mut stems = HashSet::new();

    for path in paths {
        if path.is_file() {
            modules.push(path.clone());
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(error) => {
                        tracing::warn!(%error, "skipping unreadable directory entry");
                        None
                    }
                })
            {
                let candidate = entry.path();
                if !entry.file_type().is_file() || !is_test_module(candidate, suffix) {
                    continue;
                }
                let stem = candidate
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_lowercase())
                    .unwrap_or_default();
                if stems.insert(stem) {
                    modules.push(entry.into_path());
                }
            }
        } else {
            tracing::warn!(path = %path.display(), "module path does not exist");
        }
    }

    modules
}
