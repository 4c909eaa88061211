//! Deployment resolution and staging
//!
//! Suites declare files they need next to the run. Items are resolved against
//! the suite's source root (the module directory with its build-output
//! segment stripped) and collected in a manifest keyed by source path, so an
//! item shared by several suites is staged once.

use crate::metadata::{module_directory, DeploymentItem};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Directory names that mark the start of a build-output tree
const BUILD_OUTPUT_SEGMENTS: &[&str] = &["target", "bin"];

/// One resolved copy operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentMapping {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Suite that first declared the item
    pub suite: String,
}

/// Outcome of staging a manifest
#[derive(Debug, Default)]
pub struct StagingReport {
    /// Destinations written
    pub copied: Vec<PathBuf>,
    /// Entries skipped because an earlier entry of the same pass wrote their destination
    pub collisions: Vec<DeploymentMapping>,
    /// Entries skipped because their source does not exist
    pub missing: Vec<DeploymentMapping>,
    /// Entries whose copy failed, with the I/O error
    pub failed: Vec<(DeploymentMapping, String)>,
}

impl StagingReport {
    pub fn skipped(&self) -> usize {
        self.collisions.len() + self.missing.len() + self.failed.len()
    }
}

/// Find the directory deployment items of a module are relative to.
///
/// Strips the last `target` or `bin` directory (and everything below it)
/// from the module's directory. Without one, the module directory itself is
/// the source root.
pub fn source_root(module_path: &Path) -> PathBuf {
    let directory = module_directory(module_path);
    let components: Vec<Component<'_>> = directory.components().collect();

    let cut = components.iter().rposition(|c| match c {
        Component::Normal(name) => name
            .to_str()
            .map(|n| BUILD_OUTPUT_SEGMENTS.contains(&n.to_lowercase().as_str()))
            .unwrap_or(false),
        _ => false,
    });

    match cut {
        Some(index) => components[..index].iter().collect(),
        None => directory,
    }
}

/// Ordered set of copy operations, keyed by source path
#[derive(Debug, Default, Clone)]
pub struct DeploymentManifest {
    entries: Vec<DeploymentMapping>,
    sources: HashMap<PathBuf, usize>,
}

impl DeploymentManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping unless its source is already present
    pub fn insert(&mut self, mapping: DeploymentMapping) -> bool {
        if self.sources.contains_key(&mapping.source) {
            return false;
        }
        self.sources.insert(mapping.source.clone(), self.entries.len());
        self.entries.push(mapping);
        true
    }

    /// Resolve a suite's declared items and add them.
    ///
    /// Returns how many new entries were added.
    pub fn resolve(
        &mut self,
        suite: &str,
        items: &[DeploymentItem],
        module_path: &Path,
        deploy_root: &Path,
    ) -> usize {
        let root = source_root(module_path);
        let mut added = 0;

        for item in items {
            let Some(file_name) = item.path.file_name() else {
                tracing::warn!(
                    suite,
                    item = %item.path.display(),
                    "deployment item has no file name; skipping"
                );
                continue;
            };

            let source = if item.path.is_absolute() {
                item.path.clone()
            } else {
                root.join(&item.path)
            };

            let mut destination = deploy_root.to_path_buf();
            if let Some(output) = &item.output_directory {
                destination.push(output);
            }
            destination.push(file_name);

            if self.insert(DeploymentMapping {
                source,
                destination,
                suite: suite.to_string(),
            }) {
                added += 1;
            }
        }

        added
    }

    pub fn entries(&self) -> &[DeploymentMapping] {
        &self.entries
    }

    pub fn get(&self, source: &Path) -> Option<&DeploymentMapping> {
        self.sources.get(source).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy every entry into place. Problems are reported, never raised.
    ///
    /// Only destinations written earlier in the same pass count as
    /// collisions; files left by a previous run are overwritten.
    pub fn stage(&self) -> StagingReport {
        let mut report = StagingReport::default();
        let mut occupied: HashSet<&Path> = HashSet::new();

        for mapping in &self.entries {
            if occupied.contains(mapping.destination.as_path()) {
                tracing::warn!(
                    suite = %mapping.suite,
                    source = %mapping.source.display(),
                    destination = %mapping.destination.display(),
                    "deployment item has the same file name as another item; give each an output directory"
                );
                report.collisions.push(mapping.clone());
                continue;
            }

            if !mapping.source.is_file() {
                tracing::warn!(
                    suite = %mapping.suite,
                    source = %mapping.source.display(),
                    "deployment file not found"
                );
                report.missing.push(mapping.clone());
                continue;
            }

            match copy(mapping) {
                Ok(()) => {
                    occupied.insert(mapping.destination.as_path());
                    report.copied.push(mapping.destination.clone());
                }
                Err(error) => {
                    tracing::warn!(
                        suite = %mapping.suite,
                        destination = %mapping.destination.display(),
                        %error,
                        "failed to stage deployment item"
                    );
                    report.failed.push((mapping.clone(), error.to_string()));
                }
            }
        }

        report
    }
}

fn copy(mapping: &DeploymentMapping) -> std::io::Result<()> {
    if let Some(parent) = mapping.destination.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(&mapping.source, &mapping.destination)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/work/app/target/debug/app_tests", "/work/app")]
    #[case("/work/app/bin/Release/app_tests.dll", "/work/app")]
    #[case("/work/target/app/target/release/app_tests", "/work/target/app")]
    #[case("/work/app/out/app_tests", "/work/app/out")]
    fn test_source_root(#[case] module: &str, #[case] expected: &str) {
        assert_eq!(source_root(Path::new(module)), PathBuf::from(expected));
    }

    #[test]
    fn test_resolve_keys_by_source() {
        let mut manifest = DeploymentManifest::new();
        let module = Path::new("/work/app/target/debug/app_tests");
        let root = Path::new("/results");

        let added = manifest.resolve(
            "First",
            &[
                DeploymentItem::new("data/input.csv"),
                DeploymentItem::new("config.toml").to("conf"),
            ],
            module,
            root,
        );
        assert_eq!(added, 2);

        let added = manifest.resolve(
            "Second",
            &[DeploymentItem::new("data/input.csv")],
            module,
            root,
        );
        assert_eq!(added, 0);
        assert_eq!(manifest.len(), 2);

        let entry = manifest
            .get(Path::new("/work/app/data/input.csv"))
            .unwrap();
        assert_eq!(entry.destination, PathBuf::from("/results/input.csv"));
        assert_eq!(entry.suite, "First");
        assert_eq!(
            manifest.entries()[1].destination,
            PathBuf::from("/results/conf/config.toml")
        );
    }
}
