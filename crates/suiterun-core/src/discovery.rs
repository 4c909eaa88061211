//! Discovery and filtering
//!
//! Modules are registered one at a time. Each module is loaded through the
//! introspector once per file name; its suites are filtered, class-initialized
//! and compiled into plans in discovery order.

use crate::deployment::DeploymentManifest;
use crate::introspect::{LoadError, ModuleIntrospector};
use crate::plan::{CompiledPlan, PlanOutline};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Result of registering one module
#[derive(Debug)]
pub enum ModuleOutcome {
    /// Module loaded; `suites` plans were added
    Loaded { suites: usize },
    /// A module with the same file name was already registered
    Duplicate,
    /// Module could not be loaded and was skipped
    Skipped(LoadError),
}

/// Selects and compiles the suites of a run
#[derive(Debug)]
pub struct Discovery {
    seen: HashSet<String>,
    filters: Vec<String>,
    plans: Vec<CompiledPlan>,
    manifest: DeploymentManifest,
    deploy_root: PathBuf,
}

impl Discovery {
    /// Create an engine that stages deployment items under `deploy_root`
    pub fn new(deploy_root: impl Into<PathBuf>) -> Self {
        Self {
            seen: HashSet::new(),
            filters: Vec::new(),
            plans: Vec::new(),
            manifest: DeploymentManifest::new(),
            deploy_root: deploy_root.into(),
        }
    }

    /// Add a name filter. Filters are substrings, matched case-insensitively
    /// and combined with OR.
    ///
    /// Filters apply to modules registered after the call.
    pub fn add_filter(&mut self, filter: &str) {
        self.filters.push(filter.to_lowercase());
    }

    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    /// Load a module and register its eligible suites
    pub fn add_module(&mut self, introspector: &dyn ModuleIntrospector, path: &Path) -> ModuleOutcome {
        let key = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if !self.seen.insert(key) {
            tracing::debug!(module = %path.display(), "module already registered");
            return ModuleOutcome::Duplicate;
        }

        let module = match introspector.load(path) {
            Ok(module) => module,
            Err(error) => {
                tracing::warn!(module = %path.display(), %error, "ignoring module");
                return ModuleOutcome::Skipped(error);
            }
        };

        let mut registered = 0;
        for suite in &module.suites {
            let metadata = suite.metadata();
            if metadata.ignored || !metadata.matches_filters(&self.filters) {
                continue;
            }

            let plan = match suite.run_class_initialize() {
                Ok(()) => suite.compile(&module.name),
                Err((member, failure)) => {
                    tracing::debug!(suite = %metadata.name, member = %member, "class initialization failed");
                    let outline = PlanOutline {
                        suite: metadata.name.clone(),
                        module: module.name.clone(),
                        tests: metadata
                            .eligible_tests()
                            .into_iter()
                            .map(str::to_string)
                            .collect(),
                        ignored: metadata
                            .ignored_tests()
                            .into_iter()
                            .map(str::to_string)
                            .collect(),
                    };
                    CompiledPlan::failed_registration(outline, member, failure)
                }
            };

            self.manifest.resolve(
                &metadata.name,
                &metadata.deployment_items,
                &module.location,
                &self.deploy_root,
            );
            self.plans.push(plan);
            registered += 1;
        }

        ModuleOutcome::Loaded { suites: registered }
    }

    pub fn plans(&self) -> &[CompiledPlan] {
        &self.plans
    }

    pub fn manifest(&self) -> &DeploymentManifest {
        &self.manifest
    }

    pub fn deploy_root(&self) -> &Path {
        &self.deploy_root
    }

    /// Number of eligible test methods across all registered plans
    pub fn test_count(&self) -> usize {
        self.plans.iter().map(|p| p.tests().len()).sum()
    }
}
