//! Module introspection
//!
//! The engine never loads code itself. A [`ModuleIntrospector`] resolves a
//! module path to the suites registered for it. [`StaticIntrospector`] is the
//! link-time registry: modules are declared in code and matched to files on
//! disk by file stem.

use crate::suite::{Suite, SuiteSource};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Why a module could not be loaded
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Module not found: {path}")]
    NotFound { path: PathBuf },

    #[error("No test module registered for {path}")]
    NotRegistered { path: PathBuf },

    #[error("Module {module} is missing dependency '{dependency}'")]
    MissingDependency { module: String, dependency: String },
}

impl LoadError {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        LoadError::NotFound { path: path.into() }
    }

    pub fn not_registered(path: impl Into<PathBuf>) -> Self {
        LoadError::NotRegistered { path: path.into() }
    }

    pub fn missing_dependency(module: impl Into<String>, dependency: impl Into<String>) -> Self {
        LoadError::MissingDependency {
            module: module.into(),
            dependency: dependency.into(),
        }
    }
}

/// Suites exposed by one loaded module
#[derive(Clone)]
pub struct LoadedModule {
    pub name: String,
    /// Path the module was loaded from
    pub location: PathBuf,
    pub suites: Vec<Arc<dyn SuiteSource>>,
}

impl std::fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let suites: Vec<&str> = self.suites.iter().map(|s| s.metadata().name.as_str()).collect();
        f.debug_struct("LoadedModule")
            .field("name", &self.name)
            .field("location", &self.location)
            .field("suites", &suites)
            .finish()
    }
}

/// Source of suite metadata for module paths
pub trait ModuleIntrospector: Send + Sync {
    fn load(&self, path: &Path) -> Result<LoadedModule, LoadError>;
}

/// A named group of suites, declared in code
#[derive(Clone, Default)]
pub struct TestModule {
    name: String,
    suites: Vec<Arc<dyn SuiteSource>>,
    dependencies: Vec<String>,
}

impl TestModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            suites: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// Add a suite
    pub fn suite<S: Send + 'static>(self, suite: Suite<S>) -> Self {
        self.source(Arc::new(suite))
    }

    /// Add an already type-erased suite
    pub fn source(mut self, suite: Arc<dyn SuiteSource>) -> Self {
        self.suites.push(suite);
        self
    }

    /// Declare a file that must sit next to the module for it to load
    pub fn requires(mut self, file_name: impl Into<String>) -> Self {
        self.dependencies.push(file_name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn suites(&self) -> &[Arc<dyn SuiteSource>] {
        &self.suites
    }
}

/// Registry of [`TestModule`]s keyed by module name
#[derive(Clone, Default)]
pub struct StaticIntrospector {
    modules: HashMap<String, TestModule>,
}

impl StaticIntrospector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module; a later module with the same name replaces it
    pub fn register(&mut self, module: TestModule) {
        self.modules.insert(module.name.to_lowercase(), module);
    }

    pub fn with(mut self, module: TestModule) -> Self {
        self.register(module);
        self
    }

    pub fn module_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.values().map(|m| m.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Look up a registered module by name, ignoring case
    pub fn module(&self, name: &str) -> Option<&TestModule> {
        self.modules.get(&name.to_lowercase())
    }

    fn lookup(&self, path: &Path) -> Option<&TestModule> {
        let stem = path.file_stem()?.to_str()?.to_lowercase();
        self.modules.get(&stem)
    }
}

impl ModuleIntrospector for StaticIntrospector {
    fn load(&self, path: &Path) -> Result<LoadedModule, LoadError> {
        if !path.is_file() {
            return Err(LoadError::not_found(path));
        }

        let module = self
            .lookup(path)
            .ok_or_else(|| LoadError::not_registered(path))?;

        let directory = crate::metadata::module_directory(path);
        if let Some(missing) = module
            .dependencies
            .iter()
            .find(|dep| !directory.join(dep.as_str()).exists())
        {
            return Err(LoadError::missing_dependency(&module.name, missing));
        }

        Ok(LoadedModule {
            name: module.name.clone(),
            location: path.to_path_buf(),
            suites: module.suites.clone(),
        })
    }
}
