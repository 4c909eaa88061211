//! Runner facade: discovery, staging, scheduling and aggregation in one place

use crate::aggregator::{NullSink, ProgressSink, RunRecord};
use crate::deployment::StagingReport;
use crate::discovery::{Discovery, ModuleOutcome};
use crate::error::{CoreError, CoreResult};
use crate::introspect::ModuleIntrospector;
use crate::plan::CompiledPlan;
use crate::scheduler::{Scheduler, DEFAULT_PARALLELISM};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Runs the suites of registered modules
pub struct TestRunner<I> {
    introspector: I,
    discovery: Discovery,
    results_dir: PathBuf,
    parallelism: usize,
    sink: Arc<dyn ProgressSink>,
    switch_working_directory: bool,
}

impl<I: ModuleIntrospector> TestRunner<I> {
    /// Create a runner that writes into `results_dir`, creating it if needed
    pub fn new(introspector: I, results_dir: impl Into<PathBuf>) -> CoreResult<Self> {
        let results_dir = results_dir.into();
        let results_dir = if results_dir.is_absolute() {
            results_dir
        } else {
            std::env::current_dir()
                .map_err(|e| CoreError::results_directory(&results_dir, e))?
                .join(results_dir)
        };
        std::fs::create_dir_all(&results_dir)
            .map_err(|e| CoreError::results_directory(&results_dir, e))?;

        Ok(Self {
            introspector,
            discovery: Discovery::new(results_dir.clone()),
            results_dir,
            parallelism: DEFAULT_PARALLELISM,
            sink: Arc::new(NullSink),
            switch_working_directory: false,
        })
    }

    /// Set the maximum number of suites run concurrently (at least one)
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Send progress notifications to `sink`
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Make the results directory the process working directory while
    /// executing, so suites see their deployment items by relative path
    pub fn switch_working_directory(mut self, enabled: bool) -> Self {
        self.switch_working_directory = enabled;
        self
    }

    pub fn add_filter(&mut self, filter: &str) {
        self.discovery.add_filter(filter);
    }

    /// Load a module and register its suites
    pub fn add_module(&mut self, path: &Path) -> ModuleOutcome {
        self.discovery.add_module(&self.introspector, path)
    }

    pub fn plans(&self) -> &[CompiledPlan] {
        self.discovery.plans()
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    fn prepare(&self) -> CoreResult<(StagingReport, Arc<RunRecord>)> {
        let staged = self.discovery.manifest().stage();
        if self.switch_working_directory {
            std::env::set_current_dir(&self.results_dir).map_err(|error| {
                CoreError::WorkingDirectory {
                    path: self.results_dir.clone(),
                    error,
                }
            })?;
        }
        let record = Arc::new(RunRecord::new(Arc::clone(&self.sink)));
        Ok((staged, record))
    }

    /// Run every registered plan on a runtime of its own and return the
    /// stopped record
    pub fn execute(&self) -> CoreResult<Arc<RunRecord>> {
        let (staged, record) = self.prepare()?;
        tracing::debug!(
            copied = staged.copied.len(),
            skipped = staged.skipped(),
            plans = self.plans().len(),
            "starting run"
        );

        record.start();
        Scheduler::new(self.parallelism).run_blocking(self.plans(), Arc::clone(&record))?;
        record.stop();
        Ok(record)
    }

    /// Run every registered plan on the current runtime
    pub async fn execute_async(&self) -> CoreResult<Arc<RunRecord>> {
        let (staged, record) = self.prepare()?;
        tracing::debug!(
            copied = staged.copied.len(),
            skipped = staged.skipped(),
            plans = self.plans().len(),
            "starting run"
        );

        record.start();
        Scheduler::new(self.parallelism)
            .run(self.plans(), Arc::clone(&record))
            .await;
        record.stop();
        Ok(record)
    }
}
