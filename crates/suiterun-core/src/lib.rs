//! Suiterun test-execution engine
//!
//! Provides the core of a test runner:
//! - Static suite registration (suites, members and lifecycle roles)
//! - Plan compilation with initialize/cleanup and expected-failure semantics
//! - Module discovery and name filtering
//! - Deployment item resolution and staging
//! - Bounded concurrent scheduling of compiled plans
//! - Thread-safe result aggregation with stable test identifiers
//! - TeamTest report emission
//!
//! # Example
//!
//! ```no_run
//! use suiterun_core::{ensure_eq, StaticIntrospector, Suite, TestModule, TestRunner};
//! use std::path::Path;
//!
//! #[derive(Default)]
//! struct MathTests;
//!
//! let registry = StaticIntrospector::new().with(
//!     TestModule::new("math_tests")
//!         .suite(Suite::<MathTests>::with_default("MathTests").test("Adds", |_| ensure_eq(1 + 1, 2))),
//! );
//!
//! let mut runner = TestRunner::new(registry, "TestResults").unwrap();
//! runner.add_module(Path::new("target/debug/math_tests"));
//! let record = runner.execute().unwrap();
//! println!("{} succeeded, {} failed", record.succeeded(), record.failed());
//! ```

pub mod aggregator;
pub mod deployment;
pub mod discovery;
pub mod error;
pub mod failure;
pub mod identity;
pub mod introspect;
pub mod metadata;
pub mod plan;
pub mod report;
pub mod runner;
pub mod scheduler;
pub mod suite;

// Re-export main types
pub use aggregator::{FailurePoint, NullSink, ProgressSink, RunRecord, TestRecord};
pub use deployment::{source_root, DeploymentManifest, DeploymentMapping, StagingReport};
pub use discovery::{Discovery, ModuleOutcome};
pub use error::{CoreError, CoreResult};
pub use failure::{ensure, ensure_eq, fail, TestFailure, TestOutcome};
pub use identity::{execution_id, test_id};
pub use introspect::{LoadError, LoadedModule, ModuleIntrospector, StaticIntrospector, TestModule};
pub use metadata::{qualified_name, DeploymentItem, MemberMetadata, MemberRole, SuiteMetadata};
pub use plan::{CompiledPlan, PlanOutcome, PlanOutline};
pub use report::{format_duration, render_report, run_outcome, write_report};
pub use runner::TestRunner;
pub use scheduler::{Scheduler, DEFAULT_PARALLELISM};
pub use suite::{Member, Suite, SuiteSource};
