//! Plan compilation
//!
//! A suite's registration table is turned into a [`CompiledPlan`] once: the
//! members are sorted into lifecycle steps, declaration errors are detected,
//! and the result is captured in a closure that can be invoked any number of
//! times. Each invocation builds a fresh suite instance and runs
//!
//! 1. construction
//! 2. the Initialize member
//! 3. each eligible test method in declaration order, stopping at the first
//!    failure
//! 4. the Cleanup member, whenever an instance exists
//!
//! strictly one after another. Failures are reported to the [`RunRecord`],
//! never returned.

use crate::aggregator::{FailurePoint, RunRecord};
use crate::failure::{TestFailure, TestOutcome};
use crate::metadata::MemberRole;
use crate::suite::{Body, Constructor, MemberBody, Suite};
use futures_util::future::BoxFuture;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Static description of a compiled plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOutline {
    pub suite: String,
    /// Module the suite was registered from; default failure origin
    pub module: String,
    /// Eligible test methods, in the order the plan attempts them
    pub tests: Vec<String>,
    /// Test methods declared but ignored
    pub ignored: Vec<String>,
}

/// What one plan invocation did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanOutcome {
    /// Test methods invoked, including the one that failed
    pub attempted: usize,
    /// Wall-clock time of each attempted test method
    pub durations: Vec<Duration>,
}

pub type PlanProcedure = Arc<dyn Fn(Arc<RunRecord>) -> BoxFuture<'static, PlanOutcome> + Send + Sync>;

/// A reusable executable plan for one suite
#[derive(Clone)]
pub struct CompiledPlan {
    outline: Arc<PlanOutline>,
    procedure: PlanProcedure,
}

impl fmt::Debug for CompiledPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPlan")
            .field("outline", &self.outline)
            .finish_non_exhaustive()
    }
}

impl CompiledPlan {
    pub(crate) fn new(outline: Arc<PlanOutline>, procedure: PlanProcedure) -> Self {
        Self { outline, procedure }
    }

    pub fn outline(&self) -> &PlanOutline {
        &self.outline
    }

    pub fn suite_name(&self) -> &str {
        &self.outline.suite
    }

    pub fn tests(&self) -> &[String] {
        &self.outline.tests
    }

    /// Run the plan once against `record`
    pub fn invoke(&self, record: Arc<RunRecord>) -> BoxFuture<'static, PlanOutcome> {
        (self.procedure)(record)
    }

    /// A plan for a suite whose class initializer failed at registration.
    ///
    /// Every invocation reports that failure against all of its tests.
    pub(crate) fn failed_registration(
        outline: PlanOutline,
        member: String,
        failure: TestFailure,
    ) -> Self {
        let outline = Arc::new(outline);
        let failure = failure.or_origin(&outline.module);
        let point = FailurePoint::ClassInitialize(member);

        let reported = Arc::clone(&outline);
        let procedure: PlanProcedure = Arc::new(
            move |record: Arc<RunRecord>| -> BoxFuture<'static, PlanOutcome> {
                record.add_ignored(reported.ignored.len());
                record.failure(&reported, &point, &failure);
                Box::pin(futures_util::future::ready(PlanOutcome::default()))
            },
        );

        Self::new(outline, procedure)
    }
}

struct TestStep<S> {
    name: String,
    index: usize,
    body: Body<S>,
    expected_failure: Option<String>,
}

impl<S: Send> TestStep<S> {
    async fn invoke(&self, instance: &mut S) -> TestOutcome {
        let outcome = self.body.invoke(instance).await;
        let Some(kind) = &self.expected_failure else {
            return outcome;
        };
        match outcome {
            Ok(()) => Err(TestFailure::expected_not_raised(kind)),
            Err(failure) if failure.is_kind(kind) => Ok(()),
            Err(failure) => Err(failure),
        }
    }
}

enum CleanupStep<S> {
    Absent,
    Declared(String, Body<S>),
    Duplicate(TestFailure),
}

struct PlanSteps<S> {
    outline: Arc<PlanOutline>,
    constructor: Constructor<S>,
    configuration_error: Option<TestFailure>,
    initialize: Option<(String, Body<S>)>,
    tests: Vec<TestStep<S>>,
    cleanup: CleanupStep<S>,
}

impl<S: Send + 'static> PlanSteps<S> {
    async fn run(&self, record: &RunRecord) -> PlanOutcome {
        let mut outcome = PlanOutcome::default();
        record.add_ignored(self.outline.ignored.len());

        let mut instance = match self.construct() {
            Ok(instance) => instance,
            Err(failure) => {
                self.report(record, &FailurePoint::Construction, failure);
                return outcome;
            }
        };

        if let Err((point, failure)) = self.run_members(&mut instance, &mut outcome).await {
            self.report(record, &point, failure);
        }

        match &self.cleanup {
            CleanupStep::Absent => {}
            CleanupStep::Declared(name, body) => {
                if let Err(failure) = body.invoke(&mut instance).await {
                    self.report(record, &FailurePoint::Cleanup(name.clone()), failure);
                }
            }
            CleanupStep::Duplicate(failure) => {
                self.report(record, &FailurePoint::Cleanup(String::new()), failure.clone());
            }
        }

        outcome
    }

    fn construct(&self) -> Result<S, TestFailure> {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.constructor)())) {
            Ok(result) => result,
            Err(payload) => Err(TestFailure::from_panic(payload)),
        }
    }

    async fn run_members(
        &self,
        instance: &mut S,
        outcome: &mut PlanOutcome,
    ) -> Result<(), (FailurePoint, TestFailure)> {
        if let Some(failure) = &self.configuration_error {
            return Err((FailurePoint::Configuration, failure.clone()));
        }

        if let Some((name, body)) = &self.initialize {
            body.invoke(instance)
                .await
                .map_err(|f| (FailurePoint::Initialize(name.clone()), f))?;
        }

        for step in &self.tests {
            let started = Instant::now();
            let result = step.invoke(instance).await;
            let duration = started.elapsed();
            outcome.attempted += 1;
            outcome.durations.push(duration);

            result.map_err(|f| {
                let point = FailurePoint::Test {
                    name: step.name.clone(),
                    index: step.index,
                    duration,
                };
                (point, f)
            })?;
        }

        Ok(())
    }

    fn report(&self, record: &RunRecord, point: &FailurePoint, failure: TestFailure) {
        record.failure(&self.outline, point, &failure.or_origin(&self.outline.module));
    }
}

fn duplicate_declaration(role: MemberRole, names: &[&str]) -> TestFailure {
    TestFailure::configuration(format!(
        "Only one {} member may be declared, found {}: {}",
        role.as_str(),
        names.len(),
        names.join(", ")
    ))
}

/// Compile a suite's registration table into a plan
pub(crate) fn compile<S: Send + 'static>(suite: &Suite<S>, module: &str) -> CompiledPlan {
    let metadata = suite.metadata();

    let mut initializers = Vec::new();
    let mut cleanups = Vec::new();
    let mut tests = Vec::new();

    for member in suite.members() {
        let MemberBody::Instance(body) = &member.body else {
            continue;
        };
        let meta = &member.metadata;
        match meta.role {
            MemberRole::Initialize => initializers.push((meta.name.clone(), body.clone())),
            MemberRole::Cleanup => cleanups.push((meta.name.clone(), body.clone())),
            MemberRole::TestMethod if meta.is_eligible_test() => tests.push(TestStep {
                name: meta.name.clone(),
                index: tests.len(),
                body: body.clone(),
                expected_failure: meta.expected_failure.clone(),
            }),
            MemberRole::TestMethod | MemberRole::ClassInitialize => {}
        }
    }

    let outline = Arc::new(PlanOutline {
        suite: metadata.name.clone(),
        module: module.to_string(),
        tests: tests.iter().map(|t| t.name.clone()).collect(),
        ignored: metadata
            .ignored_tests()
            .into_iter()
            .map(str::to_string)
            .collect(),
    });

    let configuration_error = (initializers.len() > 1).then(|| {
        let names: Vec<&str> = initializers.iter().map(|(n, _)| n.as_str()).collect();
        duplicate_declaration(MemberRole::Initialize, &names)
    });

    let cleanup = match cleanups.len() {
        0 => CleanupStep::Absent,
        1 => {
            let (name, body) = cleanups.remove(0);
            CleanupStep::Declared(name, body)
        }
        _ => {
            let names: Vec<&str> = cleanups.iter().map(|(n, _)| n.as_str()).collect();
            CleanupStep::Duplicate(duplicate_declaration(MemberRole::Cleanup, &names))
        }
    };

    let initialize = if configuration_error.is_none() {
        initializers.pop()
    } else {
        None
    };

    let steps = Arc::new(PlanSteps {
        outline: Arc::clone(&outline),
        constructor: suite.constructor(),
        configuration_error,
        initialize,
        tests,
        cleanup,
    });

    let procedure: PlanProcedure =
        Arc::new(move |record: Arc<RunRecord>| -> BoxFuture<'static, PlanOutcome> {
            let steps = Arc::clone(&steps);
            Box::pin(async move { steps.run(&record).await })
        });

    CompiledPlan::new(outline, procedure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::{Member, SuiteSource};

    #[derive(Default)]
    struct Empty;

    #[test]
    fn test_outline_lists_eligible_tests_in_order() {
        let suite = Suite::<Empty>::with_default("OrderTests")
            .test("B", |_| Ok(()))
            .member(Member::<Empty>::test("Skipped", |_| Ok(())).ignore())
            .test("A", |_| Ok(()));

        let plan = suite.compile("order_tests");
        assert_eq!(plan.suite_name(), "OrderTests");
        assert_eq!(plan.tests(), ["B".to_string(), "A".to_string()]);
        assert_eq!(plan.outline().ignored, vec!["Skipped".to_string()]);
        assert_eq!(plan.outline().module, "order_tests");
    }

    #[test]
    fn test_duplicate_initialize_message_names_members() {
        let failure = duplicate_declaration(MemberRole::Initialize, &["One", "Two"]);
        assert_eq!(
            failure.message(),
            "Only one initialize member may be declared, found 2: One, Two"
        );
    }
}
