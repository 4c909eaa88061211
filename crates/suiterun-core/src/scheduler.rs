//! Bounded concurrent execution of compiled plans
//!
//! At most `parallelism` plans run at once. A permit is taken before a plan
//! is spawned and released when it finishes, so the next queued plan starts
//! as soon as a slot frees up. Members inside a plan stay sequential.

use crate::aggregator::{FailurePoint, RunRecord};
use crate::error::{CoreError, CoreResult};
use crate::failure::TestFailure;
use crate::plan::CompiledPlan;
use futures_util::FutureExt;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

/// Default number of plans run concurrently
pub const DEFAULT_PARALLELISM: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    parallelism: usize,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(DEFAULT_PARALLELISM)
    }
}

impl Scheduler {
    /// Create a scheduler; a parallelism of zero is treated as one
    pub fn new(parallelism: usize) -> Self {
        Self {
            parallelism: parallelism.max(1),
        }
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Run every plan once, reporting into `record`
    pub async fn run(&self, plans: &[CompiledPlan], record: Arc<RunRecord>) {
        let slots = Arc::new(Semaphore::new(self.parallelism));
        let mut tasks = JoinSet::new();
        let mut scheduled = HashMap::new();

        for plan in plans {
            let permit = match Arc::clone(&slots).acquire_owned().await {
                Ok(permit) => permit,
                Err(error) => {
                    tracing::error!(%error, "scheduler slots closed");
                    break;
                }
            };

            let task_plan = plan.clone();
            let task_record = Arc::clone(&record);
            tracing::debug!(suite = plan.suite_name(), "scheduling plan");
            let handle = tasks.spawn(async move {
                run_plan(&task_plan, task_record).await;
                drop(permit);
            });
            scheduled.insert(handle.id(), plan.clone());
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, ())) => {
                    scheduled.remove(&id);
                }
                Err(error) => {
                    let plan = scheduled.remove(&error.id());
                    report_join_error(&record, plan.as_ref(), error);
                }
            }
        }
    }

    /// Run every plan on a dedicated multi-thread runtime sized to the
    /// parallelism, blocking until all of them finish
    pub fn run_blocking(&self, plans: &[CompiledPlan], record: Arc<RunRecord>) -> CoreResult<()> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.parallelism)
            .enable_all()
            .build()
            .map_err(CoreError::Runtime)?;
        runtime.block_on(self.run(plans, record));
        Ok(())
    }
}

/// Invoke one plan; anything that escapes it is recorded against the suite
async fn run_plan(plan: &CompiledPlan, record: Arc<RunRecord>) {
    let invoked = panic::catch_unwind(AssertUnwindSafe(|| plan.invoke(Arc::clone(&record))));
    let outcome = match invoked {
        Ok(future) => AssertUnwindSafe(future).catch_unwind().await,
        Err(payload) => Err(payload),
    };

    match outcome {
        Ok(outcome) => record.success(plan.outline(), &outcome),
        Err(payload) => {
            let failure = TestFailure::from_panic(payload).or_origin(&plan.outline().module);
            tracing::debug!(suite = plan.suite_name(), "plan escaped with a panic");
            record.failure(plan.outline(), &FailurePoint::Scheduler, &failure);
        }
    }
}

/// Record a plan task that never returned, cancelled or panicked outside
/// [`run_plan`], as a scheduler failure of its suite
fn report_join_error(record: &RunRecord, plan: Option<&CompiledPlan>, error: JoinError) {
    tracing::error!(%error, "plan task did not complete");
    let Some(plan) = plan else {
        return;
    };

    let failure = if error.is_panic() {
        TestFailure::from_panic(error.into_panic())
    } else {
        TestFailure::new("Cancelled", "plan task was cancelled")
    };
    record.failure(
        plan.outline(),
        &FailurePoint::Scheduler,
        &failure.or_origin(&plan.outline().module),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{PlanOutcome, PlanOutline, PlanProcedure};
    use futures_util::future::BoxFuture;

    fn outline(suite: &str, tests: &[&str]) -> Arc<PlanOutline> {
        Arc::new(PlanOutline {
            suite: suite.to_string(),
            module: "scheduler".to_string(),
            tests: tests.iter().map(|t| t.to_string()).collect(),
            ignored: Vec::new(),
        })
    }

    fn passing(suite: &str, tests: &[&str]) -> CompiledPlan {
        let count = tests.len();
        let procedure: PlanProcedure =
            Arc::new(move |_record: Arc<RunRecord>| -> BoxFuture<'static, PlanOutcome> {
                Box::pin(async move {
                    PlanOutcome {
                        attempted: count,
                        durations: vec![Default::default(); count],
                    }
                })
            });
        CompiledPlan::new(outline(suite, tests), procedure)
    }

    fn lose_worker() -> PlanOutcome {
        panic!("worker lost")
    }

    fn escaping(suite: &str, tests: &[&str]) -> CompiledPlan {
        let procedure: PlanProcedure =
            Arc::new(|_record: Arc<RunRecord>| -> BoxFuture<'static, PlanOutcome> {
                Box::pin(async move { lose_worker() })
            });
        CompiledPlan::new(outline(suite, tests), procedure)
    }

    fn escaping_before_future(suite: &str) -> CompiledPlan {
        let procedure: PlanProcedure =
            Arc::new(|_record: Arc<RunRecord>| -> BoxFuture<'static, PlanOutcome> { panic!("no future") });
        CompiledPlan::new(outline(suite, &["Only"]), procedure)
    }

    #[tokio::test]
    async fn test_escaped_panic_is_reported_with_empty_member() {
        let record = Arc::new(RunRecord::default());
        let plans = vec![
            passing("Fine", &["A", "B"]),
            escaping("Lost", &["X", "Y"]),
            escaping_before_future("Early"),
        ];

        Scheduler::new(2).run(&plans, Arc::clone(&record)).await;

        assert_eq!(record.succeeded(), 2);
        assert_eq!(record.failed(), 2);
        let mut messages = record.failure_messages();
        messages.sort();
        assert_eq!(
            messages,
            vec![
                "Early - scheduler - Panic: no future".to_string(),
                "Lost - scheduler - Panic: worker lost".to_string(),
            ]
        );
        let failed: Vec<String> = record
            .tests()
            .into_iter()
            .filter(|t| !t.success)
            .map(|t| t.name)
            .collect();
        assert_eq!(failed.len(), 3);
    }

    async fn joined_error<F>(task: F, abort: bool) -> JoinError
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut tasks = JoinSet::new();
        tasks.spawn(task);
        if abort {
            tasks.abort_all();
        }
        match tasks.join_next().await {
            Some(Err(error)) => error,
            _ => panic!("expected the task to fail"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_task_fails_its_suite() {
        let record = RunRecord::default();
        let plan = passing("Stalled", &["A", "B"]);

        let error = joined_error(futures_util::future::pending::<()>(), true).await;
        assert!(error.is_cancelled());
        report_join_error(&record, Some(&plan), error);

        assert_eq!(record.failed(), 1);
        assert_eq!(
            record.failure_messages(),
            vec!["Stalled - scheduler - Cancelled: plan task was cancelled"]
        );
        let failed: Vec<String> = record
            .tests()
            .into_iter()
            .filter(|t| !t.success)
            .map(|t| t.name)
            .collect();
        assert_eq!(failed, vec!["Stalled.A", "Stalled.B"]);
    }

    fn drop_worker() {
        panic!("worker dropped")
    }

    #[tokio::test]
    async fn test_panicked_task_fails_its_suite() {
        let record = RunRecord::default();
        let plan = passing("Dropped", &["Only"]);

        let error = joined_error(async { drop_worker() }, false).await;
        report_join_error(&record, Some(&plan), error);

        assert_eq!(
            record.failure_messages(),
            vec!["Dropped - scheduler - Panic: worker dropped"]
        );
    }

    #[tokio::test]
    async fn test_join_error_without_plan_is_only_logged() {
        let record = RunRecord::default();
        let error = joined_error(futures_util::future::pending::<()>(), true).await;
        report_join_error(&record, None, error);
        assert_eq!(record.failed(), 0);
    }

    #[test]
    fn test_zero_parallelism_is_clamped() {
        assert_eq!(Scheduler::new(0).parallelism(), 1);
        assert_eq!(Scheduler::default().parallelism(), DEFAULT_PARALLELISM);
    }

    #[test]
    fn test_run_blocking() {
        let record = Arc::new(RunRecord::default());
        let plans: Vec<CompiledPlan> = (0..10)
            .map(|i| passing(&format!("Suite{}", i), &["A", "B", "C"]))
            .collect();

        Scheduler::new(3)
            .run_blocking(&plans, Arc::clone(&record))
            .unwrap();

        assert_eq!(record.succeeded(), 30);
        assert_eq!(record.failed(), 0);
    }
}
