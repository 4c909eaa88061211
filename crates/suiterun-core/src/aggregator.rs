//! Thread-safe result aggregation
//!
//! Every running plan reports into one shared [`RunRecord`]. Counters are
//! atomics; the failure log, test records and the failed-name set live behind
//! a single lock so a failure and the records it marks land together.

use crate::failure::TestFailure;
use crate::identity::{execution_id, test_id};
use crate::metadata::qualified_name;
use crate::plan::{PlanOutcome, PlanOutline};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Where in a plan a failure was raised
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailurePoint {
    /// Constructing the suite instance
    Construction,
    /// Invalid suite declaration detected before any member ran
    Configuration,
    /// Class initializer that failed at registration time
    ClassInitialize(String),
    /// The suite's Initialize member
    Initialize(String),
    /// A test method, by position in the plan's test order, with the time
    /// it ran for
    Test {
        name: String,
        index: usize,
        duration: Duration,
    },
    /// The suite's Cleanup member; empty for a duplicate declaration
    Cleanup(String),
    /// A fault that escaped the plan and was caught by the scheduler
    Scheduler,
}

impl FailurePoint {
    /// Member segment of the failure message, if any
    pub fn label(&self) -> Option<&str> {
        let name = match self {
            FailurePoint::Construction | FailurePoint::Configuration | FailurePoint::Scheduler => {
                return None
            }
            FailurePoint::ClassInitialize(name)
            | FailurePoint::Initialize(name)
            | FailurePoint::Cleanup(name) => name,
            FailurePoint::Test { name, .. } => name,
        };
        (!name.is_empty()).then_some(name.as_str())
    }

    /// Index of the first test method invalidated by this failure.
    ///
    /// `None` means no test method is affected.
    pub fn first_unexecuted(&self) -> Option<usize> {
        match self {
            FailurePoint::Test { index, .. } => Some(*index),
            FailurePoint::Cleanup(_) => None,
            _ => Some(0),
        }
    }
}

/// Per-test result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRecord {
    /// Stable identifier derived from the name
    pub id: Uuid,
    /// Identifier of this particular execution
    pub execution_id: Uuid,
    /// Dotted `suite.method` name
    pub name: String,
    /// Failure message, or captured output for passing tests
    pub output: Option<String>,
    pub success: bool,
    pub duration: Duration,
}

impl TestRecord {
    fn new(name: String, success: bool, output: Option<String>, duration: Duration) -> Self {
        Self {
            id: test_id(&name),
            execution_id: execution_id(),
            name,
            output,
            success,
            duration,
        }
    }
}

/// Receives progress notifications as plans report in
pub trait ProgressSink: Send + Sync {
    fn on_success(&self, _suite: &str, _count: usize) {}
    fn on_failure(&self, _message: &str) {}
    fn on_finish(&self) {}
}

/// Sink that discards all progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {}

#[derive(Default)]
struct Collected {
    failures: Vec<String>,
    tests: Vec<TestRecord>,
    failed_names: HashSet<String>,
}

#[derive(Default)]
struct Timing {
    started: Option<Instant>,
    elapsed: Option<Duration>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

/// Aggregated state of one run
pub struct RunRecord {
    run_id: Uuid,
    succeeded: AtomicU64,
    failed: AtomicU64,
    ignored: AtomicU64,
    collected: Mutex<Collected>,
    timing: Mutex<Timing>,
    frozen: AtomicBool,
    sink: Arc<dyn ProgressSink>,
}

impl Default for RunRecord {
    fn default() -> Self {
        Self::new(Arc::new(NullSink))
    }
}

impl std::fmt::Debug for RunRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunRecord")
            .field("run_id", &self.run_id)
            .field("succeeded", &self.succeeded())
            .field("failed", &self.failed())
            .field("ignored", &self.ignored())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}

impl RunRecord {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            ignored: AtomicU64::new(0),
            collected: Mutex::new(Collected::default()),
            timing: Mutex::new(Timing::default()),
            frozen: AtomicBool::new(false),
            sink,
        }
    }

    fn collected(&self) -> MutexGuard<'_, Collected> {
        self.collected.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn timing(&self) -> MutexGuard<'_, Timing> {
        self.timing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reject_if_frozen(&self, operation: &str) -> bool {
        let frozen = self.is_frozen();
        if frozen {
            tracing::warn!(operation, "run record already stopped; ignoring update");
        }
        frozen
    }

    /// Start the run timer
    pub fn start(&self) {
        if self.reject_if_frozen("start") {
            return;
        }
        let mut timing = self.timing();
        timing.started = Some(Instant::now());
        timing.started_at = Some(Utc::now());
    }

    /// Freeze the record: stop the timer and reject further updates
    pub fn stop(&self) {
        if self.frozen.swap(true, Ordering::SeqCst) {
            return;
        }
        {
            let mut timing = self.timing();
            timing.elapsed = Some(timing.started.map(|s| s.elapsed()).unwrap_or_default());
            timing.finished_at = Some(Utc::now());
        }
        self.sink.on_finish();
    }

    /// Record a failure raised at `point` of the plan described by `outline`.
    ///
    /// The failed counter moves by one. Test methods invalidated by the
    /// failure are recorded as failed with the same message, once each.
    pub fn failure(&self, outline: &PlanOutline, point: &FailurePoint, failure: &TestFailure) {
        if self.reject_if_frozen("failure") {
            return;
        }

        let message = match point.label() {
            Some(member) => format!("{}.{} - {}", outline.suite, member, failure.summary()),
            None => format!("{} - {}", outline.suite, failure.summary()),
        };

        // Only the failing test itself has a measured duration
        let measured = match point {
            FailurePoint::Test { duration, .. } => *duration,
            _ => Duration::ZERO,
        };
        let mut marked: Vec<(String, Duration)> = match point.first_unexecuted() {
            Some(index) => outline
                .tests
                .iter()
                .skip(index)
                .enumerate()
                .map(|(offset, t)| {
                    let duration = if offset == 0 { measured } else { Duration::ZERO };
                    (qualified_name(&outline.suite, t), duration)
                })
                .collect(),
            None => Vec::new(),
        };
        if let FailurePoint::Cleanup(name) = point {
            if !name.is_empty() {
                marked.push((qualified_name(&outline.suite, name), Duration::ZERO));
            }
        }

        {
            let mut collected = self.collected();
            for (name, duration) in marked {
                if collected.failed_names.insert(name.clone()) {
                    collected.tests.push(TestRecord::new(
                        name,
                        false,
                        Some(message.clone()),
                        duration,
                    ));
                }
            }
            collected.failures.push(message.clone());
        }

        self.failed.fetch_add(1, Ordering::SeqCst);
        self.sink.on_failure(&message);
    }

    /// Record the passing tests of a plan that returned.
    ///
    /// Walks the attempted tests in order and stops at the first name already
    /// recorded as failed.
    pub fn success(&self, outline: &PlanOutline, outcome: &PlanOutcome) {
        if self.reject_if_frozen("success") {
            return;
        }

        let mut written = 0usize;
        {
            let mut collected = self.collected();
            for (index, test) in outline.tests.iter().take(outcome.attempted).enumerate() {
                let name = qualified_name(&outline.suite, test);
                if collected.failed_names.contains(&name) {
                    break;
                }
                let duration = outcome.durations.get(index).copied().unwrap_or_default();
                collected
                    .tests
                    .push(TestRecord::new(name, true, None, duration));
                written += 1;
            }
        }

        self.succeeded.fetch_add(written as u64, Ordering::SeqCst);
        self.sink.on_success(&outline.suite, written);
    }

    /// Count ignored test methods
    pub fn add_ignored(&self, count: usize) {
        if count == 0 || self.reject_if_frozen("ignored") {
            return;
        }
        self.ignored.fetch_add(count as u64, Ordering::SeqCst);
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn ignored(&self) -> u64 {
        self.ignored.load(Ordering::SeqCst)
    }

    /// succeeded + failed + ignored
    pub fn total(&self) -> u64 {
        self.succeeded() + self.failed() + self.ignored()
    }

    /// succeeded + failed
    pub fn executed(&self) -> u64 {
        self.succeeded() + self.failed()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    /// Snapshot of the per-test records, in the order they were recorded
    pub fn tests(&self) -> Vec<TestRecord> {
        self.collected().tests.clone()
    }

    /// Snapshot of the failure log
    pub fn failure_messages(&self) -> Vec<String> {
        self.collected().failures.clone()
    }

    /// Elapsed run time; final once the record is stopped
    pub fn time_taken(&self) -> Duration {
        let timing = self.timing();
        match (timing.elapsed, timing.started) {
            (Some(elapsed), _) => elapsed,
            (None, Some(started)) => started.elapsed(),
            (None, None) => Duration::ZERO,
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.timing().started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.timing().finished_at
    }
}
