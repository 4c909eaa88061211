//! Console reporting: progress characters, run summary and failure list

use chrono::{DateTime, Local};
use colored::*;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use suiterun_core::{format_duration, run_outcome, ProgressSink, RunRecord};

/// Prints one `.` per passed test and one `x` per failure as plans report in
#[derive(Debug, Default)]
pub struct ProgressDots {
    quiet: bool,
    printed: AtomicBool,
}

impl ProgressDots {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            printed: AtomicBool::new(false),
        }
    }

    fn emit(&self, text: ColoredString) {
        let mut stdout = io::stdout().lock();
        let _ = write!(stdout, "{}", text);
        let _ = stdout.flush();
        self.printed.store(true, Ordering::Relaxed);
    }
}

impl ProgressSink for ProgressDots {
    fn on_success(&self, _suite: &str, count: usize) {
        if !self.quiet && count > 0 {
            self.emit(".".repeat(count).green());
        }
    }

    fn on_failure(&self, _message: &str) {
        if !self.quiet {
            self.emit("x".red().bold());
        }
    }

    fn on_finish(&self) {
        if self.printed.load(Ordering::Relaxed) {
            println!();
        }
    }
}

/// What a finished run looks like to the console
#[derive(Debug, Clone)]
pub struct Summary {
    pub took: Duration,
    pub succeeded: u64,
    pub failed: u64,
    pub ignored: u64,
    pub outcome: &'static str,
    pub completed_at: DateTime<Local>,
    pub failures: Vec<String>,
    pub results: Vec<ResultLine>,
}

/// One test result as shown in the JSON summary
#[derive(Debug, Clone)]
pub struct ResultLine {
    pub name: String,
    pub passed: bool,
    pub duration: Duration,
}

impl Summary {
    pub fn from_record(record: &RunRecord) -> Self {
        let completed_at = record
            .finished_at()
            .map(|at| at.with_timezone(&Local))
            .unwrap_or_else(Local::now);

        Self {
            took: record.time_taken(),
            succeeded: record.succeeded(),
            failed: record.failed(),
            ignored: record.ignored(),
            outcome: run_outcome(record),
            completed_at,
            failures: record.failure_messages(),
            results: record
                .tests()
                .into_iter()
                .map(|test| ResultLine {
                    name: test.name,
                    passed: test.success,
                    duration: test.duration,
                })
                .collect(),
        }
    }

    /// Tests that ran, passed or failed
    pub fn executed(&self) -> u64 {
        self.succeeded + self.failed
    }

    /// Process exit status: the failure count, saturated
    pub fn exit_code(&self) -> i32 {
        i32::try_from(self.failed).unwrap_or(i32::MAX)
    }

    /// Write the timing line and the succeeded/failed counts
    pub fn write_totals(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(
            out,
            "Took {} to Run {} Tests Completed at {}",
            format_duration(self.took),
            self.executed(),
            self.completed_at.format("%Y-%m-%dT%H:%M:%S")
        )?;
        if self.succeeded > 0 {
            writeln!(out, "{}", format!("{} Succeeded", self.succeeded).green())?;
        }
        if self.failed > 0 {
            writeln!(out, "{}", format!("{} Failed", self.failed).red())?;
        }
        if self.ignored > 0 {
            writeln!(out, "{}", format!("{} Ignored", self.ignored).yellow())?;
        }
        Ok(())
    }

    /// Write every failure message with its position
    pub fn write_failures(&self, out: &mut impl Write) -> io::Result<()> {
        let count = self.failures.len();
        for (index, message) in self.failures.iter().enumerate() {
            writeln!(out, "{}", failure_heading(index, count).red().bold())?;
            writeln!(out, "{}", message)?;
            writeln!(out)?;
        }
        Ok(())
    }

    pub fn to_json(&self) -> serde_json::Value {
        let results: Vec<_> = self
            .results
            .iter()
            .map(|r| {
                serde_json::json!({
                    "name": r.name,
                    "passed": r.passed,
                    "duration_ms": r.duration.as_millis(),
                })
            })
            .collect();

        serde_json::json!({
            "outcome": self.outcome,
            "tests": self.executed(),
            "succeeded": self.succeeded,
            "failed": self.failed,
            "ignored": self.ignored,
            "duration_ms": self.took.as_millis(),
            "completed_at": self.completed_at.to_rfc3339(),
            "failures": self.failures,
            "results": results,
        })
    }
}

/// `Failure #i of n`, one-based
pub fn failure_heading(index: usize, count: usize) -> String {
    format!("Failure #{} of {}", index + 1, count)
}
