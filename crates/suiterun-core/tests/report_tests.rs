//! Report document contents

use std::sync::Arc;
use suiterun_core::{
    render_report, test_id, write_report, FailurePoint, PlanOutcome, PlanOutline, RunRecord,
    Scheduler, Suite, SuiteSource, TestFailure,
};
use tempfile::TempDir;

fn outline(suite: &str, tests: &[&str]) -> PlanOutline {
    PlanOutline {
        suite: suite.to_string(),
        module: "report_tests".to_string(),
        tests: tests.iter().map(|t| t.to_string()).collect(),
        ignored: Vec::new(),
    }
}

/// succeeded=3, failed=1, ignored=0
fn three_passed_one_failed() -> RunRecord {
    let record = RunRecord::default();
    record.start();
    record.success(
        &outline("Calc", &["Adds", "Subtracts", "Multiplies"]),
        &PlanOutcome {
            attempted: 3,
            durations: vec![std::time::Duration::from_millis(1_500); 3],
        },
    );
    record.failure(
        &outline("Io", &["Reads"]),
        &FailurePoint::Test {
            name: "Reads".to_string(),
            index: 0,
            duration: std::time::Duration::from_millis(250),
        },
        &TestFailure::assertion("file <missing> & unreadable").with_origin("io"),
    );
    record.stop();
    record
}

#[test]
fn test_summary_counters() {
    let xml = render_report(&three_passed_one_failed()).unwrap();

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
    assert!(xml.contains("<TestRun id=\""));
    assert!(xml.contains("xmlns=\"http://microsoft.com/schemas/VisualStudio/TeamTest/2010\""));
    assert!(xml.contains("<ResultSummary outcome=\"Failed\">"));
    assert!(xml.contains(
        "<Counters total=\"4\" executed=\"4\" error=\"0\" failed=\"1\" timeout=\"0\""
    ));
    assert!(xml.contains("pending=\"0\"/>"));
}

#[test]
fn test_results_carry_outcome_and_error_payload() {
    let xml = render_report(&three_passed_one_failed()).unwrap();

    assert_eq!(xml.matches("<UnitTest ").count(), 4);
    assert_eq!(xml.matches("<TestEntry ").count(), 4);
    assert_eq!(xml.matches("<UnitTestResult ").count(), 4);
    assert_eq!(xml.matches("outcome=\"Passed\"").count(), 3);
    assert_eq!(xml.matches("outcome=\"Failed\"").count(), 2);
    assert!(xml.contains("duration=\"00:00:01.5000000\""));
    assert!(xml.contains(
        "<Message>Io.Reads - io - file &lt;missing&gt; &amp; unreadable</Message>"
    ));
    assert!(xml.contains(&format!("id=\"{}\"", test_id("Calc.Adds"))));
    assert!(xml.contains("<TestList name=\"List\" id=\""));
}

#[test]
fn test_outcome_variants() {
    let record = RunRecord::default();
    record.success(
        &outline("Calc", &["Adds"]),
        &PlanOutcome {
            attempted: 1,
            durations: Vec::new(),
        },
    );
    let xml = render_report(&record).unwrap();
    assert!(xml.contains("<ResultSummary outcome=\"Completed\">"));
    assert!(xml.contains("duration=\"00:00:00\""));
    assert!(!xml.contains("<Output>"));

    record.add_ignored(2);
    let xml = render_report(&record).unwrap();
    assert!(xml.contains("<ResultSummary outcome=\"Warning\">"));
    assert!(xml.contains("total=\"3\" executed=\"1\""));
}

#[test]
fn test_times_follow_the_record() {
    let record = three_passed_one_failed();
    let xml = render_report(&record).unwrap();
    let start = record.started_at().unwrap().to_rfc3339();
    assert!(xml.contains(&format!("start=\"{}\"", start)));
    assert!(xml.contains("finish=\""));

    let unstarted = render_report(&RunRecord::default()).unwrap();
    assert!(unstarted.contains("<Times/>"));
}

#[test]
fn test_write_report_creates_directories() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested/dir/results.trx");

    write_report(&path, &three_passed_one_failed()).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("<ResultSummary outcome=\"Failed\">"));
}

#[tokio::test]
async fn test_report_from_executed_plans() {
    let suite = Suite::<()>::with_default("Greeter")
        .test("SaysHello", |_| Ok(()))
        .test("SaysGoodbye", |_| Ok(()));
    let record = Arc::new(RunRecord::default());
    record.start();
    Scheduler::default()
        .run(&[suite.compile("report_tests")], Arc::clone(&record))
        .await;
    record.stop();

    let xml = render_report(&record).unwrap();
    assert!(xml.contains("testName=\"Greeter.SaysHello\""));
    assert!(xml.contains("testName=\"Greeter.SaysGoodbye\""));
    assert!(xml.contains("<ResultSummary outcome=\"Completed\">"));
}

#[test]
fn test_terminal_escapes_leave_a_well_formed_document() {
    let record = RunRecord::default();
    record.failure(
        &outline("Colors", &["Paints"]),
        &FailurePoint::Test {
            name: "Paints".to_string(),
            index: 0,
            duration: std::time::Duration::ZERO,
        },
        &TestFailure::assertion("expected \x1b[32mgreen\x1b[0m, got \x07red").with_origin("paint"),
    );

    let xml = render_report(&record).unwrap();
    assert!(!xml.contains('\x1b'));
    assert!(!xml.contains('\x07'));
    assert!(xml.contains("\u{FFFD}[32mgreen\u{FFFD}[0m"));

    let mut reader = quick_xml::Reader::from_str(&xml);
    let mut messages = Vec::new();
    let mut in_message = false;
    loop {
        match reader.read_event().unwrap() {
            quick_xml::events::Event::Start(e) if e.name().as_ref() == b"Message" => {
                in_message = true
            }
            quick_xml::events::Event::End(e) if e.name().as_ref() == b"Message" => {
                in_message = false
            }
            quick_xml::events::Event::Text(text) if in_message => {
                messages.push(text.unescape().unwrap().into_owned())
            }
            quick_xml::events::Event::Eof => break,
            _ => {}
        }
    }
    assert_eq!(
        messages,
        vec!["Colors.Paints - paint - expected \u{FFFD}[32mgreen\u{FFFD}[0m, got \u{FFFD}red"]
    );
}
