//! Test-run report document
//!
//! Renders a stopped [`RunRecord`] as a TeamTest 2010 results document, the
//! format external test-reporting tools ingest.

use crate::aggregator::{RunRecord, TestRecord};
use crate::error::{CoreError, CoreResult};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;
use std::fs;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

pub const NAMESPACE: &str = "http://microsoft.com/schemas/VisualStudio/TeamTest/2010";

const TEST_LIST_NAME: &str = "List";

/// Counters other than total/executed/failed, always zero
const ZERO_COUNTERS: &[&str] = &[
    "timeout",
    "aborted",
    "inconclusive",
    "passedButRunAborted",
    "notRunnable",
    "notExecuted",
    "disconnected",
    "warning",
    "completed",
    "inProgress",
    "pending",
];

/// Summary outcome of a run
pub fn run_outcome(record: &RunRecord) -> &'static str {
    if record.failed() > 0 {
        "Failed"
    } else if record.ignored() > 0 {
        "Warning"
    } else {
        "Completed"
    }
}

/// Format a duration as a time span: `[d.]hh:mm:ss[.fffffff]`
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let days = total_seconds / 86_400;
    let hours = (total_seconds / 3_600) % 24;
    let minutes = (total_seconds / 60) % 60;
    let seconds = total_seconds % 60;
    let ticks = duration.subsec_nanos() / 100;

    let mut formatted = String::new();
    if days > 0 {
        formatted.push_str(&format!("{}.", days));
    }
    formatted.push_str(&format!("{:02}:{:02}:{:02}", hours, minutes, seconds));
    if ticks > 0 {
        formatted.push_str(&format!(".{:07}", ticks));
    }
    formatted
}

/// Whether `c` may appear in an XML 1.0 document
fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Replace characters XML cannot carry, such as terminal escapes in a
/// failure message, with U+FFFD.
pub fn xml_safe(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|c| if is_xml_char(c) { c } else { char::REPLACEMENT_CHARACTER })
            .collect(),
    )
}

struct Document {
    writer: Writer<Vec<u8>>,
}

impl Document {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn declaration(&mut self) -> CoreResult<()> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        Ok(())
    }

    fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> CoreResult<()> {
        let values = safe_attributes(attributes);
        let element =
            BytesStart::new(name).with_attributes(values.iter().map(|(k, v)| (*k, &**v)));
        self.writer.write_event(Event::Start(element))?;
        Ok(())
    }

    fn end(&mut self, name: &str) -> CoreResult<()> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> CoreResult<()> {
        let values = safe_attributes(attributes);
        let element =
            BytesStart::new(name).with_attributes(values.iter().map(|(k, v)| (*k, &**v)));
        self.writer.write_event(Event::Empty(element))?;
        Ok(())
    }

    fn text_element(&mut self, name: &str, text: &str) -> CoreResult<()> {
        self.start(name, &[])?;
        self.writer.write_event(Event::Text(BytesText::new(&xml_safe(text))))?;
        self.end(name)
    }

    fn finish(self) -> CoreResult<String> {
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| CoreError::ReportRender(e.to_string()))
    }
}

fn safe_attributes<'a>(attributes: &[(&'a str, &'a str)]) -> Vec<(&'a str, Cow<'a, str>)> {
    attributes
        .iter()
        .map(|(key, value)| (*key, xml_safe(value)))
        .collect()
}

/// Render the report document for `record`
pub fn render_report(record: &RunRecord) -> CoreResult<String> {
    let tests = record.tests();
    let run_id = record.run_id().to_string();
    let list_id = Uuid::new_v4().to_string();

    let mut doc = Document::new();
    doc.declaration()?;
    doc.start("TestRun", &[("id", run_id.as_str()), ("xmlns", NAMESPACE)])?;

    doc.empty("TestSettings", &[])?;
    write_times(&mut doc, record)?;
    write_summary(&mut doc, record)?;

    doc.start("TestDefinitions", &[])?;
    for test in &tests {
        write_definition(&mut doc, test)?;
    }
    doc.end("TestDefinitions")?;

    doc.start("TestLists", &[])?;
    doc.empty("TestList", &[("name", TEST_LIST_NAME), ("id", list_id.as_str())])?;
    doc.end("TestLists")?;

    doc.start("TestEntries", &[])?;
    for test in &tests {
        let test_id = test.id.to_string();
        let execution_id = test.execution_id.to_string();
        doc.empty(
            "TestEntry",
            &[
                ("testId", test_id.as_str()),
                ("executionId", execution_id.as_str()),
                ("testListId", list_id.as_str()),
            ],
        )?;
    }
    doc.end("TestEntries")?;

    doc.start("Results", &[])?;
    for test in &tests {
        write_result(&mut doc, test, &list_id)?;
    }
    doc.end("Results")?;

    doc.end("TestRun")?;
    doc.finish()
}

fn write_times(doc: &mut Document, record: &RunRecord) -> CoreResult<()> {
    let start = record.started_at().map(|t| t.to_rfc3339());
    let finish = record.finished_at().map(|t| t.to_rfc3339());

    let mut attributes = Vec::new();
    if let Some(start) = &start {
        attributes.push(("creation", start.as_str()));
        attributes.push(("start", start.as_str()));
    }
    if let Some(finish) = &finish {
        attributes.push(("finish", finish.as_str()));
    }
    doc.empty("Times", &attributes)
}

fn write_summary(doc: &mut Document, record: &RunRecord) -> CoreResult<()> {
    let total = record.total().to_string();
    let executed = record.executed().to_string();
    let failed = record.failed().to_string();

    let mut counters = vec![
        ("total", total.as_str()),
        ("executed", executed.as_str()),
        ("error", "0"),
        ("failed", failed.as_str()),
    ];
    counters.extend(ZERO_COUNTERS.iter().map(|name| (*name, "0")));

    doc.start("ResultSummary", &[("outcome", run_outcome(record))])?;
    doc.empty("Counters", &counters)?;
    doc.empty("RunInfos", &[])?;
    doc.end("ResultSummary")
}

fn write_definition(doc: &mut Document, test: &TestRecord) -> CoreResult<()> {
    let id = test.id.to_string();
    let execution_id = test.execution_id.to_string();

    doc.start(
        "UnitTest",
        &[("name", test.name.as_str()), ("storage", ""), ("id", id.as_str())],
    )?;
    doc.empty("Execution", &[("id", execution_id.as_str())])?;
    doc.empty(
        "TestMethod",
        &[
            ("codeBase", ""),
            ("adapterTypeName", ""),
            ("className", ""),
            ("name", test.name.as_str()),
        ],
    )?;
    doc.end("UnitTest")
}

fn write_result(doc: &mut Document, test: &TestRecord, list_id: &str) -> CoreResult<()> {
    let id = test.id.to_string();
    let execution_id = test.execution_id.to_string();
    let duration = format_duration(test.duration);
    let attributes = [
        ("executionId", execution_id.as_str()),
        ("testId", id.as_str()),
        ("testName", test.name.as_str()),
        ("outcome", if test.success { "Passed" } else { "Failed" }),
        ("testListId", list_id),
        ("duration", duration.as_str()),
    ];

    let output = test.output.as_deref().unwrap_or_default();
    if !test.success {
        doc.start("UnitTestResult", &attributes)?;
        doc.start("Output", &[])?;
        doc.start("ErrorInfo", &[])?;
        doc.text_element("Message", output)?;
        doc.end("ErrorInfo")?;
        doc.end("Output")?;
        doc.end("UnitTestResult")
    } else if !output.is_empty() {
        doc.start("UnitTestResult", &attributes)?;
        doc.start("Output", &[])?;
        doc.text_element("DebugTrace", output)?;
        doc.end("Output")?;
        doc.end("UnitTestResult")
    } else {
        doc.empty("UnitTestResult", &attributes)
    }
}

/// Render the report and write it to `path`, creating parent directories
pub fn write_report(path: &Path, record: &RunRecord) -> CoreResult<()> {
    let document = render_report(record)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CoreError::report_write(parent, e))?;
    }
    fs::write(path, document).map_err(|e| CoreError::report_write(path, e))
}
