//! Lifecycle event constructors and the line writer.

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::io::{self, Write};

use super::event::{Event, MessageType};

// =============================================================================
// EVENT NAMES
// =============================================================================

pub const REPORTER_ATTACHED: &str = "reporterAttached";
pub const ROOT_PRESENTATION: &str = "rootPresentation";
pub const TEST_STARTED: &str = "testStarted";
pub const TEST_IGNORED: &str = "testIgnored";
pub const TEST_FINISHED: &str = "testFinished";
pub const TREE_NODE: &str = "treeNode";
pub const TEST_SUITE_STARTED: &str = "testSuiteStarted";
pub const TEST_SUITE_FINISHED: &str = "testSuiteFinished";
pub const SUITE_TREE_NODE_STARTED: &str = "suiteTreeNodeStarted";
pub const SUITE_TREE_NODE_ENDED: &str = "suiteTreeNodeEnded";
pub const TEST_FAILED: &str = "testFailed";
pub const TEST_RUN_FINISHED: &str = "testRunFinished";
pub const RUNNER_ERROR: &str = "runnerError";

const LOCATION_SCHEME: &str = "java:test://";

// =============================================================================
// INPUTS
// =============================================================================

/// The test an event is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDescription {
    pub class_name: String,
    pub method_name: String,
}

impl TestDescription {
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
        }
    }

    fn method_location(&self) -> String {
        format!("{}{}.{}", LOCATION_SCHEME, self.class_name, self.method_name)
    }
}

/// The error attached to a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureCause {
    /// May be absent even when an error is attached.
    pub message: Option<String>,
    pub stack_trace: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFailure {
    pub test: TestDescription,
    pub cause: Option<FailureCause>,
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run: usize,
    pub failures: usize,
    pub skips: usize,
}

// =============================================================================
// EVENT CONSTRUCTORS
// =============================================================================

pub fn reporter_attached() -> Event {
    Event::bare(REPORTER_ATTACHED)
}

pub fn root_presentation() -> Event {
    Event::new(ROOT_PRESENTATION).attr("name", "Default Suite")
}

pub fn test_started(test: &TestDescription) -> Event {
    Event::new(TEST_STARTED)
        .attr("name", test.method_name.as_str())
        .attr("location", test.method_location())
}

pub fn test_ignored(name: &str) -> Event {
    Event::new(TEST_IGNORED).attr("name", name)
}

pub fn test_finished(test: &TestDescription, duration_ms: u64) -> Event {
    Event::new(TEST_FINISHED)
        .attr("name", test.method_name.as_str())
        .attr("duration", duration_ms.to_string())
}

pub fn tree_node(test: &TestDescription) -> Event {
    Event::new(TREE_NODE)
        .attr("name", test.method_name.as_str())
        .attr("location", test.method_location())
}

pub fn test_suite_started(class_name: &str) -> Event {
    suite_event(TEST_SUITE_STARTED, class_name)
}

pub fn test_suite_finished(name: &str) -> Event {
    Event::new(TEST_SUITE_FINISHED).attr("name", name)
}

pub fn suite_tree_node_started(class_name: &str) -> Event {
    suite_event(SUITE_TREE_NODE_STARTED, class_name)
}

pub fn suite_tree_node_ended(class_name: &str) -> Event {
    suite_event(SUITE_TREE_NODE_ENDED, class_name)
}

fn suite_event(name: &str, class_name: &str) -> Event {
    Event::new(name)
        .attr("name", class_name)
        .attr("location", format!("{}{}", LOCATION_SCHEME, class_name))
}

/// `details` is present only when an error is attached; without one the
/// message is empty.
pub fn test_failed(failure: &TestFailure, duration_ms: u64) -> Event {
    let event = Event::new(TEST_FAILED).attr("name", failure.test.method_name.as_str());
    let event = match &failure.cause {
        Some(cause) => event
            .optional_attr("message", cause.message.clone())
            .attr("details", cause.stack_trace.as_str()),
        None => event.attr("message", ""),
    };
    event.attr("duration", duration_ms.to_string())
}

pub fn test_run_finished(summary: &RunSummary) -> Event {
    Event::new(TEST_RUN_FINISHED).attr(
        "message",
        format!(
            "Total tests run: {}, Failures: {}, Skips: {}",
            summary.run, summary.failures, summary.skips
        ),
    )
}

/// A harness failure; `details` is the error chain, or `null` without an error.
pub fn runner_error(message: &str, error: Option<&(dyn StdError + 'static)>) -> Event {
    Event::new(RUNNER_ERROR)
        .with_type(MessageType::Error)
        .attr("message", message)
        .optional_attr("details", error.map(error_chain))
}

/// Render an error and its sources one per line, innermost last.
pub fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut text = format!("{}\n", error);
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(&format!("Caused by: {}\n", cause));
        source = cause.source();
    }
    text
}

// =============================================================================
// WRITER
// =============================================================================

/// Writes events to a sink, one line each, flushing after every line.
pub struct TestReporter<W: Write> {
    out: W,
}

impl<W: Write> TestReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn emit(&mut self, event: &Event) -> io::Result<()> {
        writeln!(self.out, "{}", event.render())?;
        self.out.flush()
    }

    pub fn reporter_attached(&mut self) -> io::Result<()> {
        self.emit(&reporter_attached())
    }

    pub fn root_presentation(&mut self) -> io::Result<()> {
        self.emit(&root_presentation())
    }

    pub fn test_started(&mut self, test: &TestDescription) -> io::Result<()> {
        self.emit(&test_started(test))
    }

    pub fn test_ignored(&mut self, name: &str) -> io::Result<()> {
        self.emit(&test_ignored(name))
    }

    pub fn test_finished(&mut self, test: &TestDescription, duration_ms: u64) -> io::Result<()> {
        self.emit(&test_finished(test, duration_ms))
    }

    pub fn tree_node(&mut self, test: &TestDescription) -> io::Result<()> {
        self.emit(&tree_node(test))
    }

    pub fn test_suite_started(&mut self, class_name: &str) -> io::Result<()> {
        self.emit(&test_suite_started(class_name))
    }

    pub fn test_suite_finished(&mut self, name: &str) -> io::Result<()> {
        self.emit(&test_suite_finished(name))
    }

    pub fn suite_tree_node_started(&mut self, class_name: &str) -> io::Result<()> {
        self.emit(&suite_tree_node_started(class_name))
    }

    pub fn suite_tree_node_ended(&mut self, class_name: &str) -> io::Result<()> {
        self.emit(&suite_tree_node_ended(class_name))
    }

    pub fn test_failed(&mut self, failure: &TestFailure, duration_ms: u64) -> io::Result<()> {
        self.emit(&test_failed(failure, duration_ms))
    }

    pub fn test_run_finished(&mut self, summary: &RunSummary) -> io::Result<()> {
        self.emit(&test_run_finished(summary))
    }

    pub fn runner_error(&mut self, message: &str, error: Option<&(dyn StdError + 'static)>) -> io::Result<()> {
        self.emit(&runner_error(message, error))
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
