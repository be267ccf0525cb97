//! Folding runner events into per-test results.

use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

use super::decode::{DecodedEvent, FrameDecoder, FrameError};
use super::emitter::{RUNNER_ERROR, TEST_FAILED, TEST_FINISHED, TEST_RUN_FINISHED, TEST_STARTED, TEST_SUITE_FINISHED, TEST_SUITE_STARTED};
use crate::model::{TestLevel, TestTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TestStatus {
    /// Started, not finished yet.
    Pending,
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOutcome {
    pub status: TestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl TestOutcome {
    fn with_status(status: TestStatus) -> Self {
        Self {
            status,
            message: None,
            details: None,
            duration_ms: None,
        }
    }
}

/// Outcome of one discovered test method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestResult {
    pub test: String,
    pub uri: String,
    pub result: TestOutcome,
}

/// Consumes runner output and tracks results keyed `<suite>#<test>`.
#[derive(Debug, Default)]
pub struct ResultAnalyzer {
    decoder: FrameDecoder,
    current_suite: Option<String>,
    results: HashMap<String, TestOutcome>,
    runner_errors: Vec<String>,
    summary: Option<String>,
    malformed_frames: usize,
}

impl ResultAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of runner output.
    pub fn feed(&mut self, chunk: &str) {
        let events = self.decoder.push(chunk);
        self.apply_all(events);
    }

    /// Flush a trailing partial line.
    pub fn finish(&mut self) {
        let events = self.decoder.finish();
        self.apply_all(events);
    }

    fn apply_all(&mut self, events: Vec<Result<DecodedEvent, FrameError>>) {
        for event in events {
            match event {
                Ok(event) => self.apply(&event),
                Err(e) => {
                    warn!(error = %e, "failed to analyze runner output");
                    self.malformed_frames += 1;
                }
            }
        }
    }

    pub fn apply(&mut self, event: &DecodedEvent) {
        let name = event.attribute("name");
        match event.name.as_str() {
            TEST_SUITE_STARTED => self.current_suite = name.map(String::from),
            TEST_SUITE_FINISHED => self.current_suite = None,
            TEST_STARTED => {
                if let Some(key) = self.key(name) {
                    self.results.insert(key, TestOutcome::with_status(TestStatus::Pending));
                }
            }
            TEST_FAILED => {
                if let Some(result) = self.key(name).and_then(|k| self.results.get_mut(&k)) {
                    result.status = TestStatus::Failed;
                    result.message = event.attribute("message").map(String::from);
                    result.details = event.attribute("details").map(String::from);
                }
            }
            TEST_FINISHED => {
                if let Some(result) = self.key(name).and_then(|k| self.results.get_mut(&k)) {
                    if result.status == TestStatus::Pending {
                        result.status = TestStatus::Passed;
                    }
                    result.duration_ms = event.attribute("duration").and_then(|d| d.parse().ok());
                }
            }
            TEST_RUN_FINISHED => self.summary = event.attribute("message").map(String::from),
            RUNNER_ERROR => {
                self.runner_errors
                    .push(event.attribute("message").unwrap_or_default().to_string());
            }
            _ => {}
        }
    }

    fn key(&self, name: Option<&str>) -> Option<String> {
        let suite = self.current_suite.as_deref()?;
        Some(format!("{}#{}", suite, name?))
    }

    pub fn result(&self, test: &str) -> Option<&TestOutcome> {
        self.results.get(test)
    }

    /// One result per method node; class nodes contribute their children.
    /// Tests never seen in the output are `Skipped`.
    pub fn results_for(&self, tests: &TestTree) -> Vec<TestResult> {
        let mut results = Vec::new();
        for (index, node) in tests.iter().enumerate() {
            match node.level {
                TestLevel::Class => {
                    for child in tests.children_of(index) {
                        results.push(self.result_of(&child.test, &child.uri));
                    }
                }
                TestLevel::Method if node.parent.is_none() => {
                    results.push(self.result_of(&node.test, &node.uri));
                }
                TestLevel::Method => {}
            }
        }
        results
    }

    fn result_of(&self, test: &str, uri: &str) -> TestResult {
        TestResult {
            test: test.to_string(),
            uri: uri.to_string(),
            result: self
                .results
                .get(test)
                .cloned()
                .unwrap_or_else(|| TestOutcome::with_status(TestStatus::Skipped)),
        }
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn runner_errors(&self) -> &[String] {
        &self.runner_errors
    }

    pub fn malformed_frames(&self) -> usize {
        self.malformed_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Range, TestKind, TestNode};
    use crate::reporter::emitter::{
        test_failed, test_finished, test_run_finished, test_started, test_suite_finished, test_suite_started,
        FailureCause, RunSummary, TestDescription, TestFailure,
    };

    fn tree() -> TestTree {
        let mut tree = TestTree::new();
        let class = tree.push(TestNode::class(Range::default(), "file:///C.java", "pkg.Calc", "pkg", TestKind::JUnit, "p"));
        let children = ["add", "sub", "mul"]
            .iter()
            .map(|m| {
                tree.push_child(
                    class,
                    TestNode::method(Range::default(), "file:///C.java", "pkg.Calc", m, "pkg", TestKind::JUnit, "p"),
                )
            })
            .collect();
        tree.set_children(class, children);
        tree
    }

    fn output() -> String {
        let add = TestDescription::new("pkg.Calc", "add");
        let sub = TestDescription::new("pkg.Calc", "sub");
        let failure = TestFailure {
            test: sub.clone(),
            cause: Some(FailureCause {
                message: Some("expected:<1> but was:<2>".to_string()),
                stack_trace: "java.lang.AssertionError\n\tat pkg.Calc.sub".to_string(),
            }),
        };
        [
            test_suite_started("pkg.Calc"),
            test_started(&add),
            test_finished(&add, 4),
            test_started(&sub),
            test_failed(&failure, 2),
            test_finished(&sub, 2),
            test_suite_finished("pkg.Calc"),
            test_run_finished(&RunSummary { run: 2, failures: 1, skips: 0 }),
        ]
        .iter()
        .map(|e| format!("{}\n", e.render()))
        .collect()
    }

    #[test]
    fn test_outcomes() {
        let mut analyzer = ResultAnalyzer::new();
        analyzer.feed(&output());
        analyzer.finish();

        let results = analyzer.results_for(&tree());
        assert_eq!(results.len(), 3);

        assert_eq!(results[0].test, "pkg.Calc#add");
        assert_eq!(results[0].result.status, TestStatus::Passed);
        assert_eq!(results[0].result.duration_ms, Some(4));

        assert_eq!(results[1].result.status, TestStatus::Failed);
        assert_eq!(results[1].result.message.as_deref(), Some("expected:<1> but was:<2>"));
        assert!(results[1].result.details.is_some());

        assert_eq!(results[2].result.status, TestStatus::Skipped);
        assert_eq!(analyzer.summary(), Some("Total tests run: 2, Failures: 1, Skips: 0"));
    }

    #[test]
    fn test_events_outside_a_suite_are_ignored() {
        let add = TestDescription::new("pkg.Calc", "add");
        let mut analyzer = ResultAnalyzer::new();
        analyzer.feed(&format!("{}\n{}\n", test_started(&add).render(), test_finished(&add, 1).render()));
        assert!(analyzer.result("pkg.Calc#add").is_none());
        assert!(analyzer.result("#add").is_none());
    }

    #[test]
    fn test_started_without_finish_is_pending() {
        let add = TestDescription::new("pkg.Calc", "add");
        let mut analyzer = ResultAnalyzer::new();
        analyzer.feed(&test_suite_started("pkg.Calc").render());
        analyzer.feed("\n");
        analyzer.feed(&test_started(&add).render());
        analyzer.finish();
        assert_eq!(analyzer.result("pkg.Calc#add").unwrap().status, TestStatus::Pending);
    }

    #[test]
    fn test_malformed_frames_are_counted() {
        let mut analyzer = ResultAnalyzer::new();
        analyzer.feed("@@<TestRunner-{broken}-TestRunner>\n");
        assert_eq!(analyzer.malformed_frames(), 1);
    }
}
