//! Command surface over the discovery engine.
//!
//! Each command runs the matching query once per enabled framework, all
//! appending into one result, and answers with JSON.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cancel::CancellationToken;
use crate::discovery::{DiscoveryError, TestFramework, TestSearcher};
use crate::index::{JavaWorkspace, SearchStatus};
use crate::model::TestTree;

pub const SEARCH_ALL_TESTS: &str = "searchAllTests";
pub const SEARCH_TESTS_IN_FOLDER: &str = "searchTestsInFolder";
pub const SEARCH_TEST_PACKAGES: &str = "searchTestPackages";
pub const SEARCH_TEST_CHILDREN: &str = "searchTestChildren";

/// Every command name [`TestService::execute`] accepts.
pub const COMMANDS: &[&str] = &[
    SEARCH_ALL_TESTS,
    SEARCH_TESTS_IN_FOLDER,
    SEARCH_TEST_PACKAGES,
    SEARCH_TEST_CHILDREN,
];

/// Service errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("Failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A query result with how the underlying searches ended.
#[derive(Debug)]
pub struct Discovered<T> {
    pub result: T,
    /// `Cancelled` if any search was cancelled, else the first failure, else
    /// `Completed`.
    pub status: SearchStatus,
}

/// Runs discovery queries over a workspace for a set of frameworks.
pub struct TestService<I: JavaWorkspace> {
    index: I,
    frameworks: Vec<TestFramework>,
}

impl<I: JavaWorkspace> TestService<I> {
    pub fn new(index: I, frameworks: Vec<TestFramework>) -> Self {
        Self { index, frameworks }
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn frameworks(&self) -> &[TestFramework] {
        &self.frameworks
    }

    pub fn search_all_tests(&self, token: &CancellationToken) -> Discovered<TestTree> {
        let mut tree = TestTree::new();
        let status = self.each_framework(|searcher| Ok(searcher.search_all_tests(&mut tree, token)));
        Discovered {
            result: tree,
            status: status.unwrap_or(SearchStatus::Completed),
        }
    }

    pub fn search_tests_in_folder(&self, args: &[Value], token: &CancellationToken) -> Result<Discovered<TestTree>, DiscoveryError> {
        let mut tree = TestTree::new();
        let status = self.each_framework(|searcher| searcher.search_tests_in_folder(&mut tree, args, token))?;
        Ok(Discovered { result: tree, status })
    }

    /// Packages are framework independent, so one search suffices.
    pub fn search_test_packages(&self, args: &[Value], token: &CancellationToken) -> Result<Discovered<Vec<String>>, DiscoveryError> {
        let mut packages = Vec::new();
        let status = match self.frameworks.first() {
            Some(&framework) => TestSearcher::new(&self.index, framework).search_test_packages(&mut packages, args, token)?,
            None => SearchStatus::Completed,
        };
        Ok(Discovered { result: packages, status })
    }

    pub fn search_test_children(&self, args: &[Value], token: &CancellationToken) -> Result<Discovered<TestTree>, DiscoveryError> {
        let mut tree = TestTree::new();
        let status = self.each_framework(|searcher| searcher.search_test_children(&mut tree, args, token))?;
        Ok(Discovered { result: tree, status })
    }

    /// Dispatch a command by name and return its result as JSON.
    pub fn execute(&self, command: &str, args: &[Value], token: &CancellationToken) -> Result<Value, ServiceError> {
        debug!(command, args = args.len(), "executing command");
        let value = match command {
            SEARCH_ALL_TESTS => serde_json::to_value(self.search_all_tests(token).result)?,
            SEARCH_TESTS_IN_FOLDER => serde_json::to_value(self.search_tests_in_folder(args, token)?.result)?,
            SEARCH_TEST_PACKAGES => serde_json::to_value(self.search_test_packages(args, token)?.result)?,
            SEARCH_TEST_CHILDREN => serde_json::to_value(self.search_test_children(args, token)?.result)?,
            other => return Err(ServiceError::UnknownCommand(other.to_string())),
        };
        Ok(value)
    }

    /// Run `query` for each framework, stopping on cancellation.
    fn each_framework<F>(&self, mut query: F) -> Result<SearchStatus, DiscoveryError>
    where
        F: FnMut(&TestSearcher<'_, I>) -> Result<SearchStatus, DiscoveryError>,
    {
        let mut failure = None;
        for &framework in &self.frameworks {
            let searcher = TestSearcher::new(&self.index, framework);
            match query(&searcher)? {
                SearchStatus::Completed => {}
                SearchStatus::Cancelled => return Ok(SearchStatus::Cancelled),
                SearchStatus::Failed(e) => {
                    warn!(framework = %framework, error = %e, "discovery failed for framework");
                    if failure.is_none() {
                        failure = Some(SearchStatus::Failed(e));
                    }
                }
            }
        }
        Ok(failure.unwrap_or(SearchStatus::Completed))
    }
}
