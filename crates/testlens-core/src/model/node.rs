//! Discovered test entities: test classes and test methods.

use serde::{Deserialize, Serialize};

// =============================================================================
// SOURCE LOCATIONS
// =============================================================================

/// A zero-based position in a text document (UTF-16 character offsets).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A span between two positions, end exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

// =============================================================================
// TEST NODE
// =============================================================================

/// Granularity of a discovered node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestLevel {
    /// A test class (suite).
    Class,
    /// A single test method (case).
    Method,
}

/// Which test-definition variant matched a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestKind {
    /// `TestCase` subclasses with `test*` methods.
    JUnit3,
    /// `@org.junit.Test` methods.
    JUnit,
    /// `@org.junit.jupiter.api.Test` and friends.
    JUnit5,
}

impl std::fmt::Display for TestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::JUnit3 => write!(f, "JUnit3"),
            Self::JUnit => write!(f, "JUnit"),
            Self::JUnit5 => write!(f, "JUnit5"),
        }
    }
}

/// One discovered test class or test method.
///
/// Parent and children are indices into the flat sequence the node lives in
/// (see [`super::TestTree`]), never references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestNode {
    /// Range of the element's name token.
    pub range: Range,

    /// URI of the owning source file.
    pub uri: String,

    /// `pkg.Type` or `pkg.Type#method`.
    pub test: String,

    /// Package name, empty for the default package.
    pub package_name: String,

    pub level: TestLevel,

    pub kind: TestKind,

    /// Owning project name.
    pub project: String,

    #[serde(rename = "parentIndex", default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,

    /// `None` means "not expanded", not "no children".
    #[serde(rename = "childrenIndices", default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<usize>>,
}

impl TestNode {
    /// Create a class-level node.
    pub fn class(
        range: Range,
        uri: impl Into<String>,
        test: impl Into<String>,
        package_name: impl Into<String>,
        kind: TestKind,
        project: impl Into<String>,
    ) -> Self {
        Self {
            range,
            uri: uri.into(),
            test: test.into(),
            package_name: package_name.into(),
            level: TestLevel::Class,
            kind,
            project: project.into(),
            parent: None,
            children: None,
        }
    }

    /// Create a method-level node for `method` declared in `class_name`.
    pub fn method(
        range: Range,
        uri: impl Into<String>,
        class_name: &str,
        method: &str,
        package_name: impl Into<String>,
        kind: TestKind,
        project: impl Into<String>,
    ) -> Self {
        Self {
            range,
            uri: uri.into(),
            test: format!("{}#{}", class_name, method),
            package_name: package_name.into(),
            level: TestLevel::Method,
            kind,
            project: project.into(),
            parent: None,
            children: None,
        }
    }

    /// Decode a node from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Fully-qualified name of the class this node belongs to.
    pub fn class_name(&self) -> &str {
        match self.test.split_once('#') {
            Some((class, _)) => class,
            None => &self.test,
        }
    }

    /// Method name for method-level nodes.
    pub fn method_name(&self) -> Option<&str> {
        self.test.split_once('#').map(|(_, method)| method)
    }

    /// Name shown in a test explorer: the method name, or the class name
    /// without its package.
    pub fn short_name(&self) -> &str {
        if let Some(method) = self.method_name() {
            return method;
        }
        if self.package_name.is_empty() {
            &self.test
        } else {
            self.test
                .strip_prefix(self.package_name.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
                .unwrap_or(&self.test)
        }
    }
}
