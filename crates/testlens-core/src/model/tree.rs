//! Flat, index-linked sequence of discovered test nodes.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::node::{TestLevel, TestNode};

/// Ordered arena of [`TestNode`]s.
///
/// Parent/child links are positions in this sequence. Indices are absolute,
/// so several discovery calls may append to the same tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestTree {
    nodes: Vec<TestNode>,
}

/// A broken structural invariant, reported by [`TestTree::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeViolation {
    /// Index points past the end of the sequence.
    DanglingIndex { node: usize, index: usize },
    /// Method node whose parent is not an earlier class node.
    BadParent { node: usize, parent: usize },
    /// Class node listing something other than one of its own methods.
    BadChild { node: usize, child: usize },
    /// Two nodes share an identifier.
    DuplicateTest { first: usize, second: usize },
}

impl fmt::Display for TreeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingIndex { node, index } => write!(f, "node {} refers to missing index {}", node, index),
            Self::BadParent { node, parent } => write!(f, "node {} has invalid parent {}", node, parent),
            Self::BadChild { node, child } => write!(f, "node {} lists invalid child {}", node, child),
            Self::DuplicateTest { first, second } => write!(f, "nodes {} and {} share an identifier", first, second),
        }
    }
}

impl TestTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node, returning its index.
    pub fn push(&mut self, node: TestNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Append a method node linked to the class at `parent`.
    pub fn push_child(&mut self, parent: usize, mut node: TestNode) -> usize {
        node.parent = Some(parent);
        self.push(node)
    }

    /// Record the expanded children of a class node.
    ///
    /// Only the first call for a node takes effect.
    pub fn set_children(&mut self, index: usize, children: Vec<usize>) {
        if let Some(node) = self.nodes.get_mut(index) {
            if node.children.is_none() {
                node.children = Some(children);
            }
        }
    }

    pub fn get(&self, index: usize) -> Option<&TestNode> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TestNode> {
        self.nodes.iter()
    }

    pub fn nodes(&self) -> &[TestNode] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<TestNode> {
        self.nodes
    }

    /// Whether a node with this identifier is already present.
    pub fn contains_test(&self, test: &str) -> bool {
        self.nodes.iter().any(|n| n.test == test)
    }

    /// Nodes without a parent, in sequence order.
    pub fn roots(&self) -> impl Iterator<Item = (usize, &TestNode)> {
        self.nodes.iter().enumerate().filter(|(_, n)| n.parent.is_none())
    }

    /// Expanded children of the node at `index`.
    pub fn children_of(&self, index: usize) -> impl Iterator<Item = &TestNode> {
        self.nodes
            .get(index)
            .and_then(|n| n.children.as_deref())
            .unwrap_or(&[])
            .iter()
            .filter_map(|&i| self.nodes.get(i))
    }

    /// Check the structural invariants of the sequence.
    pub fn validate(&self) -> Result<(), TreeViolation> {
        let mut seen: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();

        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(first) = seen.insert(node.test.as_str(), i) {
                return Err(TreeViolation::DuplicateTest { first, second: i });
            }

            if let Some(parent) = node.parent {
                let parent_node = self
                    .nodes
                    .get(parent)
                    .ok_or(TreeViolation::DanglingIndex { node: i, index: parent })?;
                if node.level != TestLevel::Method || parent >= i || parent_node.level != TestLevel::Class {
                    return Err(TreeViolation::BadParent { node: i, parent });
                }
            }

            for &child in node.children.as_deref().unwrap_or(&[]) {
                let child_node = self
                    .nodes
                    .get(child)
                    .ok_or(TreeViolation::DanglingIndex { node: i, index: child })?;
                if child_node.level != TestLevel::Method || child_node.parent != Some(i) {
                    return Err(TreeViolation::BadChild { node: i, child });
                }
            }
        }

        Ok(())
    }
}

impl From<Vec<TestNode>> for TestTree {
    fn from(nodes: Vec<TestNode>) -> Self {
        Self { nodes }
    }
}

impl<'a> IntoIterator for &'a TestTree {
    type Item = &'a TestNode;
    type IntoIter = std::slice::Iter<'a, TestNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
