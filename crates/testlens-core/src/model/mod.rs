//! Data model for discovery results.

mod node;
mod tree;

pub use node::{Position, Range, TestKind, TestLevel, TestNode};
pub use tree::{TestTree, TreeViolation};
