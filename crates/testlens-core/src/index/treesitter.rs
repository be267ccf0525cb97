//! Tree-sitter helpers used by the Java source parser.

use tree_sitter::{Language, Node, Parser as TSParser, Point, Tree};

use crate::model::{Position, Range};

/// Thin wrapper around a tree-sitter language.
pub struct TreeSitterParser {
    language: Language,
}

impl TreeSitterParser {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    /// Parse source code into a tree-sitter tree.
    pub fn parse_tree(&self, content: &str) -> Result<Tree, String> {
        let mut parser = TSParser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| format!("Failed to set language: {}", e))?;

        parser
            .parse(content, None)
            .ok_or_else(|| "Failed to parse content".to_string())
    }

    /// Get text for a node from source content.
    pub fn node_text<'a>(node: &Node, content: &'a str) -> &'a str {
        &content[node.byte_range()]
    }

    /// Editor range (zero-based lines, UTF-16 columns) covered by a node.
    pub fn node_range(node: &Node, content: &str) -> Range {
        Range::new(
            Self::position(content, node.start_byte(), node.start_position()),
            Self::position(content, node.end_byte(), node.end_position()),
        )
    }

    /// Named children of a specific kind.
    pub fn children_of_kind<'a>(node: &Node<'a>, kind: &str) -> Vec<Node<'a>> {
        let mut cursor = node.walk();
        node.named_children(&mut cursor)
            .filter(|n| n.kind() == kind)
            .collect()
    }

    /// First named child of one of the given kinds.
    pub fn first_child_of_kinds<'a>(node: &Node<'a>, kinds: &[&str]) -> Option<Node<'a>> {
        let mut cursor = node.walk();
        let found = node
            .named_children(&mut cursor)
            .find(|n| kinds.contains(&n.kind()));
        found
    }

    fn position(content: &str, byte: usize, point: Point) -> Position {
        // Point columns are byte offsets; editors count UTF-16 code units.
        let line_start = byte.saturating_sub(point.column);
        let character = content
            .get(line_start..byte)
            .map(|prefix| prefix.encode_utf16().count())
            .unwrap_or(point.column);
        Position::new(point.row as u32, character as u32)
    }
}
