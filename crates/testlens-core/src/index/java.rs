//! Java declaration extraction using tree-sitter.

use tree_sitter::Node;

use super::names::erase_type;
use super::treesitter::TreeSitterParser;
use super::{Import, MethodDecl, Modifiers, TypeDeclKind};
use crate::model::Range;

/// Declarations extracted from one `.java` file.
#[derive(Debug, Clone, Default)]
pub struct ParsedUnit {
    /// Package name, empty for the default package.
    pub package: String,
    pub imports: Vec<Import>,
    /// Top-level types; nested types hang off their parents.
    pub types: Vec<ParsedType>,
    /// The syntax tree contained error nodes.
    pub has_errors: bool,
}

/// A type declaration before it is assigned handles by the index.
#[derive(Debug, Clone)]
pub struct ParsedType {
    pub name: String,
    pub kind: TypeDeclKind,
    pub modifiers: Modifiers,
    pub annotations: Vec<String>,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub methods: Vec<MethodDecl>,
    pub name_range: Range,
    pub nested: Vec<ParsedType>,
}

/// Java parser using tree-sitter.
pub struct JavaSourceParser {
    base: TreeSitterParser,
}

impl JavaSourceParser {
    pub fn new() -> Self {
        Self {
            base: TreeSitterParser::new(tree_sitter_java::LANGUAGE.into()),
        }
    }

    /// Extract package, imports and type declarations from source text.
    pub fn parse(&self, content: &str) -> Result<ParsedUnit, String> {
        let tree = self.base.parse_tree(content)?;
        let root = tree.root_node();

        let mut unit = ParsedUnit {
            has_errors: root.has_error(),
            ..Default::default()
        };

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "package_declaration" => {
                    if let Some(name) = TreeSitterParser::first_child_of_kinds(&child, &["scoped_identifier", "identifier"]) {
                        unit.package = TreeSitterParser::node_text(&name, content).to_string();
                    }
                }
                "import_declaration" => {
                    if let Some(import) = self.extract_import(&child, content) {
                        unit.imports.push(import);
                    }
                }
                kind => {
                    if let Some(decl_kind) = Self::type_decl_kind(kind) {
                        if let Some(ty) = self.extract_type(&child, content, decl_kind) {
                            unit.types.push(ty);
                        }
                    }
                }
            }
        }

        Ok(unit)
    }

    fn type_decl_kind(kind: &str) -> Option<TypeDeclKind> {
        match kind {
            "class_declaration" => Some(TypeDeclKind::Class),
            "interface_declaration" => Some(TypeDeclKind::Interface),
            "enum_declaration" => Some(TypeDeclKind::Enum),
            "record_declaration" => Some(TypeDeclKind::Record),
            "annotation_type_declaration" => Some(TypeDeclKind::Annotation),
            _ => None,
        }
    }

    fn extract_import(&self, node: &Node, content: &str) -> Option<Import> {
        let name = TreeSitterParser::first_child_of_kinds(node, &["scoped_identifier", "identifier"])?;

        let mut is_static = false;
        let mut on_demand = false;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "static" => is_static = true,
                "asterisk" => on_demand = true,
                _ => {}
            }
        }

        Some(Import {
            name: TreeSitterParser::node_text(&name, content).to_string(),
            on_demand,
            is_static,
        })
    }

    fn extract_type(&self, node: &Node, content: &str, kind: TypeDeclKind) -> Option<ParsedType> {
        let name_node = node.child_by_field_name("name")?;
        let name = TreeSitterParser::node_text(&name_node, content).to_string();
        let (keywords, annotations) = self.extract_modifiers(node, content);

        let superclass = node
            .child_by_field_name("superclass")
            .and_then(|s| s.named_child(0))
            .map(|t| erase_type(TreeSitterParser::node_text(&t, content)).to_string());

        let interfaces = match kind {
            TypeDeclKind::Interface => TreeSitterParser::first_child_of_kinds(node, &["extends_interfaces"]),
            _ => node.child_by_field_name("interfaces"),
        }
        .map(|n| self.extract_type_list(&n, content))
        .unwrap_or_default();

        let mut ty = ParsedType {
            name,
            kind,
            modifiers: Modifiers::from_keywords(keywords.iter().map(String::as_str)),
            annotations,
            superclass,
            interfaces,
            methods: Vec::new(),
            name_range: TreeSitterParser::node_range(&name_node, content),
            nested: Vec::new(),
        };

        if let Some(body) = node.child_by_field_name("body") {
            self.extract_members(&body, content, &mut ty);
        }

        Some(ty)
    }

    fn extract_members(&self, body: &Node, content: &str, ty: &mut ParsedType) {
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            match member.kind() {
                "method_declaration" => {
                    if let Some(method) = self.extract_method(&member, content) {
                        ty.methods.push(method);
                    }
                }
                // Enum constants come first, then the regular class body.
                "enum_body_declarations" => self.extract_members(&member, content, ty),
                kind => {
                    if let Some(decl_kind) = Self::type_decl_kind(kind) {
                        if let Some(nested) = self.extract_type(&member, content, decl_kind) {
                            ty.nested.push(nested);
                        }
                    }
                }
            }
        }
    }

    fn extract_method(&self, node: &Node, content: &str) -> Option<MethodDecl> {
        let name_node = node.child_by_field_name("name")?;
        let (keywords, annotations) = self.extract_modifiers(node, content);

        let return_type = node
            .child_by_field_name("type")
            .map(|t| TreeSitterParser::node_text(&t, content).to_string())
            .unwrap_or_else(|| "void".to_string());

        let parameter_count = node
            .child_by_field_name("parameters")
            .map(|params| {
                let mut cursor = params.walk();
                let count = params
                    .named_children(&mut cursor)
                    .filter(|p| p.kind() == "formal_parameter" || p.kind() == "spread_parameter")
                    .count();
                count
            })
            .unwrap_or(0);

        Some(MethodDecl {
            name: TreeSitterParser::node_text(&name_node, content).to_string(),
            modifiers: Modifiers::from_keywords(keywords.iter().map(String::as_str)),
            annotations,
            return_type,
            parameter_count,
            has_body: node.child_by_field_name("body").is_some(),
            name_range: TreeSitterParser::node_range(&name_node, content),
        })
    }

    /// Split a declaration's `modifiers` node into keywords and annotation names.
    fn extract_modifiers(&self, node: &Node, content: &str) -> (Vec<String>, Vec<String>) {
        let mut keywords = Vec::new();
        let mut annotations = Vec::new();

        if let Some(modifiers) = TreeSitterParser::first_child_of_kinds(node, &["modifiers"]) {
            let mut cursor = modifiers.walk();
            for modifier in modifiers.children(&mut cursor) {
                match modifier.kind() {
                    "marker_annotation" | "annotation" => {
                        if let Some(name) = modifier.child_by_field_name("name") {
                            annotations.push(TreeSitterParser::node_text(&name, content).to_string());
                        }
                    }
                    "line_comment" | "block_comment" => {}
                    _ => keywords.push(TreeSitterParser::node_text(&modifier, content).to_string()),
                }
            }
        }

        (keywords, annotations)
    }

    /// Type names listed in `implements`/`extends` clauses.
    fn extract_type_list(&self, clause: &Node, content: &str) -> Vec<String> {
        TreeSitterParser::children_of_kind(clause, "type_list")
            .iter()
            .flat_map(|list| {
                let mut cursor = list.walk();
                list.named_children(&mut cursor)
                    .map(|t| erase_type(TreeSitterParser::node_text(&t, content)).to_string())
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

impl Default for JavaSourceParser {
    fn default() -> Self {
        Self::new()
    }
}
