//! Symbol index over a Java workspace.
//!
//! Discovery talks to the workspace exclusively through three traits:
//!
//! - [`SymbolIndex`] - declaration search over a scope, scope construction,
//!   and access to type/method declarations by handle
//! - [`ProjectResolver`] - projects, their classpath entries and package roots
//! - [`LocationResolver`] - compilation units and element source locations
//!
//! [`WorkspaceIndex`] implements all three by parsing Java sources with
//! tree-sitter.
//!
//! # Example
//!
//! ```ignore
//! use testlens_core::index::{WorkspaceIndex, SymbolIndex, SearchPattern};
//!
//! let index = WorkspaceIndex::open("./my-project", &WorkspaceConfig::default())?;
//! let scope = index.project_scope(&index.project_ids());
//! let outcome = index.search(&SearchPattern::ClassDeclarations(NamePattern::any()), &scope, Vec::new(), &token);
//! ```

mod error;
mod java;
pub mod names;
mod project;
mod treesitter;
mod workspace;

pub use error::IndexError;
pub use java::{JavaSourceParser, ParsedType, ParsedUnit};
pub use names::NamePattern;
pub use project::{ClasspathEntry, EntryKind, PackageRoot, Project, RootKind};
pub use workspace::WorkspaceIndex;

use std::collections::BTreeSet;
use url::Url;

use crate::cancel::CancellationToken;
use crate::model::Range;

// =============================================================================
// HANDLES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProjectId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageRootId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(pub usize);

/// A method, addressed by its declaring type and declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodId {
    pub owner: TypeId,
    pub index: usize,
}

/// A searchable Java element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    Type(TypeId),
    Method(MethodId),
}

// =============================================================================
// DECLARATIONS
// =============================================================================

/// Declaration modifiers relevant to test eligibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub public: bool,
    pub protected: bool,
    pub private: bool,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
}

impl Modifiers {
    /// Build from modifier keywords as written in source.
    pub fn from_keywords<'a>(keywords: impl IntoIterator<Item = &'a str>) -> Self {
        let mut modifiers = Self::default();
        for keyword in keywords {
            match keyword {
                "public" => modifiers.public = true,
                "protected" => modifiers.protected = true,
                "private" => modifiers.private = true,
                "static" => modifiers.is_static = true,
                "abstract" => modifiers.is_abstract = true,
                "final" => modifiers.is_final = true,
                _ => {}
            }
        }
        modifiers
    }
}

/// Kind of type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeDeclKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

/// A single-type or on-demand import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Imported name, without the trailing `.*` for on-demand imports.
    pub name: String,
    pub on_demand: bool,
    pub is_static: bool,
}

/// A method declared in a type body.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    pub modifiers: Modifiers,
    /// Annotation names as written (`Test`, `org.junit.Test`).
    pub annotations: Vec<String>,
    /// Return type as written; `void` for procedures.
    pub return_type: String,
    pub parameter_count: usize,
    /// Declared without a body (abstract or interface method).
    pub has_body: bool,
    pub name_range: Range,
}

impl MethodDecl {
    pub fn is_abstract(&self) -> bool {
        self.modifiers.is_abstract || !self.has_body
    }
}

/// A type declaration stored in the index.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub id: TypeId,
    pub name: String,
    /// Binary-style name: `pkg.Outer$Inner`.
    pub qualified_name: String,
    pub package: String,
    pub kind: TypeDeclKind,
    pub modifiers: Modifiers,
    pub annotations: Vec<String>,
    /// Superclass as written, type arguments erased.
    pub superclass: Option<String>,
    /// Implemented (or, for interfaces, extended) types as written.
    pub interfaces: Vec<String>,
    pub methods: Vec<MethodDecl>,
    pub name_range: Range,
    pub unit: UnitId,
    pub enclosing: Option<TypeId>,
    /// Workspace supertypes resolved from `superclass` and `interfaces`.
    pub supertypes: Vec<TypeId>,
}

impl TypeDecl {
    /// Interfaces and annotation types are implicitly abstract.
    pub fn is_abstract(&self) -> bool {
        self.modifiers.is_abstract || matches!(self.kind, TypeDeclKind::Interface | TypeDeclKind::Annotation)
    }

    pub fn method_ids(&self) -> impl Iterator<Item = MethodId> + '_ {
        (0..self.methods.len()).map(move |index| MethodId { owner: self.id, index })
    }
}

/// One parsed source file.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    pub id: UnitId,
    /// Client-facing `file://` URI.
    pub uri: String,
    pub path: std::path::PathBuf,
    pub project: ProjectId,
    pub root: PackageRootId,
    pub package: String,
    pub imports: Vec<Import>,
    /// Top-level types in declaration order.
    pub types: Vec<TypeId>,
    /// All types, nested ones included, in declaration order.
    pub all_types: Vec<TypeId>,
}

impl CompilationUnit {
    /// Whether the file still exists on disk.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Where an element's name token lives.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementLocation {
    pub uri: String,
    pub range: Range,
}

// =============================================================================
// SEARCH
// =============================================================================

/// What a declaration search looks for.
#[derive(Debug, Clone)]
pub enum SearchPattern {
    /// Methods carrying any of the given (qualified) annotations.
    AnnotatedMethods(Vec<String>),
    /// Types carrying any of the given (qualified) annotations.
    AnnotatedTypes(Vec<String>),
    /// Classes whose supertype chain reaches the given qualified type.
    Subtypes(String),
    /// Class declarations whose simple name matches.
    ClassDeclarations(NamePattern),
    /// Package declarations whose name matches.
    PackageDeclarations(NamePattern),
    /// Union of several patterns.
    Or(Vec<SearchPattern>),
}

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SearchMatch {
    Type(TypeId),
    Method(MethodId),
    Package(String),
}

/// Where a search looks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchScope {
    /// Compilation units under these package roots.
    Roots(BTreeSet<PackageRootId>),
    /// Only these types: a focus type plus its super- and subtypes.
    Hierarchy { focus: TypeId, types: BTreeSet<TypeId> },
}

impl SearchScope {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Roots(roots) => roots.is_empty(),
            Self::Hierarchy { types, .. } => types.is_empty(),
        }
    }
}

/// Receives matches as a search runs.
pub trait MatchAccumulator {
    fn accept(&mut self, found: SearchMatch);
}

impl MatchAccumulator for Vec<SearchMatch> {
    fn accept(&mut self, found: SearchMatch) {
        self.push(found);
    }
}

/// How a search (or a discovery call built on one) ended.
#[derive(Debug)]
pub enum SearchStatus {
    Completed,
    /// Stopped early on request; results are partial.
    Cancelled,
    /// The index failed; results were discarded.
    Failed(IndexError),
}

impl SearchStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Accumulator handed back by [`SymbolIndex::search`], with how it ended.
#[derive(Debug)]
pub struct SearchOutcome<A> {
    pub accumulator: A,
    pub status: SearchStatus,
}

// =============================================================================
// COLLABORATOR TRAITS
// =============================================================================

/// Declaration search and type information.
pub trait SymbolIndex: Send + Sync {
    /// Run one search, feeding every match into `accumulator`.
    ///
    /// The token is checked between units of work; on cancellation the
    /// accumulator is returned with whatever it received so far.
    fn search<A: MatchAccumulator>(
        &self,
        pattern: &SearchPattern,
        scope: &SearchScope,
        accumulator: A,
        token: &CancellationToken,
    ) -> SearchOutcome<A>;

    /// Scope over the source roots of the given projects.
    fn project_scope(&self, projects: &[ProjectId]) -> SearchScope;

    /// Scope over exactly the given package roots.
    fn root_scope(&self, roots: &[PackageRootId]) -> SearchScope;

    /// Scope over a type together with its supertypes and subtypes.
    fn hierarchy_scope(&self, focus: TypeId) -> Result<SearchScope, IndexError>;

    fn type_decl(&self, id: TypeId) -> Option<&TypeDecl>;

    fn method_decl(&self, id: MethodId) -> Option<&MethodDecl> {
        self.type_decl(id.owner).and_then(|t| t.methods.get(id.index))
    }

    /// Whether `written`, appearing in `unit`, names the type `qualified`.
    fn resolves_to(&self, unit: UnitId, written: &str, qualified: &str) -> bool;
}

/// Projects and their classpaths.
pub trait ProjectResolver: Send + Sync {
    fn projects(&self) -> &[Project];

    fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects().get(id.0)
    }

    fn project_ids(&self) -> Vec<ProjectId> {
        (0..self.projects().len()).map(ProjectId).collect()
    }

    /// Projects located under `uri`, or the innermost project containing it.
    fn projects_for_uri(&self, uri: &Url) -> Vec<ProjectId>;

    fn package_root(&self, id: PackageRootId) -> Option<&PackageRoot>;
}

/// Compilation units and element locations.
pub trait LocationResolver: Send + Sync {
    fn resolve_compilation_unit(&self, uri: &str) -> Option<UnitId>;

    fn unit(&self, id: UnitId) -> Option<&CompilationUnit>;

    fn element_location(&self, element: Element) -> Option<ElementLocation>;
}

/// Everything discovery needs from a workspace.
pub trait JavaWorkspace: SymbolIndex + ProjectResolver + LocationResolver {}

impl<T: SymbolIndex + ProjectResolver + LocationResolver> JavaWorkspace for T {}
