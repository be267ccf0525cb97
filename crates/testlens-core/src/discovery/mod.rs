//! Test discovery over a symbol index.
//!
//! A [`TestSearcher`] pairs a workspace with one framework's
//! [`TestDefinition`] and answers four queries:
//!
//! - [`TestSearcher::search_all_tests`] - every test class in the workspace,
//!   with its test methods as children
//! - [`TestSearcher::search_tests_in_folder`] - test classes under a folder,
//!   not expanded
//! - [`TestSearcher::search_test_packages`] - package names under the test
//!   source roots of a folder's projects
//! - [`TestSearcher::search_test_children`] - test classes and methods in the
//!   type hierarchy of a previously returned node
//!
//! Each query runs one symbol search. Search failures never reach the output:
//! nothing is appended and the failure comes back as [`SearchStatus::Failed`].
//! A cancelled search still hands back its matches; those are turned into
//! nodes and the query reports [`SearchStatus::Cancelled`].

mod definition;
mod error;
mod scope;

pub use definition::{is_accessible, MethodMarker, TestDefinition, TestFramework, Visibility};
pub use error::DiscoveryError;
pub use scope::{parse_file_uri, ScopeBuilder};

use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::cancel::CancellationToken;
use crate::index::{
    Element, JavaWorkspace, MatchAccumulator, MethodId, NamePattern, SearchMatch, SearchOutcome, SearchPattern,
    SearchStatus, TypeDecl, TypeId,
};
use crate::model::{TestNode, TestTree};

/// Collects matched types and methods, deduplicated, in match order.
#[derive(Debug, Default)]
struct MemberCollector {
    types: Vec<TypeId>,
    methods: Vec<MethodId>,
    seen_types: HashSet<TypeId>,
    seen_methods: HashSet<MethodId>,
}

impl MatchAccumulator for MemberCollector {
    fn accept(&mut self, found: SearchMatch) {
        match found {
            SearchMatch::Type(id) => {
                if self.seen_types.insert(id) {
                    self.types.push(id);
                }
            }
            SearchMatch::Method(id) => {
                if self.seen_methods.insert(id) {
                    self.methods.push(id);
                }
            }
            SearchMatch::Package(_) => {}
        }
    }
}

/// Set of declaring types: a method match contributes its owner.
#[derive(Debug, Default)]
struct CandidateTypes(HashSet<TypeId>);

impl MatchAccumulator for CandidateTypes {
    fn accept(&mut self, found: SearchMatch) {
        match found {
            SearchMatch::Type(id) => {
                self.0.insert(id);
            }
            SearchMatch::Method(id) => {
                self.0.insert(id.owner);
            }
            SearchMatch::Package(_) => {}
        }
    }
}

#[derive(Debug, Default)]
struct PackageNames(Vec<String>);

impl MatchAccumulator for PackageNames {
    fn accept(&mut self, found: SearchMatch) {
        if let SearchMatch::Package(name) = found {
            self.0.push(name);
        }
    }
}

/// Discovers tests of one framework in a workspace.
pub struct TestSearcher<'a, I: JavaWorkspace> {
    index: &'a I,
    definition: TestDefinition,
}

impl<'a, I: JavaWorkspace> TestSearcher<'a, I> {
    pub fn new(index: &'a I, framework: TestFramework) -> Self {
        Self::with_definition(index, framework.definition())
    }

    pub fn with_definition(index: &'a I, definition: TestDefinition) -> Self {
        Self { index, definition }
    }

    pub fn definition(&self) -> &TestDefinition {
        &self.definition
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Append every test class in the workspace followed by its test methods.
    #[tracing::instrument(skip_all, fields(kind = %self.definition.kind))]
    pub fn search_all_tests(&self, out: &mut TestTree, token: &CancellationToken) -> SearchStatus {
        let scope = ScopeBuilder::new(self.index).workspace();
        let outcome = self
            .index
            .search(&self.definition.pattern, &scope, CandidateTypes::default(), token);
        let (candidates, status) = match self.settle(outcome) {
            Ok(settled) => settled,
            Err(status) => return status,
        };

        for id in candidates.0 {
            let Some(ty) = self.index.type_decl(id) else {
                continue;
            };
            if !self.is_candidate_class(ty, out) {
                continue;
            }
            let Some(class_node) = self.class_node(ty) else {
                continue;
            };

            let class_index = out.push(class_node);
            let mut children = Vec::new();
            for method_id in ty.method_ids() {
                let method = &ty.methods[method_id.index];
                if !self.definition.is_test_method(self.index, ty, method) {
                    continue;
                }
                if let Some(node) = self.method_node(method_id) {
                    children.push(out.push_child(class_index, node));
                }
            }
            out.set_children(class_index, children);
        }

        debug!(nodes = out.len(), "all tests searched");
        status
    }

    /// Append the test classes under the folder given as the first argument.
    #[tracing::instrument(skip_all, fields(kind = %self.definition.kind))]
    pub fn search_tests_in_folder(
        &self,
        out: &mut TestTree,
        args: &[Value],
        token: &CancellationToken,
    ) -> Result<SearchStatus, DiscoveryError> {
        let Some(folder) = first_string(args)? else {
            return Ok(SearchStatus::Completed);
        };
        let folder = parse_file_uri(folder)?;

        let scope = ScopeBuilder::new(self.index).folder(&folder);
        let pattern = SearchPattern::ClassDeclarations(NamePattern::any());
        let outcome = self.index.search(&pattern, &scope, MemberCollector::default(), token);
        let (collected, status) = match self.settle(outcome) {
            Ok(settled) => settled,
            Err(status) => return Ok(status),
        };

        for id in collected.types {
            let Some(ty) = self.index.type_decl(id) else {
                continue;
            };
            if !self.is_candidate_class(ty, out) || !self.definition.is_test_class(self.index, ty) {
                continue;
            }
            if let Some(node) = self.class_node(ty) {
                out.push(node);
            }
        }

        Ok(status)
    }

    /// Append the packages under the test source roots of the folder's projects.
    #[tracing::instrument(skip_all)]
    pub fn search_test_packages(
        &self,
        out: &mut Vec<String>,
        args: &[Value],
        token: &CancellationToken,
    ) -> Result<SearchStatus, DiscoveryError> {
        let Some(folder) = first_string(args)? else {
            return Ok(SearchStatus::Completed);
        };
        let folder = parse_file_uri(folder)?;

        let scope = ScopeBuilder::new(self.index).packages(&folder);
        let pattern = SearchPattern::PackageDeclarations(NamePattern::any());
        let outcome = self.index.search(&pattern, &scope, PackageNames::default(), token);
        let (packages, status) = match self.settle(outcome) {
            Ok(settled) => settled,
            Err(status) => return Ok(status),
        };

        for package in packages.0 {
            if !out.contains(&package) {
                out.push(package);
            }
        }

        Ok(status)
    }

    /// Append the test classes and methods in the hierarchy of the node
    /// serialized in the first argument. Methods are appended without a parent.
    #[tracing::instrument(skip_all, fields(kind = %self.definition.kind))]
    pub fn search_test_children(
        &self,
        out: &mut TestTree,
        args: &[Value],
        token: &CancellationToken,
    ) -> Result<SearchStatus, DiscoveryError> {
        let Some(serialized) = first_string(args)? else {
            return Ok(SearchStatus::Completed);
        };
        let parent = TestNode::from_json(serialized)?;
        let uri = parse_file_uri(&parent.uri)?;

        let scope = match ScopeBuilder::new(self.index).hierarchy(&parent, &uri) {
            Ok(scope) => scope,
            Err(e) => {
                warn!(error = %e, test = %parent.test, "hierarchy scope failed");
                return Ok(SearchStatus::Failed(e));
            }
        };
        let outcome = self
            .index
            .search(&self.definition.pattern, &scope, MemberCollector::default(), token);
        let (collected, status) = match self.settle(outcome) {
            Ok(settled) => settled,
            Err(status) => return Ok(status),
        };

        for id in collected.types {
            let Some(ty) = self.index.type_decl(id) else {
                continue;
            };
            if ty.qualified_name == parent.test
                || !self.is_candidate_class(ty, out)
                || !self.definition.is_test_class(self.index, ty)
            {
                continue;
            }
            if let Some(node) = self.class_node(ty) {
                out.push(node);
            }
        }

        for id in collected.methods {
            let (Some(ty), Some(method)) = (self.index.type_decl(id.owner), self.index.method_decl(id)) else {
                continue;
            };
            if !self.definition.is_test_method(self.index, ty, method) {
                continue;
            }
            if let Some(node) = self.method_node(id) {
                if !out.contains_test(&node.test) {
                    out.push(node);
                }
            }
        }

        Ok(status)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Split a search into the matches to materialize and the status the
    /// query ends with. Only a failure discards the matches.
    fn settle<A>(&self, outcome: SearchOutcome<A>) -> Result<(A, SearchStatus), SearchStatus> {
        match outcome.status {
            SearchStatus::Completed => Ok((outcome.accumulator, SearchStatus::Completed)),
            SearchStatus::Cancelled => {
                debug!("search cancelled, keeping partial matches");
                Ok((outcome.accumulator, SearchStatus::Cancelled))
            }
            SearchStatus::Failed(e) => {
                warn!(error = %e, "test search failed");
                Err(SearchStatus::Failed(e))
            }
        }
    }

    /// Accessible, concrete, and not already in the output.
    fn is_candidate_class(&self, ty: &TypeDecl, out: &TestTree) -> bool {
        is_accessible(self.index, ty) && !ty.is_abstract() && !out.contains_test(&ty.qualified_name)
    }

    fn project_name(&self, ty: &TypeDecl) -> Option<String> {
        let unit = self.index.unit(ty.unit)?;
        self.index.project(unit.project).map(|p| p.name.clone())
    }

    fn class_node(&self, ty: &TypeDecl) -> Option<TestNode> {
        let location = self.index.element_location(Element::Type(ty.id))?;
        Some(TestNode::class(
            location.range,
            location.uri,
            ty.qualified_name.clone(),
            ty.package.clone(),
            self.definition.kind,
            self.project_name(ty)?,
        ))
    }

    fn method_node(&self, id: MethodId) -> Option<TestNode> {
        let ty = self.index.type_decl(id.owner)?;
        let method = ty.methods.get(id.index)?;
        let location = self.index.element_location(Element::Method(id))?;
        Some(TestNode::method(
            location.range,
            location.uri,
            &ty.qualified_name,
            &method.name,
            ty.package.clone(),
            self.definition.kind,
            self.project_name(ty)?,
        ))
    }
}

/// The first argument as a string; `None` when there are no arguments.
fn first_string(args: &[Value]) -> Result<Option<&str>, DiscoveryError> {
    match args.first() {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(DiscoveryError::InvalidArgument(format!("expected a string, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_string() {
        assert_eq!(first_string(&[]).unwrap(), None);
        assert_eq!(first_string(&[json!("file:///x")]).unwrap(), Some("file:///x"));
        assert!(matches!(first_string(&[json!(3)]), Err(DiscoveryError::InvalidArgument(_))));
    }

    #[test]
    fn test_candidate_types_use_method_owner() {
        let mut candidates = CandidateTypes::default();
        candidates.accept(SearchMatch::Method(MethodId { owner: TypeId(4), index: 0 }));
        candidates.accept(SearchMatch::Method(MethodId { owner: TypeId(4), index: 1 }));
        candidates.accept(SearchMatch::Type(TypeId(2)));
        candidates.accept(SearchMatch::Package("pkg".to_string()));
        assert_eq!(candidates.0, HashSet::from([TypeId(2), TypeId(4)]));
    }

    #[test]
    fn test_member_collector_dedups() {
        let mut collector = MemberCollector::default();
        let method = MethodId { owner: TypeId(1), index: 0 };
        collector.accept(SearchMatch::Method(method));
        collector.accept(SearchMatch::Method(method));
        collector.accept(SearchMatch::Type(TypeId(1)));
        collector.accept(SearchMatch::Type(TypeId(1)));
        assert_eq!(collector.methods, vec![method]);
        assert_eq!(collector.types, vec![TypeId(1)]);
    }
}
