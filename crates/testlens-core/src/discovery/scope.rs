//! Turning query targets into search scopes.

use tracing::debug;
use url::Url;

use super::error::DiscoveryError;
use crate::index::{IndexError, JavaWorkspace, RootKind, SearchScope};
use crate::model::TestNode;

/// Parse a client URI, requiring the `file` scheme.
pub fn parse_file_uri(uri: &str) -> Result<Url, DiscoveryError> {
    let url = Url::parse(uri).map_err(|source| DiscoveryError::InvalidUri {
        uri: uri.to_string(),
        source,
    })?;
    if url.scheme() != "file" {
        return Err(DiscoveryError::NotFileUri(uri.to_string()));
    }
    Ok(url)
}

/// Builds the search scope for each query mode.
pub struct ScopeBuilder<'a, I> {
    index: &'a I,
}

impl<'a, I: JavaWorkspace> ScopeBuilder<'a, I> {
    pub fn new(index: &'a I) -> Self {
        Self { index }
    }

    /// Source roots of every project.
    pub fn workspace(&self) -> SearchScope {
        self.index.project_scope(&self.index.project_ids())
    }

    /// Source roots of the projects under `folder`, or of the deepest project
    /// containing it.
    pub fn folder(&self, folder: &Url) -> SearchScope {
        let projects = self.index.projects_for_uri(folder);
        debug!(folder = %folder, projects = projects.len(), "folder scope");
        self.index.project_scope(&projects)
    }

    /// Hierarchy around the type a node was discovered from.
    ///
    /// Falls back to the folder scope of the node's URI when its source file
    /// is gone or declares no matching top-level type.
    pub fn hierarchy(&self, node: &TestNode, uri: &Url) -> Result<SearchScope, IndexError> {
        let unit = self
            .index
            .resolve_compilation_unit(&node.uri)
            .and_then(|id| self.index.unit(id))
            .filter(|unit| unit.exists());
        let Some(unit) = unit else {
            debug!(uri = %node.uri, "compilation unit unavailable, using folder scope");
            return Ok(self.folder(uri));
        };

        let class_name = node.class_name();
        let focus = unit
            .types
            .iter()
            .copied()
            .find(|&id| self.index.type_decl(id).is_some_and(|ty| class_name.ends_with(ty.name.as_str())));
        match focus {
            Some(focus) => self.index.hierarchy_scope(focus),
            None => {
                debug!(test = %node.test, "no matching type in unit, using folder scope");
                Ok(self.folder(uri))
            }
        }
    }

    /// Folder roots backing the test source entries of the projects under
    /// `folder`.
    pub fn packages(&self, folder: &Url) -> SearchScope {
        let roots: Vec<_> = self
            .index
            .projects_for_uri(folder)
            .into_iter()
            .filter_map(|id| self.index.project(id))
            .filter(|project| project.has_test_sources())
            .flat_map(|project| project.package_roots.iter().copied())
            .filter(|&id| {
                self.index
                    .package_root(id)
                    .is_some_and(|root| root.kind == RootKind::Folder && root.is_test)
            })
            .collect();
        debug!(folder = %folder, roots = roots.len(), "packages scope");
        self.index.root_scope(&roots)
    }
}
