//! Projects, classpath entries and package roots.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use super::{PackageRootId, ProjectId};
use crate::config::WorkspaceConfig;

/// Kind of raw classpath entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A directory of source files.
    Source,
    /// A compiled archive (`.jar`).
    Library,
}

/// One raw classpath entry of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClasspathEntry {
    pub kind: EntryKind,
    /// Absolute path.
    pub path: PathBuf,
    /// Entry is designated as holding test sources.
    pub is_test: bool,
}

/// Whether a package root is backed by a folder or an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    Folder,
    Archive,
}

/// A package fragment root: the base directory (or archive) packages live under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRoot {
    pub id: PackageRootId,
    pub project: ProjectId,
    pub path: PathBuf,
    pub kind: RootKind,
    /// Backed by a test source entry.
    pub is_test: bool,
}

/// A Java project in the workspace.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: ProjectId,
    /// Directory name.
    pub name: String,
    pub root: PathBuf,
    pub classpath: Vec<ClasspathEntry>,
    pub package_roots: Vec<PackageRootId>,
}

impl Project {
    /// At least one source entry is designated for tests.
    pub fn has_test_sources(&self) -> bool {
        self.classpath
            .iter()
            .any(|e| e.kind == EntryKind::Source && e.is_test)
    }

    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }

    pub fn source_entries(&self) -> impl Iterator<Item = &ClasspathEntry> {
        self.classpath.iter().filter(|e| e.kind == EntryKind::Source)
    }
}

/// Directories under `root` that carry a build marker, shallowest first.
///
/// Falls back to `root` itself when no directory has a marker.
pub(crate) fn discover_project_dirs(root: &Path, config: &WorkspaceConfig) -> Vec<PathBuf> {
    let exclude = config.exclude_dirs.clone();
    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .filter_entry(move |entry| {
            let name = entry.file_name().to_string_lossy();
            !exclude.iter().any(|e| *e == name)
        })
        .build();

    let mut dirs: Vec<PathBuf> = walker
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.into_path())
        .filter(|dir| {
            config
                .project_markers
                .iter()
                .any(|marker| dir.join(marker).is_file())
        })
        .collect();

    if dirs.is_empty() {
        dirs.push(root.to_path_buf());
    }

    dirs.sort_by_key(|d| (d.components().count(), d.clone()));
    dirs
}

/// Raw classpath of the project rooted at `dir`.
pub(crate) fn build_classpath(dir: &Path, config: &WorkspaceConfig) -> Vec<ClasspathEntry> {
    let mut entries = Vec::new();

    let roots = config
        .source_roots
        .iter()
        .map(|r| (r, false))
        .chain(config.test_source_roots.iter().map(|r| (r, true)));
    for (relative, is_test) in roots {
        let path = dir.join(relative);
        if path.is_dir() && !entries.iter().any(|e: &ClasspathEntry| e.path == path) {
            entries.push(ClasspathEntry {
                kind: EntryKind::Source,
                path,
                is_test,
            });
        }
    }

    if entries.is_empty() {
        entries.push(ClasspathEntry {
            kind: EntryKind::Source,
            path: dir.to_path_buf(),
            is_test: false,
        });
    }

    let lib_dir = dir.join(&config.library_dir);
    if let Ok(read) = std::fs::read_dir(&lib_dir) {
        let mut jars: Vec<PathBuf> = read
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("jar"))
            .collect();
        jars.sort();
        entries.extend(jars.into_iter().map(|path| ClasspathEntry {
            kind: EntryKind::Library,
            path,
            is_test: false,
        }));
    }

    entries
}

/// Name shown for a project: its directory name.
pub(crate) fn project_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| dir.to_string_lossy().to_string())
}
