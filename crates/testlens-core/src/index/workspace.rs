//! In-process symbol index built from the Java sources of a workspace.

use ignore::WalkBuilder;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

use super::java::{JavaSourceParser, ParsedType, ParsedUnit};
use super::names::{erase_type, qualifier, simple_name};
use super::project::{build_classpath, discover_project_dirs, project_name};
use super::{
    CompilationUnit, Element, ElementLocation, EntryKind, IndexError, LocationResolver,
    MatchAccumulator, PackageRoot, PackageRootId, Project, ProjectId, ProjectResolver,
    RootKind, SearchMatch, SearchOutcome, SearchPattern, SearchScope, SearchStatus, SymbolIndex,
    TypeDecl, TypeDeclKind, TypeId, UnitId,
};
use crate::cancel::CancellationToken;
use crate::config::WorkspaceConfig;

/// Counts describing an opened workspace.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub projects: usize,
    pub units: usize,
    pub types: usize,
    pub methods: usize,
    pub skipped_files: usize,
}

/// Symbol index over every Java source file of a workspace.
///
/// Built once by [`WorkspaceIndex::open`] and immutable afterwards, so it can
/// serve concurrent discovery calls without locking.
pub struct WorkspaceIndex {
    root: PathBuf,
    projects: Vec<Project>,
    roots: Vec<PackageRoot>,
    units: Vec<CompilationUnit>,
    types: Vec<TypeDecl>,
    subtypes: Vec<Vec<TypeId>>,
    units_by_path: HashMap<PathBuf, UnitId>,
    /// Binary (`a.B$C`) and source (`a.B.C`) names.
    types_by_name: HashMap<String, TypeId>,
    types_by_simple: HashMap<String, Vec<TypeId>>,
    skipped_files: usize,
}

impl WorkspaceIndex {
    /// Discover projects under `root` and index their Java sources.
    pub fn open(root: impl AsRef<Path>, config: &WorkspaceConfig) -> Result<Self, IndexError> {
        let root = root.as_ref();
        let root = root
            .canonicalize()
            .map_err(|_| IndexError::InvalidRoot(root.to_path_buf()))?;
        if !root.is_dir() {
            return Err(IndexError::InvalidRoot(root));
        }

        let mut index = Self {
            root: root.clone(),
            projects: Vec::new(),
            roots: Vec::new(),
            units: Vec::new(),
            types: Vec::new(),
            subtypes: Vec::new(),
            units_by_path: HashMap::new(),
            types_by_name: HashMap::new(),
            types_by_simple: HashMap::new(),
            skipped_files: 0,
        };

        for dir in discover_project_dirs(&root, config) {
            index.add_project(dir, config);
        }

        let parser = JavaSourceParser::new();
        for (project, package_root, path) in index.source_files(config) {
            match index.read_unit(&parser, &path, config) {
                Ok(parsed) => index.add_unit(project, package_root, path, parsed),
                Err(e) => {
                    warn!(error = %e, "skipping source file");
                    index.skipped_files += 1;
                }
            }
        }

        index.link_supertypes();

        let stats = index.stats();
        debug!(
            root = %index.root.display(),
            projects = stats.projects,
            units = stats.units,
            types = stats.types,
            "workspace indexed"
        );

        Ok(index)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn units(&self) -> &[CompilationUnit] {
        &self.units
    }

    pub fn types(&self) -> &[TypeDecl] {
        &self.types
    }

    /// Look a type up by binary or source qualified name.
    pub fn find_type(&self, qualified: &str) -> Option<TypeId> {
        self.types_by_name.get(qualified).copied()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            projects: self.projects.len(),
            units: self.units.len(),
            types: self.types.len(),
            methods: self.types.iter().map(|t| t.methods.len()).sum(),
            skipped_files: self.skipped_files,
        }
    }

    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    fn add_project(&mut self, dir: PathBuf, config: &WorkspaceConfig) {
        let id = ProjectId(self.projects.len());
        let classpath = build_classpath(&dir, config);

        let mut package_roots = Vec::new();
        for entry in &classpath {
            let root_id = PackageRootId(self.roots.len());
            self.roots.push(PackageRoot {
                id: root_id,
                project: id,
                path: entry.path.clone(),
                kind: match entry.kind {
                    EntryKind::Source => RootKind::Folder,
                    EntryKind::Library => RootKind::Archive,
                },
                is_test: entry.is_test,
            });
            package_roots.push(root_id);
        }

        self.projects.push(Project {
            id,
            name: project_name(&dir),
            root: dir,
            classpath,
            package_roots,
        });
    }

    /// Every `.java` file under a folder package root, owned by the deepest
    /// project containing it.
    fn source_files(&self, config: &WorkspaceConfig) -> Vec<(ProjectId, PackageRootId, PathBuf)> {
        let mut files = Vec::new();
        let mut seen = HashSet::new();

        for root in self.roots.iter().filter(|r| r.kind == RootKind::Folder) {
            let exclude = config.exclude_dirs.clone();
            let walker = WalkBuilder::new(&root.path)
                .hidden(true)
                .git_ignore(true)
                .filter_entry(move |entry| {
                    let name = entry.file_name().to_string_lossy();
                    !exclude.iter().any(|e| *e == name)
                })
                .build();

            for entry in walker.flatten() {
                let path = entry.path();
                if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("java") {
                    continue;
                }
                if self.owning_project(path) != Some(root.project) || !seen.insert(path.to_path_buf()) {
                    continue;
                }
                files.push((root.project, root.id, path.to_path_buf()));
            }
        }

        files
    }

    fn owning_project(&self, path: &Path) -> Option<ProjectId> {
        self.projects
            .iter()
            .filter(|p| p.contains(path))
            .max_by_key(|p| p.root.components().count())
            .map(|p| p.id)
    }

    fn read_unit(&self, parser: &JavaSourceParser, path: &Path, config: &WorkspaceConfig) -> Result<ParsedUnit, IndexError> {
        let metadata = fs::metadata(path).map_err(|e| IndexError::io(path, e))?;
        if metadata.len() > config.max_file_size {
            return Err(IndexError::Parse {
                path: path.to_path_buf(),
                message: format!("file exceeds {} bytes", config.max_file_size),
            });
        }

        let content = fs::read_to_string(path).map_err(|e| IndexError::io(path, e))?;
        let parsed = parser.parse(&content).map_err(|message| IndexError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        if parsed.has_errors {
            debug!(path = %path.display(), "source contains syntax errors");
        }
        Ok(parsed)
    }

    fn add_unit(&mut self, project: ProjectId, root: PackageRootId, path: PathBuf, parsed: ParsedUnit) {
        let id = UnitId(self.units.len());
        let uri = Url::from_file_path(&path)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("file://{}", path.display()));

        let mut unit = CompilationUnit {
            id,
            uri,
            path: path.clone(),
            project,
            root,
            package: parsed.package,
            imports: parsed.imports,
            types: Vec::new(),
            all_types: Vec::new(),
        };

        for ty in parsed.types {
            let type_id = self.add_type(ty, &mut unit, None);
            unit.types.push(type_id);
        }

        self.units_by_path.insert(path, id);
        self.units.push(unit);
    }

    fn add_type(&mut self, parsed: ParsedType, unit: &mut CompilationUnit, enclosing: Option<TypeId>) -> TypeId {
        let id = TypeId(self.types.len());
        let qualified_name = match enclosing {
            Some(outer) => format!("{}${}", self.types[outer.0].qualified_name, parsed.name),
            None if unit.package.is_empty() => parsed.name.clone(),
            None => format!("{}.{}", unit.package, parsed.name),
        };

        self.types_by_name.insert(qualified_name.clone(), id);
        self.types_by_name.insert(qualified_name.replace('$', "."), id);
        self.types_by_simple.entry(parsed.name.clone()).or_default().push(id);

        self.types.push(TypeDecl {
            id,
            name: parsed.name,
            qualified_name,
            package: unit.package.clone(),
            kind: parsed.kind,
            modifiers: parsed.modifiers,
            annotations: parsed.annotations,
            superclass: parsed.superclass,
            interfaces: parsed.interfaces,
            methods: parsed.methods,
            name_range: parsed.name_range,
            unit: unit.id,
            enclosing,
            supertypes: Vec::new(),
        });
        unit.all_types.push(id);

        for nested in parsed.nested {
            self.add_type(nested, unit, Some(id));
        }

        id
    }

    fn link_supertypes(&mut self) {
        let resolved: Vec<Vec<TypeId>> = self
            .types
            .iter()
            .map(|ty| {
                ty.superclass
                    .iter()
                    .chain(ty.interfaces.iter())
                    .filter_map(|written| self.resolve_type_name(ty, written))
                    .filter(|&s| s != ty.id)
                    .collect()
            })
            .collect();

        self.subtypes = vec![Vec::new(); self.types.len()];
        for (ty, supers) in self.types.iter_mut().zip(resolved) {
            for &s in &supers {
                self.subtypes[s.0].push(ty.id);
            }
            ty.supertypes = supers;
        }
    }

    /// Resolve a type name written inside `context` to a workspace type.
    fn resolve_type_name(&self, context: &TypeDecl, written: &str) -> Option<TypeId> {
        let written = erase_type(written);
        let unit = &self.units[context.unit.0];

        if let Some((head, rest)) = written.split_once('.') {
            if let Some(&id) = self.types_by_name.get(written) {
                return Some(id);
            }
            // `Outer.Inner` where `Outer` is itself resolvable.
            let outer = self.resolve_type_name(context, head)?;
            let binary = format!("{}${}", self.types[outer.0].qualified_name, rest.replace('.', "$"));
            return self.types_by_name.get(&binary).copied();
        }

        // Member types of the context and its enclosing types.
        let candidates = self.types_by_simple.get(written)?;
        let mut scope = Some(context.id);
        while let Some(current) = scope {
            if let Some(&id) = candidates.iter().find(|&&c| self.types[c.0].enclosing == Some(current)) {
                return Some(id);
            }
            scope = self.types[current.0].enclosing;
        }

        let imports = unit.imports.iter().filter(|i| !i.is_static);
        for import in imports.clone().filter(|i| !i.on_demand) {
            if simple_name(&import.name) == written {
                if let Some(&id) = self.types_by_name.get(&import.name) {
                    return Some(id);
                }
            }
        }

        let same_package = if unit.package.is_empty() {
            written.to_string()
        } else {
            format!("{}.{}", unit.package, written)
        };
        if let Some(&id) = self.types_by_name.get(&same_package) {
            return Some(id);
        }

        for import in imports.filter(|i| i.on_demand) {
            if let Some(&id) = self.types_by_name.get(&format!("{}.{}", import.name, written)) {
                return Some(id);
            }
        }

        let top_level: Vec<TypeId> = candidates
            .iter()
            .copied()
            .filter(|c| self.types[c.0].enclosing.is_none())
            .collect();
        match top_level.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Whether `ty`'s supertype chain reaches `target` (qualified name).
    fn extends_type(&self, ty: &TypeDecl, target: &str) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([ty.id]);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            let decl = &self.types[current.0];
            let names_target = decl
                .superclass
                .iter()
                .chain(decl.interfaces.iter())
                .any(|written| self.resolves_to(decl.unit, written, target));
            if names_target {
                return true;
            }
            queue.extend(decl.supertypes.iter().copied());
        }

        false
    }

    // -------------------------------------------------------------------------
    // Matching
    // -------------------------------------------------------------------------

    fn match_package<A: MatchAccumulator>(&self, pattern: &SearchPattern, unit: &CompilationUnit, acc: &mut A) {
        match pattern {
            SearchPattern::PackageDeclarations(name) if name.matches(&unit.package) => {
                acc.accept(SearchMatch::Package(unit.package.clone()));
            }
            SearchPattern::Or(patterns) => {
                for p in patterns {
                    self.match_package(p, unit, acc);
                }
            }
            _ => {}
        }
    }

    fn match_type<A: MatchAccumulator>(&self, pattern: &SearchPattern, ty: &TypeDecl, acc: &mut A) {
        match pattern {
            SearchPattern::AnnotatedMethods(annotations) => {
                for id in ty.method_ids() {
                    let method = &ty.methods[id.index];
                    if self.has_annotation(ty.unit, &method.annotations, annotations) {
                        acc.accept(SearchMatch::Method(id));
                    }
                }
            }
            SearchPattern::AnnotatedTypes(annotations) => {
                if self.has_annotation(ty.unit, &ty.annotations, annotations) {
                    acc.accept(SearchMatch::Type(ty.id));
                }
            }
            SearchPattern::Subtypes(target) => {
                if ty.kind == TypeDeclKind::Class && self.extends_type(ty, target) {
                    acc.accept(SearchMatch::Type(ty.id));
                }
            }
            SearchPattern::ClassDeclarations(name) => {
                if ty.kind == TypeDeclKind::Class && name.matches(&ty.name) {
                    acc.accept(SearchMatch::Type(ty.id));
                }
            }
            SearchPattern::PackageDeclarations(_) => {}
            SearchPattern::Or(patterns) => {
                for p in patterns {
                    self.match_type(p, ty, acc);
                }
            }
        }
    }

    fn has_annotation(&self, unit: UnitId, written: &[String], wanted: &[String]) -> bool {
        written
            .iter()
            .any(|w| wanted.iter().any(|q| self.resolves_to(unit, w, q)))
    }

    fn check_scope(&self, scope: &SearchScope) -> Result<(), IndexError> {
        match scope {
            SearchScope::Roots(roots) => match roots.iter().find(|r| r.0 >= self.roots.len()) {
                Some(&bad) => Err(IndexError::UnknownRoot(bad)),
                None => Ok(()),
            },
            SearchScope::Hierarchy { focus, types } => {
                match std::iter::once(focus).chain(types.iter()).find(|t| t.0 >= self.types.len()) {
                    Some(&bad) => Err(IndexError::UnknownType(bad)),
                    None => Ok(()),
                }
            }
        }
    }
}

impl SymbolIndex for WorkspaceIndex {
    fn search<A: MatchAccumulator>(
        &self,
        pattern: &SearchPattern,
        scope: &SearchScope,
        mut accumulator: A,
        token: &CancellationToken,
    ) -> SearchOutcome<A> {
        if let Err(e) = self.check_scope(scope) {
            return SearchOutcome {
                accumulator,
                status: SearchStatus::Failed(e),
            };
        }

        match scope {
            SearchScope::Roots(roots) => {
                for unit in self.units.iter().filter(|u| roots.contains(&u.root)) {
                    if token.is_cancelled() {
                        return SearchOutcome {
                            accumulator,
                            status: SearchStatus::Cancelled,
                        };
                    }
                    self.match_package(pattern, unit, &mut accumulator);
                    for &id in &unit.all_types {
                        self.match_type(pattern, &self.types[id.0], &mut accumulator);
                    }
                }
            }
            SearchScope::Hierarchy { types, .. } => {
                let units: BTreeSet<UnitId> = types.iter().map(|t| self.types[t.0].unit).collect();
                for unit in units {
                    self.match_package(pattern, &self.units[unit.0], &mut accumulator);
                }
                for id in types {
                    if token.is_cancelled() {
                        return SearchOutcome {
                            accumulator,
                            status: SearchStatus::Cancelled,
                        };
                    }
                    self.match_type(pattern, &self.types[id.0], &mut accumulator);
                }
            }
        }

        SearchOutcome {
            accumulator,
            status: SearchStatus::Completed,
        }
    }

    fn project_scope(&self, projects: &[ProjectId]) -> SearchScope {
        let roots = projects
            .iter()
            .filter_map(|id| self.projects.get(id.0))
            .flat_map(|p| p.package_roots.iter().copied())
            .filter(|r| self.roots[r.0].kind == RootKind::Folder)
            .collect();
        SearchScope::Roots(roots)
    }

    fn root_scope(&self, roots: &[PackageRootId]) -> SearchScope {
        SearchScope::Roots(roots.iter().copied().collect())
    }

    fn hierarchy_scope(&self, focus: TypeId) -> Result<SearchScope, IndexError> {
        if focus.0 >= self.types.len() {
            return Err(IndexError::UnknownType(focus));
        }

        let mut types = BTreeSet::from([focus]);
        let mut queue: VecDeque<TypeId> = self.types[focus.0].supertypes.iter().copied().collect();
        while let Some(t) = queue.pop_front() {
            if types.insert(t) {
                queue.extend(self.types[t.0].supertypes.iter().copied());
            }
        }

        let mut queue: VecDeque<TypeId> = self.subtypes[focus.0].iter().copied().collect();
        while let Some(t) = queue.pop_front() {
            if types.insert(t) {
                queue.extend(self.subtypes[t.0].iter().copied());
            }
        }

        Ok(SearchScope::Hierarchy { focus, types })
    }

    fn type_decl(&self, id: TypeId) -> Option<&TypeDecl> {
        self.types.get(id.0)
    }

    fn resolves_to(&self, unit: UnitId, written: &str, qualified: &str) -> bool {
        let written = erase_type(written);
        let dotted = qualified.replace('$', ".");
        if written == qualified || written == dotted {
            return true;
        }
        if written.contains('.') || simple_name(&dotted) != written {
            return false;
        }

        let Some(unit) = self.units.get(unit.0) else {
            return false;
        };
        let target_package = qualifier(qualified);

        let imported = unit.imports.iter().filter(|i| !i.is_static).any(|i| {
            if i.on_demand {
                i.name == target_package
            } else {
                i.name == dotted
            }
        });

        imported || unit.package == target_package
    }
}

impl ProjectResolver for WorkspaceIndex {
    fn projects(&self) -> &[Project] {
        &self.projects
    }

    fn projects_for_uri(&self, uri: &Url) -> Vec<ProjectId> {
        let Ok(path) = uri.to_file_path() else {
            return Vec::new();
        };
        let path = path.canonicalize().unwrap_or(path);

        let under: Vec<ProjectId> = self
            .projects
            .iter()
            .filter(|p| p.root.starts_with(&path))
            .map(|p| p.id)
            .collect();
        if !under.is_empty() {
            return under;
        }

        self.owning_project(&path).into_iter().collect()
    }

    fn package_root(&self, id: PackageRootId) -> Option<&PackageRoot> {
        self.roots.get(id.0)
    }
}

impl LocationResolver for WorkspaceIndex {
    fn resolve_compilation_unit(&self, uri: &str) -> Option<UnitId> {
        let path = Url::parse(uri).ok()?.to_file_path().ok()?;
        if let Some(&id) = self.units_by_path.get(&path) {
            return Some(id);
        }
        let canonical = path.canonicalize().ok()?;
        self.units_by_path.get(&canonical).copied()
    }

    fn unit(&self, id: UnitId) -> Option<&CompilationUnit> {
        self.units.get(id.0)
    }

    fn element_location(&self, element: Element) -> Option<ElementLocation> {
        let (owner, range) = match element {
            Element::Type(id) => {
                let ty = self.types.get(id.0)?;
                (ty, ty.name_range)
            }
            Element::Method(id) => {
                let ty = self.types.get(id.owner.0)?;
                (ty, ty.methods.get(id.index)?.name_range)
            }
        };
        let unit = self.units.get(owner.unit.0)?;
        Some(ElementLocation {
            uri: unit.uri.clone(),
            range,
        })
    }
}
