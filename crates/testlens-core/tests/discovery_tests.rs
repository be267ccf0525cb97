use serde_json::{json, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use url::Url;

use testlens_core::discovery::{DiscoveryError, TestFramework, TestSearcher};
use testlens_core::index::{
    CompilationUnit, Element, ElementLocation, IndexError, LocationResolver, MatchAccumulator, PackageRoot,
    PackageRootId, Project, ProjectId, ProjectResolver, SearchOutcome, SearchPattern, SearchScope, SearchStatus,
    SymbolIndex, TypeDecl, TypeId, UnitId,
};
use testlens_core::{CancellationToken, TestKind, TestLevel, TestNode, TestTree, WorkspaceConfig, WorkspaceIndex};

// =============================================================================
// Helpers
// =============================================================================

fn create_workspace(files: &[(&str, &str)]) -> (TempDir, PathBuf, WorkspaceIndex) {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();
    for (relative, content) in files {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    let index = WorkspaceIndex::open(&root, &WorkspaceConfig::default()).unwrap();
    (temp, root, index)
}

fn uri(path: &Path) -> String {
    Url::from_file_path(path).unwrap().to_string()
}

fn ids(tree: &TestTree) -> HashSet<String> {
    tree.iter().map(|n| n.test.clone()).collect()
}

fn all_tests(index: &WorkspaceIndex, framework: TestFramework) -> TestTree {
    let mut tree = TestTree::new();
    let status = TestSearcher::new(index, framework).search_all_tests(&mut tree, &CancellationToken::new());
    assert!(status.is_completed());
    tree
}

const CALC: &str = r#"package pkg;

import org.junit.Test;

public class Calc {
    @Test
    public void add() {}

    public void helper() {}
}
"#;

const JUNIT3_BASE: &str = r#"package pkg;

import junit.framework.TestCase;

public abstract class BaseTest extends TestCase {
    public void testShared() {}
}
"#;

const JUNIT3_CALC: &str = r#"package pkg;

public class CalcTest extends BaseTest {
    public void testAdd() {}
    public void helper() {}
    public int testValue() { return 1; }
}
"#;

// =============================================================================
// searchAllTests
// =============================================================================

#[test]
fn test_calc_scenario() {
    let (_temp, root, index) = create_workspace(&[("pom.xml", "<project/>"), ("src/test/java/pkg/Calc.java", CALC)]);
    let tree = all_tests(&index, TestFramework::JUnit4);

    assert_eq!(tree.len(), 2);
    let class = tree.get(0).unwrap();
    assert_eq!(class.test, "pkg.Calc");
    assert_eq!(class.level, TestLevel::Class);
    assert_eq!(class.children, Some(vec![1]));
    assert_eq!(class.parent, None);
    assert_eq!(class.package_name, "pkg");
    assert_eq!(class.kind, TestKind::JUnit);
    assert_eq!(class.project, root.file_name().unwrap().to_string_lossy());
    assert_eq!(class.uri, uri(&root.join("src/test/java/pkg/Calc.java")));

    let method = tree.get(1).unwrap();
    assert_eq!(method.test, "pkg.Calc#add");
    assert_eq!(method.level, TestLevel::Method);
    assert_eq!(method.parent, Some(0));
    assert_eq!(method.children, None);
    assert_eq!(method.range.start.line, 6);
    assert_eq!(method.range.start.character, 16);
    assert_eq!(method.range.end.character, 19);

    assert!(tree.validate().is_ok());
}

#[test]
fn test_wire_form() {
    let (_temp, _root, index) = create_workspace(&[("src/test/java/pkg/Calc.java", CALC)]);
    let tree = all_tests(&index, TestFramework::JUnit4);

    let json = serde_json::to_value(&tree).unwrap();
    let nodes = json.as_array().unwrap();
    assert_eq!(nodes[0]["childrenIndices"], json!([1]));
    assert!(nodes[0].get("parentIndex").is_none());
    assert_eq!(nodes[1]["parentIndex"], 0);
    assert_eq!(nodes[1]["packageName"], "pkg");
    assert_eq!(nodes[1]["level"], "Method");

    let decoded: TestTree = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, tree);
}

#[test]
fn test_repeated_search_is_stable() {
    let (_temp, _root, index) = create_workspace(&[
        ("src/test/java/pkg/Calc.java", CALC),
        (
            "src/test/java/pkg/other/More.java",
            "package pkg.other;\nimport org.junit.*;\npublic class More { @Test public void one() {} @Test public void two() {} }\n",
        ),
    ]);
    let first = all_tests(&index, TestFramework::JUnit4);
    let second = all_tests(&index, TestFramework::JUnit4);
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first.len(), 5);
}

#[test]
fn test_abstract_and_inaccessible_types_are_skipped() {
    let (_temp, _root, index) = create_workspace(&[
        (
            "src/pkg/AbstractCase.java",
            "package pkg;\nimport org.junit.Test;\npublic abstract class AbstractCase { @Test public void a() {} }\n",
        ),
        (
            "src/pkg/Outer.java",
            r#"package pkg;
import org.junit.Test;
public class Outer {
    private static class Hidden { @Test public void h() {} }
    public class Inner { @Test public void i() {} }
    public static class Nested { @Test public void n() {} }
}
"#,
        ),
    ]);
    let tree = all_tests(&index, TestFramework::JUnit4);

    let expected: HashSet<String> = ["pkg.Outer$Nested", "pkg.Outer$Nested#n"].iter().map(|s| s.to_string()).collect();
    assert_eq!(ids(&tree), expected);
    assert!(tree.validate().is_ok());
}

#[test]
fn test_junit5_methods() {
    let (_temp, _root, index) = create_workspace(&[(
        "src/test/java/pkg/LoopTest.java",
        r#"package pkg;

import org.junit.jupiter.api.Test;
import org.junit.jupiter.params.ParameterizedTest;

class LoopTest {
    @Test void runs() {}
    @ParameterizedTest void many(int x) {}
    @Test private void hidden() {}
    @Test static void shared() {}
}
"#,
    )]);

    let tree = all_tests(&index, TestFramework::JUnit5);
    let expected: HashSet<String> = ["pkg.LoopTest", "pkg.LoopTest#runs", "pkg.LoopTest#many"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(ids(&tree), expected);
    assert!(tree.iter().all(|n| n.kind == TestKind::JUnit5));

    assert!(all_tests(&index, TestFramework::JUnit4).is_empty());
}

#[test]
fn test_junit3_convention() {
    let (_temp, _root, index) = create_workspace(&[
        ("src/test/java/pkg/BaseTest.java", JUNIT3_BASE),
        ("src/test/java/pkg/CalcTest.java", JUNIT3_CALC),
    ]);
    let tree = all_tests(&index, TestFramework::JUnit3);

    assert_eq!(tree.len(), 2);
    assert_eq!(tree.get(0).unwrap().test, "pkg.CalcTest");
    assert_eq!(tree.get(0).unwrap().kind, TestKind::JUnit3);
    assert_eq!(tree.get(1).unwrap().test, "pkg.CalcTest#testAdd");
}

#[test]
fn test_fully_qualified_annotation() {
    let (_temp, _root, index) = create_workspace(&[(
        "src/pkg/Direct.java",
        "package pkg;\npublic class Direct { @org.junit.Test public void works() {} }\n",
    )]);
    let tree = all_tests(&index, TestFramework::JUnit4);
    assert!(tree.contains_test("pkg.Direct#works"));
}

// =============================================================================
// searchTestsInFolder
// =============================================================================

fn two_project_workspace() -> (TempDir, PathBuf, WorkspaceIndex) {
    create_workspace(&[
        ("app/pom.xml", "<project/>"),
        ("app/src/main/java/com/app/Main.java", "package com.app;\npublic class Main {}\n"),
        (
            "app/src/test/java/com/app/AppTest.java",
            "package com.app;\nimport org.junit.Test;\npublic class AppTest { @Test public void starts() {} }\n",
        ),
        (
            "app/src/test/java/com/app/util/Fixtures.java",
            "package com.app.util;\nimport org.junit.Test;\npublic abstract class Fixtures { @Test public void shared() {} }\n",
        ),
        (
            "app/src/test/java/com/app/util/UtilTest.java",
            "package com.app.util;\npublic class UtilTest extends Fixtures {}\n",
        ),
        ("lib/build.gradle", ""),
        (
            "lib/src/main/java/com/lib/LibTest.java",
            "package com.lib;\nimport org.junit.Test;\npublic class LibTest { @Test public void misplaced() {} }\n",
        ),
    ])
}

#[test]
fn test_folder_scope() {
    let (_temp, root, index) = two_project_workspace();
    let searcher = TestSearcher::new(&index, TestFramework::JUnit4);

    let mut tree = TestTree::new();
    let status = searcher
        .search_tests_in_folder(&mut tree, &[json!(uri(&root.join("app")))], &CancellationToken::new())
        .unwrap();
    assert!(status.is_completed());

    let expected: HashSet<String> = ["com.app.AppTest", "com.app.util.UtilTest"].iter().map(|s| s.to_string()).collect();
    assert_eq!(ids(&tree), expected);
    assert!(tree.iter().all(|n| n.level == TestLevel::Class && n.children.is_none()));
    assert!(tree.iter().all(|n| n.project == "app"));
}

#[test]
fn test_folder_inside_project_uses_containing_project() {
    let (_temp, root, index) = two_project_workspace();
    let searcher = TestSearcher::new(&index, TestFramework::JUnit4);

    let mut tree = TestTree::new();
    searcher
        .search_tests_in_folder(&mut tree, &[json!(uri(&root.join("lib/src/main")))], &CancellationToken::new())
        .unwrap();
    assert_eq!(ids(&tree), HashSet::from(["com.lib.LibTest".to_string()]));
}

#[test]
fn test_folder_above_projects_covers_all() {
    let (_temp, root, index) = two_project_workspace();
    let searcher = TestSearcher::new(&index, TestFramework::JUnit4);

    let mut tree = TestTree::new();
    searcher
        .search_tests_in_folder(&mut tree, &[json!(uri(&root))], &CancellationToken::new())
        .unwrap();
    assert_eq!(tree.len(), 3);
}

// =============================================================================
// searchTestPackages
// =============================================================================

#[test]
fn test_packages_come_from_test_roots() {
    let (_temp, root, index) = two_project_workspace();
    let searcher = TestSearcher::new(&index, TestFramework::JUnit4);

    let mut packages = Vec::new();
    let status = searcher
        .search_test_packages(&mut packages, &[json!(uri(&root.join("app")))], &CancellationToken::new())
        .unwrap();
    assert!(status.is_completed());
    packages.sort();
    assert_eq!(packages, vec!["com.app", "com.app.util"]);
}

#[test]
fn test_packages_skip_existing_entries() {
    let (_temp, root, index) = two_project_workspace();
    let searcher = TestSearcher::new(&index, TestFramework::JUnit4);

    let mut packages = vec!["com.app".to_string()];
    searcher
        .search_test_packages(&mut packages, &[json!(uri(&root.join("app")))], &CancellationToken::new())
        .unwrap();
    assert_eq!(packages, vec!["com.app", "com.app.util"]);
}

#[test]
fn test_packages_without_test_sources() {
    let (_temp, root, index) = two_project_workspace();
    let searcher = TestSearcher::new(&index, TestFramework::JUnit4);

    let mut packages = Vec::new();
    searcher
        .search_test_packages(&mut packages, &[json!(uri(&root.join("lib")))], &CancellationToken::new())
        .unwrap();
    assert!(packages.is_empty());
}

// =============================================================================
// searchTestChildren
// =============================================================================

fn node_json(index: &WorkspaceIndex, qualified: &str) -> Value {
    let id = index.find_type(qualified).unwrap();
    let location = index.element_location(Element::Type(id)).unwrap();
    let node = TestNode::class(location.range, location.uri, qualified, "pkg", TestKind::JUnit, "ws");
    json!(serde_json::to_string(&node).unwrap())
}

#[test]
fn test_children_of_abstract_base() {
    let (_temp, _root, index) = create_workspace(&[
        ("src/test/java/pkg/BaseTest.java", JUNIT3_BASE),
        ("src/test/java/pkg/CalcTest.java", JUNIT3_CALC),
        (
            "src/test/java/pkg/Unrelated.java",
            "package pkg;\nimport junit.framework.TestCase;\npublic class Unrelated extends TestCase { public void testX() {} }\n",
        ),
    ]);
    let searcher = TestSearcher::new(&index, TestFramework::JUnit3);

    let mut tree = TestTree::new();
    let status = searcher
        .search_test_children(&mut tree, &[node_json(&index, "pkg.BaseTest")], &CancellationToken::new())
        .unwrap();
    assert!(status.is_completed());

    assert_eq!(ids(&tree), HashSet::from(["pkg.CalcTest".to_string()]));
    assert!(!tree.contains_test("pkg.BaseTest"));
}

#[test]
fn test_children_methods_have_no_parent() {
    let (_temp, _root, index) = create_workspace(&[
        (
            "src/pkg/Base4.java",
            "package pkg;\nimport org.junit.Test;\npublic abstract class Base4 { @Test public void inherited() {} }\n",
        ),
        (
            "src/pkg/Sub4.java",
            r#"package pkg;
import org.junit.Test;
import org.junit.runner.RunWith;
@RunWith(Runner.class)
public class Sub4 extends Base4 {
    @Test public void own() {}
    @Test public void own() {}
}
"#,
        ),
    ]);
    let searcher = TestSearcher::new(&index, TestFramework::JUnit4);

    let mut tree = TestTree::new();
    searcher
        .search_test_children(&mut tree, &[node_json(&index, "pkg.Base4")], &CancellationToken::new())
        .unwrap();

    let classes: Vec<&str> = tree
        .iter()
        .filter(|n| n.level == TestLevel::Class)
        .map(|n| n.test.as_str())
        .collect();
    assert_eq!(classes, vec!["pkg.Sub4"]);
    assert!(tree.iter().all(|n| n.parent.is_none()));
    assert!(tree.contains_test("pkg.Sub4#own"));
    assert!(tree.contains_test("pkg.Base4#inherited"));
    assert_eq!(tree.iter().filter(|n| n.test == "pkg.Sub4#own").count(), 1);
}

#[test]
fn test_children_fall_back_when_file_is_gone() {
    let (_temp, root, index) = create_workspace(&[("src/test/java/pkg/Calc.java", CALC)]);
    let gone = root.join("src/test/java/pkg/Gone.java");
    let node = TestNode::class(Default::default(), uri(&gone), "pkg.Gone", "pkg", TestKind::JUnit, "ws");
    let args = [json!(serde_json::to_string(&node).unwrap())];

    let mut tree = TestTree::new();
    let status = TestSearcher::new(&index, TestFramework::JUnit4)
        .search_test_children(&mut tree, &args, &CancellationToken::new())
        .unwrap();
    assert!(status.is_completed());
    assert!(tree.contains_test("pkg.Calc#add"));
}

// =============================================================================
// Arguments and errors
// =============================================================================

#[test]
fn test_empty_arguments_yield_nothing() {
    let (_temp, _root, index) = create_workspace(&[("src/test/java/pkg/Calc.java", CALC)]);
    let searcher = TestSearcher::new(&index, TestFramework::JUnit4);
    let token = CancellationToken::new();

    let mut tree = TestTree::new();
    assert!(searcher.search_tests_in_folder(&mut tree, &[], &token).unwrap().is_completed());
    assert!(searcher.search_test_children(&mut tree, &[], &token).unwrap().is_completed());
    assert!(tree.is_empty());

    let mut packages = Vec::new();
    assert!(searcher.search_test_packages(&mut packages, &[], &token).unwrap().is_completed());
    assert!(packages.is_empty());
}

#[test]
fn test_malformed_input() {
    let (_temp, _root, index) = create_workspace(&[("src/test/java/pkg/Calc.java", CALC)]);
    let searcher = TestSearcher::new(&index, TestFramework::JUnit4);
    let token = CancellationToken::new();
    let mut tree = TestTree::new();

    let err = searcher.search_tests_in_folder(&mut tree, &[json!("not a uri")], &token).unwrap_err();
    assert!(matches!(err, DiscoveryError::InvalidUri { .. }));

    let err = searcher
        .search_tests_in_folder(&mut tree, &[json!("https://example.com/ws")], &token)
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::NotFileUri(_)));

    let err = searcher.search_test_children(&mut tree, &[json!("{not json")], &token).unwrap_err();
    assert!(matches!(err, DiscoveryError::MalformedNode(_)));

    let err = searcher.search_test_children(&mut tree, &[json!(42)], &token).unwrap_err();
    assert!(matches!(err, DiscoveryError::InvalidArgument(_)));

    assert!(tree.is_empty());
}

// =============================================================================
// Cancellation and failures
// =============================================================================

#[test]
fn test_cancelled_before_search() {
    let (_temp, _root, index) = create_workspace(&[("src/test/java/pkg/Calc.java", CALC)]);
    let token = CancellationToken::new();
    token.cancel();

    let mut tree = TestTree::new();
    let status = TestSearcher::new(&index, TestFramework::JUnit4).search_all_tests(&mut tree, &token);
    assert!(status.is_cancelled());
    assert!(tree.is_empty());
    assert!(tree.validate().is_ok());
}

/// Delegates to a real index, then ends every search early with the real
/// matches already fed: either failed, or cancelled with the token signalled.
struct InterruptedIndex {
    index: WorkspaceIndex,
    cancel: bool,
}

impl InterruptedIndex {
    fn failing(index: WorkspaceIndex) -> Self {
        Self { index, cancel: false }
    }

    fn cancelling(index: WorkspaceIndex) -> Self {
        Self { index, cancel: true }
    }
}

impl SymbolIndex for InterruptedIndex {
    fn search<A: MatchAccumulator>(
        &self,
        pattern: &SearchPattern,
        scope: &SearchScope,
        accumulator: A,
        token: &CancellationToken,
    ) -> SearchOutcome<A> {
        let outcome = self.index.search(pattern, scope, accumulator, token);
        let status = if self.cancel {
            token.cancel();
            SearchStatus::Cancelled
        } else {
            SearchStatus::Failed(IndexError::UnknownRoot(PackageRootId(0)))
        };
        SearchOutcome {
            accumulator: outcome.accumulator,
            status,
        }
    }

    fn project_scope(&self, projects: &[ProjectId]) -> SearchScope {
        self.index.project_scope(projects)
    }

    fn root_scope(&self, roots: &[PackageRootId]) -> SearchScope {
        self.index.root_scope(roots)
    }

    fn hierarchy_scope(&self, focus: TypeId) -> Result<SearchScope, IndexError> {
        self.index.hierarchy_scope(focus)
    }

    fn type_decl(&self, id: TypeId) -> Option<&TypeDecl> {
        self.index.type_decl(id)
    }

    fn resolves_to(&self, unit: UnitId, written: &str, qualified: &str) -> bool {
        self.index.resolves_to(unit, written, qualified)
    }
}

impl ProjectResolver for InterruptedIndex {
    fn projects(&self) -> &[Project] {
        self.index.projects()
    }

    fn projects_for_uri(&self, uri: &Url) -> Vec<ProjectId> {
        self.index.projects_for_uri(uri)
    }

    fn package_root(&self, id: PackageRootId) -> Option<&PackageRoot> {
        self.index.package_root(id)
    }
}

impl LocationResolver for InterruptedIndex {
    fn resolve_compilation_unit(&self, uri: &str) -> Option<UnitId> {
        self.index.resolve_compilation_unit(uri)
    }

    fn unit(&self, id: UnitId) -> Option<&CompilationUnit> {
        self.index.unit(id)
    }

    fn element_location(&self, element: Element) -> Option<ElementLocation> {
        self.index.element_location(element)
    }
}

#[test]
fn test_failing_index_appends_nothing() {
    let (_temp, root, index) = create_workspace(&[("src/test/java/pkg/Calc.java", CALC)]);
    let failing = InterruptedIndex::failing(index);
    let searcher = TestSearcher::new(&failing, TestFramework::JUnit4);
    let token = CancellationToken::new();

    let mut tree = TestTree::new();
    assert!(searcher.search_all_tests(&mut tree, &token).is_failed());
    let folder = [json!(uri(&root))];
    assert!(searcher.search_tests_in_folder(&mut tree, &folder, &token).unwrap().is_failed());
    assert!(tree.is_empty());

    let mut packages = Vec::new();
    assert!(searcher.search_test_packages(&mut packages, &folder, &token).unwrap().is_failed());
    assert!(packages.is_empty());
}

#[test]
fn test_cancelled_search_keeps_delivered_matches() {
    let (_temp, root, index) = create_workspace(&[
        ("src/test/java/pkg/Calc.java", CALC),
        (
            "src/test/java/pkg/other/More.java",
            "package pkg.other;\nimport org.junit.*;\npublic class More { @Test public void one() {} @Test public void two() {} }\n",
        ),
    ]);
    let cancelling = InterruptedIndex::cancelling(index);
    let searcher = TestSearcher::new(&cancelling, TestFramework::JUnit4);

    let mut tree = TestTree::new();
    let status = searcher.search_all_tests(&mut tree, &CancellationToken::new());
    assert!(status.is_cancelled());
    assert_eq!(tree.len(), 5);
    assert!(tree.validate().is_ok());
    let calc = tree.iter().position(|n| n.test == "pkg.Calc").unwrap();
    let children: Vec<&str> = tree.children_of(calc).map(|n| n.test.as_str()).collect();
    assert_eq!(children, vec!["pkg.Calc#add"]);

    let folder = [json!(uri(&root))];
    let mut classes = TestTree::new();
    let status = searcher
        .search_tests_in_folder(&mut classes, &folder, &CancellationToken::new())
        .unwrap();
    assert!(status.is_cancelled());
    let expected: HashSet<String> = ["pkg.Calc", "pkg.other.More"].iter().map(|s| s.to_string()).collect();
    assert_eq!(ids(&classes), expected);

    let mut packages = Vec::new();
    let status = searcher
        .search_test_packages(&mut packages, &folder, &CancellationToken::new())
        .unwrap();
    assert!(status.is_cancelled());
    packages.sort();
    assert_eq!(packages, vec!["pkg", "pkg.other"]);

    let calc_node = json!(serde_json::to_string(tree.get(calc).unwrap()).unwrap());
    let mut children = TestTree::new();
    let status = searcher
        .search_test_children(&mut children, &[calc_node], &CancellationToken::new())
        .unwrap();
    assert!(status.is_cancelled());
    assert!(children.contains_test("pkg.Calc#add"));
}
