//! Test definitions: what counts as a test for each supported framework.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use crate::index::{MethodDecl, SearchPattern, SymbolIndex, TypeDecl, TypeDeclKind, TypeId};
use crate::model::TestKind;

const JUNIT3_TEST_CASE: &str = "junit.framework.TestCase";
const JUNIT4_TEST: &str = "org.junit.Test";
const JUNIT4_RUN_WITH: &str = "org.junit.runner.RunWith";
const JUNIT5_TEST_ANNOTATIONS: &[&str] = &[
    "org.junit.jupiter.api.Test",
    "org.junit.jupiter.params.ParameterizedTest",
    "org.junit.jupiter.api.RepeatedTest",
    "org.junit.jupiter.api.TestFactory",
];

/// Supported test frameworks, as named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestFramework {
    JUnit3,
    JUnit4,
    JUnit5,
}

impl TestFramework {
    pub const ALL: [TestFramework; 3] = [Self::JUnit3, Self::JUnit4, Self::JUnit5];

    /// The definition record driving discovery for this framework.
    pub fn definition(self) -> TestDefinition {
        match self {
            Self::JUnit3 => TestDefinition {
                kind: TestKind::JUnit3,
                pattern: SearchPattern::Subtypes(JUNIT3_TEST_CASE.to_string()),
                marker: MethodMarker::NamingConvention {
                    prefix: "test".to_string(),
                    base_type: JUNIT3_TEST_CASE.to_string(),
                },
                runner_annotations: Vec::new(),
            },
            Self::JUnit4 => TestDefinition {
                kind: TestKind::JUnit,
                pattern: SearchPattern::Or(vec![
                    SearchPattern::AnnotatedMethods(vec![JUNIT4_TEST.to_string()]),
                    SearchPattern::AnnotatedTypes(vec![JUNIT4_RUN_WITH.to_string()]),
                ]),
                marker: MethodMarker::Annotated {
                    annotations: vec![JUNIT4_TEST.to_string()],
                    visibility: Visibility::Public,
                },
                runner_annotations: vec![JUNIT4_RUN_WITH.to_string()],
            },
            Self::JUnit5 => {
                let annotations: Vec<String> = JUNIT5_TEST_ANNOTATIONS.iter().map(|s| s.to_string()).collect();
                TestDefinition {
                    kind: TestKind::JUnit5,
                    pattern: SearchPattern::AnnotatedMethods(annotations.clone()),
                    marker: MethodMarker::Annotated {
                        annotations,
                        visibility: Visibility::NonPrivate,
                    },
                    runner_annotations: Vec::new(),
                }
            }
        }
    }
}

impl fmt::Display for TestFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JUnit3 => write!(f, "junit3"),
            Self::JUnit4 => write!(f, "junit4"),
            Self::JUnit5 => write!(f, "junit5"),
        }
    }
}

impl FromStr for TestFramework {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "junit3" => Ok(Self::JUnit3),
            "junit4" | "junit" => Ok(Self::JUnit4),
            "junit5" | "jupiter" => Ok(Self::JUnit5),
            other => Err(format!("unknown test framework: {}", other)),
        }
    }
}

/// Lowest method visibility a framework accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    NonPrivate,
}

/// How a test method is recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodMarker {
    /// Public `void` no-arg methods named `<prefix>*` inside a subtype of `base_type`.
    NamingConvention { prefix: String, base_type: String },
    /// Methods carrying one of `annotations`.
    Annotated {
        annotations: Vec<String>,
        visibility: Visibility,
    },
}

/// Search pattern, kind tag and test-method marker of one framework.
#[derive(Debug, Clone)]
pub struct TestDefinition {
    pub kind: TestKind,
    pub pattern: SearchPattern,
    pub marker: MethodMarker,
    /// Type annotations that make a class a test on their own (`@RunWith`).
    pub runner_annotations: Vec<String>,
}

impl TestDefinition {
    /// Whether `method`, declared in `owner`, is a test method.
    pub fn is_test_method<I: SymbolIndex>(&self, index: &I, owner: &TypeDecl, method: &MethodDecl) -> bool {
        if method.modifiers.is_static || method.is_abstract() {
            return false;
        }

        match &self.marker {
            MethodMarker::NamingConvention { prefix, base_type } => {
                method.modifiers.public
                    && method.return_type == "void"
                    && method.parameter_count == 0
                    && method.name.starts_with(prefix.as_str())
                    && is_subtype_of(index, owner, base_type)
            }
            MethodMarker::Annotated {
                annotations,
                visibility,
            } => {
                let visible = match visibility {
                    Visibility::Public => method.modifiers.public,
                    Visibility::NonPrivate => !method.modifiers.private,
                };
                visible
                    && method
                        .annotations
                        .iter()
                        .any(|written| annotations.iter().any(|q| index.resolves_to(owner.unit, written, q)))
            }
        }
    }

    /// Whether `ty` has a test method, declared or inherited, or a runner annotation.
    pub fn is_test_class<I: SymbolIndex>(&self, index: &I, ty: &TypeDecl) -> bool {
        supertype_closure(index, ty.id).into_iter().any(|id| {
            let Some(decl) = index.type_decl(id) else {
                return false;
            };
            let has_runner = decl.annotations.iter().any(|written| {
                self.runner_annotations
                    .iter()
                    .any(|q| index.resolves_to(decl.unit, written, q))
            });
            has_runner || decl.methods.iter().any(|m| self.is_test_method(index, decl, m))
        })
    }
}

/// A concrete class that a runner can instantiate: neither it nor any
/// enclosing type is private, and nested classes are static.
pub fn is_accessible<I: SymbolIndex>(index: &I, ty: &TypeDecl) -> bool {
    if ty.kind != TypeDeclKind::Class {
        return false;
    }

    let mut current = ty;
    loop {
        if current.modifiers.private {
            return false;
        }
        let Some(outer) = current.enclosing.and_then(|id| index.type_decl(id)) else {
            return true;
        };
        // Member types of interfaces are implicitly static.
        let implicitly_static = matches!(outer.kind, TypeDeclKind::Interface | TypeDeclKind::Annotation);
        if !current.modifiers.is_static && !implicitly_static {
            return false;
        }
        current = outer;
    }
}

/// `ty` followed by its transitive workspace supertypes.
fn supertype_closure<I: SymbolIndex>(index: &I, ty: TypeId) -> Vec<TypeId> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    let mut queue = VecDeque::from([ty]);

    while let Some(id) = queue.pop_front() {
        if !seen.insert(id) {
            continue;
        }
        order.push(id);
        if let Some(decl) = index.type_decl(id) {
            queue.extend(decl.supertypes.iter().copied());
        }
    }

    order
}

/// Whether some type in `ty`'s supertype chain names `qualified` as a supertype.
fn is_subtype_of<I: SymbolIndex>(index: &I, ty: &TypeDecl, qualified: &str) -> bool {
    supertype_closure(index, ty.id).into_iter().any(|id| {
        index.type_decl(id).is_some_and(|decl| {
            decl.superclass
                .iter()
                .chain(decl.interfaces.iter())
                .any(|written| index.resolves_to(decl.unit, written, qualified))
        })
    })
}
