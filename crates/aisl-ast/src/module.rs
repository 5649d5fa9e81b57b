//! Module- and definition-level AST nodes.

use crate::expr::{Expr, Literal};
use crate::ty::Type;

/// A function parameter: a name and a mandatory declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

/// A function definition: name, parameters, mandatory return type, body.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Type,
    pub body: Expr,
}

/// One case of a test-spec: a description, literal argument list, and the
/// expected literal result.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub description: String,
    pub args: Vec<Literal>,
    pub expected: Literal,
}

/// A test-spec: exercises one named function against a table of cases.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSpec {
    pub target: String,
    pub cases: Vec<TestCase>,
}

/// A top-level module definition: either a function or a test-spec.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Function(Function),
    TestSpec(TestSpec),
}

/// An import: the name of another module this module depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub module_name: String,
}

/// A parsed module: name, ordered imports, ordered definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub imports: Vec<Import>,
    pub definitions: Vec<Definition>,
}

impl Module {
    /// Functions declared directly in this module (test-specs excluded).
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.definitions.iter().filter_map(|d| match d {
            Definition::Function(f) => Some(f),
            Definition::TestSpec(_) => None,
        })
    }

    /// Test-specs declared directly in this module.
    pub fn test_specs(&self) -> impl Iterator<Item = &TestSpec> {
        self.definitions.iter().filter_map(|d| match d {
            Definition::TestSpec(t) => Some(t),
            Definition::Function(_) => None,
        })
    }

    /// Whether this module declares a `main` function.
    pub fn has_main(&self) -> bool {
        self.functions().any(|f| f.name == "main")
    }
}
