//! Typed Abstract Syntax Tree definitions.
//!
//! This module contains the typed variants of AST nodes produced by
//! the type checker. Each typed node includes type information and
//! has been validated for type correctness.
//!
//! The typed AST mirrors the structure of the untyped AST but includes:
//! - Resolved types for all expressions
//! - Identifiers split into locals, fields of `this` and class references
//! - Calls resolved to a built-in, a constructor or a concrete method
//! - Field slots resolved to their index in the class layout
//!
//! This typed AST is consumed by the code generator to produce LLVM IR.

use std::fmt::Display;

use crate::{
    ast::{
        expressions::{BinaryOp, Literal, UnaryOp},
        types::Type,
    },
    Position,
};

use super::builtins::Builtin;

#[derive(Debug, Clone, PartialEq)]
pub struct TypedExpr {
    pub kind: TypedExprKind,
    pub ty: Type,
    pub position: Position,
}

impl TypedExpr {
    pub fn new(kind: TypedExprKind, ty: Type, position: Position) -> Self {
        TypedExpr { kind, ty, position }
    }

    /// True for expressions that name a storage slot (`ask` targets).
    pub fn is_variable(&self) -> bool {
        matches!(
            self.kind,
            TypedExprKind::Local(_) | TypedExprKind::Field { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedExprKind {
    /// Local variable or parameter
    Local(String),
    /// Field of the current object
    Field {
        class: String,
        field: String,
        index: u32,
    },
    /// A class name used as a value, e.g. the receiver of `Class.method()`
    ClassRef(String),
    Literal(Literal),
    ArrayLiteral(Vec<TypedExpr>),
    Binary {
        left: Box<TypedExpr>,
        operator: BinaryOp,
        right: Box<TypedExpr>,
    },
    Unary {
        operator: UnaryOp,
        operand: Box<TypedExpr>,
    },
    Call {
        callee: Callee,
        arguments: Vec<TypedExpr>,
    },
    Index {
        target: Box<TypedExpr>,
        index: Box<TypedExpr>,
    },
    /// Field of another object
    Member {
        target: Box<TypedExpr>,
        class: String,
        field: String,
        index: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    Builtin(Builtin),
    /// `ClassName()`
    Constructor(String),
    Method {
        class: String,
        name: String,
        /// `None` calls on the current object
        receiver: Option<Box<TypedExpr>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedStmt {
    VarDecl {
        name: String,
        var_type: Type,
        /// Element count of `T[n]` declarations
        size: Option<TypedExpr>,
        value: Option<TypedExpr>,
    },
    Assign {
        target: TypedExpr,
        value: TypedExpr,
    },
    Return(Option<TypedExpr>),
    If {
        condition: TypedExpr,
        then_body: Vec<TypedStmt>,
        else_body: Option<Vec<TypedStmt>>,
    },
    Loop {
        init: Option<Box<TypedStmt>>,
        condition: TypedExpr,
        action: Option<Box<TypedStmt>>,
        body: Vec<TypedStmt>,
    },
    Repeat {
        condition: TypedExpr,
        body: Vec<TypedStmt>,
    },
    Expression(TypedExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedFunction {
    pub class: String,
    pub name: String,
    pub parameters: Vec<(String, Type)>,
    pub return_type: Type,
    pub is_entry: bool,
    pub body: Vec<TypedStmt>,
}

impl TypedFunction {
    /// Name of the emitted IR function.
    pub fn symbol_name(&self) -> String {
        if self.is_entry {
            String::from("main")
        } else {
            method_symbol(&self.class, &self.name)
        }
    }
}

/// IR name of a non-entry method.
pub fn method_symbol(class: &str, method: &str) -> String {
    format!("{}.{}", class, method)
}

/// IR name of a class constructor. `#` cannot appear in a method name, so a
/// user method called `new` keeps its own symbol.
pub fn constructor_symbol(class: &str) -> String {
    format!("{}#new", class)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedField {
    pub name: String,
    pub ty: Type,
    pub size: Option<TypedExpr>,
    pub initializer: Option<TypedExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedClass {
    pub name: String,
    /// In declaration order
    pub fields: Vec<TypedField>,
    pub methods: Vec<TypedFunction>,
}

/// A non-fatal diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub message: String,
    pub position: Position,
}

impl Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "warning: {} ({})", self.message, self.position)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedProgram {
    pub classes: Vec<TypedClass>,
    pub warnings: Vec<Warning>,
}

impl TypedProgram {
    pub fn class(&self, name: &str) -> Option<&TypedClass> {
        self.classes.iter().find(|class| class.name == name)
    }

    pub fn entry(&self) -> Option<&TypedFunction> {
        self.classes
            .iter()
            .flat_map(|class| class.methods.iter())
            .find(|method| method.is_entry)
    }
}
