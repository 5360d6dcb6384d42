//! Type checking and semantic analysis module.
//!
//! This module performs type checking and semantic analysis on the AST.
//! It transforms the untyped AST into a typed AST while:
//!
//! - Registering classes, fields and methods in a scope arena
//! - Verifying type correctness of expressions and statements
//! - Resolving identifiers, members and calls
//! - Checking method signatures and argument types
//! - Validating the shape of the program entry point
//!
//! Scopes form a chain global → class → method and lookups walk up it.
//! The first violation found stops the analysis.

pub mod builtins;
pub mod symbol_table;
pub mod type_checker;
pub mod typed_ast;
