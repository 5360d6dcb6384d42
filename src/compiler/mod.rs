//! Code generation module for the compiler.
//!
//! This module contains the LLVM-based code generator that lowers the typed
//! AST into LLVM IR. It handles:
//!
//! - Class structs, constructors and methods
//! - Expressions, statements and implicit conversions
//! - Runtime arrays and the C runtime used for I/O and allocation

pub mod array;
pub mod compiler;
pub mod expr;
pub mod runtime;
pub mod stmt;

#[cfg(test)]
mod tests;
