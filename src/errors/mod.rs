//! Error types and error handling for the compiler.
//!
//! This module defines the single error type shared by the type checker and
//! the code generator. It includes:
//!
//! - Error structures with source position information
//! - One variant per violated rule, plus internal compiler errors
//! - Error names and suggestions used when reporting to the user

pub mod errors;

#[cfg(test)]
mod tests;
