/// AST (Abstract Syntax Tree) module
/// Contains the tree handed over by the external parser
///
/// Submodules:
/// - ast: Program, class and function declarations
/// - expressions: Expression nodes and operators
/// - statements: Statement nodes
/// - types: Type annotations and resolved types
pub mod ast;
pub mod expressions;
pub mod statements;
pub mod types;

#[cfg(test)]
mod tests;
