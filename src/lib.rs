#![allow(clippy::module_inception)]

use std::{fmt::Display, rc::Rc};

use inkwell::context::Context;

use crate::{
    ast::ast::Program,
    compiler::compiler::{compile, Compiler, CompilerOptions},
    errors::errors::{Error, ErrorTip},
    type_checker::{type_checker::type_check, typed_ast::TypedProgram},
};

pub mod ast;
pub mod compiler;
pub mod errors;
pub mod macros;
pub mod type_checker;

/// A location in a source file, as recorded by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub file: Rc<String>,
}

impl Position {
    pub fn new(line: u32, column: u32, file: Rc<String>) -> Self {
        Position { line, column, file }
    }

    /// Placeholder for nodes built without a source, such as in tests.
    pub fn null() -> Self {
        Position::new(0, 0, Rc::new(String::from("<null>")))
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Merges the translation units and runs semantic analysis over the result.
pub fn analyze(units: Vec<Program>) -> Result<TypedProgram, Error> {
    type_check(Program::merge(units))
}

/// Runs the whole back end: merge, analysis and lowering.
///
/// Lowering only starts once analysis succeeded.
pub fn compile_program<'a>(
    units: Vec<Program>,
    context: &'a Context,
    options: &CompilerOptions,
) -> Result<Compiler<'a>, Error> {
    let program = analyze(units)?;
    compile(&program, context, options)
}

/// Renders an error for the user.
///
/// ```text
/// Error: TypeMismatch (Expected a value of type `b`)
/// condition of 'check': expected 'b', received 'i'.
/// -> main.lang:4:12
/// ```
pub fn report_error(error: &Error) -> String {
    let header = if error.is_internal() {
        format!("Error: {}", error.get_impl())
    } else if let ErrorTip::None = error.get_tip() {
        format!("Error: {}\n{}", error.get_error_name(), error.get_impl())
    } else {
        format!(
            "Error: {} ({})\n{}",
            error.get_error_name(),
            error.get_tip(),
            error.get_impl()
        )
    };

    format!("{}\n-> {}", header, error.get_position())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::{
        errors::errors::{Error, ErrorImpl},
        Position,
    };

    #[test]
    fn test_position_display() {
        let position = Position::new(12, 4, Rc::new(String::from("main.lang")));
        assert_eq!(position.to_string(), "main.lang:12:4");
        assert_eq!(Position::null().to_string(), "<null>:0:0");
    }

    #[test]
    fn test_report_error() {
        let error = Error::new(
            ErrorImpl::UndefinedSymbol {
                symbol: String::from("total"),
            },
            Position::new(3, 9, Rc::new(String::from("main.lang"))),
        );

        let report = super::report_error(&error);
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(
            lines[0],
            "Error: UndefinedSymbol (`total` must be declared before it is used)"
        );
        assert_eq!(lines[1], "'total' is not declared.");
        assert_eq!(lines[2], "-> main.lang:3:9");
    }

    #[test]
    fn test_report_internal_error() {
        let report = super::report_error(&Error::internal("no insert block"));
        assert!(report.starts_with("Error: internal compiler error: no insert block"));
    }
}
