use std::fmt::Display;

use inkwell::builder::BuilderError;
use thiserror::Error;

use crate::Position;

#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    /// Shorthand for an internal compiler error with no useful source position.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::new(
            ErrorImpl::InternalCompilerError {
                message: message.into(),
            },
            Position::null(),
        )
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_impl(&self) -> &ErrorImpl {
        &self.internal_error
    }

    /// True for compiler bugs, false for mistakes in the compiled program.
    pub fn is_internal(&self) -> bool {
        matches!(self.internal_error, ErrorImpl::InternalCompilerError { .. })
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::DuplicateDefinition { .. } => "DuplicateDefinition",
            ErrorImpl::UndefinedSymbol { .. } => "UndefinedSymbol",
            ErrorImpl::UndefinedMember { .. } => "UndefinedMember",
            ErrorImpl::TypeMismatch { .. } => "TypeMismatch",
            ErrorImpl::ArityMismatch { .. } => "ArityMismatch",
            ErrorImpl::NoEntryPoint => "NoEntryPoint",
            ErrorImpl::MultipleEntryPoints { .. } => "MultipleEntryPoints",
            ErrorImpl::InvalidEntryShape { .. } => "InvalidEntryShape",
            ErrorImpl::InternalCompilerError { .. } => "InternalCompilerError",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::DuplicateDefinition { name, .. } => {
                ErrorTip::Suggestion(format!("Rename one of the `{}` definitions", name))
            }
            ErrorImpl::UndefinedSymbol { symbol } => ErrorTip::Suggestion(format!(
                "`{}` must be declared before it is used",
                symbol
            )),
            ErrorImpl::UndefinedMember { member, .. } => ErrorTip::Suggestion(format!(
                "Only fields and methods of a known class can be accessed, `{}` is neither",
                member
            )),
            ErrorImpl::TypeMismatch { expected, .. } => {
                ErrorTip::Suggestion(format!("Expected a value of type `{}`", expected))
            }
            ErrorImpl::ArityMismatch {
                expected, received, ..
            } => ErrorTip::Suggestion(format!(
                "Expected {} arguments, received {}",
                expected, received
            )),
            ErrorImpl::NoEntryPoint => ErrorTip::Suggestion(String::from(
                "Mark exactly one method as the entry method",
            )),
            ErrorImpl::MultipleEntryPoints { .. } => ErrorTip::Suggestion(String::from(
                "Only one method in the whole program can be the entry method",
            )),
            ErrorImpl::InvalidEntryShape { .. } => ErrorTip::Suggestion(String::from(
                "The entry class can only contain the entry method",
            )),
            ErrorImpl::InternalCompilerError { .. } => ErrorTip::None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.get_error_name(), self.internal_error)
    }
}

impl std::error::Error for Error {}

impl From<BuilderError> for Error {
    fn from(error: BuilderError) -> Self {
        Error::internal(format!("IR builder failed: {}", error))
    }
}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    /// `kind` is one of Class, Field, Method, Parameter or Variable
    #[error("{kind} '{name}' already defined in {scope}.")]
    DuplicateDefinition {
        kind: String,
        name: String,
        scope: String,
    },
    #[error("'{symbol}' is not declared.")]
    UndefinedSymbol { symbol: String },
    #[error("type '{type_}' has no member '{member}'.")]
    UndefinedMember { type_: String, member: String },
    #[error("{context}: expected '{expected}', received '{received}'.")]
    TypeMismatch {
        context: String,
        expected: String,
        received: String,
    },
    #[error("'{function}' expects {expected} arguments but got {received}.")]
    ArityMismatch {
        function: String,
        expected: usize,
        received: usize,
    },
    #[error("no entry method found, can't execute program.")]
    NoEntryPoint,
    #[error("multiple entry methods found: '{first}' and '{second}'.")]
    MultipleEntryPoints { first: String, second: String },
    #[error("the entry class '{class}' {reason}.")]
    InvalidEntryShape { class: String, reason: String },
    #[error("internal compiler error: {message}")]
    InternalCompilerError { message: String },
}
