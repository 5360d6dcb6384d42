//! Unit tests for error handling.
//!
//! This module contains tests for error types and error reporting.

use crate::errors::errors::{Error, ErrorImpl, ErrorTip};
use crate::Position;
use std::rc::Rc;

fn position() -> Position {
    Position::new(3, 7, Rc::new("test.lang".to_string()))
}

#[test]
fn test_error_creation() {
    let error = Error::new(
        ErrorImpl::UndefinedSymbol {
            symbol: "x".to_string(),
        },
        position(),
    );

    assert_eq!(error.get_error_name(), "UndefinedSymbol");
}

#[test]
fn test_error_position() {
    let error = Error::new(ErrorImpl::NoEntryPoint, position());

    assert_eq!(error.get_position().line, 3);
    assert_eq!(error.get_position().column, 7);
}

#[test]
fn test_duplicate_field_message() {
    let error = Error::new(
        ErrorImpl::DuplicateDefinition {
            kind: "Field".to_string(),
            name: "x".to_string(),
            scope: "class 'C'".to_string(),
        },
        position(),
    );

    assert_eq!(
        error.to_string(),
        "DuplicateDefinition: Field 'x' already defined in class 'C'."
    );
}

#[test]
fn test_type_mismatch_error() {
    let error = Error::new(
        ErrorImpl::TypeMismatch {
            context: "array index must be 'i'".to_string(),
            expected: "i".to_string(),
            received: "f".to_string(),
        },
        position(),
    );

    assert_eq!(error.get_error_name(), "TypeMismatch");
    assert!(error.to_string().contains("array index must be 'i'"));
}

#[test]
fn test_arity_mismatch_error() {
    let error = Error::new(
        ErrorImpl::ArityMismatch {
            function: "add".to_string(),
            expected: 2,
            received: 3,
        },
        position(),
    );

    assert_eq!(error.get_error_name(), "ArityMismatch");
    assert_eq!(
        error.get_tip().to_string(),
        "Expected 2 arguments, received 3"
    );
}

#[test]
fn test_entry_errors() {
    let multiple = Error::new(
        ErrorImpl::MultipleEntryPoints {
            first: "A.Main".to_string(),
            second: "B.Main".to_string(),
        },
        position(),
    );
    let shape = Error::new(
        ErrorImpl::InvalidEntryShape {
            class: "Program".to_string(),
            reason: "has 2 methods".to_string(),
        },
        position(),
    );

    assert_eq!(multiple.get_error_name(), "MultipleEntryPoints");
    assert_eq!(shape.get_error_name(), "InvalidEntryShape");
    assert!(!shape.is_internal());
}

#[test]
fn test_internal_error_is_distinct() {
    let error = Error::internal("unreachable node");

    assert!(error.is_internal());
    assert_eq!(error.get_error_name(), "InternalCompilerError");
    assert!(matches!(error.get_tip(), ErrorTip::None));
}

#[test]
fn test_error_tip_display() {
    let tip = ErrorTip::Suggestion("Try this instead".to_string());
    assert_eq!(tip.to_string(), "Try this instead");

    let tip = ErrorTip::None;
    assert_eq!(tip.to_string(), "");
}
