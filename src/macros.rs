//! Utility macros for the compiler.
//!
//! This module defines helper macros used throughout the compiler:
//!
//! - `MK_ERROR!` - Creates an `Err` holding a positioned Error
//! - `MK_TYPE_MISMATCH!` - Creates an `Err` holding a TypeMismatch
//!
//! These macros reduce boilerplate in the type checker.

/// Creates an `Err(Error)` from an ErrorImpl variant and a position.
///
/// # Arguments
///
/// * `$impl` - The ErrorImpl value
/// * `$position` - The source position, cloned
///
/// # Example
///
/// ```ignore
/// return MK_ERROR!(ErrorImpl::NoEntryPoint, Position::null());
/// ```
#[macro_export]
macro_rules! MK_ERROR {
    ($impl:expr, $position:expr) => {
        Err($crate::errors::errors::Error::new($impl, $position.clone()))
    };
}

/// Creates an `Err(Error)` holding a TypeMismatch.
///
/// The expected and received values are anything implementing `Display`,
/// usually a `Type` or a plain description such as `"numeric"`.
///
/// # Arguments
///
/// * `$context` - What was being checked
/// * `$expected` - The expected type
/// * `$received` - The type that was found
/// * `$position` - The source position, cloned
///
/// # Example
///
/// ```ignore
/// return MK_TYPE_MISMATCH!("array index", Type::int(), index.ty, index.position);
/// ```
#[macro_export]
macro_rules! MK_TYPE_MISMATCH {
    ($context:expr, $expected:expr, $received:expr, $position:expr) => {
        $crate::MK_ERROR!(
            $crate::errors::errors::ErrorImpl::TypeMismatch {
                context: $context.to_string(),
                expected: $expected.to_string(),
                received: $received.to_string(),
            },
            $position
        )
    };
}
