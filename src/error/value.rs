//! This module contains errors pertaining to the construction and conversion
//! of values.

use thiserror::Error;

/// Errors that occur when building or converting
/// [`crate::val::Value`]s.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("A value of type {from} cannot be converted to {to}")]
    InvalidConversion { from: String, to: String },

    #[error("The operator {operator} cannot be applied to operands of type {found}")]
    InvalidOperand { operator: String, found: String },

    #[error("Expected a value of type {expected} but found one of type {found}")]
    InvalidType { expected: String, found: String },

    #[error("The value {value} cannot be passed to or returned from a native method")]
    ValueDoesNotSupportNative { value: String },

    #[error("The descriptor {descriptor:?} is malformed")]
    InvalidDescriptor { descriptor: String },
}

/// The result type for methods that may have value errors.
pub type Result<T> = std::result::Result<T, Error>;
