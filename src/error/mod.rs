//! This module contains the primary error type for the engine's interface.
//! It also re-exports the more specific error types that are
//! subsystem-specific.

pub mod class;
pub mod container;
pub mod decision;
pub mod execution;
pub mod memory;
pub mod value;

use thiserror::Error;

/// A library error with the program counter at which it occurred.
pub type LocatedError = container::Located<Error>;

/// The interface result type for the library.
///
/// Subsystems return their more-specific child error types, and these all
/// convert into [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// The interface error type for the library.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    /// Errors from building or converting values.
    #[error(transparent)]
    Value(#[from] value::Error),

    /// Errors from the memory model.
    #[error(transparent)]
    Memory(#[from] memory::Error),

    /// Errors from the decision procedure.
    #[error(transparent)]
    Decision(#[from] decision::Error),

    /// Errors from class resolution.
    #[error(transparent)]
    Class(#[from] class::Error),

    /// Errors that aborted a step of symbolic execution.
    #[error(transparent)]
    Execution(#[from] execution::Error),

    /// An unknown error, represented as a string.
    #[error("Unknown Error: {_0:?}")]
    Other(String),
}

impl Error {
    /// Constructs an unknown error with the provided `message`.
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Allow simple conversions from located execution errors by re-wrapping the
/// located error around the more general payload.
impl From<execution::LocatedError> for LocatedError {
    fn from(value: execution::LocatedError) -> Self {
        value.map(Error::from)
    }
}
