//! This module contains the errors that escape the multi-state generator and
//! the instruction handlers.
//!
//! Conditions that describe a flaw in the analysed program never show up
//! here. Malformed bytecode becomes a simulated `VerifyError` inside the
//! offending state, and an infeasible alternative simply produces no
//! successor. What remains are failures of the decision procedure, which
//! abandon the step in progress, and internal errors, which are engine bugs.

use std::fmt::Display;

use thiserror::Error;

use crate::error::{class, container, decision};

/// Errors that abort a step of symbolic execution.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Decision(#[from] decision::Error),

    #[error(transparent)]
    Class(#[from] class::Error),

    #[error("Cannot invoke native method {method}: {reason}")]
    CannotInvokeNative { method: String, reason: String },

    #[error("Execution was stopped by the watchdog")]
    StoppedByWatchdog,

    #[error("Internal invariant violated: {message}")]
    Internal { message: String },
}

impl Error {
    /// Checks whether the error signals a bug in the engine.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Constructs the fatal error for a broken engine-side assumption.
///
/// This is the one place where internal errors are created, so that they
/// cannot be mistaken for a condition of the analysed program.
#[must_use]
pub fn unexpected(cause: impl Display) -> Error {
    let message = cause.to_string();
    tracing::error!(%message, "internal invariant violated");
    Error::Internal { message }
}

/// An extension for results whose failure can only be an engine bug.
pub trait OrInternal<T> {
    /// Converts any error into [`Error::Internal`].
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `self` is an error.
    fn or_internal(self) -> Result<T>;
}

impl<T, E> OrInternal<T> for std::result::Result<T, E>
where
    E: Display,
{
    fn or_internal(self) -> Result<T> {
        self.map_err(unexpected)
    }
}

/// An execution error with an associated program counter.
pub type LocatedError = container::Located<Error>;

/// The result type for the unlocated internals of the generator.
pub type Result<T> = std::result::Result<T, Error>;

/// The result type for generator and handler entry points.
pub type LocatedResult<T> = std::result::Result<T, LocatedError>;

/// Make it possible to attach locations to these errors.
impl container::Locatable for Error {
    type Located = LocatedError;

    fn locate(self, program_counter: u32) -> Self::Located {
        container::Located {
            location: program_counter,
            payload:  self,
        }
    }
}
