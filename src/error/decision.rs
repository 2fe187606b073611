//! This module contains errors pertaining to the decision procedure.

use thiserror::Error;

/// Errors reported by a [`crate::dec::DecisionProcedure`].
///
/// A failure aborts only the query in progress. The owning state is left
/// untouched.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("The decision procedure failed: {message}")]
    Failure { message: String },

    #[error("The decision procedure timed out")]
    Timeout,

    #[error("The decision procedure does not support {query}")]
    Unsupported { query: String },
}

impl Error {
    /// Constructs a generic failure with the provided `message`.
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Failure { message }
    }
}

/// The result type for decision procedure queries.
pub type Result<T> = std::result::Result<T, Error>;
