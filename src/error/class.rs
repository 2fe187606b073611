//! This module contains errors pertaining to class resolution.

use thiserror::Error;

/// Errors reported by a [`crate::bc::ClassHierarchy`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("Class {class_name} was not found")]
    NotFound { class_name: String },

    #[error("Class {class_name} is not accessible from {accessor}")]
    NotAccessible { class_name: String, accessor: String },
}

/// The result type for class resolution.
pub type Result<T> = std::result::Result<T, Error>;
