//! This module contains the clauses that make up a path condition.

use std::fmt::{Display, Formatter};

use crate::val::{Address, Primitive, ReferenceSymbolic};

/// One assumption of a path condition.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Clause {
    /// A boolean expression is assumed to hold.
    Assume(Primitive),

    /// A symbolic reference is resolved to a fresh object of class
    /// `class_name`, stored at `address`.
    AssumeExpands {
        reference:  ReferenceSymbolic,
        address:    Address,
        class_name: String,
    },

    /// A symbolic reference is resolved to the object that was at `address`
    /// when execution started.
    AssumeAliases {
        reference: ReferenceSymbolic,
        address:   Address,
    },

    /// A symbolic reference is resolved to null.
    AssumeNull { reference: ReferenceSymbolic },

    /// A class is assumed to have been initialized before execution started.
    AssumeClassInitialized { class_name: String },

    /// A class is assumed not to have been initialized before execution
    /// started.
    AssumeClassNotInitialized { class_name: String },
}

impl Clause {
    /// Gets the symbolic reference this clause resolves, if any.
    #[must_use]
    pub fn reference(&self) -> Option<&ReferenceSymbolic> {
        match self {
            Self::AssumeExpands { reference, .. }
            | Self::AssumeAliases { reference, .. }
            | Self::AssumeNull { reference } => Some(reference),
            _ => None,
        }
    }

    /// Gets the address a resolving clause binds its reference to. Null
    /// resolutions and non-resolving clauses have none.
    #[must_use]
    pub fn address(&self) -> Option<Address> {
        match self {
            Self::AssumeExpands { address, .. } | Self::AssumeAliases { address, .. } => {
                Some(*address)
            }
            _ => None,
        }
    }
}

impl Display for Clause {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Assume(expression) => write!(f, "{expression}"),
            Self::AssumeExpands {
                reference,
                address,
                class_name,
            } => write!(f, "{reference} == {address} (fresh {class_name})"),
            Self::AssumeAliases { reference, address } => {
                write!(f, "{reference} == {address} (aliases)")
            }
            Self::AssumeNull { reference } => write!(f, "{reference} == null"),
            Self::AssumeClassInitialized { class_name } => write!(f, "pre_init({class_name})"),
            Self::AssumeClassNotInitialized { class_name } => {
                write!(f, "!pre_init({class_name})")
            }
        }
    }
}
