//! This module contains the value algebra: the closed set of values that the
//! engine computes with.
//!
//! Every value is immutable. Symbolic atoms ([`PrimitiveSymbolic`] and
//! [`ReferenceSymbolic`]) are identified by their id alone, while everything
//! else is compared structurally. Consumers dispatch on the variants with a
//! single `match`, so adding a new kind of value is a compile-checked change.

pub mod calculator;
pub mod primitive;
pub mod reference;
pub mod types;

use std::fmt::{Display, Formatter};

pub use calculator::Calculator;
pub use primitive::{
    Conversion,
    ConversionKind,
    Expression,
    FunctionApplication,
    Operator,
    Primitive,
    PrimitiveSymbolic,
    Simplex,
};
pub use reference::{Address, Origin, Reference, ReferenceSymbolic};
pub use types::PrimitiveType;

use crate::error::value::{Error, Result};

/// A value that can be stored in a local variable, an operand stack slot, a
/// field or an array member.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Value {
    Primitive(Primitive),
    Reference(Reference),
}

impl Value {
    /// Gets the default value for a field or array member of type
    /// `descriptor`: zero for primitives and null for references.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `descriptor` is not a field descriptor.
    pub fn default_for(descriptor: &str) -> Result<Self> {
        if let Some(ty) = PrimitiveType::from_descriptor(descriptor) {
            Ok(Simplex::zero(ty).into())
        } else if types::is_reference(descriptor) {
            Ok(Reference::Null.into())
        } else {
            Err(Error::InvalidDescriptor {
                descriptor: descriptor.into(),
            })
        }
    }

    /// Checks if the value occupies a single local variable slot.
    #[must_use]
    pub fn is_cat_1(&self) -> bool {
        match self {
            Self::Primitive(primitive) => primitive.ty().is_cat_1(),
            Self::Reference(_) => true,
        }
    }

    /// Gets the number of local variable slots the value occupies.
    #[must_use]
    pub fn slots(&self) -> u16 {
        if self.is_cat_1() {
            1
        } else {
            2
        }
    }

    #[must_use]
    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            Self::Primitive(primitive) => Some(primitive),
            Self::Reference(_) => None,
        }
    }

    #[must_use]
    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Self::Reference(reference) => Some(reference),
            Self::Primitive(_) => None,
        }
    }

    /// Gets the value as a primitive.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the value is a reference.
    pub fn expect_primitive(&self) -> Result<&Primitive> {
        self.as_primitive().ok_or_else(|| Error::InvalidType {
            expected: "primitive".into(),
            found:    "reference".into(),
        })
    }

    /// Gets the value as a reference.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the value is a primitive.
    pub fn expect_reference(&self) -> Result<&Reference> {
        self.as_reference().ok_or_else(|| Error::InvalidType {
            expected: "reference".into(),
            found:    "primitive".into(),
        })
    }

    /// Checks if the value is symbolic.
    #[must_use]
    pub fn is_symbolic(&self) -> bool {
        match self {
            Self::Primitive(primitive) => primitive.is_symbolic(),
            Self::Reference(reference) => reference.is_symbolic(),
        }
    }

    /// Checks if the value may be stored in a location declared with type
    /// `descriptor`.
    ///
    /// `int` and `boolean` locations accept one another's values, as do all
    /// reference locations.
    #[must_use]
    pub fn conforms_to(&self, descriptor: &str) -> bool {
        match self {
            Self::Reference(_) => types::is_reference(descriptor),
            Self::Primitive(primitive) => {
                let Some(declared) = PrimitiveType::from_descriptor(descriptor) else {
                    return false;
                };
                let actual = primitive.ty();
                actual == declared
                    || (actual.op_stack_type() == PrimitiveType::Int
                        && declared.op_stack_type() == PrimitiveType::Int)
            }
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primitive(primitive) => primitive.fmt(f),
            Self::Reference(reference) => reference.fmt(f),
        }
    }
}

impl From<Primitive> for Value {
    fn from(value: Primitive) -> Self {
        Self::Primitive(value)
    }
}

impl From<Simplex> for Value {
    fn from(value: Simplex) -> Self {
        Self::Primitive(value.into())
    }
}

impl From<Reference> for Value {
    fn from(value: Reference) -> Self {
        Self::Reference(value)
    }
}

impl From<ReferenceSymbolic> for Value {
    fn from(value: ReferenceSymbolic) -> Self {
        Self::Reference(value.into())
    }
}
