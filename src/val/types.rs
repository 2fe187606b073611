//! This module contains the primitive types of the analysed programs, and
//! helpers for working with the textual type descriptors used by class files.
//!
//! # Descriptors
//!
//! Field types are written as in class files: `I` for `int`, `J` for `long`,
//! `Ljava/lang/String;` for a class type and `[I` for an array of `int`.
//! The static type of a reference is a class name (`java/lang/String`) for
//! instance types and an array descriptor (`[I`, `[Ljava/lang/String;`) for
//! array types.

use serde::Serialize;

use crate::error::value::{Error, Result};

/// The primitive types of the analysed programs.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    /// Gets the primitive type for the descriptor character `c`, if any.
    #[must_use]
    pub fn from_descriptor_char(c: char) -> Option<Self> {
        Some(match c {
            'Z' => Self::Boolean,
            'B' => Self::Byte,
            'C' => Self::Char,
            'S' => Self::Short,
            'I' => Self::Int,
            'J' => Self::Long,
            'F' => Self::Float,
            'D' => Self::Double,
            _ => return None,
        })
    }

    /// Gets the primitive type denoted by the whole `descriptor`, if any.
    #[must_use]
    pub fn from_descriptor(descriptor: &str) -> Option<Self> {
        let mut chars = descriptor.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_descriptor_char(c),
            _ => None,
        }
    }

    /// Gets the descriptor character for this type.
    #[must_use]
    pub fn descriptor(self) -> char {
        match self {
            Self::Boolean => 'Z',
            Self::Byte => 'B',
            Self::Char => 'C',
            Self::Short => 'S',
            Self::Int => 'I',
            Self::Long => 'J',
            Self::Float => 'F',
            Self::Double => 'D',
        }
    }

    /// Checks if values of this type occupy a single local variable slot.
    #[must_use]
    pub fn is_cat_1(self) -> bool {
        !matches!(self, Self::Long | Self::Double)
    }

    /// Gets the number of local variable slots occupied by values of this
    /// type.
    #[must_use]
    pub fn slots(self) -> u16 {
        if self.is_cat_1() {
            1
        } else {
            2
        }
    }

    /// Checks if values of this type can live on the operand stack without
    /// conversion.
    #[must_use]
    pub fn is_op_stack_native(self) -> bool {
        matches!(self, Self::Int | Self::Long | Self::Float | Self::Double)
    }

    /// Gets the type that values of this type take when pushed on the operand
    /// stack.
    ///
    /// `boolean`, `byte`, `char` and `short` are widened to `int`.
    #[must_use]
    pub fn op_stack_type(self) -> Self {
        if self.is_op_stack_native() {
            self
        } else {
            Self::Int
        }
    }

    /// Checks if this is a numeric type, which is every type but `boolean`.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        self != Self::Boolean
    }

    /// Checks if this is an integral type.
    #[must_use]
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            Self::Byte | Self::Char | Self::Short | Self::Int | Self::Long
        )
    }

    /// The position of the type in the widening order, used to tell widening
    /// from narrowing conversions.
    pub(crate) fn rank(self) -> u8 {
        match self {
            Self::Boolean => 0,
            Self::Byte => 1,
            Self::Char | Self::Short => 2,
            Self::Int => 3,
            Self::Long => 4,
            Self::Float => 5,
            Self::Double => 6,
        }
    }
}

impl std::fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
        };
        write!(f, "{name}")
    }
}

/// Checks if `descriptor` denotes an array type.
#[must_use]
pub fn is_array(descriptor: &str) -> bool {
    descriptor.starts_with('[')
}

/// Checks if `descriptor` denotes a reference (class or array) type.
#[must_use]
pub fn is_reference(descriptor: &str) -> bool {
    is_array(descriptor) || (descriptor.starts_with('L') && descriptor.ends_with(';'))
}

/// Checks if `descriptor` denotes the `void` return type.
#[must_use]
pub fn is_void(descriptor: &str) -> bool {
    descriptor == "V"
}

/// Checks if `descriptor` denotes a primitive type.
#[must_use]
pub fn is_primitive(descriptor: &str) -> bool {
    PrimitiveType::from_descriptor(descriptor).is_some()
}

/// Gets the descriptor of the members of the array type `descriptor`.
///
/// Returns [`None`] if `descriptor` is not an array type.
#[must_use]
pub fn array_member_type(descriptor: &str) -> Option<&str> {
    descriptor.strip_prefix('[').filter(|member| !member.is_empty())
}

/// Converts a reference field descriptor into the static type used for
/// references: `Lfoo/Bar;` becomes `foo/Bar` and array descriptors are kept.
///
/// # Errors
///
/// Returns [`Err`] if `descriptor` does not denote a reference type.
pub fn static_type_of(descriptor: &str) -> Result<&str> {
    if is_array(descriptor) {
        Ok(descriptor)
    } else if let Some(name) = descriptor
        .strip_prefix('L')
        .and_then(|rest| rest.strip_suffix(';'))
    {
        Ok(name)
    } else {
        Err(Error::InvalidDescriptor {
            descriptor: descriptor.into(),
        })
    }
}

/// Splits the return type out of the method descriptor `descriptor`.
///
/// # Errors
///
/// Returns [`Err`] if `descriptor` is not a method descriptor.
pub fn return_type(descriptor: &str) -> Result<&str> {
    descriptor
        .strip_prefix('(')
        .and_then(|rest| rest.split_once(')'))
        .map(|(_, ret)| ret)
        .filter(|ret| !ret.is_empty())
        .ok_or_else(|| Error::InvalidDescriptor {
            descriptor: descriptor.into(),
        })
}

/// Splits the parameter descriptors out of the method descriptor
/// `descriptor`, in declaration order.
///
/// # Errors
///
/// Returns [`Err`] if `descriptor` is not a well-formed method descriptor.
pub fn parameter_types(descriptor: &str) -> Result<Vec<&str>> {
    let malformed = || Error::InvalidDescriptor {
        descriptor: descriptor.into(),
    };
    let (params, _) = descriptor
        .strip_prefix('(')
        .and_then(|rest| rest.split_once(')'))
        .ok_or_else(malformed)?;

    let mut result = Vec::new();
    let mut start = 0;
    let bytes = params.as_bytes();
    while start < bytes.len() {
        let mut end = start;
        while bytes[end] == b'[' {
            end += 1;
            if end == bytes.len() {
                return Err(malformed());
            }
        }
        if bytes[end] == b'L' {
            end += params[end..].find(';').ok_or_else(malformed)?;
        } else if PrimitiveType::from_descriptor_char(char::from(bytes[end])).is_none() {
            return Err(malformed());
        }
        end += 1;
        result.push(&params[start..end]);
        start = end;
    }

    Ok(result)
}
