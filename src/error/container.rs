//! This module contains the types used to attach a program-counter location
//! to the errors of the engine.

use std::fmt::Formatter;

use thiserror::Error;

/// An error that is localised to a particular program counter in the method
/// being executed.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct Located<E>
where
    E: Clone,
{
    /// The program counter of the current frame when the error occurred.
    pub location: u32,

    /// The error data
    pub payload: E,
}

impl<E> Located<E>
where
    E: Clone,
{
    /// Converts the payload of the located error, keeping the location.
    #[must_use]
    pub fn map<F>(self, op: impl FnOnce(E) -> F) -> Located<F>
    where
        F: Clone,
    {
        Located {
            location: self.location,
            payload:  op(self.payload),
        }
    }
}

/// Displays the error associated with the hexadecimal-encoded program counter
/// where the error occurred.
impl<E> std::fmt::Display for Located<E>
where
    E: std::fmt::Display + Clone,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[pc 0x{}]: {}",
            hex::encode(self.location.to_be_bytes()),
            self.payload
        )
    }
}

/// A trait for types that can have a program-counter location attached to
/// them.
pub trait Locatable
where
    Self: Sized,
{
    /// The return type with the attached location.
    type Located;

    /// Attach the location described by `program_counter` to the error.
    fn locate(self, program_counter: u32) -> Self::Located;
}

/// A blanket implementation that allows for attaching a location to any result.
impl<T, E> Locatable for Result<T, E>
where
    E: std::error::Error + Clone,
{
    type Located = Result<T, Located<E>>;

    fn locate(self, program_counter: u32) -> Self::Located {
        self.map_err(|e| Located {
            location: program_counter,
            payload:  e,
        })
    }
}
