//! This module contains errors pertaining to the memory model: frames, local
//! variables, the operand stack, the heap and the path condition.
//!
//! Most of these describe malformed bytecode and are turned into a simulated
//! `VerifyError` by the handlers. The ones that can only be caused by the
//! engine itself are flagged by [`Error::is_engine_fault`].

use thiserror::Error;

use crate::error::value;

/// Errors that occur when operating on a [`crate::mem::State`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("Program counter {requested} is out of bounds in code of length {available}")]
    InvalidProgramCounter { requested: i64, available: usize },

    #[error("Local variable slot {slot} {fault}")]
    InvalidSlot { slot: u16, fault: SlotFault },

    #[error("The thread stack has no frames")]
    ThreadStackEmpty,

    #[error("The operand stack has no value to pop")]
    OperandStackEmpty,

    #[error("Maximum operand stack depth exceeded with request for {requested} values")]
    OperandStackDepthExceeded { requested: usize },

    #[error("No object exists at heap address {address}")]
    NoSuchObject { address: u64 },

    #[error("The object at heap address {address} is not an array")]
    NotAnArray { address: u64 },

    #[error("The object of class {class_name} has no field {field}")]
    NoSuchField { class_name: String, field: String },

    #[error("Symbolic reference {{R{id}}} has not been resolved")]
    UnresolvedReference { id: u32 },

    #[error("Symbolic reference {{R{id}}} has already been resolved")]
    AlreadyResolved { id: u32 },

    #[error("Cannot dereference the null reference")]
    NullDereference,

    #[error(transparent)]
    Value(#[from] value::Error),
}

impl Error {
    /// Checks whether this error can only result from the engine misusing the
    /// memory model, rather than from the program being analysed.
    #[must_use]
    pub fn is_engine_fault(&self) -> bool {
        matches!(
            self,
            Self::NoSuchObject { .. }
                | Self::NotAnArray { .. }
                | Self::UnresolvedReference { .. }
                | Self::AlreadyResolved { .. }
        )
    }
}

/// The ways in which an access to a local variable slot can be invalid.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SlotFault {
    /// The slot is outside the local variable area.
    OutOfRange,

    /// The slot's declared type does not accept the value.
    WrongType,

    /// The slot was never written, or was invalidated by an overlapping
    /// two-slot write.
    NotWritten,
}

impl std::fmt::Display for SlotFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::OutOfRange => "is out of range",
            Self::WrongType => "has the wrong type",
            Self::NotWritten => "was not written",
        };
        write!(f, "{text}")
    }
}

/// The result type for methods that may have memory errors.
pub type Result<T> = std::result::Result<T, Error>;
