//! This module contains the implementation of a frame's operand stack.

use crate::{
    error::memory::{Error, Result},
    val::Value,
};

/// The operand stack of a single method activation.
///
/// # Indexing
///
/// Indexing into this stack is zero-based, where depth 0 is the top of the
/// stack.
///
/// # Depth
///
/// The stack holds at most `max_depth` values. Every value occupies a single
/// entry, whatever its category.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OperandStack {
    data:      Vec<Value>,
    max_depth: usize,
}

impl OperandStack {
    /// Creates a new stack without any items on it, able to hold `max_depth`
    /// values.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        let data = Vec::new();
        Self { data, max_depth }
    }

    /// Pushes the provided value onto the top of the stack.
    ///
    /// # Errors
    ///
    /// If the stack cannot grow to accommodate the requested `value`.
    pub fn push(&mut self, value: Value) -> Result<()> {
        if self.data.len() + 1 > self.max_depth {
            return Err(Error::OperandStackDepthExceeded {
                requested: self.data.len() + 1,
            });
        }
        self.data.push(value);
        Ok(())
    }

    /// Pops the top value from the stack.
    ///
    /// # Errors
    ///
    /// If the stack has no item to pop.
    pub fn pop(&mut self) -> Result<Value> {
        self.data.pop().ok_or(Error::OperandStackEmpty)
    }

    /// Reads the value at the provided `depth`.
    ///
    /// # Errors
    ///
    /// If `depth` does not exist in the stack.
    pub fn read(&self, depth: usize) -> Result<&Value> {
        // Checked subtraction guards against reading below the bottom.
        let index = self
            .data
            .len()
            .checked_sub(depth + 1)
            .ok_or(Error::OperandStackEmpty)?;
        Ok(&self.data[index])
    }

    /// Duplicates the value at `depth` onto the top of the stack.
    ///
    /// # Errors
    ///
    /// If `depth` doesn't exist or the stack is full.
    pub fn dup(&mut self, depth: usize) -> Result<()> {
        let value = self.read(depth)?.clone();
        self.push(value)
    }

    /// Gets the current size of the stack.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Checks if the stack is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Gets the values on the stack from the bottom to the top.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.data
    }
}
