//! This module contains the activation record of a method.

use std::rc::Rc;

use crate::{
    bc::Signature,
    error::memory::{Error, Result},
    mem::{locals::LocalVariablesArea, stack::OperandStack},
    val::Value,
};

/// One method activation: the method's code, the program counter, the
/// operand stack and the local variables.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    method:   Signature,
    code:     Rc<[u8]>,
    pc:       u32,
    operands: OperandStack,
    locals:   LocalVariablesArea,
}

impl Frame {
    /// Constructs a frame for `method` positioned at the start of `code`.
    #[must_use]
    pub fn new(
        method: Signature,
        code: impl Into<Rc<[u8]>>,
        locals: LocalVariablesArea,
        max_stack_depth: usize,
    ) -> Self {
        Self {
            method,
            code: code.into(),
            pc: 0,
            operands: OperandStack::new(max_stack_depth),
            locals,
        }
    }

    #[must_use]
    pub fn method(&self) -> &Signature {
        &self.method
    }

    #[must_use]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    #[must_use]
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// Gets the code byte at the program counter plus `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProgramCounter`] if that position is outside
    /// the code.
    pub fn instruction(&self, offset: u32) -> Result<u8> {
        let position = i64::from(self.pc) + i64::from(offset);
        usize::try_from(position)
            .ok()
            .and_then(|index| self.code.get(index).copied())
            .ok_or(Error::InvalidProgramCounter {
                requested: position,
                available: self.code.len(),
            })
    }

    /// Moves the program counter to `pc`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProgramCounter`] if `pc` is outside the code,
    /// in which case the program counter is unchanged.
    pub fn set_pc(&mut self, pc: i64) -> Result<()> {
        let in_bounds = usize::try_from(pc).map_or(false, |index| index < self.code.len());
        let checked = u32::try_from(pc).ok().filter(|_| in_bounds);
        let Some(checked) = checked else {
            return Err(Error::InvalidProgramCounter {
                requested: pc,
                available: self.code.len(),
            });
        };
        self.pc = checked;
        Ok(())
    }

    /// Advances the program counter by `offset`, which may be negative.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProgramCounter`] if the target is outside the
    /// code, in which case the program counter is unchanged.
    pub fn inc_pc(&mut self, offset: i64) -> Result<()> {
        self.set_pc(i64::from(self.pc) + offset)
    }

    #[must_use]
    pub fn operands(&self) -> &OperandStack {
        &self.operands
    }

    pub fn operands_mut(&mut self) -> &mut OperandStack {
        &mut self.operands
    }

    #[must_use]
    pub fn locals(&self) -> &LocalVariablesArea {
        &self.locals
    }

    pub fn locals_mut(&mut self) -> &mut LocalVariablesArea {
        &mut self.locals
    }

    /// Writes `value` into local `slot` at the current program counter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSlot`] if the write is not allowed.
    pub fn set_local(&mut self, slot: u16, value: Value) -> Result<()> {
        self.locals.set(slot, self.pc, value)
    }
}
