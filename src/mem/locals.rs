//! This module contains the local variable area of a method activation.

use std::rc::Rc;

use serde::Serialize;

use crate::{
    error::memory::{Error, Result, SlotFault},
    val::Value,
};

/// A row of a method's local variable table, which names and types a slot
/// over a range of program counters.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct LocalVariableRow {
    pub slot:       u16,
    pub start_pc:   u32,
    pub length:     u32,
    pub descriptor: String,
    pub name:       String,
}

impl LocalVariableRow {
    /// Checks if the row is in effect at program counter `pc`.
    #[must_use]
    pub fn covers(&self, pc: u32) -> bool {
        pc >= self.start_pc && u64::from(pc) < u64::from(self.start_pc) + u64::from(self.length)
    }
}

/// The local variable slots of a method activation.
///
/// Category-2 values (`long` and `double`) occupy two consecutive slots. The
/// value is stored at the lower slot, and the upper slot is left unwritten,
/// so writing a category-2 value at slot `n` invalidates whatever was in
/// slot `n + 1`. Writing over either half of a category-2 value invalidates
/// the whole value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LocalVariablesArea {
    slots: im::Vector<Option<Value>>,
    table: Rc<[LocalVariableRow]>,
}

impl LocalVariablesArea {
    /// Constructs an area of `max_locals` unwritten slots, typed by the local
    /// variable table `table` (which may be empty).
    #[must_use]
    pub fn new(max_locals: u16, table: impl Into<Rc<[LocalVariableRow]>>) -> Self {
        let slots = std::iter::repeat(None)
            .take(usize::from(max_locals))
            .collect();
        let table = table.into();
        Self { slots, table }
    }

    /// Constructs an area of `max_locals` unwritten slots without a local
    /// variable table, so that any slot accepts any value.
    #[must_use]
    pub fn without_table(max_locals: u16) -> Self {
        Self::new(max_locals, Vec::<LocalVariableRow>::new())
    }

    /// Gets the number of slots in the area.
    #[must_use]
    pub fn max_locals(&self) -> u16 {
        u16::try_from(self.slots.len()).unwrap_or(u16::MAX)
    }

    /// Gets the value at `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSlot`] if `slot` is out of range or has not
    /// been written.
    pub fn get(&self, slot: u16) -> Result<&Value> {
        match self.slots.get(usize::from(slot)) {
            None => Err(invalid(slot, SlotFault::OutOfRange)),
            Some(None) => Err(invalid(slot, SlotFault::NotWritten)),
            Some(Some(value)) => Ok(value),
        }
    }

    /// Writes `value` into `slot` while the program counter is `pc`.
    ///
    /// If the local variable table declares a type for `slot` at `pc`, the
    /// value must conform to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSlot`] if the value does not fit in the area
    /// at `slot` or has the wrong type.
    pub fn set(&mut self, slot: u16, pc: u32, value: Value) -> Result<()> {
        let index = usize::from(slot);
        if index + usize::from(value.slots()) > self.slots.len() {
            return Err(invalid(slot, SlotFault::OutOfRange));
        }

        let conforms = {
            let mut declared = self.rows_at(slot, pc).peekable();
            declared.peek().is_none() || declared.any(|row| value.conforms_to(&row.descriptor))
        };
        if !conforms {
            return Err(invalid(slot, SlotFault::WrongType));
        }

        // A category-2 value in the slot below loses its upper half.
        if let Some(below) = index.checked_sub(1) {
            if matches!(&self.slots[below], Some(previous) if !previous.is_cat_1()) {
                self.slots.set(below, None);
            }
        }
        if !value.is_cat_1() {
            self.slots.set(index + 1, None);
        }
        self.slots.set(index, Some(value));

        Ok(())
    }

    /// Initializes the area from the arguments of a call, starting at slot 0.
    /// Category-2 arguments take two slots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSlot`] if the arguments do not fit.
    pub fn set_args(&mut self, args: impl IntoIterator<Item = Value>) -> Result<()> {
        let mut slot: u16 = 0;
        for arg in args {
            let width = arg.slots();
            self.set(slot, 0, arg)?;
            slot += width;
        }
        Ok(())
    }

    /// Gets the declared descriptor of `slot` at program counter `pc`, if the
    /// local variable table has one.
    #[must_use]
    pub fn descriptor_at(&self, slot: u16, pc: u32) -> Option<&str> {
        self.rows_at(slot, pc).next().map(|row| row.descriptor.as_str())
    }

    /// Gets the declared name of `slot` at program counter `pc`, if the local
    /// variable table has one.
    #[must_use]
    pub fn name_at(&self, slot: u16, pc: u32) -> Option<&str> {
        self.rows_at(slot, pc).next().map(|row| row.name.as_str())
    }

    /// Iterates over the written slots in ascending order.
    pub fn written(&self) -> impl Iterator<Item = (u16, &Value)> {
        self.slots.iter().enumerate().filter_map(|(index, value)| {
            let slot = u16::try_from(index).ok()?;
            value.as_ref().map(|value| (slot, value))
        })
    }

    fn rows_at(&self, slot: u16, pc: u32) -> impl Iterator<Item = &LocalVariableRow> {
        self.table
            .iter()
            .filter(move |row| row.slot == slot && row.covers(pc))
    }
}

fn invalid(slot: u16, fault: SlotFault) -> Error {
    Error::InvalidSlot { slot, fault }
}

#[cfg(test)]
mod test {
    use crate::{
        error::memory::{Error, SlotFault},
        mem::locals::{LocalVariableRow, LocalVariablesArea},
        val::{Reference, Simplex, Value},
    };

    fn row(slot: u16, descriptor: &str, name: &str) -> LocalVariableRow {
        LocalVariableRow {
            slot,
            start_pc: 0,
            length: 100,
            descriptor: descriptor.into(),
            name: name.into(),
        }
    }

    #[test]
    fn two_slot_write_invalidates_next_slot() -> anyhow::Result<()> {
        let mut locals = LocalVariablesArea::without_table(4);
        locals.set(1, 0, Simplex::Int(7).into())?;
        locals.set(0, 0, Simplex::Long(9).into())?;

        assert_eq!(locals.get(0)?, &Value::from(Simplex::Long(9)));
        assert_eq!(
            locals.get(1),
            Err(Error::InvalidSlot {
                slot:  1,
                fault: SlotFault::NotWritten,
            })
        );

        Ok(())
    }

    #[test]
    fn overwriting_upper_half_invalidates_two_slot_value() -> anyhow::Result<()> {
        let mut locals = LocalVariablesArea::without_table(4);
        locals.set(0, 0, Simplex::Double(1.5).into())?;
        locals.set(1, 0, Simplex::Int(3).into())?;

        locals.get(0).expect_err("Read a torn two-slot value");
        assert_eq!(locals.get(1)?, &Value::from(Simplex::Int(3)));

        Ok(())
    }

    #[test]
    fn rejects_out_of_range_slots() {
        let mut locals = LocalVariablesArea::without_table(2);
        locals
            .set(1, 0, Simplex::Long(0).into())
            .expect_err("Wrote a two-slot value past the end");
        assert_eq!(
            locals.get(2),
            Err(Error::InvalidSlot {
                slot:  2,
                fault: SlotFault::OutOfRange,
            })
        );
    }

    #[test]
    fn checks_types_against_the_table() -> anyhow::Result<()> {
        let mut locals =
            LocalVariablesArea::new(3, vec![row(0, "I", "count"), row(1, "[J", "values")]);
        locals.set(0, 5, Simplex::Boolean(true).into())?;
        locals.set(1, 5, Reference::Null.into())?;
        locals
            .set(0, 5, Simplex::Float(1.0).into())
            .expect_err("Stored a float in an int slot");
        locals.set(2, 5, Simplex::Float(1.0).into())?;

        assert_eq!(locals.name_at(1, 5), Some("values"));
        assert_eq!(locals.descriptor_at(1, 200), None);

        Ok(())
    }

    #[test]
    fn typed_two_slot_writes_invalidate_the_next_slot() -> anyhow::Result<()> {
        let mut locals = LocalVariablesArea::new(3, vec![row(0, "J", "total")]);
        locals.set(1, 5, Simplex::Int(4).into())?;
        locals.set(0, 5, Simplex::Long(8).into())?;

        assert_eq!(locals.get(0)?, &Value::from(Simplex::Long(8)));
        assert_eq!(
            locals.get(1),
            Err(Error::InvalidSlot {
                slot:  1,
                fault: SlotFault::NotWritten,
            })
        );
        locals
            .set(0, 5, Reference::Null.into())
            .expect_err("Stored a reference in a long slot");
        assert_eq!(locals.get(0)?, &Value::from(Simplex::Long(8)));

        Ok(())
    }

    #[test]
    fn fills_arguments() -> anyhow::Result<()> {
        let mut locals = LocalVariablesArea::without_table(4);
        locals.set_args([
            Value::from(Simplex::Long(1)),
            Value::from(Reference::Null),
            Value::from(Simplex::Int(2)),
        ])?;

        let written: Vec<_> = locals.written().map(|(slot, _)| slot).collect();
        assert_eq!(written, vec![0, 2, 3]);

        Ok(())
    }
}
