//! This module contains the trivial decision procedure.

use crate::{
    dec::DecisionProcedure,
    error::decision::Result,
    mem::{Clause, Objekt},
    val::{Address, Primitive, ReferenceSymbolic},
};

/// A decision procedure that deems everything feasible, except for
/// expressions that are literally `false`.
///
/// It is sound only in the sense that it never discards a feasible
/// alternative, and is mostly useful for exploring every shape a structure
/// may take.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AlwaysSat {
    assumptions: Vec<Clause>,
}

impl AlwaysSat {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DecisionProcedure for AlwaysSat {
    fn push_assumption(&mut self, clause: Clause) -> Result<()> {
        self.assumptions.push(clause);
        Ok(())
    }

    fn clear_assumptions(&mut self) -> Result<()> {
        self.assumptions.clear();
        Ok(())
    }

    fn get_assumptions(&self) -> Result<Vec<Clause>> {
        Ok(self.assumptions.clone())
    }

    fn is_sat(&mut self, expression: &Primitive) -> Result<bool> {
        Ok(!expression.is_false())
    }

    fn is_sat_null(&mut self, _: &ReferenceSymbolic) -> Result<bool> {
        Ok(true)
    }

    fn is_sat_aliases(&mut self, _: &ReferenceSymbolic, _: Address, _: &Objekt) -> Result<bool> {
        Ok(true)
    }

    fn is_sat_expands(&mut self, _: &ReferenceSymbolic, _: &str) -> Result<bool> {
        Ok(true)
    }

    fn is_sat_initialized(&mut self, _: &str) -> Result<bool> {
        Ok(true)
    }

    fn is_sat_not_initialized(&mut self, _: &str) -> Result<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod test {
    use crate::{
        dec::{AlwaysSat, DecisionProcedure},
        val::{Calculator, Origin, ReferenceSymbolic},
    };

    #[test]
    fn only_rejects_literal_falsehood() -> anyhow::Result<()> {
        let mut procedure = AlwaysSat::new();
        let reference = ReferenceSymbolic::new(0, "app/A", Origin::root("a"));

        assert!(procedure.is_sat(&Calculator.val_boolean(true))?);
        assert!(!procedure.is_sat(&Calculator.val_boolean(false))?);
        assert!(procedure.is_sat_null(&reference)?);
        assert!(procedure.is_sat_expands(&reference, "app/A")?);

        Ok(())
    }
}
