//! This module contains a decorator that counts the queries made of a
//! decision procedure.

use serde::Serialize;

use crate::{
    dec::DecisionProcedure,
    error::decision::Result,
    mem::{Clause, Objekt},
    val::{Address, Primitive, ReferenceSymbolic},
};

/// The number of queries of each kind made through a [`Counting`] decorator.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct QueryCounts {
    pub is_sat:                 usize,
    pub is_sat_null:            usize,
    pub is_sat_aliases:         usize,
    pub is_sat_expands:         usize,
    pub is_sat_initialized:     usize,
    pub is_sat_not_initialized: usize,
    pub assumption_resets:      usize,
}

impl QueryCounts {
    /// Gets the number of feasibility queries of every kind.
    #[must_use]
    pub fn total(&self) -> usize {
        self.is_sat
            + self.is_sat_null
            + self.is_sat_aliases
            + self.is_sat_expands
            + self.is_sat_initialized
            + self.is_sat_not_initialized
    }
}

/// Forwards to the wrapped procedure and counts the queries per kind.
#[derive(Debug)]
pub struct Counting<D> {
    inner:  D,
    counts: QueryCounts,
}

impl<D> Counting<D>
where
    D: DecisionProcedure,
{
    #[must_use]
    pub fn new(inner: D) -> Self {
        let counts = QueryCounts::default();
        Self { inner, counts }
    }

    #[must_use]
    pub fn counts(&self) -> QueryCounts {
        self.counts
    }

    #[must_use]
    pub fn inner(&self) -> &D {
        &self.inner
    }
}

impl<D> DecisionProcedure for Counting<D>
where
    D: DecisionProcedure,
{
    fn push_assumption(&mut self, clause: Clause) -> Result<()> {
        self.inner.push_assumption(clause)
    }

    fn clear_assumptions(&mut self) -> Result<()> {
        self.counts.assumption_resets += 1;
        self.inner.clear_assumptions()
    }

    fn get_assumptions(&self) -> Result<Vec<Clause>> {
        self.inner.get_assumptions()
    }

    fn is_sat(&mut self, expression: &Primitive) -> Result<bool> {
        self.counts.is_sat += 1;
        self.inner.is_sat(expression)
    }

    fn is_sat_null(&mut self, reference: &ReferenceSymbolic) -> Result<bool> {
        self.counts.is_sat_null += 1;
        self.inner.is_sat_null(reference)
    }

    fn is_sat_aliases(
        &mut self,
        reference: &ReferenceSymbolic,
        address: Address,
        object: &Objekt,
    ) -> Result<bool> {
        self.counts.is_sat_aliases += 1;
        self.inner.is_sat_aliases(reference, address, object)
    }

    fn is_sat_expands(&mut self, reference: &ReferenceSymbolic, class_name: &str) -> Result<bool> {
        self.counts.is_sat_expands += 1;
        self.inner.is_sat_expands(reference, class_name)
    }

    fn is_sat_initialized(&mut self, class_name: &str) -> Result<bool> {
        self.counts.is_sat_initialized += 1;
        self.inner.is_sat_initialized(class_name)
    }

    fn is_sat_not_initialized(&mut self, class_name: &str) -> Result<bool> {
        self.counts.is_sat_not_initialized += 1;
        self.inner.is_sat_not_initialized(class_name)
    }

    fn simplify(&mut self, expression: Primitive) -> Result<Primitive> {
        self.inner.simplify(expression)
    }
}

#[cfg(test)]
mod test {
    use crate::{
        dec::{AlwaysSat, Counting, DecisionProcedure},
        val::{Calculator, Origin, ReferenceSymbolic},
    };

    #[test]
    fn counts_each_kind_of_query() -> anyhow::Result<()> {
        let mut procedure = Counting::new(AlwaysSat::new());
        let reference = ReferenceSymbolic::new(0, "app/A", Origin::root("a"));

        procedure.is_sat(&Calculator.val_boolean(true))?;
        procedure.is_sat_null(&reference)?;
        procedure.is_sat_null(&reference)?;
        procedure.set_assumptions(&[])?;

        let counts = procedure.counts();
        assert_eq!(counts.is_sat, 1);
        assert_eq!(counts.is_sat_null, 2);
        assert_eq!(counts.assumption_resets, 1);
        assert_eq!(counts.total(), 3);

        Ok(())
    }
}
