//! This module contains a decorator that measures the time spent in a
//! decision procedure.

use std::time::{Duration, Instant};

use crate::{
    dec::DecisionProcedure,
    error::decision::Result,
    mem::{Clause, Objekt},
    val::{Address, Primitive, ReferenceSymbolic},
};

/// Forwards to the wrapped procedure and accumulates the wall-clock time
/// spent in every call, successful or not.
#[derive(Debug)]
pub struct Timer<D> {
    inner:   D,
    elapsed: Duration,
}

impl<D> Timer<D>
where
    D: DecisionProcedure,
{
    #[must_use]
    pub fn new(inner: D) -> Self {
        let elapsed = Duration::ZERO;
        Self { inner, elapsed }
    }

    /// Gets the total time spent in the wrapped procedure.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    fn timed<T>(&mut self, call: impl FnOnce(&mut D) -> T) -> T {
        let start = Instant::now();
        let result = call(&mut self.inner);
        self.elapsed += start.elapsed();
        result
    }
}

impl<D> DecisionProcedure for Timer<D>
where
    D: DecisionProcedure,
{
    fn push_assumption(&mut self, clause: Clause) -> Result<()> {
        self.timed(|inner| inner.push_assumption(clause))
    }

    fn clear_assumptions(&mut self) -> Result<()> {
        self.timed(D::clear_assumptions)
    }

    fn set_assumptions(&mut self, clauses: &[Clause]) -> Result<()> {
        self.timed(|inner| inner.set_assumptions(clauses))
    }

    fn get_assumptions(&self) -> Result<Vec<Clause>> {
        self.inner.get_assumptions()
    }

    fn is_sat(&mut self, expression: &Primitive) -> Result<bool> {
        self.timed(|inner| inner.is_sat(expression))
    }

    fn is_sat_null(&mut self, reference: &ReferenceSymbolic) -> Result<bool> {
        self.timed(|inner| inner.is_sat_null(reference))
    }

    fn is_sat_aliases(
        &mut self,
        reference: &ReferenceSymbolic,
        address: Address,
        object: &Objekt,
    ) -> Result<bool> {
        self.timed(|inner| inner.is_sat_aliases(reference, address, object))
    }

    fn is_sat_expands(&mut self, reference: &ReferenceSymbolic, class_name: &str) -> Result<bool> {
        self.timed(|inner| inner.is_sat_expands(reference, class_name))
    }

    fn is_sat_initialized(&mut self, class_name: &str) -> Result<bool> {
        self.timed(|inner| inner.is_sat_initialized(class_name))
    }

    fn is_sat_not_initialized(&mut self, class_name: &str) -> Result<bool> {
        self.timed(|inner| inner.is_sat_not_initialized(class_name))
    }

    fn simplify(&mut self, expression: Primitive) -> Result<Primitive> {
        self.timed(|inner| inner.simplify(expression))
    }
}
