//! This module contains a decorator that logs every call to a decision
//! procedure.

use crate::{
    dec::DecisionProcedure,
    error::decision::Result,
    mem::{Clause, Objekt},
    val::{Address, Primitive, ReferenceSymbolic},
};

/// Forwards to the wrapped procedure, logging each call and its verdict at
/// the `trace` level.
#[derive(Debug)]
pub struct Tracing<D> {
    inner: D,
}

impl<D> Tracing<D>
where
    D: DecisionProcedure,
{
    #[must_use]
    pub fn new(inner: D) -> Self {
        Self { inner }
    }

    #[must_use]
    pub fn into_inner(self) -> D {
        self.inner
    }
}

fn log_verdict(query: &str, subject: &dyn std::fmt::Display, verdict: &Result<bool>) {
    match verdict {
        Ok(sat) => tracing::trace!(query, %subject, sat, "decision procedure query"),
        Err(error) => tracing::trace!(query, %subject, %error, "decision procedure query failed"),
    }
}

impl<D> DecisionProcedure for Tracing<D>
where
    D: DecisionProcedure,
{
    fn push_assumption(&mut self, clause: Clause) -> Result<()> {
        tracing::trace!(%clause, "pushing assumption");
        self.inner.push_assumption(clause)
    }

    fn clear_assumptions(&mut self) -> Result<()> {
        tracing::trace!("clearing assumptions");
        self.inner.clear_assumptions()
    }

    fn set_assumptions(&mut self, clauses: &[Clause]) -> Result<()> {
        tracing::trace!(count = clauses.len(), "setting assumptions");
        self.inner.set_assumptions(clauses)
    }

    fn get_assumptions(&self) -> Result<Vec<Clause>> {
        self.inner.get_assumptions()
    }

    fn is_sat(&mut self, expression: &Primitive) -> Result<bool> {
        let verdict = self.inner.is_sat(expression);
        log_verdict("is_sat", expression, &verdict);
        verdict
    }

    fn is_sat_null(&mut self, reference: &ReferenceSymbolic) -> Result<bool> {
        let verdict = self.inner.is_sat_null(reference);
        log_verdict("is_sat_null", reference, &verdict);
        verdict
    }

    fn is_sat_aliases(
        &mut self,
        reference: &ReferenceSymbolic,
        address: Address,
        object: &Objekt,
    ) -> Result<bool> {
        let verdict = self.inner.is_sat_aliases(reference, address, object);
        let subject = format!("{reference} -> {address}");
        log_verdict("is_sat_aliases", &subject, &verdict);
        verdict
    }

    fn is_sat_expands(&mut self, reference: &ReferenceSymbolic, class_name: &str) -> Result<bool> {
        let verdict = self.inner.is_sat_expands(reference, class_name);
        let subject = format!("{reference} -> fresh {class_name}");
        log_verdict("is_sat_expands", &subject, &verdict);
        verdict
    }

    fn is_sat_initialized(&mut self, class_name: &str) -> Result<bool> {
        let verdict = self.inner.is_sat_initialized(class_name);
        log_verdict("is_sat_initialized", &class_name, &verdict);
        verdict
    }

    fn is_sat_not_initialized(&mut self, class_name: &str) -> Result<bool> {
        let verdict = self.inner.is_sat_not_initialized(class_name);
        log_verdict("is_sat_not_initialized", &class_name, &verdict);
        verdict
    }

    fn simplify(&mut self, expression: Primitive) -> Result<Primitive> {
        let simplified = self.inner.simplify(expression)?;
        tracing::trace!(%simplified, "simplified expression");
        Ok(simplified)
    }
}

#[cfg(test)]
mod test {
    use crate::{
        dec::{AlwaysSat, DecisionProcedure, Tracing},
        mem::Clause,
        val::Calculator,
    };

    #[test]
    fn forwards_every_call() -> anyhow::Result<()> {
        let mut procedure = Tracing::new(AlwaysSat::new());
        procedure.push_assumption(Clause::Assume(Calculator.val_boolean(true)))?;
        assert!(!procedure.is_sat(&Calculator.val_boolean(false))?);

        let inner = procedure.into_inner();
        assert_eq!(inner.get_assumptions()?.len(), 1);

        Ok(())
    }
}
