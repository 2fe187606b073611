//! This module contains the port to the decision procedure: the oracle that
//! tells the generator which candidate resolutions are feasible.
//!
//! # Assumption Stack
//!
//! A decision procedure keeps a live stack of assumptions, and answers every
//! query relative to it. The generator works on many states, but there is a
//! single decision procedure per exploration. Before querying on behalf of a
//! state, the generator therefore hands the stack over to that state with
//! [`sync_with`], which replaces the stack with the state's path condition.
//!
//! # Composition
//!
//! Cross-cutting concerns are added by wrapping a procedure in a decorator,
//! such as [`Timer`], [`Tracing`] or [`Counting`]. Decorators forward every
//! call and are themselves decision procedures, so they nest freely. The
//! composed procedure is built once per exploration and owned by the
//! [`crate::algo::ExecutionContext`].

pub mod always_sat;
pub mod counting;
pub mod logging;
pub mod timer;

use std::fmt::Debug;

pub use always_sat::AlwaysSat;
pub use counting::{Counting, QueryCounts};
pub use logging::Tracing;
pub use timer::Timer;

use crate::{
    error::decision::Result,
    mem::{Clause, Objekt, State},
    val::{Address, Primitive, ReferenceSymbolic},
};

/// The interface to a decision procedure.
///
/// Every query is answered relative to the live assumption stack, and never
/// changes it. A failed query aborts only itself.
pub trait DecisionProcedure
where
    Self: Debug,
{
    /// Pushes `clause` on top of the assumption stack.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the procedure cannot represent the clause.
    fn push_assumption(&mut self, clause: Clause) -> Result<()>;

    /// Empties the assumption stack.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the procedure fails.
    fn clear_assumptions(&mut self) -> Result<()>;

    /// Replaces the assumption stack with `clauses`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the procedure cannot represent one of the clauses.
    fn set_assumptions(&mut self, clauses: &[Clause]) -> Result<()> {
        self.clear_assumptions()?;
        for clause in clauses {
            self.push_assumption(clause.clone())?;
        }
        Ok(())
    }

    /// Gets the assumption stack, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the procedure fails.
    fn get_assumptions(&self) -> Result<Vec<Clause>>;

    /// Checks if the boolean `expression` may hold.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the procedure fails to decide.
    fn is_sat(&mut self, expression: &Primitive) -> Result<bool>;

    /// Checks if `reference` may be null.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the procedure fails to decide.
    fn is_sat_null(&mut self, reference: &ReferenceSymbolic) -> Result<bool>;

    /// Checks if `reference` may point at `object`, which was at `address`
    /// in the initial heap.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the procedure fails to decide.
    fn is_sat_aliases(
        &mut self,
        reference: &ReferenceSymbolic,
        address: Address,
        object: &Objekt,
    ) -> Result<bool>;

    /// Checks if `reference` may point at a fresh object of class
    /// `class_name`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the procedure fails to decide.
    fn is_sat_expands(&mut self, reference: &ReferenceSymbolic, class_name: &str) -> Result<bool>;

    /// Checks if `class_name` may have been initialized before execution
    /// started.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the procedure fails to decide.
    fn is_sat_initialized(&mut self, class_name: &str) -> Result<bool>;

    /// Checks if `class_name` may not have been initialized before execution
    /// started.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the procedure fails to decide.
    fn is_sat_not_initialized(&mut self, class_name: &str) -> Result<bool>;

    /// Simplifies `expression` relative to the assumption stack.
    ///
    /// The default returns the expression unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the procedure fails.
    fn simplify(&mut self, expression: Primitive) -> Result<Primitive> {
        Ok(expression)
    }
}

impl<D> DecisionProcedure for Box<D>
where
    D: DecisionProcedure + ?Sized,
{
    fn push_assumption(&mut self, clause: Clause) -> Result<()> {
        (**self).push_assumption(clause)
    }

    fn clear_assumptions(&mut self) -> Result<()> {
        (**self).clear_assumptions()
    }

    fn set_assumptions(&mut self, clauses: &[Clause]) -> Result<()> {
        (**self).set_assumptions(clauses)
    }

    fn get_assumptions(&self) -> Result<Vec<Clause>> {
        (**self).get_assumptions()
    }

    fn is_sat(&mut self, expression: &Primitive) -> Result<bool> {
        (**self).is_sat(expression)
    }

    fn is_sat_null(&mut self, reference: &ReferenceSymbolic) -> Result<bool> {
        (**self).is_sat_null(reference)
    }

    fn is_sat_aliases(
        &mut self,
        reference: &ReferenceSymbolic,
        address: Address,
        object: &Objekt,
    ) -> Result<bool> {
        (**self).is_sat_aliases(reference, address, object)
    }

    fn is_sat_expands(&mut self, reference: &ReferenceSymbolic, class_name: &str) -> Result<bool> {
        (**self).is_sat_expands(reference, class_name)
    }

    fn is_sat_initialized(&mut self, class_name: &str) -> Result<bool> {
        (**self).is_sat_initialized(class_name)
    }

    fn is_sat_not_initialized(&mut self, class_name: &str) -> Result<bool> {
        (**self).is_sat_not_initialized(class_name)
    }

    fn simplify(&mut self, expression: Primitive) -> Result<Primitive> {
        (**self).simplify(expression)
    }
}

/// A dynamically dispatched [`DecisionProcedure`].
pub type DynDecisionProcedure = Box<dyn DecisionProcedure>;

/// Hands the assumption stack of `procedure` over to `state`, by replacing it
/// with the state's path condition.
///
/// # Errors
///
/// Returns [`Err`] if the procedure cannot represent one of the clauses.
pub fn sync_with(procedure: &mut (impl DecisionProcedure + ?Sized), state: &State) -> Result<()> {
    procedure.set_assumptions(&state.path_condition().to_vec())
}
