//! This module contains the path condition: the ordered assumptions made
//! along one explored path.

use crate::{
    error::memory::{Error, Result},
    mem::clause::Clause,
    val::ReferenceSymbolic,
};

/// An ordered conjunction of [`Clause`]s.
///
/// Each symbolic reference can be resolved at most once. Once a resolving
/// clause is in the path condition it is never removed or replaced.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PathCondition {
    clauses:     im::Vector<Clause>,
    resolutions: im::OrdMap<u32, usize>,
}

impl PathCondition {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `clause`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyResolved`] if `clause` resolves a reference
    /// that an earlier clause already resolved.
    pub fn push(&mut self, clause: Clause) -> Result<()> {
        if let Some(reference) = clause.reference() {
            let id = reference.id();
            if self.resolutions.contains_key(&id) {
                return Err(Error::AlreadyResolved { id });
            }
            self.resolutions.insert(id, self.clauses.len());
        }
        self.clauses.push_back(clause);
        Ok(())
    }

    /// Gets the clause that resolved `reference`, if any.
    #[must_use]
    pub fn resolution(&self, reference: &ReferenceSymbolic) -> Option<&Clause> {
        self.resolutions
            .get(&reference.id())
            .and_then(|index| self.clauses.get(*index))
    }

    #[must_use]
    pub fn is_resolved(&self, reference: &ReferenceSymbolic) -> bool {
        self.resolutions.contains_key(&reference.id())
    }

    /// Iterates over the clauses, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Clause> {
        self.clauses.iter()
    }

    /// Copies the clauses out, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Clause> {
        self.clauses.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}
