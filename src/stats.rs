//! This module contains the statistics gathered over an exploration.

use std::fmt::{Display, Formatter};

use serde::Serialize;

/// How an explored path ended, as judged by the embedder.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PathOutcome {
    /// The path ended without violating any assertion.
    Safe,

    /// The path violated an assertion.
    Unsafe,

    /// The path left the scope of the analysis, for instance by exceeding a
    /// depth bound.
    OutOfScope,

    /// The path contradicted an assumption of the analysis.
    ViolatingAssumption,

    /// The path reached something the engine cannot handle.
    Unmanageable,
}

/// Counters for an exploration.
///
/// The generator updates the decision counters itself. The path counters
/// are updated by the embedder through [`Self::record_path`], since only the
/// embedder knows when and how a path ends.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Statistics {
    pub decision_points:            usize,
    pub alternatives_feasible:      usize,
    pub alternatives_infeasible:    usize,
    pub successors:                 usize,
    pub paths_total:                usize,
    pub paths_safe:                 usize,
    pub paths_unsafe:               usize,
    pub paths_out_of_scope:         usize,
    pub paths_violating_assumption: usize,
    pub paths_unmanageable:         usize,
}

impl Statistics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a path that ended with `outcome`.
    pub fn record_path(&mut self, outcome: PathOutcome) {
        self.paths_total += 1;
        let counter = match outcome {
            PathOutcome::Safe => &mut self.paths_safe,
            PathOutcome::Unsafe => &mut self.paths_unsafe,
            PathOutcome::OutOfScope => &mut self.paths_out_of_scope,
            PathOutcome::ViolatingAssumption => &mut self.paths_violating_assumption,
            PathOutcome::Unmanageable => &mut self.paths_unmanageable,
        };
        *counter += 1;
    }

    /// Adds the counters of `other` to these, for merging the statistics of
    /// separate explorations.
    #[must_use]
    pub fn plus(&self, other: &Self) -> Self {
        Self {
            decision_points:            self.decision_points + other.decision_points,
            alternatives_feasible:      self.alternatives_feasible + other.alternatives_feasible,
            alternatives_infeasible:    self.alternatives_infeasible
                + other.alternatives_infeasible,
            successors:                 self.successors + other.successors,
            paths_total:                self.paths_total + other.paths_total,
            paths_safe:                 self.paths_safe + other.paths_safe,
            paths_unsafe:               self.paths_unsafe + other.paths_unsafe,
            paths_out_of_scope:         self.paths_out_of_scope + other.paths_out_of_scope,
            paths_violating_assumption: self.paths_violating_assumption
                + other.paths_violating_assumption,
            paths_unmanageable:         self.paths_unmanageable + other.paths_unmanageable,
        }
    }
}

impl Display for Statistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Decision points: {} ({} feasible and {} infeasible alternatives, {} successors)",
            self.decision_points,
            self.alternatives_feasible,
            self.alternatives_infeasible,
            self.successors
        )?;
        write!(
            f,
            "Paths: {} total, {} safe, {} unsafe, {} out of scope, {} violating assumptions, {} \
             unmanageable",
            self.paths_total,
            self.paths_safe,
            self.paths_unsafe,
            self.paths_out_of_scope,
            self.paths_violating_assumption,
            self.paths_unmanageable
        )
    }
}
