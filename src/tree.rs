//! This module contains the decision alternatives: the candidate outcomes of
//! a branching point that the generator turns into successor states.

use std::fmt::{Display, Formatter};

use derivative::Derivative;

use crate::val::{Address, Primitive, ReferenceSymbolic, Value};

/// The kinds of [`DecisionAlternative`], used to match triggers and to count
/// outcomes.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum AlternativeKind {
    Loads,
    Null,
    Aliases,
    Expands,
    OutOfRange,
}

impl Display for AlternativeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Loads => "Loads",
            Self::Null => "Null",
            Self::Aliases => "Aliases",
            Self::Expands => "Expands",
            Self::OutOfRange => "OutOfRange",
        };
        write!(f, "{name}")
    }
}

/// What a branching point decides.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Decision {
    /// The loaded value needs no resolution.
    Loads(Value),

    /// The symbolic reference is null.
    Null(ReferenceSymbolic),

    /// The symbolic reference points at the object at the address in the
    /// initial heap.
    Aliases(ReferenceSymbolic, Address),

    /// The symbolic reference points at a fresh object of the class.
    Expands(ReferenceSymbolic, String),

    /// The array index is out of bounds.
    OutOfRange,
}

/// The array access an alternative of an array load belongs to.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ArrayAccess {
    /// The condition under which the access has this outcome.
    pub guard: Primitive,

    /// The address of the accessed array.
    pub array: Address,

    /// The index of the access.
    pub index: Primitive,

    /// Whether the loaded value is a fresh symbol that must be recorded in
    /// the array when the alternative is taken.
    pub fresh: bool,
}

/// One candidate outcome of a branching point.
///
/// Alternatives of array loads also carry their [`ArrayAccess`], so that two
/// alternatives that resolve the same reference the same way under
/// different guards are distinct. The branch number only records the
/// position of the alternative in its list and takes no part in equality.
#[derive(Clone, Debug, Derivative)]
#[derivative(Eq, Hash, PartialEq)]
pub struct DecisionAlternative {
    decision: Decision,
    access:   Option<ArrayAccess>,

    #[derivative(PartialEq = "ignore", Hash = "ignore")]
    branch_number: usize,
}

impl DecisionAlternative {
    #[must_use]
    pub fn new(decision: Decision, access: Option<ArrayAccess>) -> Self {
        Self {
            decision,
            access,
            branch_number: 0,
        }
    }

    #[must_use]
    pub fn decision(&self) -> &Decision {
        &self.decision
    }

    #[must_use]
    pub fn access(&self) -> Option<&ArrayAccess> {
        self.access.as_ref()
    }

    #[must_use]
    pub fn kind(&self) -> AlternativeKind {
        match self.decision {
            Decision::Loads(_) => AlternativeKind::Loads,
            Decision::Null(_) => AlternativeKind::Null,
            Decision::Aliases(..) => AlternativeKind::Aliases,
            Decision::Expands(..) => AlternativeKind::Expands,
            Decision::OutOfRange => AlternativeKind::OutOfRange,
        }
    }

    /// Gets the class a fresh object is expanded to, for expansions.
    #[must_use]
    pub fn expanded_class(&self) -> Option<&str> {
        match &self.decision {
            Decision::Expands(_, class_name) => Some(class_name),
            _ => None,
        }
    }

    /// Gets the symbolic reference the alternative resolves, if any.
    #[must_use]
    pub fn reference(&self) -> Option<&ReferenceSymbolic> {
        match &self.decision {
            Decision::Null(reference)
            | Decision::Aliases(reference, _)
            | Decision::Expands(reference, _) => Some(reference),
            Decision::Loads(_) | Decision::OutOfRange => None,
        }
    }

    /// Checks if taking the alternative adds nothing to the path condition.
    #[must_use]
    pub fn is_trivial(&self) -> bool {
        self.reference().is_none() && self.access.as_ref().map_or(true, |a| a.guard.is_true())
    }

    /// Gets the one-based position of the alternative among its siblings.
    #[must_use]
    pub fn branch_number(&self) -> usize {
        self.branch_number
    }

    pub(crate) fn set_branch_number(&mut self, branch_number: usize) {
        self.branch_number = branch_number;
    }
}

impl Display for DecisionAlternative {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let prefix = if self.access.is_some() { "XALOAD" } else { "LOAD" };
        match &self.decision {
            Decision::Loads(value) => write!(f, "{prefix}_Loads({value})")?,
            Decision::Null(reference) => write!(f, "{prefix}_Null({reference})")?,
            Decision::Aliases(reference, address) => {
                write!(f, "{prefix}_Aliases({reference}, {address})")?;
            }
            Decision::Expands(reference, class_name) => {
                write!(f, "{prefix}_Expands({reference}, {class_name})")?;
            }
            Decision::OutOfRange => write!(f, "{prefix}_OutOfRange")?,
        }
        if let Some(access) = &self.access {
            write!(f, " when {}", access.guard)?;
        }
        Ok(())
    }
}
