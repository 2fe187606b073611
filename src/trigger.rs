//! This module contains the port for triggers: hooks that run when the
//! generator takes an alternative, before the program counter advances.
//!
//! Triggers model instrumentation. They may change the successor state, for
//! instance to record that a structure was visited, and may keep the program
//! counter where it is so that a different piece of code runs first.

use std::{fmt::Debug, rc::Rc};

use derivative::Derivative;

use crate::{
    error::execution::Result,
    mem::State,
    tree::{AlternativeKind, DecisionAlternative},
};

/// The interface to the trigger manager consumed by the generator.
pub trait TriggerManager
where
    Self: Debug,
{
    /// Runs the triggers registered for `alternative` on the successor
    /// `state`, which is about to advance its program counter by
    /// `pc_offset`.
    ///
    /// Returns whether the program counter should advance.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if a trigger fails.
    fn run_triggers(
        &mut self,
        state: &mut State,
        alternative: &DecisionAlternative,
        pc_offset: u32,
    ) -> Result<bool>;
}

/// A trigger manager without triggers.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NoTriggers;

impl TriggerManager for NoTriggers {
    fn run_triggers(&mut self, _: &mut State, _: &DecisionAlternative, _: u32) -> Result<bool> {
        Ok(true)
    }
}

/// What the program counter should do after a trigger ran.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TriggerOutcome {
    /// Advance as usual.
    Continue,

    /// Stay at the current instruction.
    SuppressAdvance,
}

/// The action of a [`TriggerRule`].
pub type TriggerAction = Rc<dyn Fn(&mut State, &DecisionAlternative) -> Result<TriggerOutcome>>;

/// A trigger that runs on alternatives of one kind and, optionally, only on
/// expansions to one class.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct TriggerRule {
    kind:       AlternativeKind,
    class_name: Option<String>,

    #[derivative(Debug = "ignore")]
    action: TriggerAction,
}

impl TriggerRule {
    /// Constructs a rule that runs `action` on every alternative of `kind`.
    #[must_use]
    pub fn new(
        kind: AlternativeKind,
        action: impl Fn(&mut State, &DecisionAlternative) -> Result<TriggerOutcome> + 'static,
    ) -> Self {
        Self {
            kind,
            class_name: None,
            action: Rc::new(action),
        }
    }

    /// Restricts the rule to expansions to `class_name`.
    #[must_use]
    pub fn for_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// Checks if the rule applies to `alternative`.
    #[must_use]
    pub fn matches(&self, alternative: &DecisionAlternative) -> bool {
        alternative.kind() == self.kind
            && self
                .class_name
                .as_deref()
                .map_or(true, |class_name| alternative.expanded_class() == Some(class_name))
    }
}

/// A trigger manager that runs every matching rule, in registration order.
///
/// The program counter advances only if no matching rule suppressed it.
#[derive(Clone, Debug, Default)]
pub struct TriggerRules {
    rules: Vec<TriggerRule>,
}

impl TriggerRules {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `rule` after the existing ones.
    #[must_use]
    pub fn with_rule(mut self, rule: TriggerRule) -> Self {
        self.rules.push(rule);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl TriggerManager for TriggerRules {
    fn run_triggers(
        &mut self,
        state: &mut State,
        alternative: &DecisionAlternative,
        pc_offset: u32,
    ) -> Result<bool> {
        let mut advance = true;
        for rule in self.rules.iter().filter(|rule| rule.matches(alternative)) {
            tracing::trace!(%alternative, pc_offset, "running trigger");
            if (rule.action)(state, alternative)? == TriggerOutcome::SuppressAdvance {
                advance = false;
            }
        }
        Ok(advance)
    }
}
