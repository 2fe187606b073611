//! This module contains the symbolic execution algorithms: the multi-state
//! generator and the instruction handlers built on it.
//!
//! # Executing an Instruction
//!
//! A handler takes the state that is about to execute an instruction and
//! returns its successor states. It never changes the state it is given.
//! Instead, it works on a clone, and when the instruction reads a value that
//! needs a decision (an unresolved symbolic reference, or an array member at
//! a possibly symbolic index), it asks the generator for the feasible
//! [`crate::tree::DecisionAlternative`]s and clones the working state once
//! per alternative.
//!
//! Conditions of the analysed program never escape a handler. Malformed
//! bytecode becomes a simulated `VerifyError` in the offending state, a
//! class that cannot be resolved becomes a `NoClassDefFoundError` or an
//! `IllegalAccessError`, and runtime exceptions such as a
//! `NullPointerException` are thrown in the state that raises them. What
//! escapes is what the caller must act on: failures of the decision
//! procedure, a stop requested by the watchdog, and engine bugs.
//!
//! # The Context
//!
//! Every collaborator of the generator is gathered in one
//! [`ExecutionContext`], built once per exploration and passed to the
//! handlers by mutable reference.

pub mod generator;
pub mod handlers;
pub mod native;

use std::rc::Rc;

pub use handlers::{
    array_load,
    get_field,
    invoke_is_run_by_engine,
    invoke_native_pure,
    load_local,
    new_array,
    new_instance,
};
pub use native::{NativeFunction, NativeReflect, NativeTable, NoReflection};

use crate::{
    bc::{ClassHierarchy, Signature},
    constant::{
        DEFAULT_ARRAY_LENGTH_ASSUMPTION,
        DEFAULT_MAX_OPERAND_STACK_DEPTH,
        ILLEGAL_ACCESS_ERROR,
        NO_CLASS_DEFINITION_FOUND_ERROR,
    },
    dec::{DecisionProcedure, DynDecisionProcedure},
    error::{
        class,
        decision,
        execution::{self, unexpected},
        memory,
        value,
    },
    mem::{Frame, LocalVariableRow, LocalVariablesArea, State},
    stats::{PathOutcome, Statistics},
    trigger::{NoTriggers, TriggerManager},
    val::{types, Origin},
    watchdog::{DynWatchdog, LazyWatchdog},
};

/// What a read of a local variable slot that holds no value does.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SlotReadPolicy {
    /// The read is a verification error.
    Fail,

    /// The read yields the default value of the type the local variable
    /// table declares for the slot. Slots without a declared type still fail.
    ReturnDefault,
}

/// The configuration for an exploration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// The upper bound on the operand stack depth of every frame, applied on
    /// top of the bound the method declares.
    ///
    /// Defaults to [`DEFAULT_MAX_OPERAND_STACK_DEPTH`].
    pub max_operand_stack_depth: usize,

    /// What reading a slot that holds no value does.
    ///
    /// Defaults to [`SlotReadPolicy::Fail`].
    pub uninitialized_slot_policy: SlotReadPolicy,

    /// Whether expanding a symbolic reference to an array also assumes that
    /// the array's length is nonnegative.
    ///
    /// Defaults to [`DEFAULT_ARRAY_LENGTH_ASSUMPTION`].
    pub array_length_assumption: bool,
}

impl Config {
    /// Sets the `max_operand_stack_depth` config parameter to `value`.
    #[must_use]
    pub fn with_max_operand_stack_depth(mut self, value: usize) -> Self {
        self.max_operand_stack_depth = value;
        self
    }

    /// Sets the `uninitialized_slot_policy` config parameter to `value`.
    #[must_use]
    pub fn with_uninitialized_slot_policy(mut self, value: SlotReadPolicy) -> Self {
        self.uninitialized_slot_policy = value;
        self
    }

    /// Sets the `array_length_assumption` config parameter to `value`.
    #[must_use]
    pub fn with_array_length_assumption(mut self, value: bool) -> Self {
        self.array_length_assumption = value;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        let max_operand_stack_depth = DEFAULT_MAX_OPERAND_STACK_DEPTH;
        let uninitialized_slot_policy = SlotReadPolicy::Fail;
        let array_length_assumption = DEFAULT_ARRAY_LENGTH_ASSUMPTION;
        Self {
            max_operand_stack_depth,
            uninitialized_slot_policy,
            array_length_assumption,
        }
    }
}

/// The collaborators of one exploration.
///
/// The decision procedure is generic so that the embedder can get its
/// decorated procedure back, with whatever it recorded. Use the default
/// [`DynDecisionProcedure`] when that is not needed.
#[derive(Debug)]
pub struct ExecutionContext<D = DynDecisionProcedure>
where
    D: DecisionProcedure,
{
    /// The oracle for all feasibility queries. Its assumption stack is
    /// handed over to a state before querying on its behalf.
    decision_procedure: D,

    /// The classes of the analysed program.
    classes: Rc<dyn ClassHierarchy>,

    /// The hooks run when an alternative is taken.
    triggers: Box<dyn TriggerManager>,

    /// The concrete evaluator for native methods.
    natives: Box<dyn NativeReflect>,

    /// A watchdog that gets polled at intervals to check whether the
    /// exploration needs to stop.
    watchdog: DynWatchdog,

    config:     Config,
    statistics: Statistics,

    /// The number of feasibility queries made so far.
    queries: usize,
}

impl<D> ExecutionContext<D>
where
    D: DecisionProcedure,
{
    /// Constructs a context over `decision_procedure` and `classes`, with no
    /// triggers, no native evaluator, a watchdog that never stops and the
    /// default configuration.
    #[must_use]
    pub fn new(decision_procedure: D, classes: Rc<dyn ClassHierarchy>) -> Self {
        Self {
            decision_procedure,
            classes,
            triggers: Box::new(NoTriggers),
            natives: Box::new(NoReflection),
            watchdog: LazyWatchdog.in_rc(),
            config: Config::default(),
            statistics: Statistics::new(),
            queries: 0,
        }
    }

    /// Sets the trigger manager to `triggers`.
    #[must_use]
    pub fn with_triggers(mut self, triggers: impl TriggerManager + 'static) -> Self {
        self.triggers = Box::new(triggers);
        self
    }

    /// Sets the native evaluator to `natives`.
    #[must_use]
    pub fn with_natives(mut self, natives: impl NativeReflect + 'static) -> Self {
        self.natives = Box::new(natives);
        self
    }

    /// Sets the watchdog to `watchdog`.
    #[must_use]
    pub fn with_watchdog(mut self, watchdog: DynWatchdog) -> Self {
        self.watchdog = watchdog;
        self
    }

    /// Sets the configuration to `config`.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn decision_procedure(&self) -> &D {
        &self.decision_procedure
    }

    pub fn decision_procedure_mut(&mut self) -> &mut D {
        &mut self.decision_procedure
    }

    /// Consumes the context, returning its decision procedure.
    #[must_use]
    pub fn into_decision_procedure(self) -> D {
        self.decision_procedure
    }

    #[must_use]
    pub fn classes(&self) -> &dyn ClassHierarchy {
        self.classes.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Records that a path of the exploration ended with `outcome`.
    pub fn record_path(&mut self, outcome: PathOutcome) {
        self.statistics.record_path(outcome);
    }

    /// Builds a frame for `method`, with an operand stack bounded by both
    /// `max_stack` and the configured maximum depth.
    #[must_use]
    pub fn frame(
        &self,
        method: Signature,
        code: impl Into<Rc<[u8]>>,
        locals: LocalVariablesArea,
        max_stack: usize,
    ) -> Frame {
        let depth = max_stack.min(self.config.max_operand_stack_depth);
        Frame::new(method, code, locals, depth)
    }

    /// Builds the root state of an exploration of `method`, whose arguments
    /// (including the receiver, unless `is_static`) are fresh symbolic
    /// inputs.
    ///
    /// Each input is named after its slot in `table`, or `argN` for slot `N`
    /// when the table does not name it. The receiver is assumed not to be
    /// null, and gets no fields if its class is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the method descriptor is malformed, or if the
    /// arguments do not fit in `max_locals` slots.
    pub fn initial_state(
        &self,
        method: Signature,
        is_static: bool,
        code: impl Into<Rc<[u8]>>,
        max_locals: u16,
        table: Vec<LocalVariableRow>,
        max_stack: usize,
    ) -> memory::Result<State> {
        let mut state = State::new();
        let name_of = |slot: u16| {
            table
                .iter()
                .find(|row| row.slot == slot && row.start_pc == 0)
                .map_or_else(|| format!("arg{slot}"), |row| row.name.clone())
        };

        let mut args = Vec::new();
        let mut slot = 0;
        if !is_static {
            let receiver =
                state.create_symbol_reference(method.class_name(), Origin::root(name_of(0)));
            let address = state.assume_expands(
                &receiver,
                method.class_name(),
                &self.classes.instance_fields(method.class_name()).unwrap_or_default(),
            )?;
            tracing::trace!(%receiver, %address, "expanded the receiver");
            args.push(receiver.into());
            slot += 1;
        }
        for descriptor in types::parameter_types(method.descriptor())? {
            let arg = state.create_symbol(descriptor, Origin::root(name_of(slot)))?;
            slot += arg.slots();
            args.push(arg);
        }

        let mut locals = LocalVariablesArea::new(max_locals, table);
        locals.set_args(args)?;
        let frame = self.frame(method, code, locals, max_stack);
        state.push_frame(frame);
        Ok(state)
    }

    /// Polls the watchdog if this is the query to poll it on, and then asks
    /// the decision procedure for a verdict, recording it in the statistics.
    pub(crate) fn query(
        &mut self,
        verdict: impl FnOnce(&mut D) -> decision::Result<bool>,
    ) -> execution::Result<bool> {
        let poll_every = self.watchdog.poll_every().max(1);
        if self.queries % poll_every == 0 && self.watchdog.should_stop() {
            return Err(execution::Error::StoppedByWatchdog);
        }
        self.queries += 1;

        let feasible = verdict(&mut self.decision_procedure)?;
        if feasible {
            self.statistics.alternatives_feasible += 1;
        } else {
            self.statistics.alternatives_infeasible += 1;
        }
        Ok(feasible)
    }

    pub(crate) fn classes_rc(&self) -> Rc<dyn ClassHierarchy> {
        Rc::clone(&self.classes)
    }

    pub(crate) fn triggers_mut(&mut self) -> &mut dyn TriggerManager {
        self.triggers.as_mut()
    }

    pub(crate) fn natives(&self) -> &dyn NativeReflect {
        self.natives.as_ref()
    }

    pub(crate) fn statistics_mut(&mut self) -> &mut Statistics {
        &mut self.statistics
    }
}

/// A failure inside the execution of an instruction, before it has been
/// sorted into a condition of the analysed program or an error for the
/// caller.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Fault {
    /// A failure of the memory model, which is a verification error unless
    /// it is an engine fault.
    Memory(memory::Error),

    /// A class the instruction needs could not be resolved, which ends the
    /// path with a linkage error.
    Linkage(class::Error),

    /// An error that escapes to the caller.
    Execution(execution::Error),
}

impl Fault {
    /// Sorts the fault. Verification errors are thrown as a `VerifyError`
    /// into `state`, resolution failures as the matching linkage error, and
    /// anything else is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the fault is neither a verification error nor a
    /// resolution failure.
    pub(crate) fn settle(self, state: &mut State) -> execution::Result<()> {
        match self {
            Self::Memory(error) if !error.is_engine_fault() => {
                tracing::debug!(state = state.identifier(), %error, "verification error");
                state.throw_verify_error();
                Ok(())
            }
            Self::Memory(error) => Err(unexpected(error)),
            Self::Linkage(error) => {
                tracing::debug!(state = state.identifier(), %error, "linkage error");
                state.throw_new(linkage_error(&error));
                Ok(())
            }
            Self::Execution(error) => Err(error),
        }
    }
}

impl From<memory::Error> for Fault {
    fn from(value: memory::Error) -> Self {
        Self::Memory(value)
    }
}

impl From<value::Error> for Fault {
    fn from(value: value::Error) -> Self {
        Self::Memory(value.into())
    }
}

impl From<execution::Error> for Fault {
    fn from(value: execution::Error) -> Self {
        Self::Execution(value)
    }
}

impl From<decision::Error> for Fault {
    fn from(value: decision::Error) -> Self {
        Self::Execution(value.into())
    }
}

impl From<class::Error> for Fault {
    fn from(value: class::Error) -> Self {
        Self::Linkage(value)
    }
}

/// Gets the class of the error the program gets when resolving a class
/// fails with `error`.
fn linkage_error(error: &class::Error) -> &'static str {
    match error {
        class::Error::NotFound { .. } => NO_CLASS_DEFINITION_FOUND_ERROR,
        class::Error::NotAccessible { .. } => ILLEGAL_ACCESS_ERROR,
    }
}

/// The result type for the internals of instruction execution.
pub(crate) type FaultResult<T> = std::result::Result<T, Fault>;
