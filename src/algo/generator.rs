//! This module contains the multi-state generator: it decides which
//! alternatives of a branching point are feasible, and refines a state into
//! one successor per feasible alternative.
//!
//! # Lazy Initialization
//!
//! A symbolic reference stays unresolved until the first time it is loaded.
//! The load then branches over every resolution the decision procedure deems
//! feasible, in a fixed order:
//!
//! 1. **Null**, if the reference may be null.
//! 2. **Aliases**, one per object of a compatible class in the initial heap,
//!    in address order.
//! 3. **Expands**, one per concrete class the reference may point at, in the
//!    order the class hierarchy reports them.
//!
//! Aliasing is always checked against the initial heap, since a symbolic
//! reference denotes an object as it was when execution started. Every
//! candidate is checked anew against the path condition of the state being
//! decided. Verdicts are never cached across states.
//!
//! # Determinism
//!
//! Given equal states and equal answers from the decision procedure, the
//! generator produces equal successors in the same order. Symbol ids are
//! drawn from a counter in the state itself, so that nothing outside the
//! state can change them.

use crate::{
    algo::{ExecutionContext, FaultResult},
    constant::ARRAY_INDEX_OUT_OF_BOUNDS_EXCEPTION,
    dec::{sync_with, DecisionProcedure},
    error::{execution::Result, memory, value},
    mem::{AccessOutcome, Clause, State},
    tree::{ArrayAccess, Decision, DecisionAlternative},
    val::{types, Address, Origin, Primitive, Reference, ReferenceSymbolic, Value},
};

/// Decides the load of `value` in `state`.
///
/// An unresolved symbolic reference yields one alternative per feasible
/// resolution, which may be none at all. Any other value yields a single
/// [`Decision::Loads`].
///
/// # Errors
///
/// Returns [`Err`] if the decision procedure fails or if the watchdog stops
/// the exploration.
pub fn decide_load<D>(
    ctx: &mut ExecutionContext<D>,
    state: &State,
    value: Value,
) -> Result<Vec<DecisionAlternative>>
where
    D: DecisionProcedure,
{
    ctx.statistics_mut().decision_points += 1;

    let alternatives = match unresolved(state, &value) {
        Some(reference) => {
            sync_with(ctx.decision_procedure_mut(), state)?;
            reference_alternatives(ctx, state, &reference, None)?
        }
        None => vec![DecisionAlternative::new(Decision::Loads(value), None)],
    };

    tracing::debug!(
        state = state.identifier(),
        alternatives = alternatives.len(),
        "decided load"
    );
    Ok(alternatives)
}

/// Decides the read of the member at `index` of the array at `array`.
///
/// There is one alternative per feasible outcome of the access, as computed
/// by [`crate::mem::Array::get`], except that a member that is an unresolved
/// symbolic reference is replaced by its feasible resolutions under the
/// outcome's guard.
///
/// An unknown member of an array that is an input gets a fresh symbol,
/// created in `state`, which the successors record in their copy of the
/// array. An unknown member of an allocated array is the default value.
pub(crate) fn decide_array_load<D>(
    ctx: &mut ExecutionContext<D>,
    state: &mut State,
    array: Address,
    index: &Primitive,
) -> FaultResult<Vec<DecisionAlternative>>
where
    D: DecisionProcedure,
{
    ctx.statistics_mut().decision_points += 1;

    let calc = state.calculator();
    let objekt = state.get_object(array)?;
    let container = objekt.origin().cloned();
    let outcomes = objekt
        .as_array()
        .ok_or(memory::Error::NotAnArray { address: array.0 })?
        .get(calc, index)?;

    let mut alternatives = Vec::new();
    for outcome in outcomes {
        sync_with(ctx.decision_procedure_mut(), state)?;
        let guard = outcome.guard().clone();
        let feasible = ctx.query(|procedure| procedure.is_sat(&guard))?;
        tracing::trace!(%guard, feasible, "array access outcome");
        if !feasible {
            continue;
        }

        let access = |fresh| ArrayAccess {
            guard: guard.clone(),
            array,
            index: index.clone(),
            fresh,
        };
        match outcome {
            AccessOutcome::OutOfRange { .. } => {
                let decision = Decision::OutOfRange;
                alternatives.push(DecisionAlternative::new(decision, Some(access(false))));
            }
            AccessOutcome::Entry { value, .. } => {
                alternatives.extend(member_alternatives(ctx, state, value, access(false))?);
            }
            AccessOutcome::Unknown { .. } => {
                let array_data = state.get_array(array)?;
                let (value, fresh) = match &container {
                    Some(container) => {
                        let member_type = array_data.member_type().to_string();
                        let origin = Origin::array_member(container, index.clone());
                        (state.create_symbol(&member_type, origin)?, true)
                    }
                    None => (array_data.default_member()?, false),
                };
                alternatives.extend(member_alternatives(ctx, state, value, access(fresh))?);
            }
        }
    }

    tracing::debug!(
        state = state.identifier(),
        alternatives = alternatives.len(),
        "decided array load"
    );
    Ok(alternatives)
}

/// Turns `parent` into one successor per alternative, in order.
///
/// Each successor is a clone of `parent` refined by its alternative: the
/// resolution is added to its path condition, the loaded value is widened to
/// its operand stack type and pushed, the triggers run, and the program
/// counter advances by `offset` unless a trigger vetoed it. When there is
/// more than one alternative, each successor records its branch.
///
/// A verification error during refinement only makes that one successor
/// throw a `VerifyError`, and a class that cannot be resolved during an
/// expansion only makes it throw the matching linkage error.
///
/// # Errors
///
/// Returns [`Err`] if a trigger or the decision procedure fails, or on an
/// engine fault.
pub fn refine<D>(
    ctx: &mut ExecutionContext<D>,
    parent: &State,
    alternatives: Vec<DecisionAlternative>,
    offset: u32,
) -> Result<Vec<State>>
where
    D: DecisionProcedure,
{
    let branching = alternatives.len() > 1;
    let mut successors = Vec::with_capacity(alternatives.len());

    for (position, mut alternative) in alternatives.into_iter().enumerate() {
        let branch = position + 1;
        alternative.set_branch_number(branch);

        let mut successor = parent.clone();
        if branching {
            successor.add_branch(branch);
        } else {
            successor.inc_sequence();
        }

        tracing::trace!(state = successor.identifier(), %alternative, "refining");
        if let Err(fault) = apply(ctx, &mut successor, &alternative, offset) {
            fault.settle(&mut successor)?;
        }

        ctx.statistics_mut().successors += 1;
        successors.push(successor);
    }

    Ok(successors)
}

/// Widens a primitive that has no operand stack representation of its own
/// (`boolean`, `byte`, `char` or `short`) to `int`.
///
/// # Errors
///
/// Returns [`Err`] if the conversion is not supported.
pub fn widen(value: Value) -> value::Result<Value> {
    match value {
        Value::Primitive(primitive) => {
            let target = primitive.ty().op_stack_type();
            Ok(primitive.to(target)?.into())
        }
        reference @ Value::Reference(_) => Ok(reference),
    }
}

/// Gets the symbolic reference in `value` if it has not been resolved yet.
fn unresolved(state: &State, value: &Value) -> Option<ReferenceSymbolic> {
    match value {
        Value::Reference(Reference::Symbolic(reference)) if !state.is_resolved(reference) => {
            Some(reference.clone())
        }
        _ => None,
    }
}

/// Computes the feasible resolutions of `reference`. The decision procedure
/// must already hold the assumptions of `state`.
fn reference_alternatives<D>(
    ctx: &mut ExecutionContext<D>,
    state: &State,
    reference: &ReferenceSymbolic,
    access: Option<ArrayAccess>,
) -> Result<Vec<DecisionAlternative>>
where
    D: DecisionProcedure,
{
    let classes = ctx.classes_rc();
    let static_type = reference.static_type();
    let mut alternatives = Vec::new();

    let feasible = ctx.query(|procedure| procedure.is_sat_null(reference))?;
    tracing::trace!(%reference, feasible, "null candidate");
    if feasible {
        let decision = Decision::Null(reference.clone());
        alternatives.push(DecisionAlternative::new(decision, access.clone()));
    }

    for (address, objekt) in state.initial_heap().iter() {
        if !classes.is_assignable(objekt.class_name(), static_type) {
            continue;
        }
        let feasible =
            ctx.query(|procedure| procedure.is_sat_aliases(reference, address, objekt))?;
        tracing::trace!(%reference, %address, feasible, "alias candidate");
        if feasible {
            let decision = Decision::Aliases(reference.clone(), address);
            alternatives.push(DecisionAlternative::new(decision, access.clone()));
        }
    }

    // A static type that does not resolve has no expansions, but the
    // reference may still be null or an alias.
    let expansions = classes.expansion_classes(static_type).unwrap_or_else(|error| {
        tracing::debug!(%reference, %error, "no expansion candidates");
        Vec::new()
    });
    for class_name in expansions {
        let feasible = ctx.query(|procedure| procedure.is_sat_expands(reference, &class_name))?;
        tracing::trace!(%reference, class_name, feasible, "expansion candidate");
        if feasible {
            let decision = Decision::Expands(reference.clone(), class_name);
            alternatives.push(DecisionAlternative::new(decision, access.clone()));
        }
    }

    Ok(alternatives)
}

/// Computes the alternatives for reading `value` out of an array under the
/// guard of `access`.
fn member_alternatives<D>(
    ctx: &mut ExecutionContext<D>,
    state: &State,
    value: Value,
    access: ArrayAccess,
) -> Result<Vec<DecisionAlternative>>
where
    D: DecisionProcedure,
{
    match unresolved(state, &value) {
        Some(reference) => {
            let guard = Clause::Assume(access.guard.clone());
            ctx.decision_procedure_mut().push_assumption(guard)?;
            reference_alternatives(ctx, state, &reference, Some(access))
        }
        None => Ok(vec![DecisionAlternative::new(
            Decision::Loads(value),
            Some(access),
        )]),
    }
}

/// Applies `alternative` to the successor `state`.
fn apply<D>(
    ctx: &mut ExecutionContext<D>,
    state: &mut State,
    alternative: &DecisionAlternative,
    offset: u32,
) -> FaultResult<()>
where
    D: DecisionProcedure,
{
    if let Some(access) = alternative.access() {
        if !access.guard.is_true() {
            state.assume(access.guard.clone())?;
        }
    }

    let value: Value = match alternative.decision() {
        Decision::OutOfRange => {
            state.throw_new(ARRAY_INDEX_OUT_OF_BOUNDS_EXCEPTION);
            return Ok(());
        }
        Decision::Loads(value) => value.clone(),
        Decision::Null(reference) => {
            state.assume_null(reference)?;
            reference.clone().into()
        }
        Decision::Aliases(reference, address) => {
            state.assume_aliases(reference, *address)?;
            reference.clone().into()
        }
        Decision::Expands(reference, class_name) => {
            expand(ctx, state, reference, class_name)?;
            reference.clone().into()
        }
    };

    if let Some(access) = alternative.access().filter(|access| access.fresh) {
        state.array_set(access.array, access.index.clone(), value.clone())?;
    }

    state.push_operand(widen(value)?)?;
    if ctx.triggers_mut().run_triggers(state, alternative, offset)? {
        state.inc_pc(offset)?;
    }
    Ok(())
}

/// Resolves `reference` to a fresh object of `class_name`. A fresh array
/// also gets the assumption that its length is nonnegative, if configured.
fn expand<D>(
    ctx: &mut ExecutionContext<D>,
    state: &mut State,
    reference: &ReferenceSymbolic,
    class_name: &str,
) -> FaultResult<()>
where
    D: DecisionProcedure,
{
    let is_array = types::is_array(class_name);
    let fields = if is_array {
        Vec::new()
    } else {
        ctx.classes().instance_fields(class_name)?
    };
    let address = state.assume_expands(reference, class_name, &fields)?;

    if is_array && ctx.config().array_length_assumption {
        let calc = state.calculator();
        let length = state.get_array(address)?.length().clone();
        let nonnegative = calc.ge(length, calc.val_int(0))?;
        sync_with(ctx.decision_procedure_mut(), state)?;
        let nonnegative = ctx.decision_procedure_mut().simplify(nonnegative)?;
        state.assume(nonnegative)?;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use crate::{
        algo::{
            generator::{decide_array_load, decide_load, refine, widen},
            ExecutionContext,
        },
        bc::{ClassFile, ClassTable, Signature},
        constant::NO_CLASS_DEFINITION_FOUND_ERROR,
        dec::{AlwaysSat, Counting, DecisionProcedure},
        error::decision,
        mem::{Clause, Frame, LocalVariablesArea, Objekt, State, Stuck},
        tree::{AlternativeKind, Decision},
        val::{
            Address,
            Calculator,
            Origin,
            Primitive,
            PrimitiveType,
            Reference,
            ReferenceSymbolic,
            Simplex,
            Value,
        },
    };

    /// Records the assumptions it holds whenever it is asked to simplify.
    #[derive(Debug, Default)]
    struct SimplifyRecorder {
        inner:      AlwaysSat,
        simplified: Vec<Vec<Clause>>,
    }

    impl DecisionProcedure for SimplifyRecorder {
        fn push_assumption(&mut self, clause: Clause) -> decision::Result<()> {
            self.inner.push_assumption(clause)
        }

        fn clear_assumptions(&mut self) -> decision::Result<()> {
            self.inner.clear_assumptions()
        }

        fn get_assumptions(&self) -> decision::Result<Vec<Clause>> {
            self.inner.get_assumptions()
        }

        fn is_sat(&mut self, expression: &Primitive) -> decision::Result<bool> {
            self.inner.is_sat(expression)
        }

        fn is_sat_null(&mut self, reference: &ReferenceSymbolic) -> decision::Result<bool> {
            self.inner.is_sat_null(reference)
        }

        fn is_sat_aliases(
            &mut self,
            reference: &ReferenceSymbolic,
            address: Address,
            objekt: &Objekt,
        ) -> decision::Result<bool> {
            self.inner.is_sat_aliases(reference, address, objekt)
        }

        fn is_sat_expands(
            &mut self,
            reference: &ReferenceSymbolic,
            class_name: &str,
        ) -> decision::Result<bool> {
            self.inner.is_sat_expands(reference, class_name)
        }

        fn is_sat_initialized(&mut self, class_name: &str) -> decision::Result<bool> {
            self.inner.is_sat_initialized(class_name)
        }

        fn is_sat_not_initialized(&mut self, class_name: &str) -> decision::Result<bool> {
            self.inner.is_sat_not_initialized(class_name)
        }

        fn simplify(&mut self, expression: Primitive) -> decision::Result<Primitive> {
            self.simplified.push(self.inner.get_assumptions()?);
            Ok(expression)
        }
    }

    fn thrown_class(state: &State) -> Option<String> {
        let Some(Stuck::Exception(reference)) = state.stuck() else {
            return None;
        };
        let address = state.deref(reference).ok()??;
        Some(state.get_object(address).ok()?.class_name().to_string())
    }

    fn context() -> ExecutionContext<Counting<AlwaysSat>> {
        let classes = ClassTable::new()
            .with_class(ClassFile::new("app/Shape").interface())
            .with_class(ClassFile::new("app/Circle").with_interface("app/Shape"))
            .with_class(ClassFile::new("app/Square").with_interface("app/Shape"));
        ExecutionContext::new(Counting::new(AlwaysSat::new()), Rc::new(classes))
    }

    fn state() -> State {
        let mut state = State::new();
        state.push_frame(Frame::new(
            Signature::new("app/Main", "run", "()V"),
            vec![0x2a_u8, 0x2b, 0xb1],
            LocalVariablesArea::without_table(2),
            4,
        ));
        state
    }

    #[test]
    fn orders_null_aliases_then_expansions() -> anyhow::Result<()> {
        let mut ctx = context();
        let mut state = state();
        let earlier = state.create_symbol_reference("app/Shape", Origin::root("a"));
        let address = state.assume_expands(&earlier, "app/Circle", &[])?;
        let later = state.create_symbol_reference("app/Shape", Origin::root("b"));

        let alternatives = decide_load(&mut ctx, &state, later.clone().into())?;
        let kinds: Vec<_> = alternatives.iter().map(|a| a.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                AlternativeKind::Null,
                AlternativeKind::Aliases,
                AlternativeKind::Expands,
                AlternativeKind::Expands,
            ]
        );
        assert_eq!(
            alternatives[1].decision(),
            &Decision::Aliases(later.clone(), address)
        );
        assert_eq!(alternatives[2].expanded_class(), Some("app/Circle"));
        assert_eq!(alternatives[3].expanded_class(), Some("app/Square"));

        Ok(())
    }

    #[test]
    fn refinement_leaves_the_parent_untouched() -> anyhow::Result<()> {
        let mut ctx = context();
        let parent = state();
        let reference = Value::from(Simplex::Int(3));
        let alternatives = decide_load(&mut ctx, &parent, reference)?;
        let successors = refine(&mut ctx, &parent, alternatives, 1)?;

        assert_eq!(successors.len(), 1);
        assert_eq!(successors[0].pc()?, 1);
        assert_eq!(successors[0].identifier(), ".1");
        assert_eq!(successors[0].sequence(), 1);
        assert_eq!(parent.pc()?, 0);
        assert!(parent.current_frame()?.operands().is_empty());

        Ok(())
    }

    #[test]
    fn branches_record_their_number() -> anyhow::Result<()> {
        let mut ctx = context();
        let mut parent = state();
        let reference = parent.create_symbol_reference("app/Shape", Origin::root("s"));
        let alternatives = decide_load(&mut ctx, &parent, reference.into())?;
        let successors = refine(&mut ctx, &parent, alternatives, 1)?;

        let identifiers: Vec<_> = successors.iter().map(State::identifier).collect();
        assert_eq!(identifiers, vec![".1.1", ".1.2", ".1.3"]);
        assert_eq!(ctx.statistics().successors, 3);
        assert_eq!(ctx.statistics().decision_points, 1);

        Ok(())
    }

    #[test]
    fn array_expansions_assume_a_nonnegative_length() -> anyhow::Result<()> {
        let mut ctx = context();
        let mut parent = state();
        let reference = parent.create_symbol_reference("[I", Origin::root("xs"));
        let alternatives = decide_load(&mut ctx, &parent, reference.into())?;
        assert_eq!(alternatives.len(), 2);

        let successors = refine(&mut ctx, &parent, alternatives, 1)?;
        let expanded = &successors[1];
        let clauses = expanded.path_condition().to_vec();
        assert_eq!(clauses.len(), 2);
        assert!(matches!(clauses[0], Clause::AssumeExpands { .. }));
        assert_eq!(clauses[1].to_string(), "({V1} >= 0)");

        Ok(())
    }

    #[test]
    fn length_assumptions_are_simplified_under_the_successor() -> anyhow::Result<()> {
        let classes = Rc::new(ClassTable::new());
        let mut ctx = ExecutionContext::new(SimplifyRecorder::default(), classes);
        let mut parent = state();
        let reference = parent.create_symbol_reference("[I", Origin::root("xs"));
        let alternatives = decide_load(&mut ctx, &parent, reference.into())?;
        let successors = refine(&mut ctx, &parent, alternatives, 1)?;

        let simplified = &ctx.decision_procedure().simplified;
        assert_eq!(simplified.len(), 1);
        assert_eq!(simplified[0].len(), 1);
        assert!(matches!(simplified[0][0], Clause::AssumeExpands { .. }));
        assert_eq!(
            &simplified[0][..],
            &successors[1].path_condition().to_vec()[..1]
        );

        Ok(())
    }

    #[test]
    fn unresolvable_expansions_only_fail_their_own_successor() -> anyhow::Result<()> {
        let classes = ClassTable::new()
            .with_class(ClassFile::new("app/Shape").interface())
            .with_class(
                ClassFile::new("app/Circle")
                    .with_superclass("app/Gone")
                    .with_interface("app/Shape"),
            )
            .with_class(ClassFile::new("app/Square").with_interface("app/Shape"));
        let mut ctx = ExecutionContext::new(AlwaysSat::new(), Rc::new(classes));
        let mut parent = state();
        let reference = parent.create_symbol_reference("app/Shape", Origin::root("s"));
        let alternatives = decide_load(&mut ctx, &parent, reference.into())?;
        let successors = refine(&mut ctx, &parent, alternatives, 1)?;

        assert_eq!(successors.len(), 3);
        assert!(!successors[0].is_stuck());
        assert_eq!(
            thrown_class(&successors[1]).as_deref(),
            Some(NO_CLASS_DEFINITION_FOUND_ERROR)
        );
        assert!(!successors[2].is_stuck());
        assert_eq!(successors[2].pc()?, 1);

        Ok(())
    }

    #[test]
    fn unknown_static_types_may_still_be_null() -> anyhow::Result<()> {
        let mut ctx = context();
        let mut parent = state();
        let reference = parent.create_symbol_reference("ext/Unknown", Origin::root("u"));
        let alternatives = decide_load(&mut ctx, &parent, reference.into())?;

        let kinds: Vec<_> = alternatives.iter().map(|a| a.kind()).collect();
        assert_eq!(kinds, vec![AlternativeKind::Null]);

        Ok(())
    }

    #[test]
    fn symbolic_array_reads_branch_on_the_guard() -> anyhow::Result<()> {
        let mut ctx = context();
        let mut working = state();
        let reference = working.create_symbol_reference("[I", Origin::root("xs"));
        let array = working.assume_expands(&reference, "[I", &[])?;
        let index: Primitive = working
            .create_symbol_primitive(PrimitiveType::Int, Origin::root("i"))
            .into();

        let alternatives = decide_array_load(&mut ctx, &mut working, array, &index)
            .map_err(|fault| anyhow::anyhow!("{fault:?}"))?;
        let kinds: Vec<_> = alternatives.iter().map(|a| a.kind()).collect();
        assert_eq!(kinds, vec![AlternativeKind::Loads, AlternativeKind::OutOfRange]);
        assert!(alternatives[0].access().map_or(false, |access| access.fresh));

        let successors = refine(&mut ctx, &working, alternatives, 1)?;
        let member = successors[0].get_array(array)?.entries().next().cloned();
        assert!(member.map_or(false, |entry| entry.index == index));
        assert!(successors[1].is_stuck());

        Ok(())
    }

    #[test]
    fn widens_small_primitives() -> anyhow::Result<()> {
        let widened = widen(Value::from(Simplex::Boolean(true)))?;
        assert_eq!(widened, Value::from(Calculator.val_int(1)));

        let reference = Value::from(Reference::Null);
        assert_eq!(widen(reference.clone())?, reference);

        Ok(())
    }
}
