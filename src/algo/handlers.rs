//! This module contains the handlers of the instructions whose execution
//! involves the multi-state generator.
//!
//! Every handler takes the state about to execute its instruction and
//! returns the successors, leaving the given state untouched. The caller
//! dispatches on the opcode and decodes the instruction's operands. The
//! handler then pops what it consumes, pushes what it produces, and advances
//! the program counter past the instruction.

use crate::{
    algo::{
        generator,
        native,
        ExecutionContext,
        Fault,
        FaultResult,
        SlotReadPolicy,
    },
    bc::Signature,
    constant::{
        ANEWARRAY_OFFSET,
        GETX_OFFSET,
        INSTANTIATION_ERROR,
        INVOKESTATIC_OFFSET,
        NEGATIVE_ARRAY_SIZE_EXCEPTION,
        NEWARRAY_OFFSET,
        NEW_OFFSET,
        NULL_POINTER_EXCEPTION,
        XALOAD_OFFSET,
    },
    dec::{sync_with, DecisionProcedure},
    error::{
        container::Locatable,
        execution::LocatedResult,
        memory::{self, SlotFault},
        value,
    },
    mem::State,
    tree::DecisionAlternative,
    val::{types, Primitive, PrimitiveType, Reference, Value},
};

/// What the body of a handler produced.
enum Outcome {
    /// The instruction read a value that needs a decision. The generator
    /// refines the working state once per alternative.
    Decided(Vec<DecisionAlternative>),

    /// The body produced the successors itself.
    Forked(Vec<State>),

    /// The working state is the only successor.
    Done,
}

/// Runs `body` on a clone of `state` and turns its outcome into successors.
///
/// A verification error in the body makes the only successor throw a
/// `VerifyError`. Errors for the caller are located at the program counter
/// of the instruction.
fn execute<D, F>(
    ctx: &mut ExecutionContext<D>,
    state: &State,
    offset: u32,
    body: F,
) -> LocatedResult<Vec<State>>
where
    D: DecisionProcedure,
    F: FnOnce(&mut ExecutionContext<D>, &mut State) -> FaultResult<Outcome>,
{
    let location = state.pc().unwrap_or_default();
    let mut working = state.clone();

    let successors = match body(ctx, &mut working) {
        Ok(Outcome::Decided(alternatives)) => {
            generator::refine(ctx, &working, alternatives, offset)
        }
        Ok(Outcome::Forked(successors)) => Ok(successors),
        Ok(Outcome::Done) => {
            working.inc_sequence();
            ctx.statistics_mut().successors += 1;
            Ok(vec![working])
        }
        Err(fault) => {
            let mut failed = state.clone();
            fault.settle(&mut failed).map(|()| {
                failed.inc_sequence();
                ctx.statistics_mut().successors += 1;
                vec![failed]
            })
        }
    };

    successors.locate(location)
}

/// Executes a load of local variable `slot` (`iload`, `aload_0`, ...), whose
/// encoding is `offset` bytes long.
///
/// Reading a slot that holds no value is governed by the configured
/// [`SlotReadPolicy`].
///
/// # Errors
///
/// Returns [`Err`] if the decision procedure fails, the watchdog stops the
/// exploration, or the engine hits a bug.
pub fn load_local<D>(
    ctx: &mut ExecutionContext<D>,
    state: &State,
    slot: u16,
    offset: u32,
) -> LocatedResult<Vec<State>>
where
    D: DecisionProcedure,
{
    execute(ctx, state, offset, |ctx, state| {
        let value = read_local(state, slot, ctx.config().uninitialized_slot_policy)?;
        let alternatives = generator::decide_load(ctx, state, value)?;
        Ok(Outcome::Decided(alternatives))
    })
}

/// Executes `getfield` for the field called `field_name`.
///
/// A null receiver throws a `NullPointerException`.
///
/// # Errors
///
/// Returns [`Err`] if the decision procedure fails, the watchdog stops the
/// exploration, or the engine hits a bug.
pub fn get_field<D>(
    ctx: &mut ExecutionContext<D>,
    state: &State,
    field_name: &str,
) -> LocatedResult<Vec<State>>
where
    D: DecisionProcedure,
{
    execute(ctx, state, GETX_OFFSET, |ctx, state| {
        let reference = state.pop_operand()?.expect_reference()?.clone();
        let Some(address) = state.deref(&reference)? else {
            state.throw_new(NULL_POINTER_EXCEPTION);
            return Ok(Outcome::Done);
        };

        let value = state.get_object(address)?.get_field(field_name)?.clone();
        let alternatives = generator::decide_load(ctx, state, value)?;
        Ok(Outcome::Decided(alternatives))
    })
}

/// Executes an array load (`iaload`, `aaload`, ...).
///
/// A null array throws a `NullPointerException`, and an index that may be
/// out of bounds yields a successor throwing an
/// `ArrayIndexOutOfBoundsException`.
///
/// # Errors
///
/// Returns [`Err`] if the decision procedure fails, the watchdog stops the
/// exploration, or the engine hits a bug.
pub fn array_load<D>(ctx: &mut ExecutionContext<D>, state: &State) -> LocatedResult<Vec<State>>
where
    D: DecisionProcedure,
{
    execute(ctx, state, XALOAD_OFFSET, |ctx, state| {
        let index = state.pop_operand()?.expect_primitive()?.clone();
        expect_int(&index)?;
        let reference = state.pop_operand()?.expect_reference()?.clone();
        let Some(address) = state.deref(&reference)? else {
            state.throw_new(NULL_POINTER_EXCEPTION);
            return Ok(Outcome::Done);
        };

        let objekt = state.get_object(address)?;
        if objekt.as_array().is_none() {
            let found = objekt.class_name().to_string();
            let expected = "array".to_string();
            return Err(value::Error::InvalidType { expected, found }.into());
        }

        let alternatives = generator::decide_array_load(ctx, state, address, &index)?;
        Ok(Outcome::Decided(alternatives))
    })
}

/// Executes `new` for the class called `class_name`.
///
/// The class is resolved on behalf of the class of the current method. An
/// unknown class throws a `NoClassDefFoundError`, an inaccessible one an
/// `IllegalAccessError`, and an abstract class or interface an
/// `InstantiationError`.
///
/// Static initializers are not run. Instead, unless the path condition
/// already says whether the class was initialized before execution started,
/// the successor assumes that it was if that is feasible, and that it was
/// not otherwise. If neither is feasible there is no successor.
///
/// # Errors
///
/// Returns [`Err`] if the decision procedure fails, the watchdog stops the
/// exploration, or the engine hits a bug.
pub fn new_instance<D>(
    ctx: &mut ExecutionContext<D>,
    state: &State,
    class_name: &str,
) -> LocatedResult<Vec<State>>
where
    D: DecisionProcedure,
{
    execute(ctx, state, NEW_OFFSET, |ctx, state| {
        let accessor = state.current_frame()?.method().class_name().to_string();
        let classes = ctx.classes_rc();
        let class = classes.resolve_class(&accessor, class_name)?;
        if !class.is_concrete() {
            state.throw_new(INSTANTIATION_ERROR);
            return Ok(Outcome::Done);
        }
        let fields = classes.instance_fields(class_name)?;

        if state.class_initialization(class_name).is_none() {
            sync_with(ctx.decision_procedure_mut(), state)?;
            if ctx.query(|procedure| procedure.is_sat_initialized(class_name))? {
                state.assume_class_initialized(class_name)?;
            } else if ctx.query(|procedure| procedure.is_sat_not_initialized(class_name))? {
                state.assume_class_not_initialized(class_name)?;
            } else {
                tracing::debug!(class_name, "class initialization is infeasible both ways");
                return Ok(Outcome::Forked(Vec::new()));
            }
        }

        let address = state.create_instance(class_name, &fields)?;
        state.push_operand(Reference::from(address).into())?;
        state.inc_pc(NEW_OFFSET)?;
        Ok(Outcome::Done)
    })
}

/// Executes `newarray` or `anewarray` for an array whose members have the
/// type `member_type`, given as a field descriptor.
///
/// A negative length throws a `NegativeArraySizeException`. A symbolic
/// length forks into one successor assuming it is negative and one assuming
/// it is not, keeping those that are feasible.
///
/// # Errors
///
/// Returns [`Err`] if the decision procedure fails, the watchdog stops the
/// exploration, or the engine hits a bug.
pub fn new_array<D>(
    ctx: &mut ExecutionContext<D>,
    state: &State,
    member_type: &str,
) -> LocatedResult<Vec<State>>
where
    D: DecisionProcedure,
{
    let offset = if types::is_primitive(member_type) {
        NEWARRAY_OFFSET
    } else {
        ANEWARRAY_OFFSET
    };
    let class_name = format!("[{member_type}");

    execute(ctx, state, offset, |ctx, state| {
        let length = state.pop_operand()?.expect_primitive()?.clone();
        expect_int(&length)?;

        if let Some(length) = length.as_simplex() {
            if length.as_i64().map_or(false, |length| length < 0) {
                state.throw_new(NEGATIVE_ARRAY_SIZE_EXCEPTION);
            } else {
                allocate_array(state, &class_name, (*length).into(), offset)?;
            }
            return Ok(Outcome::Done);
        }

        ctx.statistics_mut().decision_points += 1;
        sync_with(ctx.decision_procedure_mut(), state)?;
        let calc = state.calculator();
        let negative = calc.lt(length.clone(), calc.val_int(0))?;
        let nonnegative = calc.ge(length.clone(), calc.val_int(0))?;

        let mut successors = Vec::new();
        if ctx.query(|procedure| procedure.is_sat(&negative))? {
            let mut thrown = state.clone();
            match thrown.assume(negative) {
                Ok(()) => {
                    thrown.throw_new(NEGATIVE_ARRAY_SIZE_EXCEPTION);
                }
                Err(error) => Fault::from(error).settle(&mut thrown)?,
            }
            successors.push(thrown);
        }
        if ctx.query(|procedure| procedure.is_sat(&nonnegative))? {
            let mut allocated = state.clone();
            let result = allocated
                .assume(nonnegative)
                .map_err(Fault::from)
                .and_then(|()| allocate_array(&mut allocated, &class_name, length, offset));
            if let Err(fault) = result {
                fault.settle(&mut allocated)?;
            }
            successors.push(allocated);
        }

        let branching = successors.len() > 1;
        for (position, successor) in successors.iter_mut().enumerate() {
            if branching {
                successor.add_branch(position + 1);
            } else {
                successor.inc_sequence();
            }
        }
        ctx.statistics_mut().successors += successors.len();
        tracing::debug!(successors = successors.len(), "decided array length");

        Ok(Outcome::Forked(successors))
    })
}

/// Executes an invocation of the native `method`, which is known to be pure,
/// through the fallback of [`native::invoke_pure`]. The invocation
/// instruction is `offset` bytes long.
///
/// # Errors
///
/// Returns [`Err`] if the native method cannot be handled, or the engine hits
/// a bug.
pub fn invoke_native_pure<D>(
    ctx: &mut ExecutionContext<D>,
    state: &State,
    method: &Signature,
    is_static: bool,
    offset: u32,
) -> LocatedResult<Vec<State>>
where
    D: DecisionProcedure,
{
    execute(ctx, state, offset, |ctx, state| {
        let parameters = types::parameter_types(method.descriptor())?.len();
        let mut args = state.pop_operands(parameters + usize::from(!is_static))?;
        if !is_static {
            args.remove(0).expect_reference()?;
        }

        let result = native::invoke_pure(ctx.natives(), state.calculator(), method, &args)?;
        if let Some(value) = result {
            state.push_operand(generator::widen(value)?)?;
        }
        state.inc_pc(offset)?;
        Ok(Outcome::Done)
    })
}

/// Executes an invocation of the static method that tells a program whether
/// it is being run by this engine, which always returns `true`.
///
/// # Errors
///
/// Returns [`Err`] only if the engine hits a bug.
pub fn invoke_is_run_by_engine<D>(
    ctx: &mut ExecutionContext<D>,
    state: &State,
) -> LocatedResult<Vec<State>>
where
    D: DecisionProcedure,
{
    execute(ctx, state, INVOKESTATIC_OFFSET, |_, state| {
        let calc = state.calculator();
        state.push_operand(calc.val_int(1).into())?;
        state.inc_pc(INVOKESTATIC_OFFSET)?;
        Ok(Outcome::Done)
    })
}

/// Reads local `slot` of the current frame under `policy`.
fn read_local(state: &State, slot: u16, policy: SlotReadPolicy) -> FaultResult<Value> {
    match state.get_local(slot) {
        Ok(value) => Ok(value.clone()),
        Err(
            error @ memory::Error::InvalidSlot {
                fault: SlotFault::NotWritten,
                ..
            },
        ) if policy == SlotReadPolicy::ReturnDefault => {
            let frame = state.current_frame()?;
            let descriptor = frame.locals().descriptor_at(slot, frame.pc()).ok_or(error)?;
            Ok(Value::default_for(descriptor)?)
        }
        Err(error) => Err(error.into()),
    }
}

fn expect_int(primitive: &Primitive) -> value::Result<()> {
    if primitive.ty() == PrimitiveType::Int {
        Ok(())
    } else {
        Err(value::Error::InvalidType {
            expected: PrimitiveType::Int.to_string(),
            found:    primitive.ty().to_string(),
        })
    }
}

fn allocate_array(
    state: &mut State,
    class_name: &str,
    length: Primitive,
    offset: u32,
) -> FaultResult<()> {
    let address = state.create_array(class_name, length);
    state.push_operand(Reference::from(address).into())?;
    state.inc_pc(offset)?;
    Ok(())
}

/// Gets the error thrown when resolving a class fails with `error`.
#[cfg(test)]
mod test {
    use std::rc::Rc;

    use crate::{
        algo::{
            array_load,
            get_field,
            invoke_is_run_by_engine,
            invoke_native_pure,
            load_local,
            new_array,
            new_instance,
            Config,
            ExecutionContext,
            NativeTable,
            SlotReadPolicy,
        },
        bc::{ClassFile, ClassTable, Signature},
        constant::{
            ARRAY_INDEX_OUT_OF_BOUNDS_EXCEPTION,
            ILLEGAL_ACCESS_ERROR,
            INSTANTIATION_ERROR,
            NEGATIVE_ARRAY_SIZE_EXCEPTION,
            NO_CLASS_DEFINITION_FOUND_ERROR,
            NULL_POINTER_EXCEPTION,
            VERIFY_ERROR,
            XLOAD_N_OFFSET,
            XLOAD_OFFSET,
        },
        dec::AlwaysSat,
        mem::{Clause, Frame, LocalVariableRow, LocalVariablesArea, State, Stuck},
        val::{Origin, Primitive, PrimitiveType, Reference, Simplex, Value},
    };

    fn context() -> ExecutionContext<AlwaysSat> {
        let classes = ClassTable::new()
            .with_class(ClassFile::new("app/Main"))
            .with_class(ClassFile::new("app/Node").with_field("next", "Lapp/Node;"))
            .with_class(ClassFile::new("app/Shape").interface())
            .with_class(ClassFile::new("lib/Hidden").package_private());
        ExecutionContext::new(AlwaysSat::new(), Rc::new(classes))
    }

    fn state_with(locals: LocalVariablesArea) -> State {
        let mut state = State::new();
        state.push_frame(Frame::new(
            Signature::new("app/Main", "run", "()V"),
            vec![0_u8; 8],
            locals,
            4,
        ));
        state
    }

    fn state() -> State {
        state_with(LocalVariablesArea::without_table(4))
    }

    /// Gets the class of the exception `state` threw, if any.
    fn thrown(state: &State) -> Option<String> {
        let Some(Stuck::Exception(reference)) = state.stuck() else {
            return None;
        };
        let address = state.deref(reference).ok()??;
        Some(state.get_object(address).ok()?.class_name().to_string())
    }

    #[test]
    fn loads_concrete_locals_without_branching() -> anyhow::Result<()> {
        let mut ctx = context();
        let mut state = state();
        state.set_local(1, Simplex::Int(7).into())?;

        let successors = load_local(&mut ctx, &state, 1, XLOAD_OFFSET)?;
        assert_eq!(successors.len(), 1);
        assert_eq!(successors[0].pc()?, 2);
        assert_eq!(successors[0].identifier(), ".1");
        assert_eq!(
            successors[0].current_frame()?.operands().values(),
            &[Value::from(Simplex::Int(7))]
        );

        Ok(())
    }

    #[test]
    fn reading_an_unwritten_slot_is_a_verification_error() -> anyhow::Result<()> {
        let mut ctx = context();
        let successors = load_local(&mut ctx, &state(), 3, XLOAD_OFFSET)?;

        assert_eq!(successors.len(), 1);
        assert_eq!(thrown(&successors[0]).as_deref(), Some(VERIFY_ERROR));

        Ok(())
    }

    #[test]
    fn unwritten_slots_may_read_as_their_default() -> anyhow::Result<()> {
        let config =
            Config::default().with_uninitialized_slot_policy(SlotReadPolicy::ReturnDefault);
        let mut ctx = context().with_config(config);
        let table = vec![LocalVariableRow {
            slot:       0,
            start_pc:   0,
            length:     8,
            descriptor: "J".into(),
            name:       "total".into(),
        }];
        let state = state_with(LocalVariablesArea::new(2, table));

        let successors = load_local(&mut ctx, &state, 0, XLOAD_N_OFFSET)?;
        assert!(!successors[0].is_stuck());
        assert_eq!(
            successors[0].current_frame()?.operands().values(),
            &[Value::from(Simplex::Long(0))]
        );

        Ok(())
    }

    #[test]
    fn field_loads_resolve_symbolic_fields() -> anyhow::Result<()> {
        let mut ctx = context();
        let mut state = state();
        let node = state.create_symbol_reference("app/Node", Origin::root("node"));
        let fields = ctx.classes().instance_fields("app/Node")?;
        state.assume_expands(&node, "app/Node", &fields)?;
        state.push_operand(node.into())?;

        let successors = get_field(&mut ctx, &state, "next")?;
        let kinds: Vec<_> = successors
            .iter()
            .map(|s| s.path_condition().to_vec().last().cloned())
            .collect();
        assert_eq!(successors.len(), 3);
        assert!(matches!(kinds[0], Some(Clause::AssumeNull { .. })));
        assert!(matches!(kinds[1], Some(Clause::AssumeAliases { .. })));
        assert!(matches!(kinds[2], Some(Clause::AssumeExpands { .. })));
        assert!(successors.iter().all(|s| s.pc().ok() == Some(3)));

        Ok(())
    }

    #[test]
    fn field_loads_from_null_throw() -> anyhow::Result<()> {
        let mut ctx = context();
        let mut state = state();
        state.push_operand(Reference::Null.into())?;

        let successors = get_field(&mut ctx, &state, "next")?;
        assert_eq!(thrown(&successors[0]).as_deref(), Some(NULL_POINTER_EXCEPTION));

        Ok(())
    }

    #[test]
    fn array_loads_may_be_out_of_bounds() -> anyhow::Result<()> {
        let mut ctx = context();
        let mut state = state();
        let array = state.create_array("[I", Simplex::Int(2).into());
        state.push_operand(Reference::from(array).into())?;
        let index = state.create_symbol_primitive(PrimitiveType::Int, Origin::root("i"));
        state.push_operand(Value::from(Primitive::from(index)))?;

        let successors = array_load(&mut ctx, &state)?;
        assert_eq!(successors.len(), 2);
        assert_eq!(
            successors[0].current_frame()?.operands().values(),
            &[Value::from(Simplex::Int(0))]
        );
        assert_eq!(
            thrown(&successors[1]).as_deref(),
            Some(ARRAY_INDEX_OUT_OF_BOUNDS_EXCEPTION)
        );

        Ok(())
    }

    #[test]
    fn instantiation_respects_resolution() -> anyhow::Result<()> {
        let mut ctx = context();
        let state = state();

        let created = new_instance(&mut ctx, &state, "app/Node")?;
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].pc()?, 3);
        assert_eq!(created[0].class_initialization("app/Node"), Some(true));
        assert_eq!(created[0].heap().len(), 1);

        let missing = new_instance(&mut ctx, &state, "app/Missing")?;
        assert_eq!(
            thrown(&missing[0]).as_deref(),
            Some(NO_CLASS_DEFINITION_FOUND_ERROR)
        );
        let hidden = new_instance(&mut ctx, &state, "lib/Hidden")?;
        assert_eq!(thrown(&hidden[0]).as_deref(), Some(ILLEGAL_ACCESS_ERROR));
        let abstraction = new_instance(&mut ctx, &state, "app/Shape")?;
        assert_eq!(thrown(&abstraction[0]).as_deref(), Some(INSTANTIATION_ERROR));

        Ok(())
    }

    #[test]
    fn symbolic_array_lengths_fork() -> anyhow::Result<()> {
        let mut ctx = context();
        let mut state = state();
        let length = state.create_symbol_primitive(PrimitiveType::Int, Origin::root("n"));
        state.push_operand(Value::from(Primitive::from(length)))?;

        let successors = new_array(&mut ctx, &state, "I")?;
        assert_eq!(successors.len(), 2);
        assert_eq!(successors[0].identifier(), ".1.1");
        assert_eq!(
            thrown(&successors[0]).as_deref(),
            Some(NEGATIVE_ARRAY_SIZE_EXCEPTION)
        );
        assert_eq!(successors[1].identifier(), ".1.2");
        assert_eq!(successors[1].pc()?, 2);
        assert_eq!(successors[1].heap().len(), 1);
        assert_eq!(ctx.statistics().decision_points, 1);

        Ok(())
    }

    #[test]
    fn concrete_negative_lengths_throw() -> anyhow::Result<()> {
        let mut ctx = context();
        let mut state = state();
        state.push_operand(Simplex::Int(-1).into())?;

        let successors = new_array(&mut ctx, &state, "Lapp/Node;")?;
        assert_eq!(successors.len(), 1);
        assert_eq!(
            thrown(&successors[0]).as_deref(),
            Some(NEGATIVE_ARRAY_SIZE_EXCEPTION)
        );

        Ok(())
    }

    #[test]
    fn pure_natives_are_evaluated() -> anyhow::Result<()> {
        let method = Signature::new("java/lang/StrictMath", "max", "(II)I");
        let natives = NativeTable::new().with_function(&method, |args| match args {
            [Simplex::Int(a), Simplex::Int(b)] => Some(Simplex::Int(*a.max(b))),
            _ => None,
        });
        let mut ctx = context().with_natives(natives);
        let mut state = state();
        state.push_operand(Simplex::Int(3).into())?;
        state.push_operand(Simplex::Int(9).into())?;

        let successors = invoke_native_pure(&mut ctx, &state, &method, true, 3)?;
        assert_eq!(
            successors[0].current_frame()?.operands().values(),
            &[Value::from(Simplex::Int(9))]
        );
        assert_eq!(successors[0].pc()?, 3);

        Ok(())
    }

    #[test]
    fn unhandled_natives_escape_with_their_location() {
        let mut ctx = context();
        let mut state = state();
        state.push_operand(Simplex::Int(3).into()).expect("Push failed");
        let method = Signature::new("app/Main", "twice", "(I)I");

        let error = invoke_native_pure(&mut ctx, &state, &method, true, 3)
            .expect_err("A native without an implementation was evaluated");
        assert_eq!(error.location, 0);
    }

    #[test]
    fn the_engine_identifies_itself() -> anyhow::Result<()> {
        let mut ctx = context();
        let successors = invoke_is_run_by_engine(&mut ctx, &state())?;
        assert_eq!(
            successors[0].current_frame()?.operands().values(),
            &[Value::from(Simplex::Int(1))]
        );
        assert_eq!(successors[0].pc()?, 3);

        Ok(())
    }
}
