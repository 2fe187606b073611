//! This module contains the [`State`] of one explored path.

use std::{
    fmt::{Display, Formatter},
    rc::Rc,
};

use crate::{
    bc::FieldInfo,
    constant::{ROOT_BRANCH_IDENTIFIER, VERIFY_ERROR},
    error::{
        memory::{Error, Result},
        value,
    },
    mem::{
        clause::Clause,
        frame::Frame,
        heap::Heap,
        objekt::{Array, Instance, Objekt},
        path_condition::PathCondition,
    },
    val::{
        types,
        Address,
        Calculator,
        Origin,
        Primitive,
        PrimitiveSymbolic,
        PrimitiveType,
        Reference,
        ReferenceSymbolic,
        Value,
    },
};

/// Why a state cannot execute any further.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Stuck {
    /// The last frame returned, with the value it returned if not `void`.
    Return(Option<Value>),

    /// An exception was thrown and not caught. The reference points at the
    /// exception object.
    Exception(Reference),
}

impl Display for Stuck {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Return(Some(value)) => write!(f, "returned {value}"),
            Self::Return(None) => write!(f, "returned"),
            Self::Exception(reference) => write!(f, "threw {reference}"),
        }
    }
}

/// The state of one explored path: a thread stack of frames, the current
/// heap, the heap as it was when execution started, and the path condition.
///
/// # Cloning
///
/// A state is forked by cloning it. The heaps and the path condition are
/// persistent structures and frames are reference counted, so a clone shares
/// all of its structure with the original. A frame or heap entry is copied
/// the first time either side writes to it, so a write on one side is never
/// observable on the other.
///
/// # Mutation
///
/// Every change to a state goes through its own methods. In particular, the
/// path condition can only grow, and a symbolic reference can only be
/// resolved once.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct State {
    identifier:     String,
    sequence:       u32,
    frames:         Vec<Rc<Frame>>,
    heap:           Heap,
    initial_heap:   Heap,
    path_condition: PathCondition,
    next_symbol:    u32,
    stuck:          Option<Stuck>,
    calculator:     Calculator,
}

impl State {
    /// Constructs the root state of an exploration, with no frames and an
    /// empty heap.
    #[must_use]
    pub fn new() -> Self {
        Self {
            identifier:     ROOT_BRANCH_IDENTIFIER.to_string(),
            sequence:       0,
            frames:         Vec::new(),
            heap:           Heap::new(),
            initial_heap:   Heap::new(),
            path_condition: PathCondition::new(),
            next_symbol:    0,
            stuck:          None,
            calculator:     Calculator,
        }
    }

    /// Gets the branch identifier of the state, such as `.1.2.1`.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Gets the number of steps taken since the state last branched.
    #[must_use]
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Records that the state is the `branch`-th successor at a branching
    /// point.
    pub fn add_branch(&mut self, branch: usize) {
        self.identifier.push_str(&format!(".{branch}"));
        self.sequence = 0;
    }

    /// Records that the state took a step.
    pub fn inc_sequence(&mut self) {
        self.sequence += 1;
    }

    #[must_use]
    pub fn calculator(&self) -> Calculator {
        self.calculator
    }

    // Frames

    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push(Rc::new(frame));
    }

    /// Removes the current frame and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThreadStackEmpty`] if there are no frames.
    pub fn pop_frame(&mut self) -> Result<Frame> {
        let frame = self.frames.pop().ok_or(Error::ThreadStackEmpty)?;
        Ok(Rc::try_unwrap(frame).unwrap_or_else(|shared| (*shared).clone()))
    }

    /// Iterates over the frames from the outermost to the current one.
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().map(|frame| &**frame)
    }

    #[must_use]
    pub fn stack_size(&self) -> usize {
        self.frames.len()
    }

    /// Gets the current frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThreadStackEmpty`] if there are no frames.
    pub fn current_frame(&self) -> Result<&Frame> {
        self.frames
            .last()
            .map(|frame| &**frame)
            .ok_or(Error::ThreadStackEmpty)
    }

    /// Gets the current frame for writing, copying it first if it is shared
    /// with another state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThreadStackEmpty`] if there are no frames.
    pub fn current_frame_mut(&mut self) -> Result<&mut Frame> {
        self.frames
            .last_mut()
            .map(Rc::make_mut)
            .ok_or(Error::ThreadStackEmpty)
    }

    /// Gets the program counter of the current frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThreadStackEmpty`] if there are no frames.
    pub fn pc(&self) -> Result<u32> {
        Ok(self.current_frame()?.pc())
    }

    /// Advances the program counter of the current frame by `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProgramCounter`] if the result is outside the
    /// method's code.
    pub fn inc_pc(&mut self, offset: u32) -> Result<()> {
        self.current_frame_mut()?.inc_pc(i64::from(offset))
    }

    /// Pushes `value` on the operand stack of the current frame.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if there is no frame or the stack is full.
    pub fn push_operand(&mut self, value: Value) -> Result<()> {
        self.current_frame_mut()?.operands_mut().push(value)
    }

    /// Pops the top of the operand stack of the current frame.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if there is no frame or the stack is empty.
    pub fn pop_operand(&mut self) -> Result<Value> {
        self.current_frame_mut()?.operands_mut().pop()
    }

    /// Pops `count` values, returned in the order they were pushed.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if there is no frame or not enough values.
    pub fn pop_operands(&mut self, count: usize) -> Result<Vec<Value>> {
        let mut values = (0..count)
            .map(|_| self.pop_operand())
            .collect::<Result<Vec<_>>>()?;
        values.reverse();
        Ok(values)
    }

    /// Reads local `slot` of the current frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSlot`] if the slot is out of range or not
    /// written.
    pub fn get_local(&self, slot: u16) -> Result<&Value> {
        self.current_frame()?.locals().get(slot)
    }

    /// Writes local `slot` of the current frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSlot`] if the write is not allowed.
    pub fn set_local(&mut self, slot: u16, value: Value) -> Result<()> {
        self.current_frame_mut()?.set_local(slot, value)
    }

    // Symbols

    fn next_symbol_id(&mut self) -> u32 {
        let id = self.next_symbol;
        self.next_symbol += 1;
        id
    }

    /// Creates a fresh symbolic primitive of type `ty`.
    pub fn create_symbol_primitive(
        &mut self,
        ty: PrimitiveType,
        origin: Origin,
    ) -> PrimitiveSymbolic {
        PrimitiveSymbolic::new(self.next_symbol_id(), ty, origin)
    }

    /// Creates a fresh symbolic reference of static type `static_type`.
    pub fn create_symbol_reference(
        &mut self,
        static_type: impl Into<String>,
        origin: Origin,
    ) -> ReferenceSymbolic {
        ReferenceSymbolic::new(self.next_symbol_id(), static_type, origin)
    }

    /// Creates a fresh symbolic value for a location declared with type
    /// `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `descriptor` is not a field descriptor.
    pub fn create_symbol(&mut self, descriptor: &str, origin: Origin) -> Result<Value> {
        if let Some(ty) = PrimitiveType::from_descriptor(descriptor) {
            Ok(Primitive::from(self.create_symbol_primitive(ty, origin)).into())
        } else {
            let static_type = types::static_type_of(descriptor)?;
            Ok(self.create_symbol_reference(static_type, origin).into())
        }
    }

    // Heap

    #[must_use]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Gets the heap as it was when execution started. It holds exactly the
    /// objects that symbolic references were expanded to, as they were
    /// before any write.
    #[must_use]
    pub fn initial_heap(&self) -> &Heap {
        &self.initial_heap
    }

    /// Allocates an instance of `class_name` whose `fields` hold their
    /// default values.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if a field has a malformed descriptor.
    pub fn create_instance(&mut self, class_name: &str, fields: &[FieldInfo]) -> Result<Address> {
        let fields = fields
            .iter()
            .map(|field| {
                let value = Value::default_for(field.descriptor())?;
                Ok((field.name().to_string(), value))
            })
            .collect::<value::Result<Vec<_>>>()?;
        Ok(self.heap.allocate(Instance::new(class_name, None, fields)))
    }

    /// Allocates an array of type `class_name` with `length` members, all
    /// holding the default value.
    pub fn create_array(&mut self, class_name: &str, length: Primitive) -> Address {
        self.heap.allocate(Array::new(class_name, None, length))
    }

    /// Gets the object at `address` in the current heap.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchObject`] if there is none.
    pub fn get_object(&self, address: Address) -> Result<&Objekt> {
        self.heap.get(address)
    }

    /// Gets the object at `address` in the initial heap.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchObject`] if there is none.
    pub fn get_object_initial(&self, address: Address) -> Result<&Objekt> {
        self.initial_heap.get(address)
    }

    /// Gets the array at `address` in the current heap.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if there is no object or it is not an array.
    pub fn get_array(&self, address: Address) -> Result<&Array> {
        self.heap
            .get(address)?
            .as_array()
            .ok_or(Error::NotAnArray { address: address.0 })
    }

    /// Records that the member at `index` of the array at `address` holds
    /// `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if there is no object or it is not an array.
    pub fn array_set(&mut self, address: Address, index: Primitive, value: Value) -> Result<()> {
        self.heap
            .get_mut(address)?
            .as_array_mut()
            .ok_or(Error::NotAnArray { address: address.0 })?
            .set(index, value);
        Ok(())
    }

    /// Sets field `name` of the instance at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if there is no such instance or field.
    pub fn set_field(&mut self, address: Address, name: &str, value: Value) -> Result<()> {
        let objekt = self.heap.get_mut(address)?;
        let class_name = objekt.class_name().to_string();
        objekt
            .as_instance_mut()
            .ok_or_else(|| Error::NoSuchField {
                class_name,
                field: name.into(),
            })?
            .set_field(name, value)
    }

    /// Maps `reference` to the address it denotes, or [`None`] for null.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedReference`] if `reference` is symbolic and
    /// has not been resolved.
    pub fn deref(&self, reference: &Reference) -> Result<Option<Address>> {
        match reference {
            Reference::Null => Ok(None),
            Reference::Concrete(address) => Ok(Some(*address)),
            Reference::Symbolic(symbolic) => match self.resolution(symbolic) {
                Some(clause) => Ok(clause.address()),
                None => Err(Error::UnresolvedReference { id: symbolic.id() }),
            },
        }
    }

    // Path condition

    #[must_use]
    pub fn path_condition(&self) -> &PathCondition {
        &self.path_condition
    }

    /// Gets the clause that resolved `reference`, if any.
    #[must_use]
    pub fn resolution(&self, reference: &ReferenceSymbolic) -> Option<&Clause> {
        self.path_condition.resolution(reference)
    }

    #[must_use]
    pub fn is_resolved(&self, reference: &ReferenceSymbolic) -> bool {
        self.path_condition.is_resolved(reference)
    }

    /// Assumes that the boolean `condition` holds.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `condition` is not a boolean.
    pub fn assume(&mut self, condition: Primitive) -> Result<()> {
        if condition.ty() != PrimitiveType::Boolean {
            return Err(value::Error::InvalidType {
                expected: PrimitiveType::Boolean.to_string(),
                found:    condition.ty().to_string(),
            }
            .into());
        }
        self.path_condition.push(Clause::Assume(condition))
    }

    /// Resolves `reference` to a fresh object of class `class_name`, and
    /// returns the object's address.
    ///
    /// The object is added to both the current and the initial heap. An
    /// instance gets a fresh symbolic value for each of `fields`. An array
    /// gets a fresh symbolic length and no recorded members.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyResolved`] if `reference` was resolved before.
    pub fn assume_expands(
        &mut self,
        reference: &ReferenceSymbolic,
        class_name: &str,
        fields: &[FieldInfo],
    ) -> Result<Address> {
        self.ensure_unresolved(reference)?;

        let objekt: Objekt = if types::is_array(class_name) {
            let length =
                self.create_symbol_primitive(PrimitiveType::Int, Origin::array_length(reference));
            Array::new(class_name, Some(reference.clone()), length.into()).into()
        } else {
            let mut values = Vec::with_capacity(fields.len());
            for field in fields {
                let origin = Origin::field(reference, field.name());
                let value = self.create_symbol(field.descriptor(), origin)?;
                values.push((field.name().to_string(), value));
            }
            Instance::new(class_name, Some(reference.clone()), values).into()
        };

        let address = self.heap.allocate(objekt.clone());
        self.initial_heap.insert_at(address, objekt);
        self.path_condition.push(Clause::AssumeExpands {
            reference: reference.clone(),
            address,
            class_name: class_name.to_string(),
        })?;

        Ok(address)
    }

    /// Resolves `reference` to the object at `address` in the initial heap.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `reference` was resolved before, or if there is no
    /// such object in the initial heap.
    pub fn assume_aliases(
        &mut self,
        reference: &ReferenceSymbolic,
        address: Address,
    ) -> Result<()> {
        self.ensure_unresolved(reference)?;
        self.initial_heap.get(address)?;
        self.path_condition.push(Clause::AssumeAliases {
            reference: reference.clone(),
            address,
        })
    }

    /// Resolves `reference` to null.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyResolved`] if `reference` was resolved before.
    pub fn assume_null(&mut self, reference: &ReferenceSymbolic) -> Result<()> {
        self.path_condition.push(Clause::AssumeNull {
            reference: reference.clone(),
        })
    }

    /// Assumes that `class_name` was initialized before execution started.
    ///
    /// # Errors
    ///
    /// Never fails for now. The signature matches the other assumptions.
    pub fn assume_class_initialized(&mut self, class_name: &str) -> Result<()> {
        self.path_condition.push(Clause::AssumeClassInitialized {
            class_name: class_name.to_string(),
        })
    }

    /// Assumes that `class_name` was not initialized before execution
    /// started.
    ///
    /// # Errors
    ///
    /// Never fails for now. The signature matches the other assumptions.
    pub fn assume_class_not_initialized(&mut self, class_name: &str) -> Result<()> {
        self.path_condition.push(Clause::AssumeClassNotInitialized {
            class_name: class_name.to_string(),
        })
    }

    /// Gets what the path condition assumes about the initialization of
    /// `class_name`, if anything.
    #[must_use]
    pub fn class_initialization(&self, class_name: &str) -> Option<bool> {
        self.path_condition.iter().find_map(|clause| match clause {
            Clause::AssumeClassInitialized { class_name: name } if name == class_name => {
                Some(true)
            }
            Clause::AssumeClassNotInitialized { class_name: name } if name == class_name => {
                Some(false)
            }
            _ => None,
        })
    }

    fn ensure_unresolved(&self, reference: &ReferenceSymbolic) -> Result<()> {
        if self.is_resolved(reference) {
            Err(Error::AlreadyResolved { id: reference.id() })
        } else {
            Ok(())
        }
    }

    // Termination

    /// Allocates an exception of class `class_name` and throws it.
    ///
    /// Exception handlers are not modelled, so the exception is uncaught and
    /// the state becomes stuck.
    pub fn throw_new(&mut self, class_name: &str) -> Address {
        let address = self.heap.allocate(Instance::new(class_name, None, []));
        tracing::debug!(state = %self.identifier, exception = class_name, "throwing");
        self.stuck = Some(Stuck::Exception(Reference::Concrete(address)));
        address
    }

    /// Throws a `VerifyError`, for a state whose bytecode turned out to be
    /// malformed.
    pub fn throw_verify_error(&mut self) -> Address {
        self.throw_new(VERIFY_ERROR)
    }

    /// Marks the state as having returned from its last frame.
    pub fn set_stuck_return(&mut self, value: Option<Value>) {
        self.stuck = Some(Stuck::Return(value));
    }

    #[must_use]
    pub fn stuck(&self) -> Option<&Stuck> {
        self.stuck.as_ref()
    }

    #[must_use]
    pub fn is_stuck(&self) -> bool {
        self.stuck.is_some()
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use crate::{
        bc::{FieldInfo, Signature},
        error::memory::Error,
        mem::{
            clause::Clause,
            frame::Frame,
            locals::LocalVariablesArea,
            objekt::Objekt,
            state::{State, Stuck},
        },
        val::{Origin, Reference, Simplex, Value},
    };

    fn state_with_frame() -> State {
        let mut state = State::new();
        state.push_frame(Frame::new(
            Signature::new("app/Main", "run", "()V"),
            vec![0x2a_u8, 0x2b, 0xb1],
            LocalVariablesArea::without_table(4),
            8,
        ));
        state
    }

    #[test]
    fn clones_do_not_share_writes() -> anyhow::Result<()> {
        let mut parent = state_with_frame();
        parent.push_operand(Simplex::Int(1).into())?;

        let mut child = parent.clone();
        child.push_operand(Simplex::Int(2).into())?;
        child.inc_pc(1)?;
        child.set_local(0, Simplex::Int(3).into())?;

        assert_eq!(parent.current_frame()?.operands().size(), 1);
        assert_eq!(parent.pc()?, 0);
        parent.get_local(0).expect_err("Parent saw the child's local write");
        assert_eq!(child.current_frame()?.operands().size(), 2);

        Ok(())
    }

    #[test]
    fn expansion_populates_both_heaps() -> anyhow::Result<()> {
        let mut state = State::new();
        let root = state.create_symbol_reference("app/Node", Origin::root("n"));
        let fields = [
            FieldInfo::new("value", "I", false),
            FieldInfo::new("next", "Lapp/Node;", false),
        ];
        let address = state.assume_expands(&root, "app/Node", &fields)?;

        let Objekt::Instance(node) = state.get_object(address)? else {
            panic!("Expanded a node into an array");
        };
        let Value::Reference(Reference::Symbolic(next)) = node.get_field("next")? else {
            panic!("The next field is not symbolic");
        };
        assert_eq!(next.static_type(), "app/Node");
        assert_eq!(next.origin().to_string(), "{ROOT}:n.next");
        assert_eq!(state.get_object_initial(address)?, state.get_object(address)?);
        assert_eq!(state.deref(&root.clone().into())?, Some(address));

        state.set_field(address, "value", Simplex::Int(5).into())?;
        assert_ne!(state.get_object_initial(address)?, state.get_object(address)?);

        Ok(())
    }

    #[test]
    fn expanded_arrays_get_a_symbolic_length() -> anyhow::Result<()> {
        let mut state = State::new();
        let root = state.create_symbol_reference("[I", Origin::root("a"));
        let address = state.assume_expands(&root, "[I", &[])?;

        let array = state.get_array(address)?;
        assert!(array.length().is_symbolic());
        assert!(array.is_symbolic());

        Ok(())
    }

    #[test]
    fn references_resolve_once() -> anyhow::Result<()> {
        let mut state = State::new();
        let root = state.create_symbol_reference("app/Node", Origin::root("n"));
        state
            .deref(&root.clone().into())
            .expect_err("Dereferenced an unresolved reference");

        state.assume_null(&root)?;
        assert_eq!(state.deref(&root.clone().into())?, None);
        assert_eq!(
            state.assume_expands(&root, "app/Node", &[]),
            Err(Error::AlreadyResolved { id: root.id() })
        );
        assert!(state.heap().is_empty());

        Ok(())
    }

    #[test]
    fn aliasing_targets_the_initial_heap() -> anyhow::Result<()> {
        let mut state = State::new();
        let allocated = state.create_instance("app/Node", &[])?;
        let root = state.create_symbol_reference("app/Node", Origin::root("n"));

        state
            .assume_aliases(&root, allocated)
            .expect_err("Aliased an object that was not there at the start");
        assert!(!state.is_resolved(&root));

        Ok(())
    }

    #[test]
    fn verify_errors_make_the_state_stuck() -> anyhow::Result<()> {
        let mut state = state_with_frame();
        let address = state.throw_verify_error();

        assert_eq!(state.get_object(address)?.class_name(), "java/lang/VerifyError");
        assert_eq!(
            state.stuck(),
            Some(&Stuck::Exception(Reference::Concrete(address)))
        );

        Ok(())
    }

    #[test]
    fn tracks_class_initialization() -> anyhow::Result<()> {
        let mut state = State::new();
        assert_eq!(state.class_initialization("app/A"), None);
        state.assume_class_initialized("app/A")?;
        state.assume_class_not_initialized("app/B")?;
        assert_eq!(state.class_initialization("app/A"), Some(true));
        assert_eq!(state.class_initialization("app/B"), Some(false));
        assert!(matches!(
            state.path_condition().iter().next(),
            Some(Clause::AssumeClassInitialized { .. })
        ));

        Ok(())
    }

    #[test]
    fn records_branches() {
        let mut state = State::new();
        state.inc_sequence();
        state.add_branch(2);
        assert_eq!(state.identifier(), ".1.2");
        assert_eq!(state.sequence(), 0);
    }
}
