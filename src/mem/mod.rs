//! This module contains the memory model of the engine: the state of one
//! explored path and everything it is made of.

pub mod clause;
pub mod frame;
pub mod heap;
pub mod locals;
pub mod objekt;
pub mod path_condition;
pub mod stack;
pub mod state;

pub use clause::Clause;
pub use frame::Frame;
pub use heap::Heap;
pub use locals::{LocalVariableRow, LocalVariablesArea};
pub use objekt::{AccessOutcome, Array, ArrayEntry, Instance, Objekt};
pub use path_condition::PathCondition;
pub use stack::OperandStack;
pub use state::{State, Stuck};
