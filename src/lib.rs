//! This library implements the core of a symbolic executor for the bytecode
//! of a stack-based managed runtime, in the style of the JVM. It explores the
//! paths of a method whose inputs are symbolic, and materializes the objects
//! those inputs point to only when the method first touches them. This is
//! known as _lazy initialization_.
//!
//! Note that the library does not parse class files, and does not decide
//! which path to explore next. Both are left to the embedder.
//!
//! # How it Works
//!
//! From a very high level, exploring a method proceeds as follows:
//!
//! 1. The embedder builds an [`algo::ExecutionContext`] from a
//!    [`dec::DecisionProcedure`] and a [`bc::ClassHierarchy`], and asks it
//!    for the initial [`mem::State`] of the method, in which every argument
//!    is a fresh symbol.
//! 2. The embedder decodes the instruction at the program counter and calls
//!    the matching handler in [`algo`].
//! 3. When the instruction reads a symbolic reference that nothing has
//!    resolved yet, the generator in [`algo::generator`] asks the decision
//!    procedure which resolutions are feasible: `null`, an alias of an object
//!    already seen, or a fresh object of each possible class. It then forks
//!    the state once per feasible [`tree::DecisionAlternative`].
//! 4. The embedder keeps executing the successors until they are
//!    [`mem::State::is_stuck`], and can inspect them through [`inspect`].
//!
//! # Basic Usage
//!
//! ```
//! use std::rc::Rc;
//!
//! use symbolic_bytecode_engine::{
//!     algo::{self, ExecutionContext},
//!     bc::{ClassFile, ClassTable, Signature},
//!     constant::XLOAD_N_OFFSET,
//!     dec::AlwaysSat,
//! };
//!
//! let classes = ClassTable::new()
//!     .with_class(ClassFile::new("app/Shape").interface())
//!     .with_class(ClassFile::new("app/Circle").with_interface("app/Shape"))
//!     .with_class(ClassFile::new("app/Square").with_interface("app/Shape"));
//! let mut ctx = ExecutionContext::new(AlwaysSat::new(), Rc::new(classes));
//!
//! // static int area(Shape shape) { return shape...; }, executing `aload_0`.
//! let state = ctx
//!     .initial_state(
//!         Signature::new("app/Main", "area", "(Lapp/Shape;)I"),
//!         true,
//!         vec![0x2a_u8, 0xac],
//!         1,
//!         Vec::new(),
//!         1,
//!     )
//!     .unwrap();
//! let successors = algo::load_local(&mut ctx, &state, 0, XLOAD_N_OFFSET).unwrap();
//!
//! // One successor where `shape` is null, and one per implementation.
//! assert_eq!(successors.len(), 3);
//! ```

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming

pub mod algo;
pub mod bc;
pub mod constant;
pub mod dec;
pub mod error;
pub mod inspect;
pub mod mem;
pub mod stats;
pub mod tree;
pub mod trigger;
pub mod val;
pub mod watchdog;

// Re-exports to provide the library interface.
pub use algo::ExecutionContext;
pub use mem::State;
