//! This module contains common utilities for simplifying the writing of
//! integration tests for this library.

#![cfg(test)]

use std::rc::Rc;

use symbolic_bytecode_engine::{
    algo::ExecutionContext,
    bc::{ClassFile, ClassTable, Signature},
    dec::DecisionProcedure,
    error::decision,
    mem::{Clause, Frame, LocalVariablesArea, Objekt, State},
    val::{Address, Primitive, ReferenceSymbolic},
};

/// A decision procedure that answers from a script: everything is feasible
/// unless the script says otherwise. Every query is recorded along with the
/// assumptions it was asked under.
#[derive(Clone, Debug, Default)]
pub struct Scripted {
    assumptions:        Vec<Clause>,
    null_infeasible:    bool,
    aliases_infeasible: Vec<Address>,
    expands_infeasible: Vec<String>,
    pub queries:        Vec<String>,
}

#[allow(unused)] // It is actually
impl Scripted {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every reference non-null.
    pub fn without_null(mut self) -> Self {
        self.null_infeasible = true;
        self
    }

    /// Makes aliasing the object at `address` infeasible.
    pub fn without_alias(mut self, address: Address) -> Self {
        self.aliases_infeasible.push(address);
        self
    }

    /// Makes expanding to `class_name` infeasible.
    pub fn without_expansion(mut self, class_name: impl Into<String>) -> Self {
        self.expands_infeasible.push(class_name.into());
        self
    }

    fn record(&mut self, query: String) {
        self.queries.push(format!("{query} | {}", self.assumptions.len()));
    }
}

impl DecisionProcedure for Scripted {
    fn push_assumption(&mut self, clause: Clause) -> decision::Result<()> {
        self.assumptions.push(clause);
        Ok(())
    }

    fn clear_assumptions(&mut self) -> decision::Result<()> {
        self.assumptions.clear();
        Ok(())
    }

    fn get_assumptions(&self) -> decision::Result<Vec<Clause>> {
        Ok(self.assumptions.clone())
    }

    fn is_sat(&mut self, expression: &Primitive) -> decision::Result<bool> {
        self.record(format!("sat {expression}"));
        Ok(!expression.is_false())
    }

    fn is_sat_null(&mut self, reference: &ReferenceSymbolic) -> decision::Result<bool> {
        self.record(format!("null {reference}"));
        Ok(!self.null_infeasible)
    }

    fn is_sat_aliases(
        &mut self,
        reference: &ReferenceSymbolic,
        address: Address,
        _: &Objekt,
    ) -> decision::Result<bool> {
        self.record(format!("aliases {reference} {address}"));
        Ok(!self.aliases_infeasible.contains(&address))
    }

    fn is_sat_expands(
        &mut self,
        reference: &ReferenceSymbolic,
        class_name: &str,
    ) -> decision::Result<bool> {
        self.record(format!("expands {reference} {class_name}"));
        Ok(!self.expands_infeasible.iter().any(|c| c == class_name))
    }

    fn is_sat_initialized(&mut self, class_name: &str) -> decision::Result<bool> {
        self.record(format!("initialized {class_name}"));
        Ok(true)
    }

    fn is_sat_not_initialized(&mut self, class_name: &str) -> decision::Result<bool> {
        self.record(format!("not initialized {class_name}"));
        Ok(true)
    }
}

/// Constructs the classes of a small program about shapes.
///
/// `app/Shape` is an interface implemented by `app/Circle` and `app/Square`.
/// `app/Node` is an unrelated linked-list node.
#[allow(unused)] // It is actually
pub fn shapes() -> ClassTable {
    ClassTable::new()
        .with_class(ClassFile::new("app/Shape").interface())
        .with_class(ClassFile::new("app/Circle").with_interface("app/Shape"))
        .with_class(ClassFile::new("app/Square").with_interface("app/Shape"))
        .with_class(
            ClassFile::new("app/Node")
                .with_field("value", "I")
                .with_field("next", "Lapp/Node;"),
        )
}

/// Constructs a context over `procedure` and the classes of [`shapes`].
#[allow(unused)] // It is actually
pub fn context<D>(procedure: D) -> ExecutionContext<D>
where
    D: DecisionProcedure,
{
    ExecutionContext::new(procedure, Rc::new(shapes()))
}

/// Constructs a state executing `code` in a method with `max_locals` slots
/// and no local variable table.
#[allow(unused)] // It is actually
pub fn state_executing(code: Vec<u8>, max_locals: u16) -> State {
    let mut state = State::new();
    state.push_frame(Frame::new(
        Signature::new("app/Main", "run", "()V"),
        code,
        LocalVariablesArea::without_table(max_locals),
        8,
    ));
    state
}

/// Gets the last clause of the path condition of `state`.
#[allow(unused)] // It is actually
pub fn last_clause(state: &State) -> Option<Clause> {
    state.path_condition().iter().last().cloned()
}
