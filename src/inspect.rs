//! This module contains read-only views of a [`State`] for reporting.
//!
//! A [`StateSnapshot`] is a serializable rendering of everything a state
//! holds. [`describe_inputs`] goes one step further and rebuilds, from the
//! path condition, the shape of the inputs that lead execution down the
//! state's path.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    error::memory::Result,
    mem::{Clause, Frame, Objekt, State},
    val::{types, Primitive, PrimitiveSymbolic, Simplex, Value},
};

/// A serializable rendering of a [`State`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub identifier:     String,
    pub sequence:       u32,
    pub path_condition: Vec<String>,
    pub heap:           Vec<ObjectSnapshot>,
    pub initial_heap:   Vec<ObjectSnapshot>,
    pub frames:         Vec<FrameSnapshot>,
    pub stuck:          Option<String>,
}

/// A rendering of one heap object.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ObjectSnapshot {
    pub address:    u64,
    pub class_name: String,
    pub origin:     Option<String>,
    pub fields:     BTreeMap<String, String>,
    pub length:     Option<String>,
    pub entries:    Vec<(String, String)>,
}

/// A rendering of one frame.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FrameSnapshot {
    pub method:   String,
    pub pc:       u32,
    pub operands: Vec<String>,
    pub locals:   BTreeMap<u16, LocalSnapshot>,
}

/// A rendering of one written local variable slot.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct LocalSnapshot {
    pub name:  Option<String>,
    pub value: String,
}

impl StateSnapshot {
    /// Takes a snapshot of `state`.
    #[must_use]
    pub fn of(state: &State) -> Self {
        let path_condition = state.path_condition().iter().map(ToString::to_string).collect();
        let heap = state
            .heap()
            .iter()
            .map(|(address, objekt)| ObjectSnapshot::of(address.0, objekt))
            .collect();
        let initial_heap = state
            .initial_heap()
            .iter()
            .map(|(address, objekt)| ObjectSnapshot::of(address.0, objekt))
            .collect();
        let frames = state.frames().map(FrameSnapshot::of).collect();

        Self {
            identifier: state.identifier().to_string(),
            sequence: state.sequence(),
            path_condition,
            heap,
            initial_heap,
            frames,
            stuck: state.stuck().map(ToString::to_string),
        }
    }

    /// Renders the snapshot as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl ObjectSnapshot {
    fn of(address: u64, objekt: &Objekt) -> Self {
        let origin = objekt.origin().map(|origin| origin.origin().to_string());
        let class_name = objekt.class_name().to_string();
        match objekt {
            Objekt::Instance(instance) => Self {
                address,
                class_name,
                origin,
                fields: instance
                    .fields()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect(),
                length: None,
                entries: Vec::new(),
            },
            Objekt::Array(array) => Self {
                address,
                class_name,
                origin,
                fields: BTreeMap::new(),
                length: Some(array.length().to_string()),
                entries: array
                    .entries()
                    .map(|entry| (entry.index.to_string(), entry.value.to_string()))
                    .collect(),
            },
        }
    }
}

impl FrameSnapshot {
    fn of(frame: &Frame) -> Self {
        let pc = frame.pc();
        let locals = frame
            .locals()
            .written()
            .map(|(slot, value)| {
                let name = frame.locals().name_at(slot, pc).map(String::from);
                let value = value.to_string();
                (slot, LocalSnapshot { name, value })
            })
            .collect();

        Self {
            method: frame.method().to_string(),
            pc,
            operands: frame.operands().values().iter().map(ToString::to_string).collect(),
            locals,
        }
    }
}

/// What an input of the analysed method must look like for execution to
/// follow the path of a state.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum InputDescriptor {
    /// A fresh object of the class.
    Object { class_name: String },

    /// A fresh array of the type, with the length the model gives it.
    Array { class_name: String, length: String },

    /// The null reference.
    Null,

    /// The same object as the input described under `target`.
    Alias { target: String },

    /// A primitive with the value the model gives it.
    Constant { value: String },
}

/// Rebuilds the inputs that lead execution down the path of `state`, keyed
/// by the origin string of each input.
///
/// Every resolved symbolic reference is described by its resolution. Every
/// symbolic primitive that `model` assigns a value to, and that occurs in
/// the state, is described by that value. The model maps symbol ids to
/// values, as produced by a solver for the state's path condition.
///
/// # Errors
///
/// Returns [`Err`] if the path condition refers to an address missing from
/// the initial heap.
pub fn describe_inputs(
    state: &State,
    model: &BTreeMap<u32, Simplex>,
) -> Result<BTreeMap<String, InputDescriptor>> {
    let mut inputs = BTreeMap::new();

    for clause in state.path_condition().iter() {
        let descriptor = match clause {
            Clause::AssumeNull { .. } => InputDescriptor::Null,
            Clause::AssumeExpands {
                address,
                class_name,
                ..
            } => {
                if types::is_array(class_name) {
                    let length = state
                        .get_object_initial(*address)?
                        .as_array()
                        .map_or_else(String::new, |array| render(array.length(), model));
                    InputDescriptor::Array {
                        class_name: class_name.clone(),
                        length,
                    }
                } else {
                    InputDescriptor::Object {
                        class_name: class_name.clone(),
                    }
                }
            }
            Clause::AssumeAliases { address, .. } => {
                let target = state
                    .get_object_initial(*address)?
                    .origin()
                    .map_or_else(|| address.to_string(), |origin| origin.origin().to_string());
                InputDescriptor::Alias { target }
            }
            _ => continue,
        };
        if let Some(reference) = clause.reference() {
            inputs.insert(reference.origin().to_string(), descriptor);
        }
    }

    for symbol in primitive_symbols(state) {
        if let Some(value) = model.get(&symbol.id()) {
            inputs.insert(
                symbol.origin().to_string(),
                InputDescriptor::Constant {
                    value: value.to_string(),
                },
            );
        }
    }

    Ok(inputs)
}

/// Renders `primitive`, replacing it by its value in `model` if it is an
/// atom the model assigns.
fn render(primitive: &Primitive, model: &BTreeMap<u32, Simplex>) -> String {
    match primitive {
        Primitive::Symbol(symbol) => model
            .get(&symbol.id())
            .map_or_else(|| symbol.to_string(), ToString::to_string),
        _ => primitive.to_string(),
    }
}

/// Collects the symbolic primitives that occur in the initial heap, in the
/// locals and operands of the frames, and in the path condition.
fn primitive_symbols(state: &State) -> Vec<PrimitiveSymbolic> {
    let mut primitives: Vec<Primitive> = Vec::new();
    let mut add = |value: &Value| {
        if let Value::Primitive(primitive) = value {
            primitives.push(primitive.clone());
        }
    };

    for (_, objekt) in state.initial_heap().iter() {
        match objekt {
            Objekt::Instance(instance) => instance.fields().for_each(|(_, value)| add(value)),
            Objekt::Array(array) => {
                add(&Value::Primitive(array.length().clone()));
                array.entries().for_each(|entry| add(&entry.value));
            }
        }
    }
    for frame in state.frames() {
        frame.locals().written().for_each(|(_, value)| add(value));
        frame.operands().values().iter().for_each(&mut add);
    }
    for clause in state.path_condition().iter() {
        if let Clause::Assume(condition) = clause {
            add(&Value::Primitive(condition.clone()));
        }
    }

    let mut symbols: Vec<PrimitiveSymbolic> = Vec::new();
    for primitive in &primitives {
        for symbol in primitive.symbols() {
            if !symbols.iter().any(|known| known.id() == symbol.id()) {
                symbols.push(symbol.clone());
            }
        }
    }
    symbols
}
