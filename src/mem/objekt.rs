//! This module contains the heap entities: class instances and arrays.

use crate::{
    error::memory::{Error, Result},
    val::{types, Calculator, Primitive, ReferenceSymbolic, Value},
};

/// An instance of a class.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Instance {
    class_name: String,
    origin:     Option<ReferenceSymbolic>,
    fields:     im::OrdMap<String, Value>,
}

impl Instance {
    /// Constructs an instance of `class_name` with the provided field values.
    ///
    /// `origin` is the symbolic reference the instance was expanded from, or
    /// [`None`] for an allocated instance.
    #[must_use]
    pub fn new(
        class_name: impl Into<String>,
        origin: Option<ReferenceSymbolic>,
        fields: impl IntoIterator<Item = (String, Value)>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            origin,
            fields: fields.into_iter().collect(),
        }
    }

    /// Gets the value of field `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchField`] if the instance has no such field.
    pub fn get_field(&self, name: &str) -> Result<&Value> {
        self.fields.get(name).ok_or_else(|| Error::NoSuchField {
            class_name: self.class_name.clone(),
            field:      name.into(),
        })
    }

    /// Sets the value of field `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchField`] if the instance has no such field.
    pub fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        let slot = self.fields.get_mut(name).ok_or_else(|| Error::NoSuchField {
            class_name: self.class_name.clone(),
            field:      name.into(),
        })?;
        *slot = value;
        Ok(())
    }

    /// Iterates over the fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// A write recorded in an [`Array`]: the member at `index` holds `value`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArrayEntry {
    pub index: Primitive,
    pub value: Value,
}

/// One of the possible results of reading an array member at an index that
/// may be symbolic. Every outcome carries the guard under which it happens.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AccessOutcome {
    /// The index hits a recorded entry.
    Entry { guard: Primitive, value: Value },

    /// The index is in bounds but hits no recorded entry, so the member is
    /// whatever the array held when it came into existence.
    Unknown { guard: Primitive },

    /// The index is out of bounds.
    OutOfRange { guard: Primitive },
}

impl AccessOutcome {
    #[must_use]
    pub fn guard(&self) -> &Primitive {
        match self {
            Self::Entry { guard, .. } | Self::Unknown { guard } | Self::OutOfRange { guard } => {
                guard
            }
        }
    }
}

/// An array.
///
/// Members are stored as an ordered list of writes, so that reads and writes
/// at symbolic indices need not be decided up front. A later entry takes
/// precedence over an earlier one with an equal index.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Array {
    class_name: String,
    origin:     Option<ReferenceSymbolic>,
    length:     Primitive,
    entries:    im::Vector<ArrayEntry>,
}

impl Array {
    /// Constructs an array of type `class_name` (an array descriptor) with
    /// the provided `length` and no recorded entries.
    ///
    /// An array with an `origin` was expanded from that symbolic reference,
    /// and its unrecorded members are unknown inputs. Otherwise it was
    /// allocated, and its unrecorded members hold the default value of the
    /// member type.
    #[must_use]
    pub fn new(
        class_name: impl Into<String>,
        origin: Option<ReferenceSymbolic>,
        length: Primitive,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            origin,
            length,
            entries: im::Vector::new(),
        }
    }

    #[must_use]
    pub fn length(&self) -> &Primitive {
        &self.length
    }

    /// Gets the descriptor of the array members.
    #[must_use]
    pub fn member_type(&self) -> &str {
        types::array_member_type(&self.class_name).unwrap_or_default()
    }

    /// Checks if unrecorded members are symbolic inputs rather than default
    /// values.
    #[must_use]
    pub fn is_symbolic(&self) -> bool {
        self.origin.is_some()
    }

    /// Gets the recorded entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &ArrayEntry> {
        self.entries.iter()
    }

    /// Gets the value of an unrecorded member in an allocated array.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the member type has no default value.
    pub fn default_member(&self) -> Result<Value> {
        Ok(Value::default_for(self.member_type())?)
    }

    /// Computes the possible outcomes of reading the member at `index`.
    ///
    /// There is one outcome per recorded entry the index may hit, one for
    /// the unrecorded remainder and one for the index being out of bounds.
    /// Outcomes whose guard folds to `false` are omitted.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `index` is not an `int`.
    pub fn get(&self, calc: Calculator, index: &Primitive) -> Result<Vec<AccessOutcome>> {
        let in_bounds = calc.and(
            calc.ge(index.clone(), calc.val_int(0))?,
            calc.lt(index.clone(), self.length.clone())?,
        )?;

        let mut outcomes = Vec::new();
        for (position, entry) in self.entries.iter().enumerate() {
            let hits = calc.eq(index.clone(), entry.index.clone())?;
            let later_misses = self
                .entries
                .iter()
                .skip(position + 1)
                .map(|later| calc.ne(index.clone(), later.index.clone()))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let guard = calc.and(calc.and(in_bounds.clone(), hits)?, calc.all(later_misses)?)?;
            if !guard.is_false() {
                outcomes.push(AccessOutcome::Entry {
                    guard,
                    value: entry.value.clone(),
                });
            }
        }

        let misses = self
            .entries
            .iter()
            .map(|entry| calc.ne(index.clone(), entry.index.clone()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let guard = calc.and(in_bounds.clone(), calc.all(misses)?)?;
        if !guard.is_false() {
            outcomes.push(AccessOutcome::Unknown { guard });
        }

        let guard = calc.not(in_bounds)?;
        if !guard.is_false() {
            outcomes.push(AccessOutcome::OutOfRange { guard });
        }

        Ok(outcomes)
    }

    /// Records that the member at `index` holds `value`. An existing entry
    /// with a structurally equal index is replaced.
    pub fn set(&mut self, index: Primitive, value: Value) {
        self.entries.retain(|entry| entry.index != index);
        self.entries.push_back(ArrayEntry { index, value });
    }
}

/// An entity in the heap.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Objekt {
    Instance(Instance),
    Array(Array),
}

impl Objekt {
    /// Gets the name of the object's class, which is an array descriptor for
    /// arrays.
    #[must_use]
    pub fn class_name(&self) -> &str {
        match self {
            Self::Instance(instance) => &instance.class_name,
            Self::Array(array) => &array.class_name,
        }
    }

    /// Gets the symbolic reference this object was expanded from, if any.
    #[must_use]
    pub fn origin(&self) -> Option<&ReferenceSymbolic> {
        match self {
            Self::Instance(instance) => instance.origin.as_ref(),
            Self::Array(array) => array.origin.as_ref(),
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(array) => Some(array),
            Self::Instance(_) => None,
        }
    }

    #[must_use]
    pub fn as_array_mut(&mut self) -> Option<&mut Array> {
        match self {
            Self::Array(array) => Some(array),
            Self::Instance(_) => None,
        }
    }

    #[must_use]
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Self::Instance(instance) => Some(instance),
            Self::Array(_) => None,
        }
    }

    #[must_use]
    pub fn as_instance_mut(&mut self) -> Option<&mut Instance> {
        match self {
            Self::Instance(instance) => Some(instance),
            Self::Array(_) => None,
        }
    }

    /// Gets the value of field `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchField`] if the object is an array or has no
    /// such field.
    pub fn get_field(&self, name: &str) -> Result<&Value> {
        match self {
            Self::Instance(instance) => instance.get_field(name),
            Self::Array(array) => Err(Error::NoSuchField {
                class_name: array.class_name.clone(),
                field:      name.into(),
            }),
        }
    }
}

impl From<Instance> for Objekt {
    fn from(value: Instance) -> Self {
        Self::Instance(value)
    }
}

impl From<Array> for Objekt {
    fn from(value: Array) -> Self {
        Self::Array(value)
    }
}

#[cfg(test)]
mod test {
    use crate::{
        mem::objekt::{AccessOutcome, Array, Instance},
        val::{
            Calculator,
            Origin,
            Primitive,
            PrimitiveSymbolic,
            PrimitiveType,
            Reference,
            Simplex,
            Value,
        },
    };

    fn index(value: i32) -> Primitive {
        Simplex::Int(value).into()
    }

    fn int_symbol(id: u32) -> Primitive {
        PrimitiveSymbolic::new(id, PrimitiveType::Int, Origin::root(format!("i{id}"))).into()
    }

    #[test]
    fn reads_concrete_indices_directly() -> anyhow::Result<()> {
        let calc = Calculator;
        let mut array = Array::new("[I", None, index(3));
        array.set(index(1), Simplex::Int(42).into());

        let outcomes = array.get(calc, &index(1))?;
        assert_eq!(
            outcomes,
            vec![AccessOutcome::Entry {
                guard: calc.val_boolean(true),
                value: Simplex::Int(42).into(),
            }]
        );

        let outcomes = array.get(calc, &index(0))?;
        assert!(matches!(outcomes.as_slice(), [AccessOutcome::Unknown { .. }]));
        assert_eq!(array.default_member()?, Value::from(Simplex::Int(0)));

        let outcomes = array.get(calc, &index(3))?;
        assert!(matches!(outcomes.as_slice(), [AccessOutcome::OutOfRange { .. }]));

        Ok(())
    }

    #[test]
    fn splits_symbolic_indices() -> anyhow::Result<()> {
        let calc = Calculator;
        let mut array = Array::new("[Ljava/lang/Object;", None, index(4));
        array.set(index(0), Reference::Null.into());
        array.set(index(1), Reference::Null.into());

        let outcomes = array.get(calc, &int_symbol(7))?;
        assert_eq!(outcomes.len(), 4);
        assert!(matches!(outcomes[0], AccessOutcome::Entry { .. }));
        assert!(matches!(outcomes[1], AccessOutcome::Entry { .. }));
        assert!(matches!(outcomes[2], AccessOutcome::Unknown { .. }));
        assert!(matches!(outcomes[3], AccessOutcome::OutOfRange { .. }));

        Ok(())
    }

    #[test]
    fn replaces_entries_with_equal_indices() {
        let mut array = Array::new("[J", None, index(2));
        array.set(index(0), Simplex::Long(1).into());
        array.set(index(0), Simplex::Long(2).into());

        let entries: Vec<_> = array.entries().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, Value::from(Simplex::Long(2)));
    }

    #[test]
    fn reads_and_writes_fields() -> anyhow::Result<()> {
        let mut instance = Instance::new(
            "app/Point",
            None,
            [("x".to_string(), Value::from(Simplex::Int(0)))],
        );
        instance.set_field("x", Simplex::Int(3).into())?;
        assert_eq!(instance.get_field("x")?, &Value::from(Simplex::Int(3)));
        instance.get_field("y").expect_err("Read a missing field");

        Ok(())
    }
}
