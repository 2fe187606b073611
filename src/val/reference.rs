//! This module contains the reference values, and the origins that record how
//! every symbolic value was produced.

use std::{
    fmt::{Display, Formatter},
    rc::Rc,
};

use derivative::Derivative;
use serde::Serialize;

use crate::{constant::ROOT_ORIGIN_PREFIX, val::primitive::Primitive};

/// An address in the heap of a state.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Address(pub u64);

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Object[{}]", self.0)
    }
}

/// A symbolic reference: a reference whose target has not been decided.
///
/// Two symbolic references are the same reference exactly when their ids
/// agree, which is what makes resolutions in the path condition findable.
#[derive(Clone, Debug, Derivative)]
#[derivative(Eq, Hash, PartialEq)]
pub struct ReferenceSymbolic {
    id: u32,

    #[derivative(PartialEq = "ignore", Hash = "ignore")]
    static_type: String,

    #[derivative(PartialEq = "ignore", Hash = "ignore")]
    origin: Origin,
}

impl ReferenceSymbolic {
    /// Constructs a symbolic reference with the provided `id`, static type
    /// and origin.
    ///
    /// The static type is a class name (`java/util/List`) or an array
    /// descriptor (`[I`).
    #[must_use]
    pub fn new(id: u32, static_type: impl Into<String>, origin: Origin) -> Self {
        let static_type = static_type.into();
        Self {
            id,
            static_type,
            origin,
        }
    }

    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[must_use]
    pub fn static_type(&self) -> &str {
        &self.static_type
    }

    #[must_use]
    pub fn origin(&self) -> &Origin {
        &self.origin
    }
}

impl Display for ReferenceSymbolic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{R{}}}", self.id)
    }
}

/// A reference value.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Reference {
    /// The null reference.
    Null,

    /// A reference to an object in the heap.
    Concrete(Address),

    /// A reference whose target is resolved lazily on first access.
    Symbolic(ReferenceSymbolic),
}

impl Reference {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn is_symbolic(&self) -> bool {
        matches!(self, Self::Symbolic(_))
    }

    /// Gets the symbolic reference, if this is one.
    #[must_use]
    pub fn as_symbolic(&self) -> Option<&ReferenceSymbolic> {
        match self {
            Self::Symbolic(symbolic) => Some(symbolic),
            _ => None,
        }
    }
}

impl Display for Reference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Concrete(address) => address.fmt(f),
            Self::Symbolic(symbolic) => symbolic.fmt(f),
        }
    }
}

impl From<ReferenceSymbolic> for Reference {
    fn from(value: ReferenceSymbolic) -> Self {
        Self::Symbolic(value)
    }
}

impl From<Address> for Reference {
    fn from(value: Address) -> Self {
        Self::Concrete(value)
    }
}

/// How a symbolic value came into existence.
///
/// The chain of containers rebuilds the access path from a root input, which
/// is what [`Display`] renders: `{ROOT}:list.head.next`, `{ROOT}:a[{V3}]` or
/// `{ROOT}:a.length`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Origin {
    /// A named input of the analysed method, such as a parameter.
    Root { name: String },

    /// The value of the instance field `field` of the object that `container`
    /// resolved to.
    Field {
        container: Rc<ReferenceSymbolic>,
        field:     String,
    },

    /// The member at `index` of the array that `container` resolved to.
    ArrayMember {
        container: Rc<ReferenceSymbolic>,
        index:     Rc<Primitive>,
    },

    /// The length of the array that `container` resolved to.
    ArrayLength { container: Rc<ReferenceSymbolic> },

    /// The `sequence`-th value returned by the native method `method`.
    Native { method: String, sequence: u32 },
}

impl Origin {
    /// Constructs a root origin for the input called `name`.
    #[must_use]
    pub fn root(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::Root { name }
    }

    /// Constructs the origin of field `field` in the object of `container`.
    #[must_use]
    pub fn field(container: &ReferenceSymbolic, field: impl Into<String>) -> Self {
        Self::Field {
            container: Rc::new(container.clone()),
            field:     field.into(),
        }
    }

    /// Constructs the origin of the member at `index` in the array of
    /// `container`.
    #[must_use]
    pub fn array_member(container: &ReferenceSymbolic, index: Primitive) -> Self {
        Self::ArrayMember {
            container: Rc::new(container.clone()),
            index:     Rc::new(index),
        }
    }

    /// Constructs the origin of the length of the array of `container`.
    #[must_use]
    pub fn array_length(container: &ReferenceSymbolic) -> Self {
        Self::ArrayLength {
            container: Rc::new(container.clone()),
        }
    }

    /// Gets the symbolic reference this origin hangs off, if any.
    #[must_use]
    pub fn container(&self) -> Option<&ReferenceSymbolic> {
        match self {
            Self::Field { container, .. }
            | Self::ArrayMember { container, .. }
            | Self::ArrayLength { container } => Some(container),
            Self::Root { .. } | Self::Native { .. } => None,
        }
    }
}

impl Display for Origin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root { name } => write!(f, "{ROOT_ORIGIN_PREFIX}:{name}"),
            Self::Field { container, field } => write!(f, "{}.{field}", container.origin()),
            Self::ArrayMember { container, index } => {
                write!(f, "{}[{index}]", container.origin())
            }
            Self::ArrayLength { container } => write!(f, "{}.length", container.origin()),
            Self::Native { method, sequence } => write!(f, "{{NATIVE}}:{method}#{sequence}"),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::val::{
        primitive::{Primitive, PrimitiveSymbolic},
        reference::{Origin, Reference, ReferenceSymbolic},
        types::PrimitiveType,
    };

    #[test]
    fn renders_access_paths() {
        let list = ReferenceSymbolic::new(0, "List", Origin::root("list"));
        let head = ReferenceSymbolic::new(1, "Node", Origin::field(&list, "head"));
        let next = Origin::field(&head, "next");
        assert_eq!(next.to_string(), "{ROOT}:list.head.next");

        let array = ReferenceSymbolic::new(2, "[I", Origin::root("a"));
        let index: Primitive =
            PrimitiveSymbolic::new(3, PrimitiveType::Int, Origin::root("i")).into();
        assert_eq!(
            Origin::array_member(&array, index).to_string(),
            "{ROOT}:a[{V3}]"
        );
        assert_eq!(Origin::array_length(&array).to_string(), "{ROOT}:a.length");
    }

    #[test]
    fn symbolic_references_compare_by_id() {
        let a = Reference::from(ReferenceSymbolic::new(4, "A", Origin::root("a")));
        let b = Reference::from(ReferenceSymbolic::new(4, "B", Origin::root("b")));
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "{R4}");
        assert!(Reference::Null.is_null());
    }
}
