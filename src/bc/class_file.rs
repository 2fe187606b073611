//! This module contains the engine's view of a class: its name, its place in
//! the hierarchy and its fields.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::constant::JAVA_OBJECT;

/// Gets the package part of a class name: everything before the last `/`.
#[must_use]
pub fn package_of(class_name: &str) -> &str {
    class_name.rsplit_once('/').map_or("", |(package, _)| package)
}

/// Identifies a method or a field by its declaring class, name and
/// descriptor.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Signature {
    class_name: String,
    name:       String,
    descriptor: String,
}

impl Signature {
    #[must_use]
    pub fn new(
        class_name: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            name:       name.into(),
            descriptor: descriptor.into(),
        }
    }

    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.class_name, self.name, self.descriptor)
    }
}

/// A field declared by a class.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct FieldInfo {
    name:       String,
    descriptor: String,
    is_static:  bool,
}

impl FieldInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>, is_static: bool) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            is_static,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }
}

/// A class of the analysed program.
///
/// Class files are built with the `with_*` methods:
///
/// ```
/// use symbolic_bytecode_engine::bc::ClassFile;
///
/// let node = ClassFile::new("app/Node")
///     .with_field("value", "I")
///     .with_field("next", "Lapp/Node;");
/// assert_eq!(node.superclass(), Some("java/lang/Object"));
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ClassFile {
    name:         String,
    superclass:   Option<String>,
    interfaces:   Vec<String>,
    is_public:    bool,
    is_abstract:  bool,
    is_interface: bool,
    fields:       Vec<FieldInfo>,
}

impl ClassFile {
    /// Constructs a public, concrete class called `name` that extends
    /// `java/lang/Object` and declares no fields.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let superclass = (name != JAVA_OBJECT).then(|| JAVA_OBJECT.to_string());
        Self {
            name,
            superclass,
            interfaces: Vec::new(),
            is_public: true,
            is_abstract: false,
            is_interface: false,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_superclass(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    #[must_use]
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Adds an instance field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        self.fields.push(FieldInfo::new(name, descriptor, false));
        self
    }

    /// Adds a static field.
    #[must_use]
    pub fn with_static_field(
        mut self,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        self.fields.push(FieldInfo::new(name, descriptor, true));
        self
    }

    /// Marks the class as an interface, which is also abstract.
    #[must_use]
    pub fn interface(mut self) -> Self {
        self.is_interface = true;
        self.is_abstract = true;
        self
    }

    #[must_use]
    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Makes the class accessible only from its own package.
    #[must_use]
    pub fn package_private(mut self) -> Self {
        self.is_public = false;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn package(&self) -> &str {
        package_of(&self.name)
    }

    #[must_use]
    pub fn superclass(&self) -> Option<&str> {
        self.superclass.as_deref()
    }

    #[must_use]
    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    #[must_use]
    pub fn is_public(&self) -> bool {
        self.is_public
    }

    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.is_interface
    }

    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Checks if instances of exactly this class can exist.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        !self.is_abstract && !self.is_interface
    }
}
