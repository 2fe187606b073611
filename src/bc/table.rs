//! This module contains an in-memory [`ClassHierarchy`].

use std::collections::BTreeMap;

use crate::{
    bc::{ClassFile, ClassHierarchy},
    constant::JAVA_OBJECT,
    error::class::{Error, Result},
};

/// A class hierarchy backed by a table of [`ClassFile`]s, keyed and iterated
/// by class name.
///
/// A new table already contains `java/lang/Object`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClassTable {
    classes: BTreeMap<String, ClassFile>,
}

impl ClassTable {
    #[must_use]
    pub fn new() -> Self {
        let mut classes = BTreeMap::new();
        classes.insert(JAVA_OBJECT.to_string(), ClassFile::new(JAVA_OBJECT));
        Self { classes }
    }

    /// Adds `class` to the table, replacing any class of the same name.
    pub fn insert(&mut self, class: ClassFile) {
        self.classes.insert(class.name().to_string(), class);
    }

    /// Adds `class` to the table and returns the table.
    #[must_use]
    pub fn with_class(mut self, class: ClassFile) -> Self {
        self.insert(class);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassHierarchy for ClassTable {
    fn class_file(&self, name: &str) -> Result<&ClassFile> {
        self.classes.get(name).ok_or_else(|| Error::NotFound {
            class_name: name.into(),
        })
    }

    fn class_names(&self) -> Vec<&str> {
        self.classes.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod test {
    use crate::{
        bc::{ClassFile, ClassHierarchy, ClassTable},
        error::class::Error,
    };

    #[test]
    fn starts_with_the_root_class() {
        let table = ClassTable::new();
        assert_eq!(table.len(), 1);
        assert!(table.class_file("java/lang/Object").is_ok());
    }

    #[test]
    fn reports_missing_classes() {
        let table = ClassTable::new().with_class(ClassFile::new("app/A"));
        assert_eq!(
            table.class_file("app/B"),
            Err(Error::NotFound {
                class_name: "app/B".into(),
            })
        );
        assert_eq!(table.class_names(), vec!["app/A", "java/lang/Object"]);
    }
}
