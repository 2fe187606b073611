//! This module contains the port through which the engine learns about the
//! classes of the analysed program, and an in-memory implementation of it.
//!
//! Parsing class files is not the engine's job. The embedder supplies a
//! [`ClassHierarchy`] that answers the few questions the generator asks:
//! which class a name resolves to, which classes are assignable to which, and
//! which concrete classes a symbolic reference may be expanded to.

pub mod class_file;
pub mod table;

use std::fmt::Debug;

pub use class_file::{ClassFile, FieldInfo, Signature};
pub use table::ClassTable;

use crate::{
    constant::JAVA_OBJECT,
    error::class::{Error, Result},
    val::types,
};

/// The interfaces implemented by every array type.
const ARRAY_INTERFACES: [&str; 2] = ["java/lang/Cloneable", "java/io/Serializable"];

/// The class resolver consumed by the engine.
///
/// Implementors only need to provide [`Self::class_file`] and
/// [`Self::class_names`]. The remaining operations have default
/// implementations in terms of those two.
pub trait ClassHierarchy
where
    Self: Debug,
{
    /// Gets the class file for the class called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such class is known.
    fn class_file(&self, name: &str) -> Result<&ClassFile>;

    /// Gets the names of all known classes, in a deterministic order.
    fn class_names(&self) -> Vec<&str>;

    /// Resolves the class called `name` on behalf of the class `accessor`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the class does not exist, and
    /// [`Error::NotAccessible`] if it exists but `accessor` may not use it.
    fn resolve_class(&self, accessor: &str, name: &str) -> Result<&ClassFile> {
        let class = self.class_file(name)?;
        let same_package = class.package() == class_file::package_of(accessor);
        if class.is_public() || same_package {
            Ok(class)
        } else {
            Err(Error::NotAccessible {
                class_name: name.into(),
                accessor:   accessor.into(),
            })
        }
    }

    /// Checks if a value of static type `sub` may be stored in a location of
    /// static type `sup`.
    ///
    /// Both types are class names or array descriptors. Unknown classes are
    /// assignable to nothing but themselves and `java/lang/Object`.
    fn is_assignable(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || sup == JAVA_OBJECT {
            return true;
        }

        match (types::array_member_type(sub), types::array_member_type(sup)) {
            (Some(sub_member), Some(sup_member)) => {
                if types::is_primitive(sub_member) || types::is_primitive(sup_member) {
                    return sub_member == sup_member;
                }
                match (
                    types::static_type_of(sub_member),
                    types::static_type_of(sup_member),
                ) {
                    (Ok(sub_member), Ok(sup_member)) => self.is_assignable(sub_member, sup_member),
                    _ => false,
                }
            }
            (Some(_), None) => ARRAY_INTERFACES.contains(&sup),
            (None, Some(_)) => false,
            (None, None) => {
                let mut pending = vec![sub];
                let mut seen = Vec::new();
                while let Some(current) = pending.pop() {
                    if current == sup {
                        return true;
                    }
                    if seen.contains(&current) {
                        continue;
                    }
                    seen.push(current);
                    if let Ok(class) = self.class_file(current) {
                        pending.extend(class.superclass());
                        pending.extend(class.interfaces().iter().map(String::as_str));
                    }
                }
                false
            }
        }
    }

    /// Gets the classes that a symbolic reference of static type
    /// `static_type` may be expanded to, in a deterministic order.
    ///
    /// These are the concrete (neither abstract nor interface) classes
    /// assignable to `static_type`. An array type expands to itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `static_type` names an unknown class.
    fn expansion_classes(&self, static_type: &str) -> Result<Vec<String>> {
        if types::is_array(static_type) {
            return Ok(vec![static_type.to_string()]);
        }
        self.class_file(static_type)?;

        let classes = self
            .class_names()
            .into_iter()
            .filter(|name| {
                self.class_file(name).map_or(false, ClassFile::is_concrete)
                    && self.is_assignable(name, static_type)
            })
            .map(String::from)
            .collect();
        Ok(classes)
    }

    /// Gets the instance fields of the class called `name`, including the
    /// inherited ones, from the root of the hierarchy downwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the class or one of its superclasses is
    /// unknown.
    fn instance_fields(&self, name: &str) -> Result<Vec<FieldInfo>> {
        let mut chain = Vec::new();
        let mut current = Some(name);
        while let Some(class_name) = current {
            let class = self.class_file(class_name)?;
            chain.push(class);
            current = class.superclass();
        }

        let fields = chain
            .into_iter()
            .rev()
            .flat_map(|class| class.fields().iter().filter(|f| !f.is_static()).cloned())
            .collect();
        Ok(fields)
    }
}
