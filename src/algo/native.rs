//! This module contains the fallback for native methods that are known to
//! be pure, and the port to the concrete evaluator it relies on.
//!
//! # Fallback Policy
//!
//! A pure native method is not executed symbolically. Instead its result is
//! derived from its return type and arguments:
//!
//! - A `void` method has no effect.
//! - A method returning a primitive is evaluated concretely through the
//!   [`NativeReflect`] evaluator when all of its arguments are concrete, and
//!   becomes an uninterpreted function application over its arguments
//!   otherwise.
//! - A method returning a reference yields `null`. This is unsound, as the
//!   method may well return an object, and is logged as a warning every time
//!   it happens.
//!
//! A primitive-returning method that receives a reference cannot be handled
//! and fails with [`Error::CannotInvokeNative`].

use std::{collections::BTreeMap, fmt::Debug, rc::Rc};

use derivative::Derivative;

use crate::{
    bc::Signature,
    error::{
        execution::{Error, Result},
        value,
    },
    val::{types, Calculator, Primitive, PrimitiveType, Reference, Simplex, Value},
};

/// The interface to a concrete evaluator for native methods.
pub trait NativeReflect
where
    Self: Debug,
{
    /// Evaluates `method` on the concrete `args`. The receiver, if any, is
    /// not passed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CannotInvokeNative`] if the method cannot be
    /// evaluated.
    fn invoke(&self, method: &Signature, args: &[Simplex]) -> Result<Simplex>;
}

/// An evaluator that cannot evaluate anything.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NoReflection;

impl NativeReflect for NoReflection {
    fn invoke(&self, method: &Signature, _: &[Simplex]) -> Result<Simplex> {
        Err(cannot_invoke(method, "no native evaluator is configured"))
    }
}

/// The implementation of one native method in a [`NativeTable`]. It returns
/// [`None`] when it does not accept its arguments.
pub type NativeFunction = Rc<dyn Fn(&[Simplex]) -> Option<Simplex>>;

/// An evaluator backed by a table of implementations keyed by method
/// signature.
#[derive(Clone, Default, Derivative)]
#[derivative(Debug)]
pub struct NativeTable {
    #[derivative(Debug(format_with = "fmt_keys"))]
    functions: BTreeMap<String, NativeFunction>,
}

fn fmt_keys(
    functions: &BTreeMap<String, NativeFunction>,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    f.debug_list().entries(functions.keys()).finish()
}

impl NativeTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `function` as the implementation of `method`.
    #[must_use]
    pub fn with_function(
        mut self,
        method: &Signature,
        function: impl Fn(&[Simplex]) -> Option<Simplex> + 'static,
    ) -> Self {
        self.functions.insert(method.to_string(), Rc::new(function));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl NativeReflect for NativeTable {
    fn invoke(&self, method: &Signature, args: &[Simplex]) -> Result<Simplex> {
        let function = self
            .functions
            .get(&method.to_string())
            .ok_or_else(|| cannot_invoke(method, "no implementation is registered"))?;
        function(args)
            .ok_or_else(|| cannot_invoke(method, "the implementation rejected its arguments"))
    }
}

/// Computes the result of the pure native `method` on `args`, which exclude
/// the receiver of an instance method. Returns [`None`] for `void` methods.
///
/// # Errors
///
/// Returns [`Error::CannotInvokeNative`] if the method has a malformed
/// descriptor, takes a reference while returning a primitive, or cannot be
/// evaluated concretely.
pub fn invoke_pure(
    natives: &dyn NativeReflect,
    calc: Calculator,
    method: &Signature,
    args: &[Value],
) -> Result<Option<Value>> {
    let return_type =
        types::return_type(method.descriptor()).map_err(|e| cannot_invoke(method, e))?;
    if types::is_void(return_type) {
        return Ok(None);
    }
    let Some(ty) = PrimitiveType::from_descriptor(return_type) else {
        tracing::warn!(%method, "approximating the reference returned by a native with null");
        return Ok(Some(Reference::Null.into()));
    };

    let primitives = args
        .iter()
        .map(|arg| {
            arg.as_primitive().cloned().ok_or_else(|| {
                let value = arg.to_string();
                cannot_invoke(method, value::Error::ValueDoesNotSupportNative { value })
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let concrete = primitives
        .iter()
        .map(|primitive| primitive.as_simplex().copied())
        .collect::<Option<Vec<_>>>();
    let result = match concrete {
        Some(concrete) => {
            let result = natives.invoke(method, &concrete)?;
            if result.ty() != ty {
                let mismatch = value::Error::InvalidType {
                    expected: ty.to_string(),
                    found:    result.ty().to_string(),
                };
                return Err(cannot_invoke(method, mismatch));
            }
            Primitive::from(result)
        }
        None => calc.apply_function(ty, method.to_string(), primitives),
    };

    Ok(Some(result.into()))
}

fn cannot_invoke(method: &Signature, reason: impl ToString) -> Error {
    Error::CannotInvokeNative {
        method: method.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod test {
    use crate::{
        algo::native::{invoke_pure, NativeTable, NoReflection},
        bc::Signature,
        error::execution::Error,
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

    fn abs() -> Signature {
        Signature::new("java/lang/StrictMath", "abs", "(I)I")
    }

    fn table() -> NativeTable {
        NativeTable::new().with_function(&abs(), |args| match args {
            [Simplex::Int(value)] => Some(Simplex::Int(value.abs())),
            _ => None,
        })
    }

    #[test]
    fn void_methods_have_no_result() -> anyhow::Result<()> {
        let method = Signature::new("app/Log", "flush", "()V");
        assert_eq!(invoke_pure(&NoReflection, Calculator, &method, &[])?, None);
        Ok(())
    }

    #[test]
    fn concrete_arguments_are_evaluated() -> anyhow::Result<()> {
        let result = invoke_pure(&table(), Calculator, &abs(), &[Simplex::Int(-4).into()])?;
        assert_eq!(result, Some(Simplex::Int(4).into()));
        Ok(())
    }

    #[test]
    fn symbolic_arguments_become_applications() -> anyhow::Result<()> {
        let symbol = PrimitiveSymbolic::new(0, PrimitiveType::Int, Origin::root("x"));
        let arg = Value::from(Primitive::from(symbol));
        let result = invoke_pure(&NoReflection, Calculator, &abs(), &[arg])?;

        let Some(Value::Primitive(Primitive::Application(application))) = result else {
            panic!("Expected a function application");
        };
        assert_eq!(application.function(), "java/lang/StrictMath:abs:(I)I");
        assert_eq!(application.args().len(), 1);

        Ok(())
    }

    #[test]
    fn reference_returns_are_approximated_by_null() -> anyhow::Result<()> {
        let method = Signature::new("app/Cache", "lookup", "(I)Ljava/lang/Object;");
        let result = invoke_pure(&NoReflection, Calculator, &method, &[Simplex::Int(1).into()])?;
        assert_eq!(result, Some(Reference::Null.into()));
        Ok(())
    }

    #[test]
    fn references_cannot_be_passed_to_primitive_methods() {
        let method = Signature::new("app/Hash", "of", "(Ljava/lang/Object;)I");
        let error = invoke_pure(&table(), Calculator, &method, &[Reference::Null.into()])
            .expect_err("A reference was passed to a native method");
        assert!(matches!(error, Error::CannotInvokeNative { .. }));
    }

    #[test]
    fn missing_implementations_are_reported() {
        let method = Signature::new("app/Math", "twice", "(I)I");
        let error = invoke_pure(&table(), Calculator, &method, &[Simplex::Int(1).into()])
            .expect_err("Evaluated a method without an implementation");
        assert_eq!(
            error,
            Error::CannotInvokeNative {
                method: "app/Math:twice:(I)I".into(),
                reason: "no implementation is registered".into(),
            }
        );
    }
}
