//! This module contains the [`Calculator`], which builds type-checked
//! primitive terms and folds the ground ones.

use crate::{
    error::value::{Error, Result},
    val::{
        primitive::{Expression, FunctionApplication, Operator, Primitive, Simplex},
        types::PrimitiveType,
    },
};

/// Builds primitive terms.
///
/// Operands are type-checked, and any expression whose operands are all
/// concrete is folded into a [`Simplex`]. Boolean connectives with one
/// concrete operand are simplified as well, so that guards such as
/// `true && x` stay readable.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Calculator;

impl Calculator {
    #[must_use]
    pub fn val_int(self, value: i32) -> Primitive {
        Simplex::Int(value).into()
    }

    #[must_use]
    pub fn val_long(self, value: i64) -> Primitive {
        Simplex::Long(value).into()
    }

    #[must_use]
    pub fn val_boolean(self, value: bool) -> Primitive {
        Simplex::Boolean(value).into()
    }

    /// Applies the unary `operator` to `operand`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the operator is not unary, or if the operand has the
    /// wrong type.
    pub fn unary(self, operator: Operator, operand: Primitive) -> Result<Primitive> {
        let ty = operand.ty();
        match operator {
            Operator::Not if ty == PrimitiveType::Boolean => {}
            Operator::Neg if ty.is_op_stack_native() => {}
            _ => return Err(invalid_operand(operator, ty)),
        }

        if let Primitive::Simplex(simplex) = &operand {
            if let Some(folded) = fold_unary(operator, *simplex) {
                return Ok(folded.into());
            }
        }

        // Double negations cancel.
        if let Primitive::Expression(inner) = &operand {
            if inner.operator() == operator && inner.first().is_none() {
                return Ok(inner.second().clone());
            }
        }

        Ok(Primitive::Expression(Expression::new_unchecked(
            operator, None, operand, ty,
        )))
    }

    /// Applies the binary `operator` to `first` and `second`.
    ///
    /// Both operands must have the same type. Arithmetic needs operands of
    /// an operand stack type (`int`, `long`, `float` or `double`), so that a
    /// result has the type of its operands whether it folds or not. The
    /// connectives need booleans, and comparisons accept any matching pair
    /// and produce a boolean.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the operator is unary or the operands have
    /// unsuitable types.
    pub fn binary(
        self,
        operator: Operator,
        first: Primitive,
        second: Primitive,
    ) -> Result<Primitive> {
        let ty = first.ty();
        if operator.is_unary() || second.ty() != ty {
            return Err(invalid_operand_pair(operator, ty, second.ty()));
        }

        let result_ty = if operator.is_comparison() {
            if !matches!(operator, Operator::Eq | Operator::Ne) && !ty.is_numeric() {
                return Err(invalid_operand(operator, ty));
            }
            PrimitiveType::Boolean
        } else if operator.is_logical() {
            if ty != PrimitiveType::Boolean {
                return Err(invalid_operand(operator, ty));
            }
            ty
        } else {
            if !ty.is_op_stack_native() {
                return Err(invalid_operand(operator, ty));
            }
            ty
        };

        if let (Primitive::Simplex(a), Primitive::Simplex(b)) = (&first, &second) {
            if let Some(folded) = fold_binary(operator, *a, *b) {
                return Ok(folded.into());
            }
        }

        if operator.is_logical() {
            if let Some(simplified) = simplify_connective(operator, &first, &second) {
                return Ok(simplified);
            }
        }

        Ok(Primitive::Expression(Expression::new_unchecked(
            operator,
            Some(first),
            second,
            result_ty,
        )))
    }

    /// Builds the application of the uninterpreted function `function` to
    /// `args`, returning a value of type `ty`.
    #[must_use]
    pub fn apply_function(
        self,
        ty: PrimitiveType,
        function: impl Into<String>,
        args: Vec<Primitive>,
    ) -> Primitive {
        Primitive::Application(FunctionApplication::new_unchecked(ty, function.into(), args))
    }

    /// Builds `first && second`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if either operand is not a boolean.
    pub fn and(self, first: Primitive, second: Primitive) -> Result<Primitive> {
        self.binary(Operator::And, first, second)
    }

    /// Builds the conjunction of all `terms`, which is `true` when there are
    /// none.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if any term is not a boolean.
    pub fn all(self, terms: impl IntoIterator<Item = Primitive>) -> Result<Primitive> {
        terms
            .into_iter()
            .try_fold(self.val_boolean(true), |acc, term| self.and(acc, term))
    }

    /// Builds `first == second`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the operand types differ.
    pub fn eq(self, first: Primitive, second: Primitive) -> Result<Primitive> {
        self.binary(Operator::Eq, first, second)
    }

    /// Builds `first != second`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the operand types differ.
    pub fn ne(self, first: Primitive, second: Primitive) -> Result<Primitive> {
        self.binary(Operator::Ne, first, second)
    }

    /// Builds `first < second`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the operands are not numeric values of one type.
    pub fn lt(self, first: Primitive, second: Primitive) -> Result<Primitive> {
        self.binary(Operator::Lt, first, second)
    }

    /// Builds `first >= second`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the operands are not numeric values of one type.
    pub fn ge(self, first: Primitive, second: Primitive) -> Result<Primitive> {
        self.binary(Operator::Ge, first, second)
    }

    /// Builds `!operand`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the operand is not a boolean.
    pub fn not(self, operand: Primitive) -> Result<Primitive> {
        self.unary(Operator::Not, operand)
    }
}

fn fold_unary(operator: Operator, operand: Simplex) -> Option<Simplex> {
    let folded = match (operator, operand) {
        (Operator::Not, Simplex::Boolean(value)) => Simplex::Boolean(!value),
        (Operator::Neg, Simplex::Int(value)) => Simplex::Int(value.wrapping_neg()),
        (Operator::Neg, Simplex::Long(value)) => Simplex::Long(value.wrapping_neg()),
        (Operator::Neg, Simplex::Float(value)) => Simplex::Float(-value),
        (Operator::Neg, Simplex::Double(value)) => Simplex::Double(-value),
        _ => return None,
    };
    Some(folded)
}

/// Folds an operation over two concrete operands of one type.
///
/// Returns [`None`] for integral division by zero, which has no value.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn fold_binary(operator: Operator, first: Simplex, second: Simplex) -> Option<Simplex> {
    if let (Some(a), Some(b)) = (first.as_bool(), second.as_bool()) {
        return Some(Simplex::Boolean(match operator {
            Operator::And => a && b,
            Operator::Or => a || b,
            Operator::Eq => a == b,
            Operator::Ne => a != b,
            _ => return None,
        }));
    }

    let ty = first.ty();
    if ty.is_integral() {
        let (a, b) = (first.as_i64()?, second.as_i64()?);
        if operator.is_comparison() {
            return Some(Simplex::Boolean(compare(operator, a.cmp(&b))));
        }
        if matches!(operator, Operator::Div | Operator::Rem) && b == 0 {
            return None;
        }
        let result = match operator {
            Operator::Add => a.wrapping_add(b),
            Operator::Sub => a.wrapping_sub(b),
            Operator::Mul => a.wrapping_mul(b),
            Operator::Div => a.wrapping_div(b),
            Operator::Rem => a.wrapping_rem(b),
            _ => return None,
        };
        return if ty == PrimitiveType::Long {
            Some(Simplex::Long(result))
        } else {
            // Int overflow wraps.
            Some(Simplex::Int(result as i32))
        };
    }

    let (a, b) = (first.as_f64()?, second.as_f64()?);
    if operator.is_comparison() {
        let verdict = match operator {
            Operator::Eq => a == b,
            Operator::Ne => a != b,
            Operator::Lt => a < b,
            Operator::Le => a <= b,
            Operator::Gt => a > b,
            _ => a >= b,
        };
        return Some(Simplex::Boolean(verdict));
    }
    let result = match operator {
        Operator::Add => a + b,
        Operator::Sub => a - b,
        Operator::Mul => a * b,
        Operator::Div => a / b,
        Operator::Rem => a % b,
        _ => return None,
    };
    if ty == PrimitiveType::Float {
        Some(Simplex::Float(result as f32))
    } else {
        Some(Simplex::Double(result))
    }
}

fn compare(operator: Operator, ordering: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::{Equal, Greater, Less};
    match operator {
        Operator::Eq => ordering == Equal,
        Operator::Ne => ordering != Equal,
        Operator::Lt => ordering == Less,
        Operator::Le => ordering != Greater,
        Operator::Gt => ordering == Greater,
        _ => ordering != Less,
    }
}

/// Simplifies a connective where one side is concrete.
fn simplify_connective(
    operator: Operator,
    first: &Primitive,
    second: &Primitive,
) -> Option<Primitive> {
    let absorbing = operator == Operator::Or;
    for (known, other) in [(first, second), (second, first)] {
        let Some(value) = known.as_simplex().and_then(Simplex::as_bool) else {
            continue;
        };
        return Some(if value == absorbing {
            Simplex::Boolean(absorbing).into()
        } else {
            other.clone()
        });
    }
    None
}

fn invalid_operand(operator: Operator, found: PrimitiveType) -> Error {
    Error::InvalidOperand {
        operator: operator.to_string(),
        found:    found.to_string(),
    }
}

fn invalid_operand_pair(operator: Operator, first: PrimitiveType, second: PrimitiveType) -> Error {
    Error::InvalidOperand {
        operator: operator.to_string(),
        found:    format!("{first} and {second}"),
    }
}

#[cfg(test)]
mod test {
    use crate::val::{
        calculator::Calculator,
        primitive::{Operator, Primitive, PrimitiveSymbolic, Simplex},
        reference::Origin,
        types::PrimitiveType,
    };

    fn int_symbol(id: u32) -> Primitive {
        PrimitiveSymbolic::new(id, PrimitiveType::Int, Origin::root(format!("i{id}"))).into()
    }

    fn bool_symbol(id: u32) -> Primitive {
        PrimitiveSymbolic::new(id, PrimitiveType::Boolean, Origin::root(format!("b{id}"))).into()
    }

    #[test]
    fn folds_ground_arithmetic() -> anyhow::Result<()> {
        let calc = Calculator;
        let sum = calc.binary(Operator::Add, calc.val_int(i32::MAX), calc.val_int(1))?;
        assert_eq!(sum, calc.val_int(i32::MIN));

        let rem = calc.binary(Operator::Rem, calc.val_long(-7), calc.val_long(3))?;
        assert_eq!(rem, calc.val_long(-1));

        let lt = calc.lt(calc.val_int(2), calc.val_int(3))?;
        assert!(lt.is_true());

        let nan = Primitive::from(Simplex::Double(f64::NAN));
        assert!(calc.eq(nan.clone(), nan)?.is_false());

        Ok(())
    }

    #[test]
    fn leaves_division_by_zero_unfolded() -> anyhow::Result<()> {
        let calc = Calculator;
        let div = calc.binary(Operator::Div, calc.val_int(1), calc.val_int(0))?;
        assert!(div.is_symbolic());
        assert_eq!(div.ty(), PrimitiveType::Int);

        Ok(())
    }

    #[test]
    fn builds_symbolic_comparisons() -> anyhow::Result<()> {
        let calc = Calculator;
        let guard = calc.ge(int_symbol(0), calc.val_int(0))?;
        assert_eq!(guard.ty(), PrimitiveType::Boolean);
        assert_eq!(guard.to_string(), "({V0} >= 0)");

        Ok(())
    }

    #[test]
    fn simplifies_connectives() -> anyhow::Result<()> {
        let calc = Calculator;
        let b = bool_symbol(1);
        assert_eq!(calc.and(calc.val_boolean(true), b.clone())?, b);
        assert!(calc.and(b.clone(), calc.val_boolean(false))?.is_false());
        assert!(calc
            .binary(Operator::Or, calc.val_boolean(true), b.clone())?
            .is_true());
        assert_eq!(calc.not(calc.not(b.clone())?)?, b);
        assert_eq!(calc.all([])?, calc.val_boolean(true));

        Ok(())
    }

    #[test]
    fn rejects_ill_typed_operands() {
        let calc = Calculator;
        calc.binary(Operator::Add, calc.val_int(1), calc.val_long(1))
            .expect_err("Mixed int and long");
        calc.binary(Operator::And, calc.val_int(1), calc.val_int(1))
            .expect_err("Conjunction of ints");
        calc.binary(Operator::Lt, calc.val_boolean(true), calc.val_boolean(false))
            .expect_err("Ordered booleans");
        calc.unary(Operator::Neg, calc.val_boolean(true))
            .expect_err("Negated a boolean");
        calc.binary(Operator::Neg, calc.val_int(1), calc.val_int(1))
            .expect_err("Used a unary operator as binary");
    }

    #[test]
    fn arithmetic_keeps_the_type_of_its_operands() -> anyhow::Result<()> {
        let calc = Calculator;
        let byte = Primitive::from(Simplex::Byte(3));
        calc.binary(Operator::Add, byte.clone(), byte.clone())
            .expect_err("Added bytes without widening them");
        calc.unary(Operator::Neg, Simplex::Short(2).into())
            .expect_err("Negated a short without widening it");

        let widened = byte.to(PrimitiveType::Int)?;
        let folded = calc.binary(Operator::Mul, widened.clone(), widened)?;
        let symbolic = calc.binary(Operator::Mul, int_symbol(4), calc.val_int(3))?;
        assert_eq!(folded, calc.val_int(9));
        assert_eq!(folded.ty(), symbolic.ty());

        let narrow = calc.lt(byte.clone(), Simplex::Byte(4).into())?;
        assert!(narrow.is_true());

        Ok(())
    }

    #[test]
    fn applies_functions() {
        let calc = Calculator;
        let app = calc.apply_function(
            PrimitiveType::Double,
            "java/lang/Math:sin:(D)D",
            vec![Simplex::Double(1.0).into()],
        );
        assert_eq!(app.ty(), PrimitiveType::Double);
        assert_eq!(app.to_string(), "java/lang/Math:sin:(D)D(1d)");
    }
}
