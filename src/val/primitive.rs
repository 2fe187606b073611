//! This module contains the primitive values: concrete [`Simplex`] values,
//! symbolic atoms, and the terms built over them.

use std::{
    fmt::{Display, Formatter},
    hash::{Hash, Hasher},
    rc::Rc,
};

use derivative::Derivative;
use itertools::Itertools;

use crate::{
    error::value::{Error, Result},
    val::{reference::Origin, types::PrimitiveType},
};

/// A concrete primitive value.
///
/// Equality and hashing are structural. Floating-point values compare by bit
/// pattern, so `NaN` equals itself and `0.0` differs from `-0.0`.
#[derive(Clone, Copy, Debug)]
pub enum Simplex {
    Boolean(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
}

impl Simplex {
    /// Gets the zero value of type `ty`.
    #[must_use]
    pub fn zero(ty: PrimitiveType) -> Self {
        match ty {
            PrimitiveType::Boolean => Self::Boolean(false),
            PrimitiveType::Byte => Self::Byte(0),
            PrimitiveType::Char => Self::Char(0),
            PrimitiveType::Short => Self::Short(0),
            PrimitiveType::Int => Self::Int(0),
            PrimitiveType::Long => Self::Long(0),
            PrimitiveType::Float => Self::Float(0.0),
            PrimitiveType::Double => Self::Double(0.0),
        }
    }

    /// Gets the type of the value.
    #[must_use]
    pub fn ty(&self) -> PrimitiveType {
        match self {
            Self::Boolean(_) => PrimitiveType::Boolean,
            Self::Byte(_) => PrimitiveType::Byte,
            Self::Char(_) => PrimitiveType::Char,
            Self::Short(_) => PrimitiveType::Short,
            Self::Int(_) => PrimitiveType::Int,
            Self::Long(_) => PrimitiveType::Long,
            Self::Float(_) => PrimitiveType::Float,
            Self::Double(_) => PrimitiveType::Double,
        }
    }

    /// Gets the value as a boolean, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Gets the value as an `i64`, if it is of integral type.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Byte(value) => Some(i64::from(value)),
            Self::Char(value) => Some(i64::from(value)),
            Self::Short(value) => Some(i64::from(value)),
            Self::Int(value) => Some(i64::from(value)),
            Self::Long(value) => Some(value),
            _ => None,
        }
    }

    /// Gets the value as an `f64`, if it is of numeric type.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float(value) => Some(f64::from(value)),
            Self::Double(value) => Some(value),
            _ => self.as_i64().map(|value| value as f64),
        }
    }

    /// Converts the value to the type `target` following the conversion
    /// rules of the bytecode.
    ///
    /// A boolean may only be converted to `int`, and nothing but a boolean
    /// may be converted to boolean.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the conversion is not supported.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to(self, target: PrimitiveType) -> Result<Self> {
        if self.ty() == target {
            return Ok(self);
        }

        if let Self::Boolean(value) = self {
            return if target == PrimitiveType::Int {
                Ok(Self::Int(i32::from(value)))
            } else {
                Err(invalid_conversion(self.ty(), target))
            };
        }

        let converted = match (self.as_i64(), target) {
            (_, PrimitiveType::Boolean) => return Err(invalid_conversion(self.ty(), target)),
            (Some(integral), PrimitiveType::Byte) => Self::Byte(integral as i8),
            (Some(integral), PrimitiveType::Char) => Self::Char(integral as u16),
            (Some(integral), PrimitiveType::Short) => Self::Short(integral as i16),
            (Some(integral), PrimitiveType::Int) => Self::Int(integral as i32),
            (Some(integral), PrimitiveType::Long) => Self::Long(integral),
            (None, _) => {
                // Floating-point sources. `as` saturates and maps NaN to zero,
                // which is what the bytecode requires.
                let real = self.as_f64().unwrap_or_default();
                match target {
                    PrimitiveType::Byte => Self::Byte(real as i32 as i8),
                    PrimitiveType::Char => Self::Char(real as i32 as u16),
                    PrimitiveType::Short => Self::Short(real as i32 as i16),
                    PrimitiveType::Int => Self::Int(real as i32),
                    PrimitiveType::Long => Self::Long(real as i64),
                    PrimitiveType::Float => Self::Float(real as f32),
                    PrimitiveType::Double => Self::Double(real),
                    PrimitiveType::Boolean => unreachable!("Handled above"),
                }
            }
            (Some(_), PrimitiveType::Float | PrimitiveType::Double) => {
                let real = self.as_f64().unwrap_or_default();
                if target == PrimitiveType::Float {
                    Self::Float(real as f32)
                } else {
                    Self::Double(real)
                }
            }
        };

        Ok(converted)
    }

    /// A key used for equality and hashing.
    fn key(&self) -> (PrimitiveType, u64) {
        #[allow(clippy::cast_sign_loss)]
        let bits = match *self {
            Self::Boolean(value) => u64::from(value),
            Self::Float(value) => u64::from(value.to_bits()),
            Self::Double(value) => value.to_bits(),
            _ => self.as_i64().unwrap_or_default() as u64,
        };
        (self.ty(), bits)
    }
}

impl PartialEq for Simplex {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Simplex {}

impl Hash for Simplex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl Display for Simplex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Byte(value) => write!(f, "(byte) {value}"),
            Self::Char(value) => write!(f, "(char) {value}"),
            Self::Short(value) => write!(f, "(short) {value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Long(value) => write!(f, "{value}L"),
            Self::Float(value) => write!(f, "{value}f"),
            Self::Double(value) => write!(f, "{value}d"),
        }
    }
}

/// A symbolic primitive atom.
///
/// Two atoms are the same atom exactly when their ids agree.
#[derive(Clone, Debug, Derivative)]
#[derivative(Eq, Hash, PartialEq)]
pub struct PrimitiveSymbolic {
    id: u32,

    #[derivative(PartialEq = "ignore", Hash = "ignore")]
    ty: PrimitiveType,

    #[derivative(PartialEq = "ignore", Hash = "ignore")]
    origin: Origin,
}

impl PrimitiveSymbolic {
    /// Constructs the atom with the provided `id`, type and origin.
    ///
    /// Ids are handed out by [`crate::mem::State::create_symbol_primitive`];
    /// constructing atoms directly is only useful in tests and decision
    /// procedures.
    #[must_use]
    pub fn new(id: u32, ty: PrimitiveType, origin: Origin) -> Self {
        Self { id, ty, origin }
    }

    /// Gets the identifier of the atom.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Gets the type of the atom.
    #[must_use]
    pub fn ty(&self) -> PrimitiveType {
        self.ty
    }

    /// Gets the description of how the atom was produced.
    #[must_use]
    pub fn origin(&self) -> &Origin {
        &self.origin
    }
}

impl Display for PrimitiveSymbolic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{V{}}}", self.id)
    }
}

/// The operators that can appear in an [`Expression`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Neg,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
}

impl Operator {
    /// Checks if the operator takes a single operand.
    #[must_use]
    pub fn is_unary(self) -> bool {
        matches!(self, Self::Neg | Self::Not)
    }

    /// Checks if the operator compares its operands, yielding a boolean.
    #[must_use]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }

    /// Checks if the operator is a boolean connective.
    #[must_use]
    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Not)
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Self::Add => "+",
            Self::Sub | Self::Neg => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
            Self::Not => "!",
        };
        write!(f, "{symbol}")
    }
}

/// A symbolic primitive built by applying an operator to one or two operands.
///
/// Expressions are built by the [`crate::val::Calculator`], which checks the
/// operand types. They are immutable and compared structurally.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Expression {
    operator: Operator,
    first:    Option<Rc<Primitive>>,
    second:   Rc<Primitive>,
    ty:       PrimitiveType,
}

impl Expression {
    /// Constructs an expression without checking it. Used by the calculator.
    pub(crate) fn new_unchecked(
        operator: Operator,
        first: Option<Primitive>,
        second: Primitive,
        ty: PrimitiveType,
    ) -> Self {
        let first = first.map(Rc::new);
        let second = Rc::new(second);
        Self {
            operator,
            first,
            second,
            ty,
        }
    }

    /// Gets the operator of the expression.
    #[must_use]
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Gets the first operand, which is absent for unary operators.
    #[must_use]
    pub fn first(&self) -> Option<&Primitive> {
        self.first.as_deref()
    }

    /// Gets the second (or only) operand.
    #[must_use]
    pub fn second(&self) -> &Primitive {
        &self.second
    }

    /// Gets the type of the expression's value.
    #[must_use]
    pub fn ty(&self) -> PrimitiveType {
        self.ty
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.first {
            Some(first) => write!(f, "({first} {} {})", self.operator, self.second),
            None => write!(f, "({}{})", self.operator, self.second),
        }
    }
}

/// An application of an uninterpreted function to primitive arguments.
///
/// Used for native methods that are called with symbolic arguments.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct FunctionApplication {
    ty:       PrimitiveType,
    function: String,
    args:     Vec<Primitive>,
}

impl FunctionApplication {
    pub(crate) fn new_unchecked(ty: PrimitiveType, function: String, args: Vec<Primitive>) -> Self {
        Self { ty, function, args }
    }

    /// Gets the name of the applied function.
    #[must_use]
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Gets the arguments of the application.
    #[must_use]
    pub fn args(&self) -> &[Primitive] {
        &self.args
    }

    /// Gets the return type of the application.
    #[must_use]
    pub fn ty(&self) -> PrimitiveType {
        self.ty
    }
}

impl Display for FunctionApplication {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.function, self.args.iter().join(", "))
    }
}

/// Whether a [`Conversion`] widens or narrows its operand.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ConversionKind {
    Widening,
    Narrowing,
}

/// A type conversion of a symbolic primitive.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Conversion {
    kind: ConversionKind,
    arg:  Rc<Primitive>,
    ty:   PrimitiveType,
}

impl Conversion {
    /// Gets whether the conversion widens or narrows.
    #[must_use]
    pub fn kind(&self) -> ConversionKind {
        self.kind
    }

    /// Gets the converted operand.
    #[must_use]
    pub fn arg(&self) -> &Primitive {
        &self.arg
    }

    /// Gets the target type of the conversion.
    #[must_use]
    pub fn ty(&self) -> PrimitiveType {
        self.ty
    }
}

impl Display for Conversion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.kind {
            ConversionKind::Widening => "WIDEN",
            ConversionKind::Narrowing => "NARROW",
        };
        write!(f, "{prefix}-{}({})", self.ty.descriptor(), self.arg)
    }
}

/// A primitive value, concrete or symbolic.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Primitive {
    /// A concrete value.
    Simplex(Simplex),

    /// An unconstrained symbolic atom.
    Symbol(PrimitiveSymbolic),

    /// An operator applied to other primitives.
    Expression(Expression),

    /// An uninterpreted function applied to other primitives.
    Application(FunctionApplication),

    /// A type conversion of another primitive.
    Conversion(Conversion),
}

impl Primitive {
    /// Gets the type of the value.
    #[must_use]
    pub fn ty(&self) -> PrimitiveType {
        match self {
            Self::Simplex(simplex) => simplex.ty(),
            Self::Symbol(symbol) => symbol.ty(),
            Self::Expression(expression) => expression.ty(),
            Self::Application(application) => application.ty(),
            Self::Conversion(conversion) => conversion.ty(),
        }
    }

    /// Checks if the value is anything but a concrete [`Simplex`].
    #[must_use]
    pub fn is_symbolic(&self) -> bool {
        !matches!(self, Self::Simplex(_))
    }

    /// Gets the concrete value, if this is one.
    #[must_use]
    pub fn as_simplex(&self) -> Option<&Simplex> {
        match self {
            Self::Simplex(simplex) => Some(simplex),
            _ => None,
        }
    }

    /// Checks if the value is the concrete boolean `true`.
    #[must_use]
    pub fn is_true(&self) -> bool {
        self.as_simplex().and_then(Simplex::as_bool) == Some(true)
    }

    /// Checks if the value is the concrete boolean `false`.
    #[must_use]
    pub fn is_false(&self) -> bool {
        self.as_simplex().and_then(Simplex::as_bool) == Some(false)
    }

    /// Converts the value to type `target`.
    ///
    /// Concrete values are converted directly. Symbolic values are wrapped in
    /// a widening or narrowing [`Conversion`].
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the conversion is not supported, such as converting
    /// a boolean to anything but `int`.
    pub fn to(&self, target: PrimitiveType) -> Result<Self> {
        let source = self.ty();
        if source == target {
            return Ok(self.clone());
        }
        if let Self::Simplex(simplex) = self {
            return simplex.to(target).map(Self::Simplex);
        }

        let boolean_to_int = source == PrimitiveType::Boolean && target == PrimitiveType::Int;
        if !boolean_to_int && (!source.is_numeric() || !target.is_numeric()) {
            return Err(invalid_conversion(source, target));
        }

        let kind = if source.rank() < target.rank() {
            ConversionKind::Widening
        } else {
            ConversionKind::Narrowing
        };
        Ok(Self::Conversion(Conversion {
            kind,
            arg: Rc::new(self.clone()),
            ty: target,
        }))
    }

    /// Collects the symbolic atoms occurring in the value, in order of first
    /// occurrence.
    #[must_use]
    pub fn symbols(&self) -> Vec<&PrimitiveSymbolic> {
        let mut found = Vec::new();
        self.collect_symbols(&mut found);
        found.into_iter().unique_by(|symbol| symbol.id()).collect()
    }

    fn collect_symbols<'a>(&'a self, found: &mut Vec<&'a PrimitiveSymbolic>) {
        match self {
            Self::Simplex(_) => {}
            Self::Symbol(symbol) => found.push(symbol),
            Self::Expression(expression) => {
                if let Some(first) = expression.first() {
                    first.collect_symbols(found);
                }
                expression.second().collect_symbols(found);
            }
            Self::Application(application) => {
                for arg in application.args() {
                    arg.collect_symbols(found);
                }
            }
            Self::Conversion(conversion) => conversion.arg().collect_symbols(found),
        }
    }
}

impl Display for Primitive {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simplex(simplex) => simplex.fmt(f),
            Self::Symbol(symbol) => symbol.fmt(f),
            Self::Expression(expression) => expression.fmt(f),
            Self::Application(application) => application.fmt(f),
            Self::Conversion(conversion) => conversion.fmt(f),
        }
    }
}

impl From<Simplex> for Primitive {
    fn from(value: Simplex) -> Self {
        Self::Simplex(value)
    }
}

impl From<PrimitiveSymbolic> for Primitive {
    fn from(value: PrimitiveSymbolic) -> Self {
        Self::Symbol(value)
    }
}

fn invalid_conversion(from: PrimitiveType, to: PrimitiveType) -> Error {
    Error::InvalidConversion {
        from: from.to_string(),
        to:   to.to_string(),
    }
}
