use std::{cmp::Ordering, fmt, sync::Arc};

use allocative::Allocative;

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::data_type::DataType;
use crate::error::{Error, Result};

/// Represents a single data value stored in the database.
///
/// This enum wraps all supported Rust types into a single type that can be
/// passed around the engine. It includes support for SQL `NULL` values.
#[derive(Debug, Clone, PartialEq, Allocative)]
pub enum Value {
    /// represents an empty or missing value.
    Null,
    /// A 64-bit signed integer value.
    Int(i64),
    /// A 64-bit floating-point value.
    Float(f64),
    /// A UTF-8 string value, wrapped in an [Arc] for efficient,
    /// thread-safe sharing and cheap cloning.
    Text(Arc<str>),
    /// A boolean value.
    Bool(bool),
}

impl Value {
    /// Returns `true` if the value is [Value::Null].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the inner integer value if this is a [Value::Int].
    /// Otherwise, returns `None`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the inner float value if this is a [Value::Float].
    /// Otherwise, returns `None`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns a reference to the inner string slice if this is a [Value::Text].
    /// Otherwise, returns `None`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the inner boolean value if this is a [Value::Bool].
    /// Otherwise, returns `None`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as a float if it is numeric (`Int` or `Float`).
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the logical [DataType] corresponding to this value.
    ///
    /// Returns `None` if the value is [Value::Null], because in this database
    /// engine, a standalone NULL value is untyped until it is placed in a column.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::Int(_) => Some(DataType::Int),
            Self::Float(_) => Some(DataType::Float),
            Self::Text(_) => Some(DataType::Text),
            Self::Bool(_) => Some(DataType::Bool),
        }
    }

    /// Name of the value's type, `NULL` included, for error messages.
    pub fn type_name(&self) -> String {
        self.data_type()
            .map_or_else(|| "NULL".to_string(), |t| t.to_string())
    }

    /// Loose truthiness used by the elementwise row operators.
    ///
    /// `NULL`, `FALSE`, zero and the empty string are false; everything else is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Text(s) => !s.is_empty(),
            Self::Bool(b) => *b,
        }
    }

    /// Applies a binary operator to `self` (left) and `rhs` (right).
    ///
    /// # Errors
    /// - [Error::IncompatibleOperands] when the operand types cannot be combined.
    /// - [Error::Arithmetic] on integer overflow or division by zero.
    /// - [Error::TypeMismatch] when a logical operator gets a non-boolean operand.
    ///
    /// # Example
    /// ```
    /// # use pql::{BinaryOperator, Value};
    /// let sum = Value::Int(2).apply(BinaryOperator::Add, &Value::Float(0.5)).unwrap();
    /// assert_eq!(sum, Value::Float(2.5));
    /// ```
    pub fn apply(&self, op: BinaryOperator, rhs: &Value) -> Result<Value> {
        if op.is_arithmetic() {
            self.arithmetic(op, rhs)
        } else if op.is_comparison() {
            self.comparison(op, rhs)
        } else {
            self.logical(op, rhs)
        }
    }

    /// Applies a unary operator.
    pub fn apply_unary(&self, op: UnaryOperator) -> Result<Value> {
        match (op, self) {
            (UnaryOperator::Not, _) => Ok(Self::Bool(!self.logical_operand(op.symbol())?)),
            (UnaryOperator::Neg, Self::Null) => Ok(Self::Null),
            (UnaryOperator::Neg, Self::Int(i)) => i
                .checked_neg()
                .map(Self::Int)
                .ok_or_else(|| Error::Arithmetic(format!("integer overflow negating {i}"))),
            (UnaryOperator::Neg, Self::Float(f)) => Ok(Self::Float(-f)),
            (UnaryOperator::Neg, other) => Err(Error::TypeMismatch {
                expected: "INT or FLOAT".to_string(),
                found: other.type_name(),
            }),
        }
    }

    /// Orders two values when they are comparable.
    ///
    /// Integers and floats compare numerically with each other; text, booleans
    /// and integers compare within their own type. `NULL` is never comparable.
    pub fn compare(&self, rhs: &Value) -> Option<Ordering> {
        match (self, rhs) {
            (Self::Int(l), Self::Int(r)) => Some(l.cmp(r)),
            (Self::Text(l), Self::Text(r)) => Some(l.cmp(r)),
            (Self::Bool(l), Self::Bool(r)) => Some(l.cmp(r)),
            _ => match (self.to_f64(), rhs.to_f64()) {
                (Some(l), Some(r)) => l.partial_cmp(&r),
                _ => None,
            },
        }
    }

    fn arithmetic(&self, op: BinaryOperator, rhs: &Value) -> Result<Value> {
        if self.is_null() || rhs.is_null() {
            return Ok(Self::Null);
        }

        match (self, rhs) {
            (Self::Int(l), Self::Int(r)) => int_arithmetic(op, *l, *r),
            (Self::Text(l), Self::Text(r)) if op == BinaryOperator::Add => {
                Ok(Self::Text(format!("{l}{r}").into()))
            }
            _ => match (self.to_f64(), rhs.to_f64()) {
                (Some(l), Some(r)) => float_arithmetic(op, l, r),
                _ => Err(self.incompatible(op, rhs)),
            },
        }
    }

    /// SQL comparison where `NULL` on either side is simply false.
    fn comparison(&self, op: BinaryOperator, rhs: &Value) -> Result<Value> {
        if self.is_null() || rhs.is_null() {
            return Ok(Self::Bool(false));
        }

        let ordering = self.compare(rhs);
        let result = match (op, ordering) {
            (BinaryOperator::Eq, ord) => ord == Some(Ordering::Equal),
            (BinaryOperator::NotEq, ord) => ord != Some(Ordering::Equal),
            (_, None) => return Err(self.incompatible(op, rhs)),
            (BinaryOperator::Lt, Some(ord)) => ord == Ordering::Less,
            (BinaryOperator::LtEq, Some(ord)) => ord != Ordering::Greater,
            (BinaryOperator::Gt, Some(ord)) => ord == Ordering::Greater,
            (BinaryOperator::GtEq, Some(ord)) => ord != Ordering::Less,
            (other, _) => return Err(Error::UnsupportedOperation(other.to_string())),
        };
        Ok(Self::Bool(result))
    }

    fn logical(&self, op: BinaryOperator, rhs: &Value) -> Result<Value> {
        let l = self.logical_operand(op.symbol())?;
        let r = rhs.logical_operand(op.symbol())?;
        match op {
            BinaryOperator::And => Ok(Self::Bool(l && r)),
            BinaryOperator::Or => Ok(Self::Bool(l || r)),
            other => Err(Error::UnsupportedOperation(other.to_string())),
        }
    }

    /// A logical operand must be boolean; `NULL` counts as false.
    fn logical_operand(&self, op: &str) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Null => Ok(false),
            other => Err(Error::TypeMismatch {
                expected: format!("BOOL operand for {op}"),
                found: other.type_name(),
            }),
        }
    }

    fn incompatible(&self, op: BinaryOperator, rhs: &Value) -> Error {
        Error::IncompatibleOperands {
            op: op.to_string(),
            left: self.type_name(),
            right: rhs.type_name(),
        }
    }
}

fn int_arithmetic(op: BinaryOperator, l: i64, r: i64) -> Result<Value> {
    let result = match op {
        BinaryOperator::Add => l.checked_add(r),
        BinaryOperator::Sub => l.checked_sub(r),
        BinaryOperator::Mul => l.checked_mul(r),
        // true division, like the `/` of the query language
        BinaryOperator::Div => return float_arithmetic(op, l as f64, r as f64),
        BinaryOperator::Mod => {
            if r == 0 {
                return Err(Error::Arithmetic("modulo by zero".into()));
            }
            l.checked_rem(r)
        }
        other => return Err(Error::UnsupportedOperation(other.to_string())),
    };
    result
        .map(Value::Int)
        .ok_or_else(|| Error::Arithmetic(format!("integer overflow in {l} {op} {r}")))
}

fn float_arithmetic(op: BinaryOperator, l: f64, r: f64) -> Result<Value> {
    let result = match op {
        BinaryOperator::Add => l + r,
        BinaryOperator::Sub => l - r,
        BinaryOperator::Mul => l * r,
        BinaryOperator::Div => {
            if r == 0.0 {
                return Err(Error::Arithmetic("division by zero".into()));
            }
            l / r
        }
        BinaryOperator::Mod => {
            if r == 0.0 {
                return Err(Error::Arithmetic("modulo by zero".into()));
            }
            l % r
        }
        other => return Err(Error::UnsupportedOperation(other.to_string())),
    };
    Ok(Value::Float(result))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::Bool(true) => f.write_str("TRUE"),
            Self::Bool(false) => f.write_str("FALSE"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value.into())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
