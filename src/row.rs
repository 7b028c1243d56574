use std::fmt;

use allocative::Allocative;

use crate::ast::BinaryOperator;
use crate::error::{Error, Result};
use crate::value::Value;

/// Builds a [Row] from anything convertible into a [Value].
///
/// ```
/// # use pql::{row, Value};
/// let row = row![1, "Alice", 30];
/// assert_eq!(row.get(1), Some(&Value::from("Alice")));
/// ```
#[macro_export]
macro_rules! row {
    ($($value:expr),* $(,)?) => {
        $crate::Row::new(vec![$($crate::Value::from($value)),*])
    };
}

/// An ordered tuple of values.
///
/// Rows are never mutated in place; every operator returns a new row. The
/// elementwise operators accept any other operand that derefs to a value
/// slice (another row, an array, a vec) and require equal arity.
#[derive(Debug, Clone, Default, PartialEq, Allocative)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn arity(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    /// Applies `op` pairwise to this row and `other`.
    ///
    /// `AND` and `OR` follow [Row::and] and [Row::or] rather than the strict
    /// boolean rules of [Value::apply].
    pub fn apply<R>(&self, op: BinaryOperator, other: &R) -> Result<Row>
    where
        R: AsRef<[Value]> + ?Sized,
    {
        match op {
            BinaryOperator::And => self.and(other),
            BinaryOperator::Or => self.or(other),
            _ => self.zip_with(other, |l, r| l.apply(op, r)),
        }
    }

    pub fn add<R: AsRef<[Value]> + ?Sized>(&self, other: &R) -> Result<Row> {
        self.apply(BinaryOperator::Add, other)
    }

    pub fn sub<R: AsRef<[Value]> + ?Sized>(&self, other: &R) -> Result<Row> {
        self.apply(BinaryOperator::Sub, other)
    }

    pub fn mul<R: AsRef<[Value]> + ?Sized>(&self, other: &R) -> Result<Row> {
        self.apply(BinaryOperator::Mul, other)
    }

    pub fn div<R: AsRef<[Value]> + ?Sized>(&self, other: &R) -> Result<Row> {
        self.apply(BinaryOperator::Div, other)
    }

    pub fn rem<R: AsRef<[Value]> + ?Sized>(&self, other: &R) -> Result<Row> {
        self.apply(BinaryOperator::Mod, other)
    }

    pub fn gt<R: AsRef<[Value]> + ?Sized>(&self, other: &R) -> Result<Row> {
        self.apply(BinaryOperator::Gt, other)
    }

    pub fn ge<R: AsRef<[Value]> + ?Sized>(&self, other: &R) -> Result<Row> {
        self.apply(BinaryOperator::GtEq, other)
    }

    pub fn lt<R: AsRef<[Value]> + ?Sized>(&self, other: &R) -> Result<Row> {
        self.apply(BinaryOperator::Lt, other)
    }

    pub fn le<R: AsRef<[Value]> + ?Sized>(&self, other: &R) -> Result<Row> {
        self.apply(BinaryOperator::LtEq, other)
    }

    pub fn equal<R: AsRef<[Value]> + ?Sized>(&self, other: &R) -> Result<Row> {
        self.apply(BinaryOperator::Eq, other)
    }

    pub fn not_equal<R: AsRef<[Value]> + ?Sized>(&self, other: &R) -> Result<Row> {
        self.apply(BinaryOperator::NotEq, other)
    }

    /// Pairwise logical AND over the truthiness of each value.
    pub fn and<R: AsRef<[Value]> + ?Sized>(&self, other: &R) -> Result<Row> {
        self.zip_with(other, |l, r| Ok(Value::Bool(l.is_truthy() && r.is_truthy())))
    }

    /// Pairwise logical OR when both rows hold only booleans; otherwise the
    /// two rows are concatenated.
    ///
    /// ```
    /// # use pql::row;
    /// assert_eq!(row![true, false].or(&row![false, false]).unwrap(), row![true, false]);
    /// assert_eq!(row![1, 2].or(&row![3, 4]).unwrap(), row![1, 2, 3, 4]);
    /// ```
    pub fn or<R: AsRef<[Value]> + ?Sized>(&self, other: &R) -> Result<Row> {
        let other = other.as_ref();
        let all_bool = self
            .values
            .iter()
            .chain(other)
            .all(|value| matches!(value, Value::Bool(_)));

        if all_bool {
            self.zip_with(other, |l, r| Ok(Value::Bool(l.is_truthy() || r.is_truthy())))
        } else {
            Ok(self.values.iter().chain(other).cloned().collect())
        }
    }

    pub fn not(&self) -> Row {
        self.map(|value| Value::Bool(!value.is_truthy()))
    }

    pub fn is_null(&self) -> Row {
        self.map(|value| Value::Bool(value.is_null()))
    }

    pub fn is_not_null(&self) -> Row {
        self.map(|value| Value::Bool(!value.is_null()))
    }

    /// Replaces every `NULL` with the value at the same position in `other`.
    pub fn coalesce<R: AsRef<[Value]> + ?Sized>(&self, other: &R) -> Result<Row> {
        self.zip_with(other, |l, r| Ok(if l.is_null() { r.clone() } else { l.clone() }))
    }

    fn map<F>(&self, f: F) -> Row
    where
        F: FnMut(&Value) -> Value,
    {
        self.values.iter().map(f).collect()
    }

    fn zip_with<R, F>(&self, other: &R, mut f: F) -> Result<Row>
    where
        R: AsRef<[Value]> + ?Sized,
        F: FnMut(&Value, &Value) -> Result<Value>,
    {
        let other = other.as_ref();
        if other.len() != self.arity() {
            return Err(Error::ArityMismatch {
                expected: self.arity(),
                found: other.len(),
            });
        }
        self.values
            .iter()
            .zip(other)
            .map(|(l, r)| f(l, r))
            .collect::<Result<Vec<_>>>()
            .map(Row::new)
    }
}

impl AsRef<[Value]> for Row {
    fn as_ref(&self) -> &[Value] {
        &self.values
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl FromIterator<Value> for Row {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, ")")
    }
}
