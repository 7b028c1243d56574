use std::sync::Arc;

use allocative::{Allocative, Key, Visitor};
use bitvec::prelude::*;

use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::value::Value;

/// Typed, contiguous storage for the values of one column.
#[derive(Debug, Clone)]
pub enum ColumnData {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Text(Vec<Arc<str>>),
    /// Booleans packed one bit each.
    Bool(BitVec),
}

impl ColumnData {
    fn empty(data_type: DataType, capacity: usize) -> Self {
        match data_type {
            DataType::Int => Self::Int(Vec::with_capacity(capacity)),
            DataType::Float => Self::Float(Vec::with_capacity(capacity)),
            DataType::Text => Self::Text(Vec::with_capacity(capacity)),
            DataType::Bool => Self::Bool(BitVec::with_capacity(capacity)),
        }
    }

    /// Keeps the slots whose bit is set in `mask`, in order.
    fn select(&self, mask: &BitSlice) -> Self {
        match self {
            Self::Int(values) => Self::Int(mask.iter_ones().map(|i| values[i]).collect()),
            Self::Float(values) => Self::Float(mask.iter_ones().map(|i| values[i]).collect()),
            Self::Text(values) => {
                Self::Text(mask.iter_ones().map(|i| Arc::clone(&values[i])).collect())
            }
            Self::Bool(values) => Self::Bool(mask.iter_ones().map(|i| values[i]).collect()),
        }
    }
}

/// Storage for a single column of a table: the typed values plus a null
/// bitmap where a set bit marks a `NULL` slot.
///
/// Both always have the same length. A `NULL` still occupies a placeholder
/// slot in the data vector so positions line up.
#[derive(Debug, Clone)]
pub struct ColumnVector {
    data_type: DataType,
    data: ColumnData,
    null_bitmap: BitVec,
}

impl ColumnVector {
    pub fn new(data_type: DataType) -> Self {
        Self::with_capacity(data_type, 0)
    }

    pub fn with_capacity(data_type: DataType, capacity: usize) -> Self {
        Self {
            data_type,
            data: ColumnData::empty(data_type, capacity),
            null_bitmap: BitVec::with_capacity(capacity),
        }
    }

    /// A column of `len` copies of `value`.
    pub fn filled(data_type: DataType, value: &Value, len: usize) -> Result<Self> {
        let mut column = Self::with_capacity(data_type, len);
        for _ in 0..len {
            column.push(value.clone())?;
        }
        Ok(column)
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn len(&self) -> usize {
        self.null_bitmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether [ColumnVector::push] would store `value`.
    ///
    /// `NULL` fits every column and integers widen into float columns.
    pub fn accepts(&self, value: &Value) -> bool {
        match value.data_type() {
            None => true,
            Some(data_type) => {
                data_type == self.data_type
                    || (data_type == DataType::Int && self.data_type == DataType::Float)
            }
        }
    }

    /// Appends a value.
    ///
    /// # Errors
    /// Returns [Error::TypeMismatch] if the value does not fit the column; the
    /// column is left untouched.
    ///
    /// # Example
    /// ```
    /// # use pql::column::ColumnVector;
    /// # use pql::{DataType, Value};
    /// let mut ages = ColumnVector::new(DataType::Int);
    /// ages.push(Value::Int(30)).unwrap();
    /// ages.push(Value::Null).unwrap();
    ///
    /// assert_eq!(ages.len(), 2);
    /// assert!(ages.get(1).unwrap().is_null());
    /// ```
    pub fn push(&mut self, value: Value) -> Result<()> {
        match (&mut self.data, value) {
            (data, Value::Null) => {
                match data {
                    ColumnData::Int(values) => values.push(0),
                    ColumnData::Float(values) => values.push(0.0),
                    ColumnData::Text(values) => values.push(Arc::from("")),
                    ColumnData::Bool(values) => values.push(false),
                }
                self.null_bitmap.push(true);
                return Ok(());
            }
            (ColumnData::Int(values), Value::Int(v)) => values.push(v),
            (ColumnData::Float(values), Value::Float(v)) => values.push(v),
            (ColumnData::Float(values), Value::Int(v)) => values.push(v as f64),
            (ColumnData::Text(values), Value::Text(v)) => values.push(v),
            (ColumnData::Bool(values), Value::Bool(v)) => values.push(v),
            (_, other) => {
                return Err(Error::TypeMismatch {
                    expected: self.data_type.to_string(),
                    found: other.type_name(),
                });
            }
        }
        self.null_bitmap.push(false);
        Ok(())
    }

    /// The value at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<Value> {
        if index >= self.len() {
            return None;
        }
        if self.null_bitmap[index] {
            return Some(Value::Null);
        }
        let value = match &self.data {
            ColumnData::Int(values) => Value::Int(values[index]),
            ColumnData::Float(values) => Value::Float(values[index]),
            ColumnData::Text(values) => Value::Text(Arc::clone(&values[index])),
            ColumnData::Bool(values) => Value::Bool(values[index]),
        };
        Some(value)
    }

    pub fn is_null(&self, index: usize) -> bool {
        self.null_bitmap.get(index).is_some_and(|bit| *bit)
    }

    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        (0..self.len()).filter_map(|index| self.get(index))
    }

    /// Removes the value at `index`, shifting later values down.
    pub fn remove(&mut self, index: usize) -> Result<()> {
        if index >= self.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }
        match &mut self.data {
            ColumnData::Int(values) => {
                values.remove(index);
            }
            ColumnData::Float(values) => {
                values.remove(index);
            }
            ColumnData::Text(values) => {
                values.remove(index);
            }
            ColumnData::Bool(values) => {
                values.remove(index);
            }
        }
        self.null_bitmap.remove(index);
        Ok(())
    }

    /// A new column with only the positions whose bit is set in `mask`.
    ///
    /// `mask` must be exactly as long as the column.
    pub fn select(&self, mask: &BitSlice) -> Self {
        debug_assert_eq!(mask.len(), self.len());
        Self {
            data_type: self.data_type,
            data: self.data.select(mask),
            null_bitmap: mask.iter_ones().map(|i| self.null_bitmap[i]).collect(),
        }
    }
}

fn visit_bits(visitor: &mut Visitor<'_>, name: &'static str, bits: &BitVec) {
    visitor.visit_simple(Key::new(name), std::mem::size_of_val(bits.as_raw_slice()));
}

impl Allocative for ColumnVector {
    fn visit<'a, 'b: 'a>(&self, visitor: &'a mut Visitor<'b>) {
        let mut visitor = visitor.enter_self_sized::<Self>();
        match &self.data {
            ColumnData::Int(values) => visitor.visit_field(Key::new("int"), values),
            ColumnData::Float(values) => visitor.visit_field(Key::new("float"), values),
            ColumnData::Text(values) => visitor.visit_field(Key::new("text"), values),
            ColumnData::Bool(bits) => visit_bits(&mut visitor, "bool", bits),
        }
        visit_bits(&mut visitor, "null_bitmap", &self.null_bitmap);
        visitor.exit();
    }
}
