//! Row-at-a-time evaluation of expressions and predicates.

use crate::ast::{BinaryOperator, Expr};
use crate::error::{Error, Result};
use crate::row::Row;
use crate::schema::Schema;
use crate::value::Value;

impl Expr {
    /// Computes the value of the expression for one row.
    ///
    /// Column references are looked up by name in `schema`; any table
    /// qualifier is ignored here and checked by the query pipeline instead.
    ///
    /// # Errors
    /// - [Error::UnknownColumn] if a referenced column is not in the schema.
    /// - Any error raised by the operators, see [Value::apply].
    pub fn resolve(&self, row: &Row, schema: &Schema) -> Result<Value> {
        match self {
            Self::Literal(lit) => Ok(lit.to_value()),
            Self::Column(col) => {
                let position = schema.index_of(&col.name)?;
                row.get(position).cloned().ok_or(Error::ArityMismatch {
                    expected: schema.len(),
                    found: row.arity(),
                })
            }
            Self::Binary { left, op, right } => {
                let left = left.resolve(row, schema)?;
                match (op, &left) {
                    (BinaryOperator::And, Value::Bool(false) | Value::Null) => {
                        return Ok(Value::Bool(false));
                    }
                    (BinaryOperator::Or, Value::Bool(true)) => return Ok(Value::Bool(true)),
                    _ => {}
                }
                let right = right.resolve(row, schema)?;
                left.apply(*op, &right)
            }
            Self::Unary { op, operand } => operand.resolve(row, schema)?.apply_unary(*op),
            Self::Wildcard => Err(Error::UnsupportedOperation(
                "* outside of a select list".into(),
            )),
        }
    }
}

/// Evaluates `expr` against `row`.
pub fn evaluate(expr: &Expr, row: &Row, schema: &Schema) -> Result<Value> {
    expr.resolve(row, schema)
}

/// Evaluates `expr` and requires a boolean result.
///
/// # Errors
/// Returns [Error::TypeMismatch] when the expression yields anything but a `BOOL`.
pub fn evaluate_predicate(expr: &Expr, row: &Row, schema: &Schema) -> Result<bool> {
    expect_bool(expr.resolve(row, schema)?)
}

fn expect_bool(value: Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(Error::TypeMismatch {
            expected: "BOOL".into(),
            found: other.type_name(),
        }),
    }
}

/// Anything that can decide whether a row passes a filter.
pub trait Predicate {
    fn test(&self, row: &Row, schema: &Schema) -> Result<bool>;
}

impl Predicate for Expr {
    fn test(&self, row: &Row, schema: &Schema) -> Result<bool> {
        evaluate_predicate(self, row, schema)
    }
}

impl<P: Predicate + ?Sized> Predicate for Box<P> {
    fn test(&self, row: &Row, schema: &Schema) -> Result<bool> {
        (**self).test(row, schema)
    }
}

impl<P: Predicate + ?Sized> Predicate for &P {
    fn test(&self, row: &Row, schema: &Schema) -> Result<bool> {
        (**self).test(row, schema)
    }
}

/// A single binary test between two expressions, e.g. `AGE > 30`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub left: Expr,
    pub op: BinaryOperator,
    pub right: Expr,
}

impl Condition {
    /// Builds a condition from an operator symbol such as `>=` or `AND`.
    ///
    /// # Example
    /// ```
    /// # use pql::ast::Expr;
    /// # use pql::eval::Condition;
    /// let cond = Condition::new(Expr::column("AGE"), ">", Expr::literal(30_i64)).unwrap();
    /// assert!(Condition::new(Expr::column("AGE"), "LIKE", Expr::literal("A%")).is_err());
    /// # let _ = cond;
    /// ```
    ///
    /// # Errors
    /// Returns [Error::UnsupportedOperation] for an unknown symbol.
    pub fn new(left: Expr, symbol: &str, right: Expr) -> Result<Self> {
        Ok(Self {
            left,
            op: BinaryOperator::from_symbol(symbol)?,
            right,
        })
    }

    /// Evaluates both sides against the row and applies the operator.
    ///
    /// # Errors
    /// Returns [Error::TypeMismatch] if the operator does not produce a boolean,
    /// as with arithmetic operators.
    pub fn evaluate(&self, row: &Row, schema: &Schema) -> Result<bool> {
        let left = self.left.resolve(row, schema)?;
        let right = self.right.resolve(row, schema)?;
        expect_bool(left.apply(self.op, &right)?)
    }

    /// The equivalent expression tree.
    pub fn to_expr(&self) -> Expr {
        Expr::binary(self.left.clone(), self.op, self.right.clone())
    }
}

impl Predicate for Condition {
    fn test(&self, row: &Row, schema: &Schema) -> Result<bool> {
        self.evaluate(row, schema)
    }
}
