//! Syntax tree produced by the [parser](crate::parser).
//!
//! Every node category is a closed enum so consumers must handle all variants.
//! Nodes own their children; there are no parent links.

use std::fmt;

use crate::error::{Error, Result};
use crate::value::Value;

/// A constant written in the query text.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
}

impl Literal {
    /// Converts the literal into the runtime [Value] it denotes.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(i) => Value::Int(*i),
            Self::Float(f) => Value::Float(*f),
            Self::String(s) => Value::Text(s.as_str().into()),
            Self::Bool(b) => Value::Bool(*b),
        }
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "'{s}'"),
            other => write!(f, "{}", other.to_value()),
        }
    }
}

/// A possibly table-qualified column name (`AGE`, `U.AGE`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{table}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Binary operators, resolved from their symbol once at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOperator {
    /// The fixed operator table. `!=` and `<>` are synonyms.
    ///
    /// # Errors
    /// Returns [Error::UnsupportedOperation] for any symbol outside the table.
    pub fn from_symbol(symbol: &str) -> Result<Self> {
        let op = match symbol.to_uppercase().as_str() {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Mod,
            "=" => Self::Eq,
            "!=" | "<>" => Self::NotEq,
            "<" => Self::Lt,
            "<=" => Self::LtEq,
            ">" => Self::Gt,
            ">=" => Self::GtEq,
            "AND" => Self::And,
            "OR" => Self::Or,
            _ => return Err(Error::UnsupportedOperation(symbol.to_string())),
        };
        Ok(op)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// Logical `NOT`.
    Not,
    /// Arithmetic negation `-`.
    Neg,
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Not => "NOT",
            Self::Neg => "-",
        }
    }
}

/// A scalar expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Column(ColumnRef),
    Binary {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    /// `*` in a select list. Only meaningful there; it never evaluates to a value.
    Wildcard,
}

impl Expr {
    /// An unqualified column reference.
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(ColumnRef {
            table: None,
            name: name.into(),
        })
    }

    /// A column reference qualified by a table name or alias.
    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Column(ColumnRef {
            table: Some(table.into()),
            name: name.into(),
        })
    }

    pub fn literal(value: impl Into<Literal>) -> Self {
        Self::Literal(value.into())
    }

    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Self {
        Self::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOperator, operand: Expr) -> Self {
        Self::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Calls `visit` on every column reference in the expression, left to right.
    pub fn visit_columns<'a, F>(&'a self, visit: &mut F) -> Result<()>
    where
        F: FnMut(&'a ColumnRef) -> Result<()>,
    {
        match self {
            Self::Column(col) => visit(col),
            Self::Binary { left, right, .. } => {
                left.visit_columns(visit)?;
                right.visit_columns(visit)
            }
            Self::Unary { operand, .. } => operand.visit_columns(visit),
            Self::Literal(_) | Self::Wildcard => Ok(()),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Column(col) => write!(f, "{col}"),
            Self::Binary { left, op, right } => {
                write_operand(f, left)?;
                write!(f, " {op} ")?;
                write_operand(f, right)
            }
            Self::Unary {
                op: UnaryOperator::Not,
                operand,
            } => {
                f.write_str("NOT ")?;
                write_operand(f, operand)
            }
            Self::Unary {
                op: UnaryOperator::Neg,
                operand,
            } => {
                f.write_str("-")?;
                write_operand(f, operand)
            }
            Self::Wildcard => f.write_str("*"),
        }
    }
}

/// Nested binary expressions are parenthesised so the rendering is unambiguous.
fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    match expr {
        Expr::Binary { .. } => write!(f, "({expr})"),
        other => write!(f, "{other}"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

/// A parenthesised query used as a table source.
#[derive(Debug, Clone, PartialEq)]
pub struct SubqueryRef {
    pub query: Box<SelectQuery>,
    pub alias: Option<String>,
}

/// Anything that can appear after `FROM` or `JOIN`.
#[derive(Debug, Clone, PartialEq)]
pub enum FromItem {
    Table(TableRef),
    Subquery(SubqueryRef),
}

impl FromItem {
    /// The name column references use to qualify this source: the alias if
    /// there is one, otherwise the table name. Unaliased subqueries have none.
    pub fn binding_name(&self) -> Option<&str> {
        match self {
            Self::Table(table) => Some(table.alias.as_deref().unwrap_or(&table.name)),
            Self::Subquery(sub) => sub.alias.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub right: FromItem,
    pub condition: Expr,
}

/// One entry of the select list.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expr: Expr,
    pub direction: SortDirection,
}

/// Root node of a parsed query.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub select: Vec<SelectItem>,
    pub from: FromItem,
    pub joins: Vec<Join>,
    pub where_clause: Option<Expr>,
    pub group_by: Option<Vec<Expr>>,
    pub having: Option<Expr>,
    pub order_by: Option<Vec<OrderByItem>>,
    pub limit: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_table() {
        assert_eq!(BinaryOperator::from_symbol("+"), Ok(BinaryOperator::Add));
        assert_eq!(BinaryOperator::from_symbol(">="), Ok(BinaryOperator::GtEq));
        assert_eq!(BinaryOperator::from_symbol("and"), Ok(BinaryOperator::And));
        assert_eq!(
            BinaryOperator::from_symbol("!="),
            BinaryOperator::from_symbol("<>")
        );
        assert!(matches!(
            BinaryOperator::from_symbol("=="),
            Err(Error::UnsupportedOperation(_))
        ));
        assert!(matches!(
            BinaryOperator::from_symbol("LIKE"),
            Err(Error::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_operator_classes() {
        assert!(BinaryOperator::Mod.is_arithmetic());
        assert!(BinaryOperator::NotEq.is_comparison());
        assert!(BinaryOperator::Or.is_logical());
        assert!(!BinaryOperator::Or.is_comparison());
    }

    #[test]
    fn test_expr_display() {
        let expr = Expr::binary(
            Expr::binary(Expr::column("SALARY"), BinaryOperator::Add, Expr::column("BONUS")),
            BinaryOperator::Mul,
            Expr::literal(0.5),
        );
        assert_eq!(expr.to_string(), "(SALARY + BONUS) * 0.5");

        let expr = Expr::unary(UnaryOperator::Not, Expr::qualified("U", "ACTIVE"));
        assert_eq!(expr.to_string(), "NOT U.ACTIVE");
        assert_eq!(Expr::literal("A").to_string(), "'A'");
    }

    #[test]
    fn test_visit_columns() {
        let expr = Expr::binary(
            Expr::column("A"),
            BinaryOperator::And,
            Expr::unary(UnaryOperator::Not, Expr::qualified("T", "B")),
        );
        let mut seen = Vec::new();
        expr.visit_columns(&mut |col| {
            seen.push(col.to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec!["A", "T.B"]);
    }

    #[test]
    fn test_binding_name() {
        let plain = FromItem::Table(TableRef {
            name: "USERS".into(),
            alias: None,
        });
        let aliased = FromItem::Table(TableRef {
            name: "USERS".into(),
            alias: Some("U".into()),
        });
        assert_eq!(plain.binding_name(), Some("USERS"));
        assert_eq!(aliased.binding_name(), Some("U"));
    }
}
