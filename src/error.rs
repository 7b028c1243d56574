//! Error type shared by every stage of the engine.

use thiserror::Error;

use crate::data_type::DataType;

/// Every failure the engine can report.
///
/// All errors are local and deterministic: they are returned at the point of
/// detection and never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("lex error at position {position} near {snippet:?}: {reason}")]
    Lex {
        /// Character offset into the upper-cased query text.
        position: usize,
        snippet: String,
        reason: String,
    },

    #[error("parse error: expected {expected}, found {found}")]
    Parse { expected: String, found: String },

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("arity mismatch: expected {expected} values, found {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("row index {index} out of range for {len} rows")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("column {column} has type {expected}, got a {found} value")]
    ColumnType {
        column: String,
        expected: DataType,
        found: DataType,
    },

    #[error("cannot apply {op} to {left} and {right}")]
    IncompatibleOperands {
        op: String,
        left: String,
        right: String,
    },

    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    #[error("table {0} already exists")]
    TableExists(String),

    #[error("table {0} does not exist")]
    TableNotFound(String),

    #[error("table {0} must have at least one column")]
    EmptySchema(String),

    #[error("table name must not be empty")]
    EmptyTableName,
}

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
