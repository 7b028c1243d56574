//! `pql` is a small in-memory, column-oriented SQL engine.
//!
//! Query text goes through the [tokenizer], the [parser] builds an [ast], and
//! the [query] executor filters and projects [Table]s held by a [Database].

pub mod ast;
pub mod column;
pub mod data_type;
pub mod database;
pub mod error;
pub mod eval;
pub mod parser;
pub mod query;
pub mod row;
pub mod schema;
pub mod table;
pub mod tokenizer;
pub mod value;

pub use ast::{BinaryOperator, Expr, SelectQuery, UnaryOperator};
pub use data_type::DataType;
pub use database::Database;
pub use error::{Error, Result};
pub use eval::{Condition, Predicate, evaluate};
pub use parser::{parse, parse_sql};
pub use row::Row;
pub use schema::{Column, Schema};
pub use table::Table;
pub use tokenizer::{Token, TokenKind, tokenize};
pub use value::Value;
