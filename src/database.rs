use std::collections::HashMap;

use allocative::Allocative;
use tracing::info;

use crate::error::{Error, Result};
use crate::parser::parse_sql;
use crate::query;
use crate::row::Row;
use crate::schema::{Column, Schema};
use crate::table::Table;
use crate::value::Value;

/// The main entry point for the in-memory engine.
/// It owns the tables by name and runs queries against them.
///
/// Table and column names are stored upper case, the same normalisation the
/// tokenizer applies to query text, so `users` and `USERS` are one table.
#[derive(Debug, Default, Allocative)]
pub struct Database {
    tables: HashMap<String, Table>,
}

fn normalize(name: &str) -> String {
    name.trim().to_uppercase()
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table.
    ///
    /// # Errors
    /// - [Error::EmptyTableName] if the name is blank.
    /// - [Error::EmptySchema] if no columns are given.
    /// - [Error::TableExists] if the name is taken.
    /// - [Error::DuplicateColumn] if two columns share a name.
    pub fn create_table(&mut self, name: &str, columns: Vec<Column>) -> Result<()> {
        let name = normalize(name);
        if name.is_empty() {
            return Err(Error::EmptyTableName);
        }
        if columns.is_empty() {
            return Err(Error::EmptySchema(name));
        }
        if self.tables.contains_key(&name) {
            return Err(Error::TableExists(name));
        }

        let columns = columns
            .into_iter()
            .map(|column| Column {
                name: normalize(&column.name),
                ..column
            })
            .collect::<Vec<_>>();
        let schema = Schema::new(columns)?;
        info!(table = %name, columns = schema.len(), "created table");
        self.tables.insert(name.clone(), Table::new(name, schema));
        Ok(())
    }

    /// Removes a table and hands it back.
    pub fn drop_table(&mut self, name: &str) -> Result<Table> {
        let name = normalize(name);
        let table = self
            .tables
            .remove(&name)
            .ok_or_else(|| Error::TableNotFound(name.clone()))?;
        info!(table = %name, rows = table.count_rows(), "dropped table");
        Ok(table)
    }

    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(&normalize(name))
    }

    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(&normalize(name))
    }

    /// Table names in alphabetical order.
    pub fn list_tables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Appends a row to the named table.
    pub fn insert(&mut self, table: &str, row: impl Into<Row>) -> Result<()> {
        self.get_table_mut(table)
            .ok_or_else(|| Error::TableNotFound(normalize(table)))?
            .add_row(row)
    }

    /// Appends rows given column by column; see [Table::insert_columns].
    /// Column names are matched case-insensitively.
    pub fn insert_columns(&mut self, table: &str, values: Vec<(&str, Vec<Value>)>) -> Result<usize> {
        let values = values
            .into_iter()
            .map(|(name, column_values)| (normalize(name), column_values))
            .collect();
        self.get_table_mut(table)
            .ok_or_else(|| Error::TableNotFound(normalize(table)))?
            .insert_columns(values)
    }

    /// Parses and runs a `SELECT` query, returning the result as a new table.
    ///
    /// # Example
    /// ```
    /// use pql::schema::Column;
    /// use pql::{row, DataType, Database};
    ///
    /// let mut db = Database::new();
    /// db.create_table("products", vec![
    ///     Column::new("name", DataType::Text),
    ///     Column::new("price", DataType::Int),
    /// ]).unwrap();
    /// db.insert("products", row!["LAPTOP", 1200]).unwrap();
    /// db.insert("products", row!["MOUSE", 25]).unwrap();
    ///
    /// let result = db.query("SELECT name FROM products WHERE price < 100").unwrap();
    /// assert_eq!(result.rows().collect::<Vec<_>>(), vec![row!["MOUSE"]]);
    /// ```
    ///
    /// # Errors
    /// Any lexing, parsing or execution error; see [query::execute].
    pub fn query(&self, sql: &str) -> Result<Table> {
        let select = parse_sql(sql)?;
        query::execute(&select, self)
    }

    /// Bytes of heap memory owned by all tables.
    pub fn memory_usage(&self) -> usize {
        allocative::size_of_unique_allocated_data(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;
    use crate::row;

    fn simple_columns() -> Vec<Column> {
        vec![
            Column::new("id", DataType::Int),
            Column::new("name", DataType::Text),
        ]
    }

    #[test]
    fn test_create_and_drop_table() {
        let mut db = Database::new();

        db.create_table("users", simple_columns()).unwrap();
        assert!(db.get_table("users").is_some());

        let dropped = db.drop_table("users").unwrap();
        assert_eq!(dropped.name(), "USERS");
        assert!(db.get_table("users").is_none());
    }

    #[test]
    fn test_names_are_normalized() {
        let mut db = Database::new();
        db.create_table(" users ", simple_columns()).unwrap();

        let table = db.get_table("Users").unwrap();
        assert_eq!(table.name(), "USERS");
        assert_eq!(table.schema().names().collect::<Vec<_>>(), vec!["ID", "NAME"]);
    }

    #[test]
    fn test_duplicate_table_error() {
        let mut db = Database::new();

        db.create_table("users", simple_columns()).unwrap();
        let err = db.create_table("USERS", simple_columns());

        assert_eq!(err, Err(Error::TableExists("USERS".into())));
    }

    #[test]
    fn test_invalid_definitions() {
        let mut db = Database::new();

        assert_eq!(db.create_table("  ", simple_columns()), Err(Error::EmptyTableName));
        assert_eq!(
            db.create_table("users", vec![]),
            Err(Error::EmptySchema("USERS".into()))
        );
        assert_eq!(
            db.create_table(
                "users",
                vec![Column::new("id", DataType::Int), Column::new("ID", DataType::Int)]
            ),
            Err(Error::DuplicateColumn("ID".into()))
        );
        assert!(db.list_tables().is_empty());
    }

    #[test]
    fn test_drop_nonexistent_table() {
        let mut db = Database::new();

        let err = db.drop_table("unknown").map(|t| t.count_rows());
        assert_eq!(err, Err(Error::TableNotFound("UNKNOWN".into())));
    }

    #[test]
    fn test_list_tables() {
        let mut db = Database::new();

        db.create_table("users", simple_columns()).unwrap();
        db.create_table("posts", simple_columns()).unwrap();

        assert_eq!(db.list_tables(), vec!["POSTS", "USERS"]);
    }

    #[test]
    fn test_insert_and_get_table_mut() {
        let mut db = Database::new();
        db.create_table("users", simple_columns()).unwrap();

        db.insert("users", row![1, "Alice"]).unwrap();
        db.get_table_mut("users")
            .unwrap()
            .add_row(row![2, "Bob"])
            .unwrap();

        let table = db.get_table("users").unwrap();
        assert_eq!(table.count_rows(), 2);
        assert_eq!(table.row(0), Some(row![1, "Alice"]));
        assert_eq!(table.row(1), Some(row![2, "Bob"]));

        assert_eq!(
            db.insert("posts", row![1, "x"]),
            Err(Error::TableNotFound("POSTS".into()))
        );
        assert!(matches!(
            db.insert("users", row!["x", 1]),
            Err(Error::ColumnType { .. })
        ));
    }

    #[test]
    fn test_insert_columns_by_name() {
        let mut db = Database::new();
        db.create_table(
            "users",
            vec![
                Column::new("id", DataType::Int),
                Column::new("name", DataType::Text),
                Column::new("email", DataType::Text),
            ],
        )
        .unwrap();

        let added = db
            .insert_columns(
                "users",
                vec![
                    ("id", vec![Value::Int(1), Value::Int(2)]),
                    ("Name", vec![Value::from("ALICE"), Value::from("BOB")]),
                ],
            )
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(
            db.get_table("users").unwrap().column_values("EMAIL").unwrap(),
            row![Value::Null, Value::Null]
        );

        assert_eq!(
            db.insert_columns("users", vec![("phone", vec![Value::from("555")])]),
            Err(Error::UnknownColumn("PHONE".into()))
        );
        assert_eq!(
            db.insert_columns("posts", vec![("id", vec![Value::Int(1)])]),
            Err(Error::TableNotFound("POSTS".into()))
        );
        assert_eq!(db.get_table("users").unwrap().count_rows(), 2);
    }

    #[test]
    fn test_memory_usage_grows() {
        let mut db = Database::new();
        db.create_table("users", simple_columns()).unwrap();
        let before = db.memory_usage();

        for i in 0..1_000 {
            db.insert("users", row![i, Value::Text(format!("user{i}").into())])
                .unwrap();
        }

        assert!(db.memory_usage() > before);
    }

    #[test]
    fn test_query_through_catalog() {
        let mut db = Database::new();
        db.create_table("users", simple_columns()).unwrap();
        db.insert("users", row![1, "ALICE"]).unwrap();

        let result = db.query("SELECT name FROM users WHERE id = 1").unwrap();
        assert_eq!(result.rows().collect::<Vec<_>>(), vec![row!["ALICE"]]);

        assert_eq!(
            db.query("SELECT * FROM orders").map(|t| t.count_rows()),
            Err(Error::TableNotFound("ORDERS".into()))
        );
    }
}
