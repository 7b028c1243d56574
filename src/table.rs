use std::fmt;
use std::sync::Arc;

use allocative::Allocative;
use bitvec::prelude::*;
use tracing::{debug, trace};

use crate::column::ColumnVector;
use crate::error::{Error, Result};
use crate::eval::Predicate;
use crate::row::Row;
use crate::schema::{Column, Schema};
use crate::value::Value;

/// A named, columnar collection of rows sharing one schema.
///
/// Every column vector holds exactly `row_count` values, and column `i`
/// stores values of the type declared by `schema.columns()[i]`.
#[derive(Debug, Clone, Allocative)]
pub struct Table {
    name: String,
    schema: Arc<Schema>,
    columns: Vec<ColumnVector>,
    row_count: usize,
}

impl Table {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self::with_schema(name.into(), Arc::new(schema))
    }

    fn with_schema(name: String, schema: Arc<Schema>) -> Self {
        let columns = schema
            .columns()
            .iter()
            .map(|column| ColumnVector::new(column.data_type))
            .collect();
        Self {
            name,
            schema,
            columns,
            row_count: 0,
        }
    }

    /// A table already filled with `rows`.
    pub fn with_rows<I>(name: impl Into<String>, schema: Schema, rows: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Row>,
    {
        let mut table = Self::new(name, schema);
        for row in rows {
            table.add_row(row)?;
        }
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the same table under another name.
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Appends a row.
    ///
    /// The whole row is checked before anything is stored, so a failed insert
    /// leaves the table unchanged.
    ///
    /// # Errors
    /// - [Error::ArityMismatch] if the row does not have one value per column.
    /// - [Error::ColumnType] if a value does not fit its column's type.
    pub fn add_row(&mut self, row: impl Into<Row>) -> Result<()> {
        let row = row.into();
        if row.arity() != self.schema.len() {
            return Err(Error::ArityMismatch {
                expected: self.schema.len(),
                found: row.arity(),
            });
        }

        self.check_types(&row)?;
        self.push_row(row)
    }

    /// Appends a batch of rows given column by column, e.g. `[("ID", [1, 2]),
    /// ("NAME", ["A", "B"])]`. Columns left out take their default, or `NULL`.
    ///
    /// Everything is validated before the first value is stored, so a failed
    /// batch leaves the table unchanged. Returns the number of rows added.
    ///
    /// # Errors
    /// - [Error::UnknownColumn] for a name not in the schema.
    /// - [Error::DuplicateColumn] if a column is listed twice.
    /// - [Error::ArityMismatch] if the listed columns differ in length.
    /// - [Error::ColumnType] if a value or a default does not fit its column.
    pub fn insert_columns<S: AsRef<str>>(&mut self, values: Vec<(S, Vec<Value>)>) -> Result<usize> {
        let mut provided: Vec<Option<std::vec::IntoIter<Value>>> =
            (0..self.schema.len()).map(|_| None).collect();
        let mut batch_len = None;
        for (name, column_values) in values {
            let position = self.schema.index_of(name.as_ref())?;
            if provided[position].is_some() {
                return Err(Error::DuplicateColumn(name.as_ref().to_string()));
            }
            match batch_len {
                Some(expected) if expected != column_values.len() => {
                    return Err(Error::ArityMismatch {
                        expected,
                        found: column_values.len(),
                    });
                }
                _ => batch_len = Some(column_values.len()),
            }
            provided[position] = Some(column_values.into_iter());
        }

        let batch_len = batch_len.unwrap_or(0);
        let defaults: Vec<Value> = self
            .schema
            .columns()
            .iter()
            .map(|column| column.default.clone().unwrap_or(Value::Null))
            .collect();
        let mut rows = Vec::with_capacity(batch_len);
        for _ in 0..batch_len {
            let values = provided
                .iter_mut()
                .zip(&defaults)
                .map(|(column, default)| {
                    column
                        .as_mut()
                        .and_then(|values| values.next())
                        .unwrap_or_else(|| default.clone())
                })
                .collect::<Row>();
            self.check_types(&values)?;
            rows.push(values);
        }

        for row in rows {
            self.push_row(row)?;
        }
        debug!(table = %self.name, rows = batch_len, "inserted column batch");
        Ok(batch_len)
    }

    fn check_types(&self, row: &Row) -> Result<()> {
        let checks = row.iter().zip(&self.columns).zip(self.schema.columns());
        for ((value, storage), column) in checks {
            if !storage.accepts(value) {
                return Err(Error::ColumnType {
                    column: column.name.clone(),
                    expected: column.data_type,
                    found: value.data_type().unwrap_or(column.data_type),
                });
            }
        }
        Ok(())
    }

    /// Stores an already validated row.
    fn push_row(&mut self, row: Row) -> Result<()> {
        for (value, storage) in row.into_values().into_iter().zip(&mut self.columns) {
            storage.push(value)?;
        }
        self.row_count += 1;
        trace!(table = %self.name, rows = self.row_count, "row added");
        Ok(())
    }

    /// Removes the row at `index`; later rows move up by one.
    pub fn delete_row_by_index(&mut self, index: usize) -> Result<()> {
        if index >= self.row_count {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.row_count,
            });
        }
        for column in &mut self.columns {
            column.remove(index)?;
        }
        self.row_count -= 1;
        Ok(())
    }

    pub fn count_rows(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Materialises the row at `index`.
    pub fn row(&self, index: usize) -> Option<Row> {
        if index >= self.row_count {
            return None;
        }
        self.columns.iter().map(|column| column.get(index)).collect()
    }

    /// All rows in insertion order.
    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        (0..self.row_count).filter_map(|index| self.row(index))
    }

    /// Every value of one column, top to bottom, as a single row.
    ///
    /// Useful with the elementwise [Row] operators to work column-wise.
    pub fn column_values(&self, name: &str) -> Result<Row> {
        let position = self.schema.index_of(name)?;
        Ok(self.columns[position].iter().collect())
    }

    /// A new table holding only the named columns, in the order given.
    ///
    /// # Errors
    /// [Error::UnknownColumn] if a name is not in the schema.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Result<Table> {
        let pairs: Vec<(&str, &str)> = names
            .iter()
            .map(|name| (name.as_ref(), name.as_ref()))
            .collect();
        self.project_as(&pairs)
    }

    /// Like [Table::project], but each `(source, output)` pair also names the
    /// result column. The same source may be picked more than once; only the
    /// output names must be unique.
    ///
    /// # Errors
    /// - [Error::UnknownColumn] if a source name is not in the schema.
    /// - [Error::DuplicateColumn] if two output names collide.
    pub fn project_as<S: AsRef<str>>(&self, pairs: &[(S, S)]) -> Result<Table> {
        let mut columns = Vec::with_capacity(pairs.len());
        let mut storage = Vec::with_capacity(pairs.len());
        for (source, output) in pairs {
            let position = self.schema.index_of(source.as_ref())?;
            let mut column = self.schema.columns()[position].clone();
            column.name = output.as_ref().to_string();
            columns.push(column);
            storage.push(self.columns[position].clone());
        }
        let schema = Schema::new(columns)?;
        debug!(table = %self.name, columns = storage.len(), "projected");
        Ok(Table {
            name: self.name.clone(),
            schema: Arc::new(schema),
            columns: storage,
            row_count: self.row_count,
        })
    }

    /// A new table with the rows for which every predicate holds, in their
    /// original order. An empty predicate list keeps every row.
    ///
    /// # Example
    /// ```
    /// # use pql::ast::Expr;
    /// # use pql::eval::Condition;
    /// # use pql::schema::{Column, Schema};
    /// # use pql::{row, DataType, Table};
    /// let schema = Schema::new(vec![
    ///     Column::new("NAME", DataType::Text),
    ///     Column::new("AGE", DataType::Int),
    /// ]).unwrap();
    /// let table = Table::with_rows("USERS", schema, [row!["Alice", 30], row!["Bob", 25]]).unwrap();
    ///
    /// let adults = Condition::new(Expr::column("AGE"), ">", Expr::literal(28_i64)).unwrap();
    /// let filtered = table.filter(&[adults]).unwrap();
    /// assert_eq!(filtered.rows().collect::<Vec<_>>(), vec![row!["Alice", 30]]);
    /// ```
    pub fn filter<P: Predicate>(&self, predicates: &[P]) -> Result<Table> {
        let mut mask = BitVec::<usize, Lsb0>::with_capacity(self.row_count);
        for (index, row) in self.rows().enumerate() {
            let mut keep = true;
            for predicate in predicates {
                if !predicate.test(&row, &self.schema)? {
                    keep = false;
                    break;
                }
            }
            trace!(row = index, keep, "evaluated filter");
            mask.push(keep);
        }

        let row_count = mask.count_ones();
        debug!(
            table = %self.name,
            kept = row_count,
            total = self.row_count,
            "filtered"
        );
        Ok(Table {
            name: self.name.clone(),
            schema: Arc::clone(&self.schema),
            columns: self.columns.iter().map(|column| column.select(&mask)).collect(),
            row_count,
        })
    }

    /// A new table with `column` appended; existing rows get the column's
    /// default, or `NULL` when it has none.
    pub fn add_column(&self, column: Column) -> Result<Table> {
        let default = column.default.clone().unwrap_or(Value::Null);
        if !ColumnVector::new(column.data_type).accepts(&default) {
            return Err(Error::ColumnType {
                column: column.name,
                expected: column.data_type,
                found: default.data_type().unwrap_or(column.data_type),
            });
        }
        let storage = ColumnVector::filled(column.data_type, &default, self.row_count)?;
        let schema = self.schema.add_column(column)?;

        let mut columns = self.columns.clone();
        columns.push(storage);
        Ok(Table {
            name: self.name.clone(),
            schema: Arc::new(schema),
            columns,
            row_count: self.row_count,
        })
    }

    /// A new table without the column `name`. Unknown names are ignored.
    pub fn remove_column(&self, name: &str) -> Table {
        let Ok(position) = self.schema.index_of(name) else {
            return self.clone();
        };
        let mut columns = self.columns.clone();
        columns.remove(position);
        Table {
            name: self.name.clone(),
            schema: Arc::new(self.schema.remove_column(name)),
            columns,
            row_count: self.row_count,
        }
    }

    /// A new table where column `name` is called `new_name`.
    pub fn rename_column(&self, name: &str, new_name: &str) -> Result<Table> {
        let schema = self.schema.rename(name, new_name)?;
        Ok(Table {
            name: self.name.clone(),
            schema: Arc::new(schema),
            columns: self.columns.clone(),
            row_count: self.row_count,
        })
    }
}

impl fmt::Display for Table {
    /// Renders the table as an aligned text grid followed by the row count.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header: Vec<String> = self.schema.names().map(str::to_string).collect();
        let cells: Vec<Vec<String>> = self
            .rows()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect();

        let mut widths: Vec<usize> = header.iter().map(|name| name.chars().count()).collect();
        for line in &cells {
            for (width, cell) in widths.iter_mut().zip(line) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let write_line = |f: &mut fmt::Formatter<'_>, line: &[String]| -> fmt::Result {
            let padded: Vec<String> = line
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:<width$}"))
                .collect();
            writeln!(f, "{}", padded.join(" | ").trim_end())
        };

        write_line(f, &header)?;
        let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
        writeln!(f, "{}", rule.join("-+-"))?;
        for line in &cells {
            write_line(f, line)?;
        }
        let plural = if self.row_count == 1 { "" } else { "s" };
        write!(f, "({} row{plural})", self.row_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOperator, Expr};
    use crate::data_type::DataType;
    use crate::eval::Condition;
    use crate::row;

    fn users_schema() -> Schema {
        Schema::new(vec![
            Column::new("ID", DataType::Int),
            Column::new("NAME", DataType::Text),
            Column::new("AGE", DataType::Int),
        ])
        .unwrap()
    }

    fn users() -> Table {
        Table::with_rows(
            "USERS",
            users_schema(),
            [
                row![1, "Alice", 30],
                row![2, "Bob", 25],
                row![3, "Charlie", 35],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_table_creation() {
        let table = Table::new("USERS", users_schema());

        assert_eq!(table.name(), "USERS");
        assert_eq!(table.schema().len(), 3);
        assert_eq!(table.count_rows(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_add_row_and_read_back() {
        let mut table = Table::new("USERS", users_schema());

        table.add_row(row![1, "Alice", 30]).unwrap();
        table.add_row(row![2, "Bob", Value::Null]).unwrap();

        assert_eq!(table.count_rows(), 2);
        assert_eq!(table.row(0), Some(row![1, "Alice", 30]));
        assert_eq!(table.row(1), Some(row![2, "Bob", Value::Null]));
        assert_eq!(table.row(2), None);
    }

    #[test]
    fn test_arity_mismatch() {
        let mut table = Table::new("USERS", users_schema());

        let result = table.add_row(row![1, "Alice"]);
        assert_eq!(
            result,
            Err(Error::ArityMismatch {
                expected: 3,
                found: 2
            })
        );
        assert!(table.add_row(row![1, "Alice", 30, 40]).is_err());
        assert!(table.add_row(Row::default()).is_err());
        assert_eq!(table.count_rows(), 0);
    }

    #[test]
    fn test_type_mismatch_leaves_table_unchanged() {
        let mut table = Table::new("USERS", users_schema());

        let result = table.add_row(row![1, "Alice", "thirty"]);
        assert_eq!(
            result,
            Err(Error::ColumnType {
                column: "AGE".into(),
                expected: DataType::Int,
                found: DataType::Text
            })
        );
        assert_eq!(table.count_rows(), 0);
        // the first column must not have been written either
        assert_eq!(table.column_values("ID").unwrap(), Row::default());
    }

    #[test]
    fn test_delete_row_by_index() {
        let mut table = users();

        table.delete_row_by_index(1).unwrap();
        assert_eq!(table.count_rows(), 2);
        assert_eq!(
            table.rows().collect::<Vec<_>>(),
            vec![row![1, "Alice", 30], row![3, "Charlie", 35]]
        );

        assert_eq!(
            table.delete_row_by_index(2),
            Err(Error::IndexOutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    fn test_project_in_requested_order() {
        let table = Table::with_rows(
            "PAIRS",
            Schema::new(vec![
                Column::new("A", DataType::Int),
                Column::new("B", DataType::Int),
            ])
            .unwrap(),
            [row![1, 2], row![3, 4]],
        )
        .unwrap();

        let projected = table.project(&["B", "A"]).unwrap();
        assert_eq!(projected.schema().names().collect::<Vec<_>>(), vec!["B", "A"]);
        assert_eq!(
            projected.rows().collect::<Vec<_>>(),
            vec![row![2, 1], row![4, 3]]
        );

        assert_eq!(
            table.project(&["C"]).map(|t| t.count_rows()),
            Err(Error::UnknownColumn("C".into()))
        );
    }

    #[test]
    fn test_filter() {
        let table = users();
        let older = Condition::new(Expr::column("AGE"), ">", Expr::literal(30_i64)).unwrap();

        let filtered = table.filter(&[older]).unwrap();
        assert_eq!(filtered.rows().collect::<Vec<_>>(), vec![row![3, "Charlie", 35]]);
        assert_eq!(filtered.schema(), table.schema());
        // the source table is untouched
        assert_eq!(table.count_rows(), 3);
    }

    #[test]
    fn test_filter_keeps_order_and_conjunction() {
        let table = Table::with_rows(
            "PAIRS",
            Schema::new(vec![
                Column::new("A", DataType::Int),
                Column::new("B", DataType::Int),
            ])
            .unwrap(),
            [row![1, 2], row![3, 4], row![5, 6]],
        )
        .unwrap();

        let a_gt_1 = Expr::binary(Expr::column("A"), BinaryOperator::Gt, Expr::literal(1_i64));
        assert_eq!(
            table.filter(&[a_gt_1.clone()]).unwrap().rows().collect::<Vec<_>>(),
            vec![row![3, 4], row![5, 6]]
        );

        let b_lt_6 = Expr::binary(Expr::column("B"), BinaryOperator::Lt, Expr::literal(6_i64));
        assert_eq!(
            table.filter(&[a_gt_1, b_lt_6]).unwrap().rows().collect::<Vec<_>>(),
            vec![row![3, 4]]
        );
    }

    #[test]
    fn test_filter_without_predicates_is_identity() {
        let table = users();

        let filtered = table.filter::<Expr>(&[]).unwrap();
        assert_eq!(
            filtered.rows().collect::<Vec<_>>(),
            table.rows().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_filter_propagates_errors() {
        let table = users();
        let bad = Expr::column("SALARY");

        assert_eq!(
            table.filter(&[bad]).map(|t| t.count_rows()),
            Err(Error::UnknownColumn("SALARY".into()))
        );
    }

    #[test]
    fn test_add_and_remove_column() {
        let table = users();

        let with_flag = table
            .add_column(Column::new("ACTIVE", DataType::Bool).with_default(true))
            .unwrap();
        assert_eq!(with_flag.row(0), Some(row![1, "Alice", 30, true]));

        let with_null = table.add_column(Column::new("EMAIL", DataType::Text)).unwrap();
        assert_eq!(with_null.row(2), Some(row![3, "Charlie", 35, Value::Null]));

        let bad_default = table.add_column(Column::new("SCORE", DataType::Int).with_default("high"));
        assert!(matches!(bad_default, Err(Error::ColumnType { .. })));

        let without_name = with_flag.remove_column("NAME");
        assert_eq!(without_name.row(1), Some(row![2, 25, true]));
        assert_eq!(without_name.remove_column("NAME").schema().len(), 3);
    }

    #[test]
    fn test_project_as_allows_swaps_and_repeats() {
        let table = users();

        let swapped = table.project_as(&[("NAME", "ID"), ("ID", "NAME")]).unwrap();
        assert_eq!(swapped.schema().names().collect::<Vec<_>>(), vec!["ID", "NAME"]);
        assert_eq!(swapped.row(0), Some(row!["Alice", 1]));
        assert_eq!(swapped.schema().column("ID").unwrap().data_type, DataType::Text);

        let repeated = table.project_as(&[("ID", "A"), ("ID", "B")]).unwrap();
        assert_eq!(repeated.row(2), Some(row![3, 3]));

        assert_eq!(
            table.project_as(&[("ID", "X"), ("AGE", "X")]).map(|t| t.count_rows()),
            Err(Error::DuplicateColumn("X".into()))
        );
    }

    #[test]
    fn test_insert_columns_fills_missing_columns() {
        let schema = Schema::new(vec![
            Column::new("ID", DataType::Int),
            Column::new("NAME", DataType::Text),
            Column::new("EMAIL", DataType::Text),
            Column::new("ACTIVE", DataType::Bool).with_default(true),
        ])
        .unwrap();
        let mut table = Table::new("USERS", schema);

        let added = table
            .insert_columns(vec![
                ("NAME", vec![Value::from("Alice"), Value::from("Bob")]),
                ("ID", vec![Value::Int(1), Value::Int(2)]),
            ])
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(
            table.rows().collect::<Vec<_>>(),
            vec![
                row![1, "Alice", Value::Null, true],
                row![2, "Bob", Value::Null, true]
            ]
        );

        table
            .insert_columns(vec![
                ("ID", vec![Value::Int(3)]),
                ("NAME", vec![Value::from("Charlie")]),
                ("EMAIL", vec![Value::from("charlie@example.com")]),
            ])
            .unwrap();
        assert_eq!(
            table.row(2),
            Some(row![3, "Charlie", "charlie@example.com", true])
        );
    }

    #[test]
    fn test_insert_columns_is_all_or_nothing() {
        let mut table = users();

        assert_eq!(
            table.insert_columns(vec![("SALARY", vec![Value::Int(1)])]),
            Err(Error::UnknownColumn("SALARY".into()))
        );
        assert_eq!(
            table.insert_columns(vec![
                ("ID", vec![Value::Int(4), Value::Int(5)]),
                ("NAME", vec![Value::from("Dana")]),
            ]),
            Err(Error::ArityMismatch {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            table.insert_columns(vec![
                ("ID", vec![Value::Int(4)]),
                ("ID", vec![Value::Int(5)]),
            ]),
            Err(Error::DuplicateColumn("ID".into()))
        );
        // the first row is valid, the second is not
        assert!(matches!(
            table.insert_columns(vec![("AGE", vec![Value::Int(40), Value::from("old")])]),
            Err(Error::ColumnType { .. })
        ));
        assert_eq!(table.count_rows(), 3);
        assert_eq!(table.insert_columns(Vec::<(&str, Vec<Value>)>::new()), Ok(0));
    }

    #[test]
    fn test_rename_column() {
        let table = users().rename_column("NAME", "USERNAME").unwrap();

        assert_eq!(table.column_values("USERNAME").unwrap(), row!["Alice", "Bob", "Charlie"]);
        assert!(table.column_values("NAME").is_err());
    }

    #[test]
    fn test_column_wise_pipeline() {
        let table = users();
        let ages = table.column_values("AGE").unwrap();

        assert_eq!(ages.gt(&vec![Value::Int(28); 3]).unwrap(), row![true, false, true]);
    }

    #[test]
    fn test_display() {
        let table = users().project(&["NAME", "AGE"]).unwrap();

        let expected = "\
NAME    | AGE
--------+----
Alice   | 30
Bob     | 25
Charlie | 35
(3 rows)";
        assert_eq!(table.to_string(), expected);
    }

    #[test]
    fn test_memory_usage() {
        let empty = Table::new("USERS", users_schema());
        let full = users();

        assert!(
            allocative::size_of_unique_allocated_data(&full)
                > allocative::size_of_unique_allocated_data(&empty)
        );
    }
}
