use std::collections::HashMap;

use allocative::Allocative;

use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::value::Value;

/// Column metadata: name, logical type and the value used to back-fill
/// existing rows when the column is added to a populated table.
#[derive(Debug, Clone, PartialEq, Allocative)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub default: Option<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            default: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Ordered column definitions plus a name → position index.
///
/// The index is always the exact inverse of the column order; every operation
/// that changes the columns builds a new schema with a fresh index.
#[derive(Debug, Clone, Default, Allocative)]
pub struct Schema {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Builds a schema from columns in order.
    ///
    /// # Errors
    /// Returns [Error::DuplicateColumn] if two columns share a name.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut index = HashMap::with_capacity(columns.len());
        for (position, column) in columns.iter().enumerate() {
            if index.insert(column.name.clone(), position).is_some() {
                return Err(Error::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(Self { columns, index })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Number of columns, i.e. the arity every row must have.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Position of the column called `name`.
    ///
    /// # Errors
    /// Returns [Error::UnknownColumn] if there is no such column.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.index_of(name).map(|position| &self.columns[position])
    }

    /// Returns a new schema with `column` appended.
    pub fn add_column(&self, column: Column) -> Result<Self> {
        if self.contains(&column.name) {
            return Err(Error::DuplicateColumn(column.name));
        }
        let mut columns = self.columns.clone();
        columns.push(column);
        Self::new(columns)
    }

    /// Returns a new schema without the column called `name`.
    /// Removing a column that does not exist leaves the schema unchanged.
    pub fn remove_column(&self, name: &str) -> Self {
        let columns = self
            .columns
            .iter()
            .filter(|column| column.name != name)
            .cloned()
            .collect();
        // names were unique before, so they still are
        Self::new(columns).unwrap_or_default()
    }

    /// Returns a schema holding the requested columns in the requested order.
    ///
    /// # Errors
    /// - [Error::UnknownColumn] if a name is not in this schema.
    /// - [Error::DuplicateColumn] if a name is requested twice.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let columns = names
            .iter()
            .map(|name| self.column(name.as_ref()).cloned())
            .collect::<Result<Vec<_>>>()?;
        Self::new(columns)
    }

    /// Returns a schema where the column `name` is called `new_name`.
    pub fn rename(&self, name: &str, new_name: &str) -> Result<Self> {
        let position = self.index_of(name)?;
        let mut columns = self.columns.clone();
        columns[position].name = new_name.to_string();
        Self::new(columns)
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        // the index is derived from the columns
        self.columns == other.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_schema() -> Schema {
        Schema::new(vec![
            Column::new("id", DataType::Int),
            Column::new("name", DataType::Text),
            Column::new("age", DataType::Int),
        ])
        .unwrap()
    }

    fn assert_index_consistent(schema: &Schema) {
        for (position, name) in schema.names().enumerate() {
            assert_eq!(schema.index_of(name), Ok(position));
        }
        assert_eq!(schema.index.len(), schema.len());
    }

    #[test]
    fn test_schema_index() {
        let schema = users_schema();

        assert_eq!(schema.len(), 3);
        assert_eq!(schema.index_of("age"), Ok(2));
        assert_eq!(schema.column("name").unwrap().data_type, DataType::Text);
        assert_eq!(
            schema.index_of("salary"),
            Err(Error::UnknownColumn("salary".into()))
        );
        assert_index_consistent(&schema);
    }

    #[test]
    fn test_duplicate_column() {
        let result = Schema::new(vec![
            Column::new("id", DataType::Int),
            Column::new("id", DataType::Text),
        ]);
        assert_eq!(result, Err(Error::DuplicateColumn("id".into())));

        let schema = Schema::new(vec![Column::new("id", DataType::Int)]).unwrap();
        let result = schema.add_column(Column::new("id", DataType::Int));
        assert_eq!(result, Err(Error::DuplicateColumn("id".into())));
    }

    #[test]
    fn test_add_and_remove_column() {
        let schema = users_schema();

        let added = schema
            .add_column(Column::new("active", DataType::Bool).with_default(true))
            .unwrap();
        assert_eq!(added.len(), 4);
        assert_eq!(added.index_of("active"), Ok(3));
        assert_eq!(added.column("active").unwrap().default, Some(Value::Bool(true)));
        assert_index_consistent(&added);
        // the original is untouched
        assert_eq!(schema.len(), 3);

        let removed = added.remove_column("name");
        assert_eq!(removed.names().collect::<Vec<_>>(), vec!["id", "age", "active"]);
        assert_eq!(removed.index_of("age"), Ok(1));
        assert!(removed.index_of("name").is_err());
        assert_index_consistent(&removed);
    }

    #[test]
    fn test_remove_nonexistent_column() {
        let schema = Schema::new(vec![Column::new("id", DataType::Int)]).unwrap();

        let removed = schema.remove_column("nonexistent");
        assert_eq!(removed.len(), 1);
        assert_eq!(removed, schema);
    }

    #[test]
    fn test_project_keeps_requested_order() {
        let schema = users_schema();

        let projected = schema.project(&["age", "id"]).unwrap();
        assert_eq!(projected.names().collect::<Vec<_>>(), vec!["age", "id"]);
        assert_index_consistent(&projected);

        assert_eq!(
            schema.project(&["id", "salary"]),
            Err(Error::UnknownColumn("salary".into()))
        );
    }

    #[test]
    fn test_rename() {
        let schema = users_schema();

        let renamed = schema.rename("name", "username").unwrap();
        assert_eq!(renamed.index_of("username"), Ok(1));
        assert!(!renamed.contains("name"));
        assert_eq!(
            schema.rename("name", "age"),
            Err(Error::DuplicateColumn("age".into()))
        );
    }
}
