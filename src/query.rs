//! Execution of a parsed [SelectQuery] against a [Database].
//!
//! Only single-source queries run: the `FROM` item (a table or a nested query)
//! is filtered by `WHERE` and then projected by the select list.

use std::borrow::Cow;

use tracing::{debug, warn};

use crate::ast::{ColumnRef, Expr, FromItem, SelectItem, SelectQuery};
use crate::data_type::DataType;
use crate::database::Database;
use crate::error::{Error, Result};
use crate::row::Row;
use crate::schema::{Column, Schema};
use crate::table::Table;

/// Name given to the result of a nested query without an alias.
const SUBQUERY_NAME: &str = "SUBQUERY";

/// Runs `query` and returns its result as a new table.
///
/// # Errors
/// - [Error::UnsupportedOperation] for joins, grouping, ordering or limits.
/// - [Error::TableNotFound] if the source table does not exist.
/// - [Error::UnknownColumn] for a missing column or a qualifier that does not
///   name the source.
/// - Any evaluation error raised while filtering or computing columns.
pub fn execute(query: &SelectQuery, db: &Database) -> Result<Table> {
    reject_unsupported(query)?;

    let source = resolve_source(&query.from, db)?;
    check_columns(query, query.from.binding_name(), source.schema())?;

    let filtered = match &query.where_clause {
        Some(predicate) => Cow::Owned(source.filter(std::slice::from_ref(predicate))?),
        None => source,
    };
    let result = project_items(&filtered, &query.select)?;
    debug!(
        table = %result.name(),
        rows = result.count_rows(),
        columns = result.schema().len(),
        "query executed"
    );
    Ok(result)
}

fn reject_unsupported(query: &SelectQuery) -> Result<()> {
    let clause = if !query.joins.is_empty() {
        Some("JOIN")
    } else if query.group_by.is_some() {
        Some("GROUP BY")
    } else if query.having.is_some() {
        Some("HAVING")
    } else if query.order_by.is_some() {
        Some("ORDER BY")
    } else if query.limit.is_some() {
        Some("LIMIT")
    } else {
        None
    };

    match clause {
        Some(clause) => {
            warn!(clause, "rejected query with unsupported clause");
            Err(Error::UnsupportedOperation(format!(
                "{clause} is not supported by the executor"
            )))
        }
        None => Ok(()),
    }
}

fn resolve_source<'db>(from: &FromItem, db: &'db Database) -> Result<Cow<'db, Table>> {
    match from {
        FromItem::Table(table) => db
            .get_table(&table.name)
            .map(Cow::Borrowed)
            .ok_or_else(|| Error::TableNotFound(table.name.clone())),
        FromItem::Subquery(sub) => {
            let name = sub.alias.as_deref().unwrap_or(SUBQUERY_NAME);
            let table = execute(&sub.query, db)?.renamed(name);
            Ok(Cow::Owned(table))
        }
    }
}

/// Every referenced column must exist in the source, and a qualifier must be
/// the name the source is bound to. Checked before any row is read, so empty
/// sources and short-circuited predicates report bad names too.
fn check_columns(query: &SelectQuery, binding: Option<&str>, schema: &Schema) -> Result<()> {
    let mut check = |col: &ColumnRef| match &col.table {
        Some(qualifier) if Some(qualifier.as_str()) != binding => {
            Err(Error::UnknownColumn(col.to_string()))
        }
        _ => schema.index_of(&col.name).map(|_| ()),
    };

    let exprs = query
        .select
        .iter()
        .map(|item| &item.expr)
        .chain(query.where_clause.as_ref());
    for expr in exprs {
        expr.visit_columns(&mut check)?;
    }
    Ok(())
}

fn project_items(table: &Table, items: &[SelectItem]) -> Result<Table> {
    let plain = items
        .iter()
        .all(|item| matches!(item.expr, Expr::Wildcard | Expr::Column(_)));
    if plain {
        project_columns(table, items)
    } else {
        compute_columns(table, items)
    }
}

/// Select lists made only of `*` and column names: a projection under the
/// output names.
fn project_columns(table: &Table, items: &[SelectItem]) -> Result<Table> {
    let mut pairs: Vec<(&str, &str)> = Vec::new();

    for item in items {
        match &item.expr {
            Expr::Wildcard => pairs.extend(table.schema().names().map(|name| (name, name))),
            Expr::Column(col) => {
                let output = item.alias.as_deref().unwrap_or(&col.name);
                pairs.push((&col.name, output));
            }
            other => {
                return Err(Error::UnsupportedOperation(format!(
                    "{other} is not a column"
                )));
            }
        }
    }

    table.project_as(&pairs)
}

/// General select lists: every item is evaluated row by row.
fn compute_columns(table: &Table, items: &[SelectItem]) -> Result<Table> {
    let source = table.schema();
    let rows: Vec<Row> = table
        .rows()
        .map(|row| -> Result<Row> {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                match &item.expr {
                    Expr::Wildcard => values.extend(row.iter().cloned()),
                    expr => values.push(expr.resolve(&row, source)?),
                }
            }
            Ok(Row::new(values))
        })
        .collect::<Result<_>>()?;

    let mut columns = Vec::new();
    for item in items {
        match &item.expr {
            Expr::Wildcard => columns.extend(source.columns().iter().cloned()),
            Expr::Column(col) => {
                let mut column = source.column(&col.name)?.clone();
                if let Some(alias) = &item.alias {
                    column.name = alias.clone();
                }
                columns.push(column);
            }
            expr => {
                let position = columns.len();
                let data_type = infer_type(&rows, position)?;
                let name = item.alias.clone().unwrap_or_else(|| expr.to_string());
                columns.push(Column::new(name, data_type));
            }
        }
    }

    Table::with_rows(table.name(), Schema::new(columns)?, rows)
}

/// The single type of the values at `position`; all-`NULL` columns are `INT`.
fn infer_type(rows: &[Row], position: usize) -> Result<DataType> {
    let mut inferred: Option<DataType> = None;
    for value in rows.iter().filter_map(|row| row.get(position)) {
        let Some(data_type) = value.data_type() else {
            continue;
        };
        inferred = match inferred {
            None => Some(data_type),
            Some(current) => Some(current.unify(data_type).ok_or_else(|| {
                Error::TypeMismatch {
                    expected: current.to_string(),
                    found: data_type.to_string(),
                }
            })?),
        };
    }
    Ok(inferred.unwrap_or(DataType::Int))
}
