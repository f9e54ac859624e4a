//! Module: store
//! Responsibility: in-memory table rows with stable ids, typed inserts.
//! Does not own: query evaluation, the session read cache, or schema metadata.
//! Boundary: bulk mutations write here directly and never consult any cache.

use crate::{
    schema::Schema,
    value::{Value, ValueType},
};
use derive_more::{Deref, DerefMut};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error as ThisError;

///
/// RowId
///
/// Stable per-table row identity; survives mutations, dies with deletes.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct RowId(u64);

///
/// StoreError
///

#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum StoreError {
    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("row arity mismatch for '{table}': expected {expected} values, found {found}")]
    RowArity {
        table: String,
        expected: usize,
        found: usize,
    },

    #[error("column '{table}.{column}' expects {expected}, found {found}")]
    ColumnType {
        table: String,
        column: String,
        expected: String,
        found: String,
    },
}

///
/// Row
///

#[derive(Clone, Debug, PartialEq, Deref, DerefMut)]
pub struct Row(Vec<Value>);

impl Row {
    #[must_use]
    pub const fn from_values(values: Vec<Value>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

///
/// TableRows
///

#[derive(Debug, Default)]
struct TableRows {
    next_id: u64,
    rows: Vec<(RowId, Row)>,
}

impl TableRows {
    fn insert(&mut self, row: Row) -> RowId {
        let id = RowId(self.next_id);
        self.next_id += 1;
        self.rows.push((id, row));
        id
    }
}

///
/// MemStore
///
/// The in-memory data source: one row vector per schema table, scanned
/// in insertion order. All columns are nullable; inserts type-check
/// non-null values against the column type (numeric family included).
///

#[derive(Debug)]
pub struct MemStore {
    schema: Arc<Schema>,
    tables: HashMap<String, TableRows>,
}

impl MemStore {
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            tables: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Insert one row in column declaration order.
    pub fn insert(
        &mut self,
        table: &str,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Result<RowId, StoreError> {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let table_def = self
            .schema
            .table(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        if values.len() != table_def.columns().len() {
            return Err(StoreError::RowArity {
                table: table.to_string(),
                expected: table_def.columns().len(),
                found: values.len(),
            });
        }
        for (column, value) in table_def.columns().iter().zip(&values) {
            if !column_accepts(&column.ty, value) {
                return Err(StoreError::ColumnType {
                    table: table.to_string(),
                    column: column.name.clone(),
                    expected: column.ty.to_string(),
                    found: format!("{value}"),
                });
            }
        }

        Ok(self
            .tables
            .entry(table.to_string())
            .or_default()
            .insert(Row(values)))
    }

    /// Scan a table's rows in insertion order. Unknown and empty tables
    /// both scan as empty; existence was checked at schema registration.
    #[must_use]
    pub fn rows(&self, table: &str) -> &[(RowId, Row)] {
        self.tables
            .get(table)
            .map_or(&[], |rows| rows.rows.as_slice())
    }

    /// Overwrite one row in place; part of the bulk-mutation path.
    pub(crate) fn for_each_row_mut(
        &mut self,
        table: &str,
        mut apply: impl FnMut(RowId, &mut Row),
    ) {
        if let Some(rows) = self.tables.get_mut(table) {
            for (id, row) in &mut rows.rows {
                apply(*id, row);
            }
        }
    }

    /// Retain rows failing the removal test; part of the bulk-delete path.
    pub(crate) fn retain_rows(&mut self, table: &str, mut keep: impl FnMut(RowId, &Row) -> bool) {
        if let Some(rows) = self.tables.get_mut(table) {
            rows.rows.retain(|(id, row)| keep(*id, row));
        }
    }
}

fn column_accepts(ty: &ValueType, value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(_) => matches!(ty, ValueType::Bool),
        Value::Int(_) => ty.is_numeric(),
        Value::Decimal(_) => matches!(ty, ValueType::Decimal),
        Value::Text(_) => matches!(ty, ValueType::Text),
        Value::List(_) | Value::Row(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Table;

    fn store() -> MemStore {
        let mut schema = Schema::new();
        schema
            .add_table(
                Table::new("member")
                    .column("username", ValueType::Text)
                    .column("age", ValueType::Int),
            )
            .unwrap();

        MemStore::new(Arc::new(schema))
    }

    #[test]
    fn insert_checks_arity_and_column_types() {
        let mut store = store();

        let err = store.insert("member", [Value::Text("a".into())]).unwrap_err();
        assert!(matches!(err, StoreError::RowArity { expected: 2, .. }));

        let err = store
            .insert("member", [Value::Int(1), Value::Int(10)])
            .unwrap_err();
        assert!(matches!(err, StoreError::ColumnType { .. }));
    }

    #[test]
    fn nulls_are_accepted_for_any_column() {
        let mut store = store();
        store
            .insert("member", [Value::Null, Value::Int(100)])
            .unwrap();

        assert_eq!(store.rows("member").len(), 1);
    }

    #[test]
    fn row_ids_are_stable_across_inserts() {
        let mut store = store();
        let first = store
            .insert("member", [Value::Text("a".into()), Value::Int(1)])
            .unwrap();
        let second = store
            .insert("member", [Value::Text("b".into()), Value::Int(2)])
            .unwrap();

        assert_ne!(first, second);
    }
}
