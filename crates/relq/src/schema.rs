//! Module: schema
//! Responsibility: relational metadata: tables, typed columns, declared relations.
//! Does not own: row storage or expression typing rules.
//! Boundary: loaded once at startup and shared immutably by builders and the evaluator.

use crate::value::ValueType;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Column
///

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ty: ValueType,
}

///
/// Table
///
/// A named, ordered set of typed columns. Column order is the row layout.
///

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
}

impl Table {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Append a typed column. Uniqueness is checked at schema registration.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>, ty: ValueType) -> Self {
        self.columns.push(Column {
            name: name.into(),
            ty,
        });
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    #[must_use]
    pub fn column_def(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }
}

///
/// Relation
///
/// A declared key relationship between two tables. Relation joins
/// synthesize `source.source_column = target.target_column`.
///

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    pub source: String,
    pub source_column: String,
    pub target: String,
    pub target_column: String,
}

impl Relation {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        source_column: impl Into<String>,
        target: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            source_column: source_column.into(),
            target: target.into(),
            target_column: target_column.into(),
        }
    }
}

///
/// SchemaError
///

#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum SchemaError {
    #[error("table '{0}' is already registered")]
    DuplicateTable(String),

    #[error("table '{table}' declares column '{column}' more than once")]
    DuplicateColumn { table: String, column: String },

    #[error("relation '{relation}' references unknown table '{table}'")]
    UnknownRelationTable { relation: String, table: String },

    #[error("relation '{relation}' references unknown column '{table}.{column}'")]
    UnknownRelationColumn {
        relation: String,
        table: String,
        column: String,
    },

    #[error("relation '{0}' is already registered")]
    DuplicateRelation(String),

    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("unknown column '{table}.{column}'")]
    UnknownColumn { table: String, column: String },
}

///
/// Schema
///
/// Process-wide relational metadata. Registration validates the
/// uniqueness invariants; after that the schema is read-only.
///

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    tables: Vec<Table>,
    relations: Vec<Relation>,
}

impl Schema {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tables: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn add_table(&mut self, table: Table) -> Result<(), SchemaError> {
        if self.table(table.name()).is_some() {
            return Err(SchemaError::DuplicateTable(table.name().to_string()));
        }
        for (i, column) in table.columns().iter().enumerate() {
            let duplicate = table.columns()[..i]
                .iter()
                .any(|earlier| earlier.name == column.name);
            if duplicate {
                return Err(SchemaError::DuplicateColumn {
                    table: table.name().to_string(),
                    column: column.name.clone(),
                });
            }
        }

        self.tables.push(table);

        Ok(())
    }

    pub fn add_relation(&mut self, relation: Relation) -> Result<(), SchemaError> {
        if self.relation(&relation.name).is_some() {
            return Err(SchemaError::DuplicateRelation(relation.name));
        }
        for (table, column) in [
            (&relation.source, &relation.source_column),
            (&relation.target, &relation.target_column),
        ] {
            let Some(table_def) = self.table(table) else {
                return Err(SchemaError::UnknownRelationTable {
                    relation: relation.name.clone(),
                    table: table.clone(),
                });
            };
            if table_def.column_index(column).is_none() {
                return Err(SchemaError::UnknownRelationColumn {
                    relation: relation.name.clone(),
                    table: table.clone(),
                    column: column.clone(),
                });
            }
        }

        self.relations.push(relation);

        Ok(())
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name() == name)
    }

    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|relation| relation.name == name)
    }

    pub fn require_table(&self, name: &str) -> Result<&Table, SchemaError> {
        self.table(name)
            .ok_or_else(|| SchemaError::UnknownTable(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member_table() -> Table {
        Table::new("member")
            .column("username", ValueType::Text)
            .column("age", ValueType::Int)
            .column("team_id", ValueType::Int)
    }

    #[test]
    fn duplicate_column_is_rejected_at_registration() {
        let mut schema = Schema::new();
        let table = member_table().column("age", ValueType::Int);

        let err = schema.add_table(table).unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateColumn {
                table: "member".into(),
                column: "age".into(),
            }
        );
    }

    #[test]
    fn relation_endpoints_must_resolve() {
        let mut schema = Schema::new();
        schema.add_table(member_table()).unwrap();

        let err = schema
            .add_relation(Relation::new("team", "member", "team_id", "team", "id"))
            .unwrap_err();
        assert!(
            matches!(err, SchemaError::UnknownRelationTable { .. }),
            "relation against an unregistered table must fail"
        );
    }
}
