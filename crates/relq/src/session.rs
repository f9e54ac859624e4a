//! Module: session
//! Responsibility: the unit-of-work facade: schema-bound store access,
//! query entry points, and the first-read row cache.
//! Does not own: plan semantics or store mutation mechanics.
//! Boundary: bulk mutations bypass the cache; cached reads stay stale
//! until an explicit `invalidate`.

use crate::{
    error::Error,
    exec::{self, ExecEnv},
    expr::{Expr, SourceRef},
    plan::QueryPlan,
    query::SelectQuery,
    schema::{Schema, SchemaError},
    store::{MemStore, Row, RowId, StoreError},
    tuple::Tuple,
    value::Value,
};
use std::{cell::RefCell, collections::HashMap, sync::Arc};
use tracing::debug;

///
/// RowCache
///
/// First-read row snapshots, keyed by table and row id. A cached row
/// shadows the store for every later read in the same session, which is
/// exactly how bulk mutations become observable staleness.
///

#[derive(Debug, Default)]
pub(crate) struct RowCache {
    entries: RefCell<HashMap<(String, RowId), Row>>,
}

impl RowCache {
    /// Return the cached row, caching the store's on first read.
    pub fn read_through(&self, table: &str, id: RowId, row: &Row) -> Row {
        self.entries
            .borrow_mut()
            .entry((table.to_string(), id))
            .or_insert_with(|| row.clone())
            .clone()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

///
/// Session
///
/// One schema, one store, one read cache. All query execution flows
/// through here; dropping the session drops everything it read.
///

#[derive(Debug)]
pub struct Session {
    schema: Arc<Schema>,
    store: MemStore,
    cache: RowCache,
}

impl Session {
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        let store = MemStore::new(Arc::clone(&schema));

        Self {
            schema,
            store,
            cache: RowCache::default(),
        }
    }

    #[must_use]
    pub const fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    #[must_use]
    pub const fn store(&self) -> &MemStore {
        &self.store
    }

    pub(crate) const fn store_mut(&mut self) -> &mut MemStore {
        &mut self.store
    }

    /// Insert one row in column declaration order. New rows are not
    /// cached until first read.
    pub fn insert(
        &mut self,
        table: &str,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Result<RowId, StoreError> {
        self.store.insert(table, values)
    }

    /// Source handle aliased by table name.
    pub fn source(&self, table: impl Into<String>) -> Result<SourceRef, SchemaError> {
        SourceRef::new(&self.schema, table)
    }

    /// Source handle under an explicit alias, for self-joins and
    /// subqueries ranging over an outer query's table.
    pub fn source_as(
        &self,
        table: impl Into<String>,
        alias: impl Into<String>,
    ) -> Result<SourceRef, SchemaError> {
        SourceRef::aliased(&self.schema, table, alias)
    }

    /// Begin a fluent query with the given select list.
    #[must_use]
    pub fn select(&self, exprs: impl IntoIterator<Item = Expr>) -> SelectQuery<'_> {
        SelectQuery::new(self, exprs)
    }

    /// Execute a pre-built plan through this session's cache.
    pub fn execute(&self, plan: &QueryPlan) -> Result<Vec<Tuple>, Error> {
        exec::execute(&self.env(), plan)
    }

    /// Drop every cached row; subsequent reads observe the store.
    pub fn invalidate(&self) {
        debug!("session cache invalidated");
        self.cache.clear();
    }

    pub(crate) fn env(&self) -> ExecEnv<'_> {
        ExecEnv {
            schema: &self.schema,
            store: &self.store,
            cache: Some(&self.cache),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{schema::Table, value::ValueType};

    fn session() -> Session {
        let mut schema = Schema::new();
        schema
            .add_table(
                Table::new("member")
                    .column("username", ValueType::Text)
                    .column("age", ValueType::Int),
            )
            .unwrap();

        Session::new(Arc::new(schema))
    }

    #[test]
    fn read_through_returns_the_first_seen_row() {
        let mut session = session();
        let id = session
            .insert("member", [Value::Text("a".into()), Value::Int(1)])
            .unwrap();

        let cache = RowCache::default();
        let original = Row::from_values(vec![Value::Text("a".into()), Value::Int(1)]);
        let mutated = Row::from_values(vec![Value::Text("a".into()), Value::Int(99)]);

        let first = cache.read_through("member", id, &original);
        let second = cache.read_through("member", id, &mutated);
        assert_eq!(first, second, "cached row must shadow later store state");

        cache.clear();
        let third = cache.read_through("member", id, &mutated);
        assert_eq!(third, mutated);
    }

    #[test]
    fn invalidate_empties_the_cache() {
        let mut session = session();
        let member = session.source("member").unwrap();
        session
            .insert("member", [Value::Text("a".into()), Value::Int(1)])
            .unwrap();

        session
            .select([member.column("username").unwrap()])
            .from(&member)
            .fetch()
            .unwrap();
        assert_eq!(session.cache.len(), 1);

        session.invalidate();
        assert_eq!(session.cache.len(), 0);
    }
}
