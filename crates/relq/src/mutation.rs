//! Module: mutation
//! Responsibility: bulk update and delete builders over one table.
//! Does not own: row storage or the session cache.
//! Boundary: mutations write to the store directly and never touch the
//! cache, so previously-read rows stay stale until `invalidate`.

use crate::{
    error::Error,
    exec::{ExecEnv, eval, join::Frame},
    expr::{Expr, SourceRef, TypeError},
    predicate::Predicate,
    schema::SchemaError,
    session::Session,
    store::RowId,
    value::Value,
};
use tracing::debug;

///
/// Update
///
/// Bulk update: assignments plus an optional filter, applied to every
/// matching row of one table. Assignment expressions evaluate against
/// the row's pre-update values.
///

#[derive(Clone, Debug)]
pub struct Update {
    source: SourceRef,
    sets: Vec<(String, Expr)>,
    filter: Option<Predicate>,
}

impl Update {
    #[must_use]
    pub fn table(source: &SourceRef) -> Self {
        Self {
            source: source.clone(),
            sets: Vec::new(),
            filter: None,
        }
    }

    /// Assign a column from an expression over the old row.
    pub fn set(mut self, column: &str, value: impl Into<Expr>) -> Result<Self, Error> {
        let target = self.source.column(column)?;
        let value = value.into();
        if let (Some(expected), Some(found)) = (target.ty(), value.ty())
            && !expected.comparable_with(&found)
        {
            return Err(TypeError::Mismatch {
                op: "set",
                lhs: expected.to_string(),
                rhs: found.to_string(),
            }
            .into());
        }
        self.sets.push((column.to_string(), value));

        Ok(self)
    }

    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Render to a parameterized SQL statement without executing.
    pub fn to_sql(&self) -> Result<crate::sql::Statement, Error> {
        crate::sql::render_update(self)
    }

    pub(crate) const fn source(&self) -> &SourceRef {
        &self.source
    }

    pub(crate) fn sets(&self) -> &[(String, Expr)] {
        &self.sets
    }

    pub(crate) const fn filter_pred(&self) -> Option<&Predicate> {
        self.filter.as_ref()
    }

    /// Apply to every matching row, returning the affected count.
    pub fn execute(self, session: &mut Session) -> Result<u64, Error> {
        let table = self.source.table().to_string();
        let table_def = session.schema().require_table(&table)?.clone();

        let mut indexed_sets = Vec::with_capacity(self.sets.len());
        for (column, expr) in &self.sets {
            let index =
                table_def
                    .column_index(column)
                    .ok_or_else(|| SchemaError::UnknownColumn {
                        table: table.clone(),
                        column: column.clone(),
                    })?;
            indexed_sets.push((index, expr));
        }

        // Evaluate against the store first, then write. Assignments see
        // pre-update values even when one row updates several columns.
        let mut pending: Vec<(RowId, Vec<(usize, Value)>)> = Vec::new();
        {
            let env = uncached_env(session);
            for (id, row) in session.store().rows(&table) {
                let frame = Frame::single(self.source.alias(), &table, *id, row.clone());
                let scope = eval::Scope::Row(&frame);
                if !matches(&env, &scope, self.filter.as_ref())? {
                    continue;
                }

                let mut assigns = Vec::with_capacity(indexed_sets.len());
                for (index, expr) in &indexed_sets {
                    assigns.push((*index, eval::eval(&env, &scope, expr)?));
                }
                pending.push((*id, assigns));
            }
        }

        let affected = pending.len() as u64;
        session.store_mut().for_each_row_mut(&table, |id, row| {
            if let Some((_, assigns)) = pending.iter().find(|(target, _)| *target == id) {
                for (index, value) in assigns {
                    row[*index] = value.clone();
                }
            }
        });
        debug!(table = %table, affected, "bulk update");

        Ok(affected)
    }
}

///
/// Delete
///
/// Bulk delete: remove every row of one table matching the filter, or
/// every row when no filter is given.
///

#[derive(Clone, Debug)]
pub struct Delete {
    source: SourceRef,
    filter: Option<Predicate>,
}

impl Delete {
    #[must_use]
    pub fn table(source: &SourceRef) -> Self {
        Self {
            source: source.clone(),
            filter: None,
        }
    }

    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Render to a parameterized SQL statement without executing.
    pub fn to_sql(&self) -> Result<crate::sql::Statement, Error> {
        crate::sql::render_delete(self)
    }

    pub(crate) const fn source(&self) -> &SourceRef {
        &self.source
    }

    pub(crate) const fn filter_pred(&self) -> Option<&Predicate> {
        self.filter.as_ref()
    }

    /// Remove every matching row, returning the affected count.
    pub fn execute(self, session: &mut Session) -> Result<u64, Error> {
        let table = self.source.table().to_string();
        session.schema().require_table(&table)?;

        let mut doomed: Vec<RowId> = Vec::new();
        {
            let env = uncached_env(session);
            for (id, row) in session.store().rows(&table) {
                let frame = Frame::single(self.source.alias(), &table, *id, row.clone());
                let scope = eval::Scope::Row(&frame);
                if matches(&env, &scope, self.filter.as_ref())? {
                    doomed.push(*id);
                }
            }
        }

        let affected = doomed.len() as u64;
        session
            .store_mut()
            .retain_rows(&table, |id, _| !doomed.contains(&id));
        debug!(table = %table, affected, "bulk delete");

        Ok(affected)
    }
}

fn uncached_env(session: &Session) -> ExecEnv<'_> {
    ExecEnv {
        schema: session.schema(),
        store: session.store(),
        cache: None,
    }
}

fn matches(
    env: &ExecEnv<'_>,
    scope: &eval::Scope<'_>,
    filter: Option<&Predicate>,
) -> Result<bool, Error> {
    match filter {
        Some(predicate) => eval::eval_truthy(env, scope, predicate.expr()),
        None => Ok(true),
    }
}
