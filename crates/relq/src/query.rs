//! Module: query
//! Responsibility: the session-bound fluent query and its fetch terminals.
//! Does not own: plan assembly rules (PlanBuilder) or evaluation (exec).
//! Boundary: terminals consume the query; counting and paging re-derive
//! plans instead of mutating the built one.

use crate::{
    error::Error,
    exec::ExecError,
    expr::{Expr, SourceRef},
    plan::{Direction, NullOrdering, PlanBuilder, PlanError, QueryPlan},
    predicate::Predicate,
    session::Session,
    tuple::Tuple,
};

///
/// SelectQuery
///
/// A `PlanBuilder` bound to the session that will execute it. Every
/// clause method consumes and returns the query, so construction reads
/// as one chain ending in a fetch terminal.
///

#[derive(Clone, Debug)]
pub struct SelectQuery<'a> {
    session: &'a Session,
    builder: PlanBuilder,
}

impl<'a> SelectQuery<'a> {
    pub(crate) fn new(session: &'a Session, exprs: impl IntoIterator<Item = Expr>) -> Self {
        Self {
            session,
            builder: PlanBuilder::select(exprs),
        }
    }

    fn map_query(mut self, f: impl FnOnce(PlanBuilder) -> PlanBuilder) -> Self {
        self.builder = f(self.builder);
        self
    }

    #[must_use]
    pub fn from(self, source: &SourceRef) -> Self {
        self.map_query(|builder| builder.from(source))
    }

    /// Explicit cartesian product with another source.
    #[must_use]
    pub fn cross_join(self, source: &SourceRef) -> Self {
        self.map_query(|builder| builder.cross_join(source))
    }

    #[must_use]
    pub fn join(self, relation: impl Into<String>, target: &SourceRef) -> Self {
        self.map_query(|builder| builder.join(relation, target))
    }

    #[must_use]
    pub fn left_join(self, relation: impl Into<String>, target: &SourceRef) -> Self {
        self.map_query(|builder| builder.left_join(relation, target))
    }

    #[must_use]
    pub fn join_on(self, target: &SourceRef, on: Predicate) -> Self {
        self.map_query(|builder| builder.join_on(target, on))
    }

    #[must_use]
    pub fn left_join_on(self, target: &SourceRef, on: Predicate) -> Self {
        self.map_query(|builder| builder.left_join_on(target, on))
    }

    /// Extra condition on the most recent join.
    #[must_use]
    pub fn on(self, condition: Predicate) -> Self {
        self.map_query(|builder| builder.on(condition))
    }

    #[must_use]
    pub fn filter(self, predicate: Predicate) -> Self {
        self.map_query(|builder| builder.filter(predicate))
    }

    /// Variadic filter list; absent entries are skipped, so optional
    /// search conditions compose without branching.
    #[must_use]
    pub fn filter_all(self, predicates: impl IntoIterator<Item = Option<Predicate>>) -> Self {
        self.map_query(|builder| builder.filter_all(predicates))
    }

    #[must_use]
    pub fn group_by(self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        self.map_query(|builder| builder.group_by(exprs))
    }

    #[must_use]
    pub fn order_by(self, expr: Expr, direction: Direction) -> Self {
        self.map_query(|builder| builder.order_by(expr, direction))
    }

    #[must_use]
    pub fn order_by_with(self, expr: Expr, direction: Direction, nulls: NullOrdering) -> Self {
        self.map_query(|builder| builder.order_by_with(expr, direction, nulls))
    }

    #[must_use]
    pub fn offset(self, offset: u64) -> Self {
        self.map_query(|builder| builder.offset(offset))
    }

    #[must_use]
    pub fn limit(self, limit: u64) -> Self {
        self.map_query(|builder| builder.limit(limit))
    }

    /// Finish into a plan without executing, for embedding as a subquery
    /// or rendering to SQL.
    pub fn build(self) -> Result<QueryPlan, PlanError> {
        self.builder.build()
    }

    // ------------------------------------------------------------------
    // Terminals
    // ------------------------------------------------------------------

    /// Execute and return every result tuple.
    pub fn fetch(self) -> Result<Vec<Tuple>, Error> {
        let plan = self.builder.build()?;
        self.session.execute(&plan)
    }

    /// Execute expecting at most one result; more than one is an error.
    pub fn fetch_one(self) -> Result<Option<Tuple>, Error> {
        let plan = self.builder.build()?;
        let mut tuples = self.session.execute(&plan)?;

        match tuples.len() {
            0 | 1 => Ok(tuples.pop()),
            found => Err(ExecError::NonUniqueResult { found }.into()),
        }
    }

    /// Execute with the limit forced to one and return the first result.
    pub fn fetch_first(self) -> Result<Option<Tuple>, Error> {
        let plan = self.builder.build()?.with_limit(1);
        let mut tuples = self.session.execute(&plan)?;

        Ok(tuples.pop())
    }

    /// Total result count with paging stripped. Grouped plans count
    /// groups, not member rows.
    pub fn fetch_count(self) -> Result<u64, Error> {
        let plan = self.builder.build()?.without_paging();
        let tuples = self.session.execute(&plan)?;

        Ok(tuples.len() as u64)
    }

    /// One page of results plus the unpaged total, in two passes over
    /// the same plan.
    pub fn fetch_page(self) -> Result<PagedFetch, Error> {
        let plan = self.builder.build()?;
        let items = self.session.execute(&plan)?;
        let total = self.session.execute(&plan.without_paging())?.len() as u64;

        Ok(PagedFetch {
            items,
            total,
            offset: plan.offset().unwrap_or(0),
            limit: plan.limit(),
        })
    }
}

///
/// PagedFetch
///
/// One page of results with the unpaged total, as `fetch_page` returns.
///

#[derive(Clone, Debug, PartialEq)]
pub struct PagedFetch {
    items: Vec<Tuple>,
    total: u64,
    offset: u64,
    limit: Option<u64>,
}

impl PagedFetch {
    #[must_use]
    pub fn items(&self) -> &[Tuple] {
        &self.items
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    #[must_use]
    pub const fn limit(&self) -> Option<u64> {
        self.limit
    }

    #[must_use]
    pub fn into_parts(self) -> (Vec<Tuple>, u64) {
        (self.items, self.total)
    }
}
