//! Module: plan
//! Responsibility: immutable query-plan snapshots and their fluent assembly.
//! Does not own: schema legality (validate) or evaluation (exec).
//! Boundary: a built plan is a pure value; executing it never mutates it.

pub(crate) mod validate;

use crate::{
    expr::{Expr, SourceRef},
    predicate::Predicate,
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// PlanError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum PlanError {
    #[error("plan has no source table")]
    NoSource,

    #[error("plan has an empty select list")]
    EmptySelect,

    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("source alias '{0}' is declared more than once")]
    DuplicateAlias(String),

    #[error("expression references undeclared source alias '{0}'")]
    UnknownSourceAlias(String),

    #[error("unknown relation '{0}'")]
    UnknownRelation(String),

    #[error("relation '{relation}' joins from table '{table}', which is not in scope")]
    RelationSourceNotInScope { relation: String, table: String },

    #[error("relation '{relation}' targets table '{expected}', but the join names '{found}'")]
    RelationTargetMismatch {
        relation: String,
        expected: String,
        found: String,
    },

    #[error("'{0}' must appear in group_by or be aggregated")]
    UngroupedSelect(String),

    #[error("on() requires a preceding join")]
    DanglingOn,
}

///
/// JoinKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
}

///
/// Source
///
/// One table occurrence in a plan, addressed by alias.
///

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub table: String,
    pub alias: String,
}

impl From<&SourceRef> for Source {
    fn from(source: &SourceRef) -> Self {
        Self {
            table: source.table().to_string(),
            alias: source.alias().to_string(),
        }
    }
}

///
/// JoinClause
///
/// A declared-relation join carries the relation name and synthesizes
/// its key equality at execution; a relation-free join carries only an
/// explicit `on` predicate and preserves left-side cardinality under
/// `Left` regardless of how arbitrary the condition is.
///

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JoinClause {
    pub source: Source,
    pub kind: JoinKind,
    pub relation: Option<String>,
    pub on: Option<Predicate>,
}

///
/// Direction / NullOrdering
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

/// Null placement is explicit per key and independent of direction.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum NullOrdering {
    First,
    #[default]
    Last,
}

///
/// OrderSpec
///

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub expr: Expr,
    pub direction: Direction,
    pub nulls: NullOrdering,
}

///
/// QueryPlan
///
/// Immutable description of a query prior to execution. Built
/// incrementally through `PlanBuilder`; once built it is shared
/// freely and re-execution always re-evaluates from scratch.
///

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    select: Vec<Expr>,
    sources: Vec<Source>,
    joins: Vec<JoinClause>,
    filter: Option<Predicate>,
    group_by: Vec<Expr>,
    order_by: Vec<OrderSpec>,
    offset: Option<u64>,
    limit: Option<u64>,
}

impl QueryPlan {
    #[must_use]
    pub fn select(&self) -> &[Expr] {
        &self.select
    }

    #[must_use]
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    #[must_use]
    pub fn joins(&self) -> &[JoinClause] {
        &self.joins
    }

    #[must_use]
    pub const fn filter(&self) -> Option<&Predicate> {
        self.filter.as_ref()
    }

    #[must_use]
    pub fn group_by(&self) -> &[Expr] {
        &self.group_by
    }

    #[must_use]
    pub fn order_by(&self) -> &[OrderSpec] {
        &self.order_by
    }

    #[must_use]
    pub const fn offset(&self) -> Option<u64> {
        self.offset
    }

    #[must_use]
    pub const fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Copy of this plan with paging stripped, for total counts.
    #[must_use]
    pub fn without_paging(&self) -> Self {
        let mut plan = self.clone();
        plan.offset = None;
        plan.limit = None;
        plan
    }

    /// Copy of this plan with the limit replaced.
    #[must_use]
    pub fn with_limit(&self, limit: u64) -> Self {
        let mut plan = self.clone();
        plan.limit = Some(limit);
        plan
    }
}

///
/// PlanBuilder
///
/// Value-semantics fluent builder: every call consumes the builder and
/// returns a new snapshot, so a partially-built plan can be reused
/// across branches without aliasing surprises.
///

#[derive(Clone, Debug, Default)]
pub struct PlanBuilder {
    plan: QueryPlan,
    defect: Option<PlanError>,
}

impl PlanBuilder {
    #[must_use]
    pub fn select(exprs: impl IntoIterator<Item = Expr>) -> Self {
        let plan = QueryPlan {
            select: exprs.into_iter().collect(),
            ..QueryPlan::default()
        };

        Self { plan, defect: None }
    }

    #[must_use]
    pub fn from(mut self, source: &SourceRef) -> Self {
        self.plan.sources.push(Source::from(source));
        self
    }

    /// Add an unjoined source: an explicit cartesian product, filtered
    /// later by `filter`. Supported but discouraged; there is no
    /// implicit key inference across sources.
    #[must_use]
    pub fn cross_join(mut self, source: &SourceRef) -> Self {
        self.plan.sources.push(Source::from(source));
        self
    }

    #[must_use]
    pub fn join(self, relation: impl Into<String>, target: &SourceRef) -> Self {
        self.push_join(JoinKind::Inner, Some(relation.into()), target, None)
    }

    #[must_use]
    pub fn left_join(self, relation: impl Into<String>, target: &SourceRef) -> Self {
        self.push_join(JoinKind::Left, Some(relation.into()), target, None)
    }

    /// Relation-free join on an arbitrary predicate.
    #[must_use]
    pub fn join_on(self, target: &SourceRef, on: Predicate) -> Self {
        self.push_join(JoinKind::Inner, None, target, Some(on))
    }

    /// Relation-free left join; left rows without a match keep their
    /// cardinality, with the right side absent.
    #[must_use]
    pub fn left_join_on(self, target: &SourceRef, on: Predicate) -> Self {
        self.push_join(JoinKind::Left, None, target, Some(on))
    }

    /// Extra condition on the most recent join, AND-combined with the
    /// relation key or the existing `on` predicate.
    #[must_use]
    pub fn on(mut self, condition: Predicate) -> Self {
        match self.plan.joins.last_mut() {
            Some(join) => {
                join.on = Some(match join.on.take() {
                    Some(existing) => existing.and(condition),
                    None => condition,
                });
            }
            None => {
                self.defect.get_or_insert(PlanError::DanglingOn);
            }
        }
        self
    }

    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.plan.filter = Some(match self.plan.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Variadic filter list; absent entries are skipped.
    #[must_use]
    pub fn filter_all(self, predicates: impl IntoIterator<Item = Option<Predicate>>) -> Self {
        match Predicate::all(predicates) {
            Some(predicate) => self.filter(predicate),
            None => self,
        }
    }

    #[must_use]
    pub fn group_by(mut self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        self.plan.group_by.extend(exprs);
        self
    }

    #[must_use]
    pub fn order_by(self, expr: Expr, direction: Direction) -> Self {
        self.order_by_with(expr, direction, NullOrdering::default())
    }

    #[must_use]
    pub fn order_by_with(mut self, expr: Expr, direction: Direction, nulls: NullOrdering) -> Self {
        self.plan.order_by.push(OrderSpec {
            expr,
            direction,
            nulls,
        });
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.plan.offset = Some(offset);
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.plan.limit = Some(limit);
        self
    }

    /// Finish into an immutable plan. Schema-aware checks run at
    /// execution or rendering; only builder-level defects surface here.
    pub fn build(self) -> Result<QueryPlan, PlanError> {
        if let Some(defect) = self.defect {
            return Err(defect);
        }

        Ok(self.plan)
    }

    fn push_join(
        mut self,
        kind: JoinKind,
        relation: Option<String>,
        target: &SourceRef,
        on: Option<Predicate>,
    ) -> Self {
        self.plan.joins.push(JoinClause {
            source: Source::from(target),
            kind,
            relation,
            on,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_snapshots_are_independent_across_branches() {
        let base = PlanBuilder::select([Expr::constant(1)]);
        let limited = base.clone().limit(2).build().unwrap();
        let unlimited = base.build().unwrap();

        assert_eq!(limited.limit(), Some(2));
        assert_eq!(unlimited.limit(), None);
    }

    #[test]
    fn on_without_join_is_a_builder_defect() {
        let err = PlanBuilder::select([Expr::constant(1)])
            .on(Expr::constant(true).eq(true).unwrap())
            .build()
            .unwrap_err();

        assert_eq!(err, PlanError::DanglingOn);
    }

    #[test]
    fn without_paging_strips_only_offset_and_limit() {
        let plan = PlanBuilder::select([Expr::constant(1)])
            .offset(1)
            .limit(2)
            .build()
            .unwrap();
        let stripped = plan.without_paging();

        assert_eq!(stripped.offset(), None);
        assert_eq!(stripped.limit(), None);
        assert_eq!(stripped.select(), plan.select());
    }
}
