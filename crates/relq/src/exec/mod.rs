//! Module: exec
//! Responsibility: in-process plan evaluation over the row store.
//! Does not own: plan construction, schema metadata, or the session cache policy.
//! Boundary: accepts validated plans; re-execution always re-evaluates from scratch.

pub(crate) mod eval;
pub(crate) mod group;
pub(crate) mod join;
pub(crate) mod sort;

use crate::{
    error::Error,
    expr::{AggregateFunc, Expr},
    plan::{QueryPlan, validate::validate},
    schema::Schema,
    session::RowCache,
    store::MemStore,
    tuple::Tuple,
};
use thiserror::Error as ThisError;
use tracing::debug;

///
/// ExecError
///

#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum ExecError {
    #[error("expected at most one result row, found {found}")]
    NonUniqueResult { found: usize },

    #[error("aggregate '{func}' over an empty group is undefined")]
    EmptyAggregate { func: AggregateFunc },
}

///
/// ExecEnv
///
/// Borrowed execution environment. The cache is present only on the
/// session read path; subqueries and counts share the same environment,
/// so one execution observes one consistent view.
///

#[derive(Clone, Copy)]
pub(crate) struct ExecEnv<'a> {
    pub schema: &'a Schema,
    pub store: &'a MemStore,
    pub cache: Option<&'a RowCache>,
}

/// Execute a plan to completion: validate, join, filter, group or sort,
/// page, project. The result is fully materialized and finite.
pub(crate) fn execute(env: &ExecEnv<'_>, plan: &QueryPlan) -> Result<Vec<Tuple>, Error> {
    validate(env.schema, plan)?;

    let mut frames = join::build_frames(env, plan)?;
    debug!(sources = plan.sources().len(), joins = plan.joins().len(), frames = frames.len(), "joined");

    if let Some(filter) = plan.filter() {
        let mut kept = Vec::with_capacity(frames.len());
        for frame in frames {
            let scope = eval::Scope::Row(&frame);
            if eval::eval_truthy(env, &scope, filter.expr())? {
                kept.push(frame);
            }
        }
        frames = kept;
    }

    let grouped = !plan.group_by().is_empty() || plan.select().iter().any(Expr::has_aggregate);
    let tuples = if grouped {
        group::execute_grouped(env, plan, frames)?
    } else {
        execute_rows(env, plan, frames)?
    };
    debug!(rows = tuples.len(), "fetched");

    Ok(tuples)
}

fn execute_rows(
    env: &ExecEnv<'_>,
    plan: &QueryPlan,
    frames: Vec<join::Frame>,
) -> Result<Vec<Tuple>, Error> {
    let mut keys = Vec::with_capacity(frames.len());
    for frame in &frames {
        let scope = eval::Scope::Row(frame);
        let mut key = Vec::with_capacity(plan.order_by().len());
        for spec in plan.order_by() {
            key.push(eval::eval(env, &scope, &spec.expr)?);
        }
        keys.push(key);
    }

    let ordered = sort::sort_by_keys(frames, keys, plan.order_by());
    let paged = page(ordered, plan.offset(), plan.limit());

    let mut tuples = Vec::with_capacity(paged.len());
    for frame in &paged {
        let scope = eval::Scope::Row(frame);
        tuples.push(project(env, &scope, plan.select())?);
    }

    Ok(tuples)
}

pub(crate) fn project(
    env: &ExecEnv<'_>,
    scope: &eval::Scope<'_>,
    select: &[Expr],
) -> Result<Tuple, Error> {
    let mut items = Vec::with_capacity(select.len());
    for expr in select {
        let value = eval::eval(env, scope, expr)?;
        items.push((expr.clone(), value));
    }

    Ok(Tuple::new(items))
}

pub(crate) fn page<T>(items: Vec<T>, offset: Option<u64>, limit: Option<u64>) -> Vec<T> {
    let skip = usize::try_from(offset.unwrap_or(0)).unwrap_or(usize::MAX);
    let take = limit.map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));

    items.into_iter().skip(skip).take(take).collect()
}
