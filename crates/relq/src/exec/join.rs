//! Module: exec::join
//! Responsibility: frame construction: source scans, cartesian products,
//! nested-loop relation and relation-free joins.
//! Does not own: expression evaluation semantics or null comparison rules.
//! Boundary: produces row frames the filter/group/sort stages consume.

use crate::{
    error::Error,
    exec::{ExecEnv, eval},
    expr::Expr,
    plan::{JoinClause, JoinKind, PlanError, QueryPlan, Source},
    predicate::Predicate,
    store::{Row, RowId},
    value::ValueType,
};

///
/// Slot
///
/// One source occurrence inside a frame. `row` is `None` for the
/// unmatched side of a left join; its columns evaluate to null.
///

#[derive(Clone, Debug)]
pub(crate) struct Slot {
    pub alias: String,
    pub table: String,
    pub row: Option<(RowId, Row)>,
}

///
/// Frame
///
/// One joined row combination: a slot per in-scope source alias.
///

#[derive(Clone, Debug, Default)]
pub(crate) struct Frame {
    slots: Vec<Slot>,
}

impl Frame {
    /// Single-source frame, used by the bulk-mutation filter path.
    pub(crate) fn single(alias: &str, table: &str, id: RowId, row: Row) -> Self {
        Self {
            slots: vec![Slot {
                alias: alias.to_string(),
                table: table.to_string(),
                row: Some((id, row)),
            }],
        }
    }

    #[must_use]
    pub fn slot(&self, alias: &str) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.alias == alias)
    }

    fn extended(&self, slot: Slot) -> Self {
        let mut slots = self.slots.clone();
        slots.push(slot);
        Self { slots }
    }
}

/// Load a table scan through the session cache when one is attached:
/// cached rows shadow the store until the caller invalidates.
fn load_rows(env: &ExecEnv<'_>, table: &str) -> Vec<(RowId, Row)> {
    let rows = env.store.rows(table);
    let Some(cache) = env.cache else {
        return rows.to_vec();
    };

    rows.iter()
        .map(|(id, row)| (*id, cache.read_through(table, *id, row)))
        .collect()
}

/// Seed frames from the plan sources (explicit cartesian product), then
/// apply joins in declaration order.
pub(crate) fn build_frames(env: &ExecEnv<'_>, plan: &QueryPlan) -> Result<Vec<Frame>, Error> {
    let mut frames = vec![Frame::default()];
    for source in plan.sources() {
        frames = cartesian(env, frames, source);
    }
    for join in plan.joins() {
        frames = apply_join(env, frames, plan, join)?;
    }

    Ok(frames)
}

fn cartesian(env: &ExecEnv<'_>, frames: Vec<Frame>, source: &Source) -> Vec<Frame> {
    let rows = load_rows(env, &source.table);
    let mut extended = Vec::with_capacity(frames.len() * rows.len().max(1));
    for frame in &frames {
        for (id, row) in &rows {
            extended.push(frame.extended(Slot {
                alias: source.alias.clone(),
                table: source.table.clone(),
                row: Some((*id, row.clone())),
            }));
        }
    }

    extended
}

fn apply_join(
    env: &ExecEnv<'_>,
    frames: Vec<Frame>,
    plan: &QueryPlan,
    join: &JoinClause,
) -> Result<Vec<Frame>, Error> {
    let condition = join_condition(env, plan, join)?;
    let rows = load_rows(env, &join.source.table);

    let mut joined = Vec::with_capacity(frames.len());
    for frame in frames {
        let mut matched = false;
        for (id, row) in &rows {
            let candidate = frame.extended(Slot {
                alias: join.source.alias.clone(),
                table: join.source.table.clone(),
                row: Some((*id, row.clone())),
            });
            let scope = eval::Scope::Row(&candidate);
            if eval::eval_truthy(env, &scope, condition.expr())? {
                matched = true;
                joined.push(candidate);
            }
        }
        // Left joins preserve left-side cardinality.
        if !matched && join.kind == JoinKind::Left {
            joined.push(frame.extended(Slot {
                alias: join.source.alias.clone(),
                table: join.source.table.clone(),
                row: None,
            }));
        }
    }

    Ok(joined)
}

/// Resolve the effective join condition: the declared relation's key
/// equality, AND-combined with any extra `on` predicate; or the explicit
/// `on` predicate alone for relation-free joins.
fn join_condition(
    env: &ExecEnv<'_>,
    plan: &QueryPlan,
    join: &JoinClause,
) -> Result<Predicate, Error> {
    let Some(relation_name) = &join.relation else {
        let on = join
            .on
            .clone()
            .ok_or(Error::Plan(PlanError::DanglingOn))?;
        return Ok(on);
    };

    let relation = env
        .schema
        .relation(relation_name)
        .ok_or_else(|| PlanError::UnknownRelation(relation_name.clone()))?;

    // Owning-side alias: first in-scope source of the relation's table,
    // ahead of this join (validation guarantees one exists).
    let owner_alias = plan
        .sources()
        .iter()
        .chain(plan.joins().iter().map(|other| &other.source))
        .take_while(|source| source.alias != join.source.alias)
        .find(|source| source.table == relation.source)
        .map(|source| source.alias.clone())
        .ok_or_else(|| PlanError::RelationSourceNotInScope {
            relation: relation_name.clone(),
            table: relation.source.clone(),
        })?;

    let key_equality = Predicate::from_expr(Expr::Binary {
        op: crate::expr::BinaryOp::Eq,
        lhs: Box::new(column_expr(env, &owner_alias, &relation.source, &relation.source_column)?),
        rhs: Box::new(column_expr(
            env,
            &join.source.alias,
            &relation.target,
            &relation.target_column,
        )?),
        ty: ValueType::Bool,
    });

    Ok(match &join.on {
        Some(extra) => key_equality.and(extra.clone()),
        None => key_equality,
    })
}

fn column_expr(env: &ExecEnv<'_>, alias: &str, table: &str, column: &str) -> Result<Expr, Error> {
    let table_def = env
        .schema
        .table(table)
        .ok_or_else(|| PlanError::UnknownTable(table.to_string()))?;
    let column_def =
        table_def
            .column_def(column)
            .ok_or_else(|| crate::schema::SchemaError::UnknownColumn {
                table: table.to_string(),
                column: column.to_string(),
            })?;

    Ok(Expr::Column {
        source: alias.to_string(),
        column: column_def.name.clone(),
        ty: column_def.ty.clone(),
    })
}
