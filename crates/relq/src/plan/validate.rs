//! Module: plan::validate
//! Responsibility: schema-aware plan legality checks before execution.
//! Does not own: operand typing (done at expression construction).
//! Boundary: the evaluator and the SQL renderer only accept validated plans.

use crate::{
    expr::Expr,
    plan::{JoinClause, PlanError, QueryPlan, Source},
    schema::Schema,
};

/// Validate a plan against the schema: source resolution, alias scoping,
/// relation join legality, and grouping rules. Nested subquery plans are
/// validated with their own (uncorrelated) scope.
pub(crate) fn validate(schema: &Schema, plan: &QueryPlan) -> Result<(), PlanError> {
    if plan.sources().is_empty() {
        return Err(PlanError::NoSource);
    }
    if plan.select().is_empty() {
        return Err(PlanError::EmptySelect);
    }

    let scope = collect_scope(schema, plan)?;

    for join in plan.joins() {
        validate_relation_join(schema, plan, join)?;
    }

    let mut exprs: Vec<&Expr> = Vec::new();
    exprs.extend(plan.select());
    exprs.extend(plan.group_by());
    exprs.extend(plan.order_by().iter().map(|spec| &spec.expr));
    if let Some(filter) = plan.filter() {
        exprs.push(filter.expr());
    }
    for join in plan.joins() {
        if let Some(on) = &join.on {
            exprs.push(on.expr());
        }
    }
    for expr in exprs {
        check_scope(schema, expr, &scope)?;
    }

    validate_grouping(plan)?;

    Ok(())
}

fn collect_scope<'a>(schema: &Schema, plan: &'a QueryPlan) -> Result<Vec<&'a Source>, PlanError> {
    let mut scope: Vec<&Source> = Vec::new();
    let declared = plan
        .sources()
        .iter()
        .chain(plan.joins().iter().map(|join| &join.source));

    for source in declared {
        if schema.table(&source.table).is_none() {
            return Err(PlanError::UnknownTable(source.table.clone()));
        }
        if scope.iter().any(|seen| seen.alias == source.alias) {
            return Err(PlanError::DuplicateAlias(source.alias.clone()));
        }
        scope.push(source);
    }

    Ok(scope)
}

fn validate_relation_join(
    schema: &Schema,
    plan: &QueryPlan,
    join: &JoinClause,
) -> Result<(), PlanError> {
    let Some(relation_name) = &join.relation else {
        return Ok(());
    };
    let relation = schema
        .relation(relation_name)
        .ok_or_else(|| PlanError::UnknownRelation(relation_name.clone()))?;

    if relation.target != join.source.table {
        return Err(PlanError::RelationTargetMismatch {
            relation: relation_name.clone(),
            expected: relation.target.clone(),
            found: join.source.table.clone(),
        });
    }

    // The relation's owning side must already be in scope ahead of this join.
    let in_scope = plan
        .sources()
        .iter()
        .chain(plan.joins().iter().map(|other| &other.source))
        .take_while(|source| source.alias != join.source.alias)
        .any(|source| source.table == relation.source);
    if !in_scope {
        return Err(PlanError::RelationSourceNotInScope {
            relation: relation_name.clone(),
            table: relation.source.clone(),
        });
    }

    Ok(())
}

fn check_scope(schema: &Schema, expr: &Expr, scope: &[&Source]) -> Result<(), PlanError> {
    match expr {
        Expr::Column { source, .. } | Expr::EntityRef { source, .. } => {
            if !scope.iter().any(|declared| declared.alias == *source) {
                return Err(PlanError::UnknownSourceAlias(source.clone()));
            }
        }
        Expr::Binary { lhs, rhs, .. } => {
            check_scope(schema, lhs, scope)?;
            check_scope(schema, rhs, scope)?;
        }
        Expr::Not(inner) | Expr::IsNull(inner) => check_scope(schema, inner, scope)?,
        Expr::Cast { inner, .. } | Expr::Alias { inner, .. } => {
            check_scope(schema, inner, scope)?;
        }
        Expr::Aggregate { arg, .. } => {
            if let Some(arg) = arg {
                check_scope(schema, arg, scope)?;
            }
        }
        Expr::StringFn { args, .. } => {
            for arg in args {
                check_scope(schema, arg, scope)?;
            }
        }
        Expr::Case {
            branches,
            otherwise,
            ..
        } => {
            for (when, then) in branches {
                check_scope(schema, when, scope)?;
                check_scope(schema, then, scope)?;
            }
            if let Some(otherwise) = otherwise {
                check_scope(schema, otherwise, scope)?;
            }
        }
        // Subqueries are uncorrelated: validated against their own scope.
        Expr::Subquery { plan, .. } => validate(schema, plan)?,
        Expr::Constant(_) => {}
    }

    Ok(())
}

fn validate_grouping(plan: &QueryPlan) -> Result<(), PlanError> {
    let grouped_exprs: Vec<&Expr> = plan
        .select()
        .iter()
        .chain(plan.order_by().iter().map(|spec| &spec.expr))
        .collect();

    if plan.group_by().is_empty() {
        // Mixing aggregates with plain expressions needs a group_by.
        if plan.select().iter().any(Expr::has_aggregate) {
            for expr in grouped_exprs {
                if !expr.has_aggregate() && !matches!(expr.unaliased(), Expr::Constant(_)) {
                    return Err(PlanError::UngroupedSelect(expr.to_string()));
                }
            }
        }
        return Ok(());
    }

    for expr in grouped_exprs {
        let bare = expr.unaliased();
        let is_key = plan.group_by().iter().any(|key| key == bare);
        if !is_key && !bare.has_aggregate() && !matches!(bare, Expr::Constant(_)) {
            return Err(PlanError::UngroupedSelect(expr.to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        expr::SourceRef,
        plan::{Direction, PlanBuilder},
        schema::{Relation, Table},
        value::ValueType,
    };
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        let mut schema = Schema::new();
        schema
            .add_table(
                Table::new("member")
                    .column("username", ValueType::Text)
                    .column("age", ValueType::Int)
                    .column("team_id", ValueType::Int),
            )
            .unwrap();
        schema
            .add_table(
                Table::new("team")
                    .column("id", ValueType::Int)
                    .column("name", ValueType::Text),
            )
            .unwrap();
        schema
            .add_relation(Relation::new("member_team", "member", "team_id", "team", "id"))
            .unwrap();

        Arc::new(schema)
    }

    #[test]
    fn grouped_select_must_use_keys_or_aggregates() {
        let schema = schema();
        let member = SourceRef::new(&schema, "member").unwrap();
        let plan = PlanBuilder::select([
            member.column("username").unwrap(),
            member.column("age").unwrap().sum().unwrap(),
        ])
        .from(&member)
        .group_by([member.column("age").unwrap()])
        .build()
        .unwrap();

        let err = validate(&schema, &plan).unwrap_err();
        assert!(matches!(err, PlanError::UngroupedSelect(_)));
    }

    #[test]
    fn relation_join_requires_owning_side_in_scope() {
        let schema = schema();
        let team = SourceRef::new(&schema, "team").unwrap();
        let plan = PlanBuilder::select([team.column("name").unwrap()])
            .from(&team)
            .join("member_team", &team)
            .build()
            .unwrap();

        let err = validate(&schema, &plan).unwrap_err();
        // First failure: the join target repeats the 'team' alias.
        assert_eq!(err, PlanError::DuplicateAlias("team".into()));
    }

    #[test]
    fn relation_join_target_table_must_match() {
        let schema = schema();
        let member = SourceRef::new(&schema, "member").unwrap();
        let other = SourceRef::aliased(&schema, "member", "m2").unwrap();
        let plan = PlanBuilder::select([member.column("username").unwrap()])
            .from(&member)
            .join("member_team", &other)
            .build()
            .unwrap();

        let err = validate(&schema, &plan).unwrap_err();
        assert!(matches!(err, PlanError::RelationTargetMismatch { .. }));
    }

    #[test]
    fn undeclared_alias_is_rejected() {
        let schema = schema();
        let member = SourceRef::new(&schema, "member").unwrap();
        let team = SourceRef::new(&schema, "team").unwrap();
        let plan = PlanBuilder::select([team.column("name").unwrap()])
            .from(&member)
            .order_by(member.column("age").unwrap(), Direction::Asc)
            .build()
            .unwrap();

        let err = validate(&schema, &plan).unwrap_err();
        assert_eq!(err, PlanError::UnknownSourceAlias("team".into()));
    }
}
