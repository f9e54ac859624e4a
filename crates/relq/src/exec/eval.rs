//! Module: exec::eval
//! Responsibility: expression evaluation over row frames and group contexts.
//! Does not own: frame construction (join) or aggregate folding (group).
//! Boundary: trusts construction-time typing; nulls propagate, never panic.

use crate::{
    error::Error,
    exec::{ExecEnv, execute, group, join::Frame},
    expr::{BinaryOp, Expr, StringFunc},
    plan::PlanError,
    value::Value,
};

///
/// Scope
///
/// Where column references resolve: a single joined row, or a group of
/// rows where only group keys and aggregates are addressable.
///

pub(crate) enum Scope<'a> {
    Row(&'a Frame),
    Group(&'a group::GroupCtx<'a>),
}

/// Evaluate a predicate for filtering: `true` only for a definite match;
/// null (unknown) filters out, as in SQL.
pub(crate) fn eval_truthy(env: &ExecEnv<'_>, scope: &Scope<'_>, expr: &Expr) -> Result<bool, Error> {
    Ok(matches!(eval(env, scope, expr)?, Value::Bool(true)))
}

pub(crate) fn eval(env: &ExecEnv<'_>, scope: &Scope<'_>, expr: &Expr) -> Result<Value, Error> {
    if let Scope::Group(group) = scope {
        // Group keys resolve to the group's key values; everything else
        // must be an aggregate or recurse into one.
        if let Some(value) = group.key_value(expr) {
            return Ok(value.clone());
        }
        if let Expr::Aggregate { func, arg, ty } = expr.unaliased() {
            return group::eval_aggregate(env, *func, arg.as_deref(), ty, group.frames);
        }
    }

    match expr {
        Expr::Column { source, column, .. } => match scope {
            Scope::Row(frame) => eval_column(env, frame, source, column),
            Scope::Group(_) => Err(PlanError::UngroupedSelect(expr.to_string()).into()),
        },
        Expr::Constant(value) => Ok(value.clone()),
        Expr::EntityRef { source, .. } => match scope {
            Scope::Row(frame) => {
                let slot = frame
                    .slot(source)
                    .ok_or_else(|| PlanError::UnknownSourceAlias(source.clone()))?;
                Ok(slot
                    .row
                    .as_ref()
                    .map_or(Value::Null, |(_, row)| Value::Row(row.values().to_vec())))
            }
            Scope::Group(_) => Err(PlanError::UngroupedSelect(expr.to_string()).into()),
        },
        Expr::Binary { op, lhs, rhs, .. } => eval_binary(env, scope, *op, lhs, rhs),
        Expr::Not(inner) => Ok(match bool3(&eval(env, scope, inner)?) {
            Some(b) => Value::Bool(!b),
            None => Value::Null,
        }),
        Expr::IsNull(inner) => Ok(Value::Bool(eval(env, scope, inner)?.is_null())),
        Expr::Case {
            branches,
            otherwise,
            ..
        } => {
            // Declaration order; first matching branch wins. A missing
            // otherwise is an explicit null, not an accident.
            for (when, then) in branches {
                if eval_truthy(env, scope, when)? {
                    return eval(env, scope, then);
                }
            }
            match otherwise {
                Some(default) => eval(env, scope, default),
                None => Ok(Value::Null),
            }
        }
        Expr::Aggregate { .. } => Err(PlanError::UngroupedSelect(expr.to_string()).into()),
        Expr::Subquery { plan, .. } => scalar_subquery(env, plan),
        Expr::Cast { inner, .. } => {
            let value = eval(env, scope, inner)?;
            Ok(value
                .render_text()
                .map_or(Value::Null, Value::Text))
        }
        Expr::StringFn { func, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                let value = eval(env, scope, arg)?;
                if value.is_null() {
                    return Ok(Value::Null);
                }
                values.push(value);
            }
            Ok(eval_string_fn(*func, &values))
        }
        Expr::Alias { inner, .. } => eval(env, scope, inner),
    }
}

/// Arity and operand types are fixed at construction; anything else
/// evaluates to null.
fn eval_string_fn(func: StringFunc, args: &[Value]) -> Value {
    match (func, args) {
        (StringFunc::Lower, [Value::Text(s)]) => Value::Text(s.to_lowercase()),
        (StringFunc::Replace, [Value::Text(s), Value::Text(from), Value::Text(to)]) => {
            Value::Text(s.replace(from.as_str(), to))
        }
        _ => Value::Null,
    }
}

fn eval_column(
    env: &ExecEnv<'_>,
    frame: &Frame,
    source: &str,
    column: &str,
) -> Result<Value, Error> {
    let slot = frame
        .slot(source)
        .ok_or_else(|| PlanError::UnknownSourceAlias(source.to_string()))?;
    let Some((_, row)) = &slot.row else {
        // Unmatched left-join side: every column reads as null.
        return Ok(Value::Null);
    };

    let table = env
        .schema
        .table(&slot.table)
        .ok_or_else(|| PlanError::UnknownTable(slot.table.clone()))?;
    let index = table
        .column_index(column)
        .ok_or_else(|| crate::schema::SchemaError::UnknownColumn {
            table: slot.table.clone(),
            column: column.to_string(),
        })?;

    Ok(row.values()[index].clone())
}

fn eval_binary(
    env: &ExecEnv<'_>,
    scope: &Scope<'_>,
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
) -> Result<Value, Error> {
    match op {
        BinaryOp::And | BinaryOp::Or => {
            let left = bool3(&eval(env, scope, lhs)?);
            let right = bool3(&eval(env, scope, rhs)?);
            Ok(match (op, left, right) {
                (BinaryOp::And, Some(false), _) | (BinaryOp::And, _, Some(false)) => {
                    Value::Bool(false)
                }
                (BinaryOp::And, Some(true), Some(true)) => Value::Bool(true),
                (BinaryOp::Or, Some(true), _) | (BinaryOp::Or, _, Some(true)) => Value::Bool(true),
                (BinaryOp::Or, Some(false), Some(false)) => Value::Bool(false),
                _ => Value::Null,
            })
        }
        BinaryOp::In => eval_in(env, scope, lhs, rhs),
        _ => {
            let left = eval(env, scope, lhs)?;
            let right = eval(env, scope, rhs)?;
            if left.is_null() || right.is_null() {
                return Ok(Value::Null);
            }
            eval_scalar_binary(op, &left, &right)
        }
    }
}

fn eval_scalar_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, Error> {
    match op {
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => {
            let Some(ordering) = left.strict_order(right) else {
                return Ok(Value::Null);
            };
            let matched = match op {
                BinaryOp::Eq => ordering.is_eq(),
                BinaryOp::Ne => ordering.is_ne(),
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Lte => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Ok(Value::Bool(matched))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => {
            // Int arithmetic that overflows i64 widens to decimal.
            if let (Value::Int(a), Value::Int(b)) = (left, right) {
                let n = match op {
                    BinaryOp::Add => a.checked_add(*b),
                    BinaryOp::Sub => a.checked_sub(*b),
                    _ => a.checked_mul(*b),
                };
                if let Some(n) = n {
                    return Ok(Value::Int(n));
                }
            }
            let (Some(a), Some(b)) = (left.to_decimal(), right.to_decimal()) else {
                return Ok(Value::Null);
            };
            let d = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                _ => a * b,
            };
            Ok(Value::Decimal(d))
        }
        BinaryOp::Concat => {
            let (Some(a), Some(b)) = (left.render_text(), right.render_text()) else {
                return Ok(Value::Null);
            };
            Ok(Value::Text(a + &b))
        }
        BinaryOp::And | BinaryOp::Or | BinaryOp::In => unreachable!("handled by eval_binary"),
    }
}

fn eval_in(env: &ExecEnv<'_>, scope: &Scope<'_>, lhs: &Expr, rhs: &Expr) -> Result<Value, Error> {
    let needle = eval(env, scope, lhs)?;
    if needle.is_null() {
        return Ok(Value::Null);
    }

    let haystack = match rhs {
        Expr::Constant(Value::List(values)) => values.clone(),
        Expr::Subquery { plan, .. } => list_subquery(env, plan)?,
        other => vec![eval(env, scope, other)?],
    };
    let matched = haystack
        .iter()
        .any(|candidate| needle.compare_eq(candidate) == Some(true));

    Ok(Value::Bool(matched))
}

/// Uncorrelated scalar subquery: no rows is null, one row is its single
/// value, more than one row is a non-unique-result failure.
fn scalar_subquery(env: &ExecEnv<'_>, plan: &crate::plan::QueryPlan) -> Result<Value, Error> {
    let rows = execute(env, plan)?;
    match rows.len() {
        0 => Ok(Value::Null),
        1 => Ok(rows[0].get_at(0).cloned().unwrap_or(Value::Null)),
        found => Err(crate::exec::ExecError::NonUniqueResult { found }.into()),
    }
}

fn list_subquery(env: &ExecEnv<'_>, plan: &crate::plan::QueryPlan) -> Result<Vec<Value>, Error> {
    let rows = execute(env, plan)?;
    Ok(rows
        .iter()
        .filter_map(|row| row.get_at(0).cloned())
        .collect())
}

const fn bool3(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn int_arithmetic_widens_to_decimal_on_overflow() {
        let in_range =
            eval_scalar_binary(BinaryOp::Add, &Value::Int(40), &Value::Int(2)).unwrap();
        assert_eq!(in_range, Value::Int(42));

        let sum =
            eval_scalar_binary(BinaryOp::Add, &Value::Int(i64::MAX), &Value::Int(1)).unwrap();
        assert_eq!(sum, Value::Decimal(Decimal::from(i64::MAX) + Decimal::ONE));

        let product =
            eval_scalar_binary(BinaryOp::Mul, &Value::Int(i64::MAX), &Value::Int(2)).unwrap();
        assert_eq!(
            product,
            Value::Decimal(Decimal::from(i64::MAX) * Decimal::from(2))
        );

        let difference =
            eval_scalar_binary(BinaryOp::Sub, &Value::Int(i64::MIN), &Value::Int(1)).unwrap();
        assert_eq!(difference, Value::Decimal(Decimal::from(i64::MIN) - Decimal::ONE));
    }
}
