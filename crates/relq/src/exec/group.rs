//! Module: exec::group
//! Responsibility: grouping, aggregate folding, and grouped projection.
//! Does not own: scalar evaluation or sort semantics.
//! Boundary: groups form in first-seen key order; ORDER BY then reorders.

use crate::{
    error::Error,
    exec::{ExecEnv, ExecError, eval, join::Frame, page, project, sort},
    expr::{AggregateFunc, Expr},
    plan::QueryPlan,
    tuple::Tuple,
    value::{Value, ValueType},
};
use rust_decimal::Decimal;

///
/// GroupCtx
///
/// One group during grouped evaluation: the grouping keys with their
/// values for this group, and the member frames aggregates fold over.
///

pub(crate) struct GroupCtx<'a> {
    pub keys: &'a [Expr],
    pub key_values: &'a [Value],
    pub frames: &'a [Frame],
}

impl GroupCtx<'_> {
    /// Resolve an expression that is (structurally) one of the grouping
    /// keys to this group's key value. Aliases are transparent.
    pub fn key_value(&self, expr: &Expr) -> Option<&Value> {
        let bare = expr.unaliased();
        self.keys
            .iter()
            .position(|key| key.unaliased() == bare)
            .map(|index| &self.key_values[index])
    }
}

/// Grouped execution path: partition the filtered frames by grouping key,
/// then fold, order, page, and project per group. A plan with aggregates
/// but no `group_by` treats the whole frame set as one group, so
/// `count(*)` over no rows is zero, not absent.
pub(crate) fn execute_grouped(
    env: &ExecEnv<'_>,
    plan: &QueryPlan,
    frames: Vec<Frame>,
) -> Result<Vec<Tuple>, Error> {
    let keys = plan.group_by();
    let groups = partition(env, keys, frames)?;

    let mut order_keys = Vec::with_capacity(groups.len());
    for (key_values, members) in &groups {
        let ctx = GroupCtx {
            keys,
            key_values,
            frames: members,
        };
        let scope = eval::Scope::Group(&ctx);
        let mut key = Vec::with_capacity(plan.order_by().len());
        for spec in plan.order_by() {
            key.push(eval::eval(env, &scope, &spec.expr)?);
        }
        order_keys.push(key);
    }

    let ordered = sort::sort_by_keys(groups, order_keys, plan.order_by());
    let paged = page(ordered, plan.offset(), plan.limit());

    let mut tuples = Vec::with_capacity(paged.len());
    for (key_values, members) in &paged {
        let ctx = GroupCtx {
            keys,
            key_values,
            frames: members,
        };
        let scope = eval::Scope::Group(&ctx);
        tuples.push(project(env, &scope, plan.select())?);
    }

    Ok(tuples)
}

type Group = (Vec<Value>, Vec<Frame>);

/// Partition frames by evaluated key vector, first-seen order. With no
/// grouping keys, every frame lands in one whole-set group.
fn partition(env: &ExecEnv<'_>, keys: &[Expr], frames: Vec<Frame>) -> Result<Vec<Group>, Error> {
    if keys.is_empty() {
        return Ok(vec![(Vec::new(), frames)]);
    }

    let mut groups: Vec<Group> = Vec::new();
    for frame in frames {
        let scope = eval::Scope::Row(&frame);
        let mut key_values = Vec::with_capacity(keys.len());
        for key in keys {
            key_values.push(eval::eval(env, &scope, key)?);
        }

        match groups.iter_mut().find(|(seen, _)| *seen == key_values) {
            Some((_, members)) => members.push(frame),
            None => groups.push((key_values, vec![frame])),
        }
    }

    Ok(groups)
}

/// Fold one aggregate over a group's frames. The argument is evaluated
/// per frame in row scope; nulls never contribute.
pub(crate) fn eval_aggregate(
    env: &ExecEnv<'_>,
    func: AggregateFunc,
    arg: Option<&Expr>,
    ty: &ValueType,
    frames: &[Frame],
) -> Result<Value, Error> {
    let Some(arg) = arg else {
        // count(*): every frame counts, matched or not.
        return Ok(Value::Int(frames.len() as i64));
    };

    let mut values = Vec::with_capacity(frames.len());
    for frame in frames {
        let scope = eval::Scope::Row(frame);
        let value = eval::eval(env, &scope, arg)?;
        if !value.is_null() {
            values.push(value);
        }
    }

    match func {
        AggregateFunc::Count => Ok(Value::Int(values.len() as i64)),
        AggregateFunc::Sum => {
            if values.is_empty() {
                return Ok(Value::Null);
            }
            if *ty == ValueType::Int {
                let sum = values.iter().filter_map(Value::as_int).sum::<i64>();
                return Ok(Value::Int(sum));
            }
            Ok(Value::Decimal(decimal_sum(&values)))
        }
        AggregateFunc::Avg => {
            if values.is_empty() {
                return Err(ExecError::EmptyAggregate { func }.into());
            }
            let sum = decimal_sum(&values);
            Ok(Value::Decimal(sum / Decimal::from(values.len() as u64)))
        }
        AggregateFunc::Max | AggregateFunc::Min => {
            let mut best: Option<Value> = None;
            for value in values {
                best = Some(match best {
                    None => value,
                    Some(current) => pick(func, current, value),
                });
            }
            best.ok_or_else(|| ExecError::EmptyAggregate { func }.into())
        }
    }
}

fn decimal_sum(values: &[Value]) -> Decimal {
    values.iter().filter_map(Value::to_decimal).sum()
}

fn pick(func: AggregateFunc, current: Value, candidate: Value) -> Value {
    let keep_candidate = match current.strict_order(&candidate) {
        Some(ordering) if func == AggregateFunc::Max => ordering.is_lt(),
        Some(ordering) => ordering.is_gt(),
        None => false,
    };

    if keep_candidate { candidate } else { current }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_and_min_fold_with_numeric_widening() {
        let mixed = vec![
            Value::Int(10),
            Value::Decimal(Decimal::new(305, 1)),
            Value::Int(20),
        ];

        let mut max = mixed[0].clone();
        let mut min = mixed[0].clone();
        for value in &mixed[1..] {
            max = pick(AggregateFunc::Max, max, value.clone());
            min = pick(AggregateFunc::Min, min, value.clone());
        }

        assert_eq!(max, Value::Decimal(Decimal::new(305, 1)));
        assert_eq!(min, Value::Int(10));
    }

    #[test]
    fn decimal_sum_widens_ints() {
        let values = vec![Value::Int(10), Value::Decimal(Decimal::new(25, 1))];
        assert_eq!(decimal_sum(&values), Decimal::new(125, 1));
    }
}
