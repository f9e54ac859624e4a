//! Module: exec::sort
//! Responsibility: stable multi-key ordering with explicit null placement.
//! Does not own: key evaluation; callers supply pre-evaluated key vectors.
//! Boundary: null placement follows the per-key declaration, independent
//! of ascending/descending.

use crate::{
    plan::{Direction, NullOrdering, OrderSpec},
    value::Value,
};
use std::cmp::Ordering;

/// Sort `items` by their parallel key vectors, one key per order spec.
/// Equal keys keep their input order.
pub(crate) fn sort_by_keys<T>(items: Vec<T>, keys: Vec<Vec<Value>>, specs: &[OrderSpec]) -> Vec<T> {
    if specs.is_empty() {
        return items;
    }

    let mut indexed: Vec<(Vec<Value>, T)> = keys.into_iter().zip(items).collect();
    indexed.sort_by(|(a, _), (b, _)| compare_keys(a, b, specs));

    indexed.into_iter().map(|(_, item)| item).collect()
}

fn compare_keys(a: &[Value], b: &[Value], specs: &[OrderSpec]) -> Ordering {
    for (i, spec) in specs.iter().enumerate() {
        let ordering = compare_key(&a[i], &b[i], spec);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

fn compare_key(a: &Value, b: &Value, spec: &OrderSpec) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => match spec.nulls {
            NullOrdering::First => Ordering::Less,
            NullOrdering::Last => Ordering::Greater,
        },
        (false, true) => match spec.nulls {
            NullOrdering::First => Ordering::Greater,
            NullOrdering::Last => Ordering::Less,
        },
        (false, false) => {
            // Incomparable non-null keys tie rather than panic.
            let ordering = a.strict_order(b).unwrap_or(Ordering::Equal);
            match spec.direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    fn spec(direction: Direction, nulls: NullOrdering) -> OrderSpec {
        OrderSpec {
            expr: Expr::constant(0),
            direction,
            nulls,
        }
    }

    #[test]
    fn descending_sort_keeps_declared_null_placement() {
        let items = vec!["a", "b", "c", "d"];
        let keys = vec![
            vec![Value::Int(20)],
            vec![Value::Null],
            vec![Value::Int(40)],
            vec![Value::Int(10)],
        ];

        let sorted = sort_by_keys(items, keys, &[spec(Direction::Desc, NullOrdering::Last)]);
        assert_eq!(sorted, vec!["c", "a", "d", "b"], "nulls must sort last");
    }

    #[test]
    fn nulls_first_precedes_regardless_of_direction() {
        let items = vec![1, 2, 3];
        let keys = vec![
            vec![Value::Text("b".into())],
            vec![Value::Null],
            vec![Value::Text("a".into())],
        ];

        let sorted = sort_by_keys(items, keys, &[spec(Direction::Asc, NullOrdering::First)]);
        assert_eq!(sorted, vec![2, 3, 1]);
    }

    #[test]
    fn later_keys_break_ties_stably() {
        let items = vec!["x", "y", "z"];
        let keys = vec![
            vec![Value::Int(1), Value::Int(9)],
            vec![Value::Int(1), Value::Int(3)],
            vec![Value::Int(0), Value::Int(5)],
        ];
        let specs = [
            spec(Direction::Asc, NullOrdering::Last),
            spec(Direction::Asc, NullOrdering::Last),
        ];

        let sorted = sort_by_keys(items, keys, &specs);
        assert_eq!(sorted, vec!["z", "y", "x"]);
    }

    #[test]
    fn equal_keys_preserve_input_order() {
        let items = vec!["first", "second", "third"];
        let keys = vec![
            vec![Value::Int(5)],
            vec![Value::Int(5)],
            vec![Value::Int(5)],
        ];

        let sorted = sort_by_keys(items, keys, &[spec(Direction::Asc, NullOrdering::Last)]);
        assert_eq!(sorted, vec!["first", "second", "third"]);
    }
}
