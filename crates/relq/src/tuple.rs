//! Module: tuple
//! Responsibility: positional result rows addressable by originating expression.
//! Does not own: projection into typed records (project) or evaluation.
//! Boundary: response payload handed out by the fetch terminals.

use crate::{expr::Expr, value::Value};

///
/// Tuple
///
/// One result row: the selected expressions paired with their evaluated
/// values, in select-list order. Values can be read positionally or by
/// the expression that produced them (alias wrapping is ignored).
///

#[derive(Clone, Debug, PartialEq)]
pub struct Tuple {
    items: Vec<(Expr, Value)>,
}

impl Tuple {
    #[must_use]
    pub(crate) fn new(items: Vec<(Expr, Value)>) -> Self {
        Self { items }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Value by position in the select list.
    #[must_use]
    pub fn get_at(&self, index: usize) -> Option<&Value> {
        self.items.get(index).map(|(_, value)| value)
    }

    /// Value by originating expression.
    #[must_use]
    pub fn get(&self, expr: &Expr) -> Option<&Value> {
        let wanted = expr.unaliased();
        self.items
            .iter()
            .find(|(item, _)| item.unaliased() == wanted)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn items(&self) -> &[(Expr, Value)] {
        &self.items
    }

    #[must_use]
    pub fn values(&self) -> Vec<&Value> {
        self.items.iter().map(|(_, value)| value).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueType;

    fn age() -> Expr {
        Expr::Column {
            source: "member".into(),
            column: "age".into(),
            ty: ValueType::Int,
        }
    }

    #[test]
    fn get_matches_through_alias_wrapping() {
        let tuple = Tuple::new(vec![(age().as_("years"), Value::Int(10))]);

        assert_eq!(tuple.get(&age()), Some(&Value::Int(10)));
        assert_eq!(tuple.get(&age().as_("years")), Some(&Value::Int(10)));
        assert_eq!(tuple.get_at(0), Some(&Value::Int(10)));
        assert_eq!(tuple.get_at(1), None);
    }
}
