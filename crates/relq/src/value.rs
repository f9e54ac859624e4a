//! Module: value
//! Responsibility: runtime values, scalar typing, and comparison semantics.
//! Does not own: expression construction or schema legality checks.
//! Boundary: the evaluator and the sorter delegate compare behavior here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

///
/// ValueType
///
/// Static type tag carried by columns and expressions.
/// `Int` and `Decimal` form the numeric family and widen to `Decimal`
/// when mixed; every other combination is strict.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ValueType {
    Bool,
    Int,
    Decimal,
    Text,
    /// A whole row of the named table, as produced by selecting a source.
    Entity(String),
}

impl ValueType {
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Decimal)
    }

    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text)
    }

    /// Whether two types may appear on opposite sides of a comparison.
    #[must_use]
    pub fn comparable_with(&self, other: &Self) -> bool {
        if self.is_numeric() && other.is_numeric() {
            return true;
        }

        self == other && !matches!(self, Self::Entity(_))
    }

    /// Widened result type for arithmetic over the numeric family.
    #[must_use]
    pub fn unify_numeric(&self, other: &Self) -> Self {
        if self == &Self::Int && other == &Self::Int {
            Self::Int
        } else {
            Self::Decimal
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Decimal => write!(f, "decimal"),
            Self::Text => write!(f, "text"),
            Self::Entity(table) => write!(f, "entity({table})"),
        }
    }
}

///
/// Value
///
/// Runtime scalar produced by evaluation and stored in rows.
/// `List` carries IN operands and list-shaped subquery results.
/// `Row` is a materialized entity reference; an unmatched left-join
/// side evaluates to `Null`, never to an empty `Row`.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Text(String),
    List(Vec<Value>),
    Row(Vec<Value>),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Widen a numeric value to `Decimal`; `None` for non-numeric values.
    #[must_use]
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Int(n) => Some(Decimal::from(*n)),
            Self::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Render a scalar as text for the explicit `string_value` cast.
    #[must_use]
    pub fn render_text(&self) -> Option<String> {
        match self {
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(n) => Some(n.to_string()),
            Self::Decimal(d) => Some(d.to_string()),
            Self::Text(s) => Some(s.clone()),
            Self::Null | Self::List(_) | Self::Row(_) => None,
        }
    }

    /// Equality with numeric widening across `Int`/`Decimal`.
    /// `None` when the operands are not comparable; `Null` never equals.
    #[must_use]
    pub fn compare_eq(&self, other: &Self) -> Option<bool> {
        self.strict_order(other).map(|ord| ord == Ordering::Equal)
    }

    /// Ordering with numeric widening across `Int`/`Decimal`.
    ///
    /// `None` for nulls or cross-family operands; null placement is the
    /// sorter's responsibility, driven by the declared per-key ordering.
    #[must_use]
    pub fn strict_order(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            _ => {
                let a = self.to_decimal()?;
                let b = other.to_decimal()?;
                Some(a.cmp(&b))
            }
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Self::Decimal(d)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Text(s) => write!(f, "'{s}'"),
            Self::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Self::Row(values) => {
                write!(f, "row(")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_widening_compares_int_against_decimal() {
        let int = Value::Int(15);
        let dec = Value::Decimal(Decimal::from(15));

        assert_eq!(int.compare_eq(&dec), Some(true));
        assert_eq!(
            Value::Int(10).strict_order(&Value::Decimal(Decimal::new(105, 1))),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn null_never_compares() {
        assert_eq!(Value::Null.compare_eq(&Value::Null), None);
        assert_eq!(Value::Null.strict_order(&Value::Int(1)), None);
    }

    #[test]
    fn cross_family_comparison_is_rejected() {
        assert_eq!(Value::Text("10".into()).compare_eq(&Value::Int(10)), None);
        assert_eq!(Value::Bool(true).strict_order(&Value::Int(1)), None);
    }

    #[test]
    fn render_text_covers_scalars_only() {
        assert_eq!(Value::Int(40).render_text().as_deref(), Some("40"));
        assert_eq!(Value::Text("a".into()).render_text().as_deref(), Some("a"));
        assert_eq!(Value::Null.render_text(), None);
        assert_eq!(Value::Row(vec![]).render_text(), None);
    }
}
