//! Module: predicate
//! Responsibility: boolean composition and the two optional-branch policies.
//! Does not own: operand type checking (expr) or evaluation (exec).
//! Boundary: a `Predicate` always wraps a boolean-typed expression.

use crate::expr::{BinaryOp, Expr};
use serde::{Deserialize, Serialize};
use std::ops::{BitAnd, BitOr};
use thiserror::Error as ThisError;

///
/// PredicateError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum PredicateError {
    #[error("both sub-predicates are required; the {side} branch is absent")]
    MissingBranch { side: &'static str },
}

///
/// Predicate
///
/// A boolean-valued expression. Composition returns new persistent
/// trees; operands are never mutated.
///
/// Optional sub-predicates follow two distinct, explicit policies:
/// - list composition (`all`) silently skips absent entries;
/// - two-branch composition (`both`) requires both and fails otherwise.
///

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Predicate(Expr);

impl Predicate {
    pub(crate) const fn from_expr(expr: Expr) -> Self {
        Self(expr)
    }

    #[must_use]
    pub const fn expr(&self) -> &Expr {
        &self.0
    }

    #[must_use]
    pub fn into_expr(self) -> Expr {
        self.0
    }

    #[must_use]
    pub fn and(self, other: Self) -> Self {
        self.combine(BinaryOp::And, other)
    }

    #[must_use]
    pub fn or(self, other: Self) -> Self {
        self.combine(BinaryOp::Or, other)
    }

    #[expect(clippy::should_implement_trait)]
    #[must_use]
    pub fn not(self) -> Self {
        Self(Expr::Not(Box::new(self.0)))
    }

    /// AND over a dynamic predicate list; absent entries are skipped.
    /// `None` means every entry was absent: no filter at all.
    #[must_use]
    pub fn all(predicates: impl IntoIterator<Item = Option<Self>>) -> Option<Self> {
        predicates
            .into_iter()
            .flatten()
            .reduce(|acc, next| acc.and(next))
    }

    /// AND over exactly two sub-predicates, both required.
    pub fn both(lhs: Option<Self>, rhs: Option<Self>) -> Result<Self, PredicateError> {
        let lhs = lhs.ok_or(PredicateError::MissingBranch { side: "left" })?;
        let rhs = rhs.ok_or(PredicateError::MissingBranch { side: "right" })?;

        Ok(lhs.and(rhs))
    }

    fn combine(self, op: BinaryOp, other: Self) -> Self {
        Self(Expr::Binary {
            op,
            lhs: Box::new(self.0),
            rhs: Box::new(other.0),
            ty: crate::value::ValueType::Bool,
        })
    }
}

impl BitAnd for Predicate {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.and(rhs)
    }
}

impl BitOr for Predicate {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.or(rhs)
    }
}

impl From<Predicate> for Expr {
    fn from(predicate: Predicate) -> Self {
        predicate.into_expr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueType;

    fn flag(name: &str) -> Predicate {
        Predicate::from_expr(Expr::Column {
            source: "t".into(),
            column: name.into(),
            ty: ValueType::Bool,
        })
    }

    #[test]
    fn all_skips_absent_entries() {
        let combined = Predicate::all([None, Some(flag("a")), None, Some(flag("b"))]).unwrap();

        assert_eq!(combined, flag("a").and(flag("b")));
    }

    #[test]
    fn all_of_nothing_means_no_filter() {
        assert_eq!(Predicate::all([None, None]), None);
    }

    #[test]
    fn both_requires_each_branch() {
        let err = Predicate::both(Some(flag("a")), None).unwrap_err();
        assert_eq!(err, PredicateError::MissingBranch { side: "right" });

        let ok = Predicate::both(Some(flag("a")), Some(flag("b"))).unwrap();
        assert_eq!(ok, flag("a").and(flag("b")));
    }

    #[test]
    fn composition_does_not_mutate_operands() {
        let a = flag("a");
        let b = flag("b");
        let _combined = a.clone().and(b.clone());

        assert_eq!(a, flag("a"));
        assert_eq!(b, flag("b"));
    }
}
