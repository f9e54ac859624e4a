//! Module: expr::case
//! Responsibility: fluent construction of case expressions.
//! Does not own: evaluation order semantics (documented on `Expr::Case`).
//! Boundary: both builders finish into a type-checked `Expr::Case`.

use crate::{
    expr::{Expr, TypeError},
    predicate::Predicate,
    value::{Value, ValueType},
};

fn unify_branch_type(
    current: Option<ValueType>,
    candidate: &Expr,
) -> Result<Option<ValueType>, TypeError> {
    let Some(candidate_ty) = candidate.ty() else {
        // Untyped branch result (a null constant) adopts the others' type.
        return Ok(current);
    };
    let Some(current_ty) = current else {
        return Ok(Some(candidate_ty));
    };

    if current_ty == candidate_ty {
        return Ok(Some(current_ty));
    }
    if current_ty.is_numeric() && candidate_ty.is_numeric() {
        return Ok(Some(current_ty.unify_numeric(&candidate_ty)));
    }

    Err(TypeError::CaseBranchType {
        first: current_ty.to_string(),
        found: candidate_ty.to_string(),
    })
}

///
/// CaseBuilder
///
/// Predicate-driven case construction:
/// `CaseBuilder::new().when(pred).then(expr)...otherwise(expr)`.
/// Ending without `otherwise` makes unmatched rows evaluate to null.
///

#[derive(Clone, Debug, Default)]
pub struct CaseBuilder {
    branches: Vec<(Expr, Expr)>,
    ty: Option<ValueType>,
}

impl CaseBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            branches: Vec::new(),
            ty: None,
        }
    }

    #[must_use]
    pub fn when(self, condition: Predicate) -> CaseWhen {
        CaseWhen {
            builder: self,
            condition: condition.into_expr(),
        }
    }

    /// Finish with a default branch.
    pub fn otherwise(self, default: impl Into<Expr>) -> Result<Expr, TypeError> {
        let default = default.into();
        let ty = unify_branch_type(self.ty.clone(), &default)?;

        self.finish(Some(default), ty)
    }

    /// Finish without a default; unmatched rows yield null.
    pub fn end(self) -> Result<Expr, TypeError> {
        let ty = self.ty.clone();

        self.finish(None, ty)
    }

    fn finish(self, otherwise: Option<Expr>, ty: Option<ValueType>) -> Result<Expr, TypeError> {
        if self.branches.is_empty() {
            return Err(TypeError::EmptyCase);
        }
        let Some(ty) = ty else {
            return Err(TypeError::EmptyCase);
        };

        Ok(Expr::Case {
            branches: self.branches,
            otherwise: otherwise.map(Box::new),
            ty,
        })
    }
}

///
/// CaseWhen
///

#[derive(Clone, Debug)]
pub struct CaseWhen {
    builder: CaseBuilder,
    condition: Expr,
}

impl CaseWhen {
    pub fn then(self, result: impl Into<Expr>) -> Result<CaseBuilder, TypeError> {
        let result = result.into();
        let mut builder = self.builder;
        builder.ty = unify_branch_type(builder.ty, &result)?;
        builder.branches.push((self.condition, result));

        Ok(builder)
    }
}

///
/// ValueCaseBuilder
///
/// Value-match case construction over one subject expression:
/// `subject.when(10)?.then("ten")?...otherwise("other")`.
/// Lowered to the predicate form with `subject = value` conditions.
///

#[derive(Clone, Debug)]
pub struct ValueCaseBuilder {
    subject: Expr,
    inner: CaseBuilder,
}

impl ValueCaseBuilder {
    pub fn when(self, value: impl Into<Value>) -> Result<ValueCaseWhen, TypeError> {
        let condition = self.subject.clone().eq(Expr::Constant(value.into()))?;

        Ok(ValueCaseWhen {
            subject: self.subject,
            inner: self.inner.when(condition),
        })
    }

    pub fn otherwise(self, default: impl Into<Expr>) -> Result<Expr, TypeError> {
        self.inner.otherwise(default)
    }

    pub fn end(self) -> Result<Expr, TypeError> {
        self.inner.end()
    }
}

///
/// ValueCaseWhen
///

#[derive(Clone, Debug)]
pub struct ValueCaseWhen {
    subject: Expr,
    inner: CaseWhen,
}

impl ValueCaseWhen {
    pub fn then(self, result: impl Into<Expr>) -> Result<ValueCaseBuilder, TypeError> {
        Ok(ValueCaseBuilder {
            subject: self.subject,
            inner: self.inner.then(result)?,
        })
    }
}

impl Expr {
    /// Begin a value-match case with this expression as the subject.
    pub fn when(self, value: impl Into<Value>) -> Result<ValueCaseWhen, TypeError> {
        ValueCaseBuilder {
            subject: self,
            inner: CaseBuilder::new(),
        }
        .when(value)
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
    fn value_case_lowers_to_equality_branches() {
        let expr = age()
            .when(10)
            .unwrap()
            .then("ten")
            .unwrap()
            .when(20)
            .unwrap()
            .then("twenty")
            .unwrap()
            .otherwise("other")
            .unwrap();

        let Expr::Case {
            branches,
            otherwise,
            ty,
        } = expr
        else {
            panic!("value case must build an Expr::Case");
        };
        assert_eq!(branches.len(), 2);
        assert!(otherwise.is_some());
        assert_eq!(ty, ValueType::Text);
    }

    #[test]
    fn branch_result_types_must_agree() {
        let err = CaseBuilder::new()
            .when(age().lt(20).unwrap())
            .then("young")
            .unwrap()
            .when(age().gte(20).unwrap())
            .then(30)
            .unwrap_err();

        assert!(matches!(err, TypeError::CaseBranchType { .. }));
    }

    #[test]
    fn case_without_branches_is_rejected() {
        assert!(matches!(CaseBuilder::new().end(), Err(TypeError::EmptyCase)));
    }
}
