//! Module: expr
//! Responsibility: typed expression trees and their construction-time checks.
//! Does not own: plan assembly, predicate null policies, or evaluation.
//! Boundary: every combinator validates operand types here; the evaluator
//! trusts trees that passed construction.

mod case;

pub use case::{CaseBuilder, CaseWhen, ValueCaseBuilder, ValueCaseWhen};

use crate::{
    plan::QueryPlan,
    predicate::Predicate,
    schema::{Schema, SchemaError},
    value::{Value, ValueType},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use thiserror::Error as ThisError;

///
/// BinaryOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Concat,
    In,
}

impl BinaryOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::And => "and",
            Self::Or => "or",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Concat => "||",
            Self::In => "in",
        }
    }
}

///
/// AggregateFunc
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

impl fmt::Display for AggregateFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Max => "max",
            Self::Min => "min",
        };
        write!(f, "{name}")
    }
}

///
/// StringFunc
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum StringFunc {
    Lower,
    Replace,
}

impl fmt::Display for StringFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lower => "lower",
            Self::Replace => "replace",
        };
        write!(f, "{name}")
    }
}

///
/// TypeError
///
/// Construction-time operand incompatibilities. Raised by the combinator
/// that received the incompatible operands, never deferred to execution.
///

#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum TypeError {
    #[error("cannot apply '{op}' to {lhs} and {rhs}")]
    Mismatch {
        op: &'static str,
        lhs: String,
        rhs: String,
    },

    #[error("'{op}' requires numeric operands, found {found}")]
    NonNumeric { op: &'static str, found: String },

    #[error("concat requires text operands, found {found}; apply string_value() first")]
    NonText { found: String },

    #[error("cannot cast {found} to text")]
    Uncastable { found: String },

    #[error("aggregate '{func}' cannot be applied to {found}")]
    NonAggregable { func: AggregateFunc, found: String },

    #[error("scalar subquery must select exactly one expression, found {found}")]
    ScalarSubqueryArity { found: usize },

    #[error("scalar subquery must select a scalar, found {found}")]
    NonScalarSubquery { found: String },

    #[error("case branches disagree on result type: {first} vs {found}")]
    CaseBranchType { first: String, found: String },

    #[error("case expression has no branches")]
    EmptyCase,
}

fn ty_name(ty: Option<&ValueType>) -> String {
    ty.map_or_else(|| "unknown".to_string(), ToString::to_string)
}

///
/// Expr
///
/// Immutable typed expression tree. Combinators return new trees and
/// never mutate operands; a tree built once can be shared across plans.
///

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A column of a query source, addressed by source alias.
    Column {
        source: String,
        column: String,
        ty: ValueType,
    },
    Constant(Value),
    /// A whole source row; evaluates to `Value::Row`, or `Value::Null`
    /// for the unmatched side of a left join.
    EntityRef { source: String, table: String },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        ty: ValueType,
    },
    Not(Box<Expr>),
    IsNull(Box<Expr>),
    /// Branches evaluate in declaration order; first matching `when` wins.
    /// A missing `otherwise` yields `Value::Null` for unmatched rows.
    Case {
        branches: Vec<(Expr, Expr)>,
        otherwise: Option<Box<Expr>>,
        ty: ValueType,
    },
    Aggregate {
        func: AggregateFunc,
        arg: Option<Box<Expr>>,
        ty: ValueType,
    },
    /// Uncorrelated embedded plan; scalar position requires a single
    /// select item (checked at construction).
    Subquery { plan: Box<QueryPlan>, ty: ValueType },
    /// Explicit `string_value` cast.
    Cast { inner: Box<Expr>, ty: ValueType },
    /// Text function call; arity is fixed per function at construction.
    StringFn { func: StringFunc, args: Vec<Expr> },
    Alias { inner: Box<Expr>, name: String },
}

impl Expr {
    #[must_use]
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant(value.into())
    }

    /// `count(*)` over the current group.
    #[must_use]
    pub const fn count_rows() -> Self {
        Self::Aggregate {
            func: AggregateFunc::Count,
            arg: None,
            ty: ValueType::Int,
        }
    }

    /// Embed an uncorrelated plan as a scalar expression.
    pub fn subquery(plan: QueryPlan) -> Result<Self, TypeError> {
        let ty = scalar_subquery_type(&plan)?;

        Ok(Self::Subquery {
            plan: Box::new(plan),
            ty,
        })
    }

    /// Static result type; `None` for untyped constants (`null`).
    #[must_use]
    pub fn ty(&self) -> Option<ValueType> {
        match self {
            Self::Column { ty, .. }
            | Self::Binary { ty, .. }
            | Self::Case { ty, .. }
            | Self::Aggregate { ty, .. }
            | Self::Subquery { ty, .. }
            | Self::Cast { ty, .. } => Some(ty.clone()),
            Self::Constant(value) => constant_type(value),
            Self::EntityRef { table, .. } => Some(ValueType::Entity(table.clone())),
            Self::Not(_) | Self::IsNull(_) => Some(ValueType::Bool),
            Self::StringFn { .. } => Some(ValueType::Text),
            Self::Alias { inner, .. } => inner.ty(),
        }
    }

    /// The expression beneath any alias wrapping.
    #[must_use]
    pub fn unaliased(&self) -> &Self {
        match self {
            Self::Alias { inner, .. } => inner.unaliased(),
            other => other,
        }
    }

    /// Projection label: explicit alias, or the column name for plain columns.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Alias { name, .. } => Some(name),
            Self::Column { column, .. } => Some(column),
            _ => None,
        }
    }

    /// Whether this tree contains an aggregate call.
    #[must_use]
    pub fn has_aggregate(&self) -> bool {
        match self {
            Self::Aggregate { .. } => true,
            Self::Binary { lhs, rhs, .. } => lhs.has_aggregate() || rhs.has_aggregate(),
            Self::Not(inner) | Self::IsNull(inner) => inner.has_aggregate(),
            Self::Cast { inner, .. } | Self::Alias { inner, .. } => inner.has_aggregate(),
            Self::StringFn { args, .. } => args.iter().any(Self::has_aggregate),
            Self::Case {
                branches,
                otherwise,
                ..
            } => {
                branches
                    .iter()
                    .any(|(when, then)| when.has_aggregate() || then.has_aggregate())
                    || otherwise.as_ref().is_some_and(|expr| expr.has_aggregate())
            }
            Self::Column { .. }
            | Self::Constant(_)
            | Self::EntityRef { .. }
            | Self::Subquery { .. } => false,
        }
    }

    // ------------------------------------------------------------------
    // Comparisons
    // ------------------------------------------------------------------

    pub fn eq(self, rhs: impl Into<Self>) -> Result<Predicate, TypeError> {
        self.compare(BinaryOp::Eq, rhs.into())
    }

    pub fn ne(self, rhs: impl Into<Self>) -> Result<Predicate, TypeError> {
        self.compare(BinaryOp::Ne, rhs.into())
    }

    pub fn lt(self, rhs: impl Into<Self>) -> Result<Predicate, TypeError> {
        self.compare(BinaryOp::Lt, rhs.into())
    }

    pub fn lte(self, rhs: impl Into<Self>) -> Result<Predicate, TypeError> {
        self.compare(BinaryOp::Lte, rhs.into())
    }

    pub fn gt(self, rhs: impl Into<Self>) -> Result<Predicate, TypeError> {
        self.compare(BinaryOp::Gt, rhs.into())
    }

    pub fn gte(self, rhs: impl Into<Self>) -> Result<Predicate, TypeError> {
        self.compare(BinaryOp::Gte, rhs.into())
    }

    /// Inclusive range check, `low <= self <= high`.
    pub fn between(
        self,
        low: impl Into<Self>,
        high: impl Into<Self>,
    ) -> Result<Predicate, TypeError> {
        let lower = self.clone().gte(low)?;
        let upper = self.lte(high)?;

        Ok(lower.and(upper))
    }

    /// Membership against a literal value list.
    pub fn in_list(
        self,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Result<Predicate, TypeError> {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        for value in &values {
            check_comparable(BinaryOp::In.symbol(), &self.ty(), &constant_type(value))?;
        }
        let list = Self::Constant(Value::List(values));

        Ok(Predicate::from_expr(Self::Binary {
            op: BinaryOp::In,
            lhs: Box::new(self),
            rhs: Box::new(list),
            ty: ValueType::Bool,
        }))
    }

    /// Membership against an uncorrelated subquery's single select item.
    pub fn in_subquery(self, plan: QueryPlan) -> Result<Predicate, TypeError> {
        let element = scalar_subquery_type(&plan)?;
        check_comparable(BinaryOp::In.symbol(), &self.ty(), &Some(element.clone()))?;

        Ok(Predicate::from_expr(Self::Binary {
            op: BinaryOp::In,
            lhs: Box::new(self),
            rhs: Box::new(Self::Subquery {
                plan: Box::new(plan),
                ty: element,
            }),
            ty: ValueType::Bool,
        }))
    }

    #[must_use]
    pub fn is_null(self) -> Predicate {
        Predicate::from_expr(Self::IsNull(Box::new(self)))
    }

    fn compare(self, op: BinaryOp, rhs: Self) -> Result<Predicate, TypeError> {
        check_comparable(op.symbol(), &self.ty(), &rhs.ty())?;

        Ok(Predicate::from_expr(Self::Binary {
            op,
            lhs: Box::new(self),
            rhs: Box::new(rhs),
            ty: ValueType::Bool,
        }))
    }

    // ------------------------------------------------------------------
    // Arithmetic / text
    // ------------------------------------------------------------------

    pub fn add(self, rhs: impl Into<Self>) -> Result<Self, TypeError> {
        self.arithmetic(BinaryOp::Add, rhs.into())
    }

    pub fn sub(self, rhs: impl Into<Self>) -> Result<Self, TypeError> {
        self.arithmetic(BinaryOp::Sub, rhs.into())
    }

    pub fn multiply(self, rhs: impl Into<Self>) -> Result<Self, TypeError> {
        self.arithmetic(BinaryOp::Mul, rhs.into())
    }

    /// Text concatenation; both operands must already be text.
    pub fn concat(self, rhs: impl Into<Self>) -> Result<Self, TypeError> {
        let rhs = rhs.into();
        for side in [&self, &rhs] {
            check_text(side)?;
        }

        Ok(Self::Binary {
            op: BinaryOp::Concat,
            lhs: Box::new(self),
            rhs: Box::new(rhs),
            ty: ValueType::Text,
        })
    }

    /// Explicit cast of a scalar to text, the bridge into `concat`.
    pub fn string_value(self) -> Result<Self, TypeError> {
        match self.ty() {
            Some(ValueType::Bool | ValueType::Int | ValueType::Decimal | ValueType::Text) => {
                Ok(Self::Cast {
                    inner: Box::new(self),
                    ty: ValueType::Text,
                })
            }
            other => Err(TypeError::Uncastable {
                found: ty_name(other.as_ref()),
            }),
        }
    }

    /// Lower-case a text expression.
    pub fn lower(self) -> Result<Self, TypeError> {
        check_text(&self)?;

        Ok(Self::StringFn {
            func: StringFunc::Lower,
            args: vec![self],
        })
    }

    /// Replace every occurrence of `from` with `to`. All three operands
    /// must be text.
    pub fn replace(self, from: impl Into<Self>, to: impl Into<Self>) -> Result<Self, TypeError> {
        let from = from.into();
        let to = to.into();
        for operand in [&self, &from, &to] {
            check_text(operand)?;
        }

        Ok(Self::StringFn {
            func: StringFunc::Replace,
            args: vec![self, from, to],
        })
    }

    fn arithmetic(self, op: BinaryOp, rhs: Self) -> Result<Self, TypeError> {
        let (lhs_ty, rhs_ty) = (self.ty(), rhs.ty());
        let (Some(lhs_ty), Some(rhs_ty)) = (&lhs_ty, &rhs_ty) else {
            return Err(TypeError::NonNumeric {
                op: op.symbol(),
                found: "unknown".to_string(),
            });
        };
        if !lhs_ty.is_numeric() || !rhs_ty.is_numeric() {
            let found = if lhs_ty.is_numeric() { rhs_ty } else { lhs_ty };
            return Err(TypeError::NonNumeric {
                op: op.symbol(),
                found: found.to_string(),
            });
        }

        let ty = lhs_ty.unify_numeric(rhs_ty);

        Ok(Self::Binary {
            op,
            lhs: Box::new(self),
            rhs: Box::new(rhs),
            ty,
        })
    }

    // ------------------------------------------------------------------
    // Aggregates
    // ------------------------------------------------------------------

    /// `count(expr)`: non-null evaluations over the current group.
    #[must_use]
    pub fn count(self) -> Self {
        Self::Aggregate {
            func: AggregateFunc::Count,
            arg: Some(Box::new(self)),
            ty: ValueType::Int,
        }
    }

    pub fn sum(self) -> Result<Self, TypeError> {
        let ty = self.numeric_aggregate_type(AggregateFunc::Sum)?;
        Ok(self.aggregate(AggregateFunc::Sum, ty))
    }

    /// Average over the current group. An empty group is an explicit
    /// `EmptyAggregate` error at execution, never a silent zero.
    pub fn avg(self) -> Result<Self, TypeError> {
        self.numeric_aggregate_type(AggregateFunc::Avg)?;
        Ok(self.aggregate(AggregateFunc::Avg, ValueType::Decimal))
    }

    pub fn max(self) -> Result<Self, TypeError> {
        let ty = self.ordered_aggregate_type(AggregateFunc::Max)?;
        Ok(self.aggregate(AggregateFunc::Max, ty))
    }

    pub fn min(self) -> Result<Self, TypeError> {
        let ty = self.ordered_aggregate_type(AggregateFunc::Min)?;
        Ok(self.aggregate(AggregateFunc::Min, ty))
    }

    fn aggregate(self, func: AggregateFunc, ty: ValueType) -> Self {
        Self::Aggregate {
            func,
            arg: Some(Box::new(self)),
            ty,
        }
    }

    fn numeric_aggregate_type(&self, func: AggregateFunc) -> Result<ValueType, TypeError> {
        match self.ty() {
            Some(ty) if ty.is_numeric() => Ok(ty),
            other => Err(TypeError::NonAggregable {
                func,
                found: ty_name(other.as_ref()),
            }),
        }
    }

    fn ordered_aggregate_type(&self, func: AggregateFunc) -> Result<ValueType, TypeError> {
        match self.ty() {
            Some(ty @ (ValueType::Bool | ValueType::Int | ValueType::Decimal | ValueType::Text)) => {
                Ok(ty)
            }
            other => Err(TypeError::NonAggregable {
                func,
                found: ty_name(other.as_ref()),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Naming
    // ------------------------------------------------------------------

    /// Override the derived projection name.
    #[must_use]
    pub fn as_(self, name: impl Into<String>) -> Self {
        Self::Alias {
            inner: Box::new(self),
            name: name.into(),
        }
    }
}

fn constant_type(value: &Value) -> Option<ValueType> {
    match value {
        Value::Bool(_) => Some(ValueType::Bool),
        Value::Int(_) => Some(ValueType::Int),
        Value::Decimal(_) => Some(ValueType::Decimal),
        Value::Text(_) => Some(ValueType::Text),
        Value::Null | Value::List(_) | Value::Row(_) => None,
    }
}

fn check_text(expr: &Expr) -> Result<(), TypeError> {
    let ty = expr.ty();
    if ty.as_ref().is_some_and(ValueType::is_text) {
        return Ok(());
    }

    Err(TypeError::NonText {
        found: ty_name(ty.as_ref()),
    })
}

/// Comparisons against untyped operands (`null` constants) are allowed;
/// they evaluate to "no match" at runtime.
fn check_comparable(
    op: &'static str,
    lhs: &Option<ValueType>,
    rhs: &Option<ValueType>,
) -> Result<(), TypeError> {
    if let (Some(lhs), Some(rhs)) = (lhs, rhs)
        && !lhs.comparable_with(rhs)
    {
        return Err(TypeError::Mismatch {
            op,
            lhs: lhs.to_string(),
            rhs: rhs.to_string(),
        });
    }

    Ok(())
}

fn scalar_subquery_type(plan: &QueryPlan) -> Result<ValueType, TypeError> {
    let select = plan.select();
    if select.len() != 1 {
        return Err(TypeError::ScalarSubqueryArity {
            found: select.len(),
        });
    }

    match select[0].ty() {
        Some(ty @ (ValueType::Bool | ValueType::Int | ValueType::Decimal | ValueType::Text)) => {
            Ok(ty)
        }
        other => Err(TypeError::NonScalarSubquery {
            found: ty_name(other.as_ref()),
        }),
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        Self::Constant(Value::Int(n))
    }
}

impl From<i32> for Expr {
    fn from(n: i32) -> Self {
        Self::Constant(Value::Int(i64::from(n)))
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Self::Constant(Value::Bool(b))
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Self::Constant(Value::Text(s.to_string()))
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Self::Constant(Value::Text(s))
    }
}

impl From<Decimal> for Expr {
    fn from(d: Decimal) -> Self {
        Self::Constant(Value::Decimal(d))
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Self::Constant(value)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column { source, column, .. } => write!(f, "{source}.{column}"),
            Self::Constant(value) => write!(f, "{value}"),
            Self::EntityRef { source, .. } => write!(f, "{source}"),
            Self::Binary { op, lhs, rhs, .. } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Self::Not(inner) => write!(f, "not ({inner})"),
            Self::IsNull(inner) => write!(f, "({inner} is null)"),
            Self::Case {
                branches,
                otherwise,
                ..
            } => {
                write!(f, "case")?;
                for (when, then) in branches {
                    write!(f, " when {when} then {then}")?;
                }
                if let Some(otherwise) = otherwise {
                    write!(f, " else {otherwise}")?;
                }
                write!(f, " end")
            }
            Self::Aggregate { func, arg, .. } => match arg {
                Some(arg) => write!(f, "{func}({arg})"),
                None => write!(f, "{func}(*)"),
            },
            Self::Subquery { .. } => write!(f, "(subquery)"),
            Self::Cast { inner, .. } => write!(f, "string({inner})"),
            Self::StringFn { func, args } => {
                write!(f, "{func}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Self::Alias { inner, name } => write!(f, "{inner} as {name}"),
        }
    }
}

///
/// SourceRef
///
/// Schema-bound handle for one query source, the root of column
/// expressions. The alias defaults to the table name; aliased handles
/// let a subquery range over the table its outer query already uses.
///

#[derive(Clone, Debug)]
pub struct SourceRef {
    schema: Arc<Schema>,
    table: String,
    alias: String,
}

impl SourceRef {
    pub fn new(schema: &Arc<Schema>, table: impl Into<String>) -> Result<Self, SchemaError> {
        let table = table.into();
        let alias = table.clone();
        Self::aliased_inner(schema, table, alias)
    }

    pub fn aliased(
        schema: &Arc<Schema>,
        table: impl Into<String>,
        alias: impl Into<String>,
    ) -> Result<Self, SchemaError> {
        Self::aliased_inner(schema, table.into(), alias.into())
    }

    fn aliased_inner(
        schema: &Arc<Schema>,
        table: String,
        alias: String,
    ) -> Result<Self, SchemaError> {
        schema.require_table(&table)?;

        Ok(Self {
            schema: Arc::clone(schema),
            table,
            alias,
        })
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub(crate) const fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Typed column expression, addressed by this source's alias.
    pub fn column(&self, name: &str) -> Result<Expr, SchemaError> {
        let table = self.schema.require_table(&self.table)?;
        let column = table
            .column_def(name)
            .ok_or_else(|| SchemaError::UnknownColumn {
                table: self.table.clone(),
                column: name.to_string(),
            })?;

        Ok(Expr::Column {
            source: self.alias.clone(),
            column: column.name.clone(),
            ty: column.ty.clone(),
        })
    }

    /// The whole source row as one expression.
    #[must_use]
    pub fn entity(&self) -> Expr {
        Expr::EntityRef {
            source: self.alias.clone(),
            table: self.table.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Table;

    fn member_source() -> SourceRef {
        let mut schema = Schema::new();
        schema
            .add_table(
                Table::new("member")
                    .column("username", ValueType::Text)
                    .column("age", ValueType::Int),
            )
            .unwrap();

        SourceRef::new(&Arc::new(schema), "member").unwrap()
    }

    #[test]
    fn comparing_text_column_to_numeric_constant_fails() {
        let member = member_source();
        let err = member.column("username").unwrap().eq(10).unwrap_err();

        assert!(
            matches!(err, TypeError::Mismatch { op: "=", .. }),
            "text = int must be a type mismatch"
        );
    }

    #[test]
    fn numeric_widening_unifies_arithmetic_type() {
        let member = member_source();
        let expr = member
            .column("age")
            .unwrap()
            .add(Expr::constant(Value::Decimal(Decimal::ONE)))
            .unwrap();

        assert_eq!(expr.ty(), Some(ValueType::Decimal));
    }

    #[test]
    fn concat_requires_text_without_explicit_cast() {
        let member = member_source();
        let age = member.column("age").unwrap();

        assert!(matches!(
            member.column("username").unwrap().concat(age.clone()),
            Err(TypeError::NonText { .. })
        ));

        let cast = age.string_value().unwrap();
        let ok = member.column("username").unwrap().concat(cast).unwrap();
        assert_eq!(ok.ty(), Some(ValueType::Text));
    }

    #[test]
    fn string_functions_require_text_operands() {
        let member = member_source();

        assert!(matches!(
            member.column("age").unwrap().lower(),
            Err(TypeError::NonText { .. })
        ));
        assert!(matches!(
            member.column("username").unwrap().replace("x", 1),
            Err(TypeError::NonText { .. })
        ));

        let lowered = member.column("username").unwrap().lower().unwrap();
        assert_eq!(lowered.ty(), Some(ValueType::Text));
    }

    #[test]
    fn alias_overrides_derived_label() {
        let member = member_source();
        let expr = member.column("username").unwrap().as_("name");

        assert_eq!(expr.label(), Some("name"));
        assert_eq!(member.column("username").unwrap().label(), Some("username"));
    }

    #[test]
    fn entity_references_are_not_comparable() {
        let member = member_source();
        let err = member.entity().eq(member.entity()).unwrap_err();

        assert!(matches!(err, TypeError::Mismatch { .. }));
    }
}
