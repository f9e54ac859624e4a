//! Module: error
//! Responsibility: the crate-level error, aggregating every stage's failures.
//! Does not own: the per-stage variants; each module defines its own.
//! Boundary: public API surfaces return this; stages convert via `From`.

use crate::{
    exec::ExecError, expr::TypeError, plan::PlanError, predicate::PredicateError,
    project::ProjectError, schema::SchemaError, store::StoreError,
};
use thiserror::Error as ThisError;

///
/// Error
///

#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Predicate(#[from] PredicateError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
