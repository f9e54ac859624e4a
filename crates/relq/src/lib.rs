//! relq: a typed relational query builder and in-process evaluator.
//!
//! Queries are built against a declared [`schema::Schema`]: column
//! expressions carry their types, combinators check operand
//! compatibility at construction, and the finished [`plan::QueryPlan`]
//! is an immutable value. A [`session::Session`] executes plans over an
//! in-memory row store, caching each row on first read until it is
//! explicitly invalidated.
//!
//! ```
//! use relq::prelude::*;
//! use std::sync::Arc;
//!
//! let mut schema = Schema::new();
//! schema.add_table(
//!     Table::new("member")
//!         .column("username", ValueType::Text)
//!         .column("age", ValueType::Int),
//! )?;
//!
//! let mut session = Session::new(Arc::new(schema));
//! session.insert("member", [Value::Text("ruby".into()), Value::Int(28)])?;
//!
//! let member = session.source("member")?;
//! let rows = session
//!     .select([member.column("username")?])
//!     .from(&member)
//!     .filter(member.column("age")?.gte(20)?)
//!     .fetch()?;
//! assert_eq!(rows.len(), 1);
//! # Ok::<(), relq::Error>(())
//! ```

pub mod error;
pub mod expr;
pub mod mutation;
pub mod plan;
pub mod predicate;
pub mod project;
pub mod query;
pub mod schema;
pub mod session;
pub mod sql;
pub mod store;
pub mod tuple;
pub mod value;

mod exec;

pub use error::Error;
pub use exec::ExecError;

pub mod prelude {
    pub use crate::{
        error::Error,
        exec::ExecError,
        expr::{AggregateFunc, CaseBuilder, Expr, SourceRef, StringFunc, TypeError},
        mutation::{Delete, Update},
        plan::{Direction, NullOrdering, PlanBuilder, PlanError, QueryPlan},
        predicate::{Predicate, PredicateError},
        project::{FromRecord, ProjectError, Projector, Record},
        query::{PagedFetch, SelectQuery},
        schema::{Relation, Schema, SchemaError, Table},
        session::Session,
        store::{MemStore, RowId, StoreError},
        tuple::Tuple,
        value::{Value, ValueType},
    };
}
