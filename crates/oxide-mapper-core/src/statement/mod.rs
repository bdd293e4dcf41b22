//! Full statement generation.
//!
//! [`StatementBuilder`] turns a [`Query`] or a captured record into a
//! [`QueryPlan`]: dialect-rendered SQL, its parameters and, for SELECTs,
//! the result columns the hydrator should expect.

mod builder;
mod plan;
mod query;

pub use builder::StatementBuilder;
pub use plan::{InsertPlan, KeyRetrieval, QueryPlan, UpdatePlan, VersionUpdate};
pub use query::Query;
