//! # oxide-mapper-core
//!
//! The metadata and translation core of a record mapper. Nothing in this
//! crate performs I/O: it describes how record types map to tables, turns
//! typed expressions into dialect-specific SQL, and materializes rows that
//! a driver hands back.
//!
//! This crate provides:
//! - Schema resolution from conventions, type annotations and explicit mappings
//! - Expression compilation for predicates, projections and orderings
//! - Full SELECT / INSERT / UPDATE / DELETE generation for several dialects
//! - Row hydration with nested records and one-to-many grouping
//! - Change tracking through snapshots
//!
//! ## Building statements
//!
//! ```rust
//! use oxide_mapper_core::dialect::SqliteDialect;
//! use oxide_mapper_core::expr::member;
//! use oxide_mapper_core::schema::SchemaFactory;
//! use oxide_mapper_core::statement::{Query, StatementBuilder};
//!
//! let factory = SchemaFactory::new();
//! let schema = factory.dynamic_schema("Event").unwrap();
//! let plan = StatementBuilder::new(&schema, &SqliteDialect)
//!     .select(&Query::new().filter(member("kind").eq("click")))
//!     .unwrap();
//! assert!(plan.sql.starts_with("SELECT"));
//! assert_eq!(plan.params.len(), 1);
//! ```

pub mod dialect;
pub mod error;
pub mod expr;
pub mod hydrate;
pub mod record;
pub mod schema;
pub mod snapshot;
pub mod statement;
pub mod value;

pub use dialect::Dialect;
pub use error::{CompileError, Error, HydrationError, Result, SchemaError};
pub use expr::{list, lit, member, Expr};
pub use hydrate::{Hydrator, RowCursor, VecCursor};
pub use record::{Record, RecordValue, SqlEnum, Value};
pub use schema::{Conventions, Mappings, SchemaFactory, TypeSchema};
pub use snapshot::{Diff, Snapshot};
pub use statement::{Query, QueryPlan, StatementBuilder};
pub use value::SqlValue;
