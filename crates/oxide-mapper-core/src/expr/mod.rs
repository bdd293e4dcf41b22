//! Typed expressions and their compilation to SQL.
//!
//! Predicates, projections and orderings are built as a small syntax tree
//! ([`Expr`]) and compiled against a [`TypeSchema`](crate::schema::TypeSchema)
//! by an [`ExpressionCompiler`]. Member paths resolve through the schema's
//! descriptor tree, so `member("address.city")` compiles to the flattened
//! `address__city` column.
//!
//! ```rust
//! use oxide_mapper_core::expr::{list, member};
//!
//! let adults_in_town = member("age")
//!     .ge(18)
//!     .and(list(["Paris", "Lyon"]).contains(member("address.city")));
//! # let _ = adults_in_town;
//! ```

mod ast;
mod compiler;
mod fragment;
mod projection;

pub use ast::{list, lit, member, BinaryOp, Expr, IntoExpr};
pub use compiler::{CompileOptions, CompiledProjection, ExpressionCompiler, OutputColumn};
pub use fragment::Fragment;
pub use projection::{OrderKey, Projection, ProjectionItem};
