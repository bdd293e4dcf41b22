//! Materialization of result rows into records.
//!
//! The driver side implements [`RowCursor`]; a [`Hydrator`] binds the
//! cursor's columns to a schema once and then builds one record per row,
//! converting every cell to the type its field declares.

mod convert;
mod cursor;
mod hydrator;

pub use cursor::{RowCursor, VecCursor};
pub use hydrator::{Hydrator, RESERVED_PREFIX, SPLIT_MARKER};
