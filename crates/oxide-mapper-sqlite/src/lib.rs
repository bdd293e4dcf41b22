//! # oxide-mapper-sqlite
//!
//! SQLite driver adapter for `oxide-mapper-core`, built on `sqlx`.
//!
//! [`Database`] compiles queries and records into plans with the SQLite
//! dialect, binds their parameters, runs them on a pool and hands the
//! fetched rows to the hydrator.
//!
//! # How rows reach the hydrator
//!
//! - Every cell is read by its runtime storage class (`INTEGER`, `REAL`,
//!   `TEXT`, `BLOB`, `NULL`); the hydrator then converts it to the type the
//!   target field declares, so booleans and date/times stored as integers or
//!   text read back correctly.
//! - All rows of a statement are fetched before hydration starts.
//! - Generated keys come back through `RETURNING` (SQLite 3.35+) and are
//!   written into the inserted record.

mod database;
mod error;
mod rows;

pub use database::Database;
pub use error::{DatabaseError, Result};
