//! Error types for the SQLite adapter.

use oxide_mapper_core::error::{CompileError, Error, HydrationError, SchemaError};
use thiserror::Error;

/// Errors raised while running plans against SQLite.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema, compilation or hydration error from the mapper.
    #[error(transparent)]
    Mapper(#[from] Error),

    /// A statement expected to return a row returned none.
    #[error("statement returned no rows: {0}")]
    NoRows(String),
}

impl From<SchemaError> for DatabaseError {
    fn from(err: SchemaError) -> Self {
        Self::Mapper(err.into())
    }
}

impl From<CompileError> for DatabaseError {
    fn from(err: CompileError) -> Self {
        Self::Mapper(err.into())
    }
}

impl From<HydrationError> for DatabaseError {
    fn from(err: HydrationError) -> Self {
        Self::Mapper(err.into())
    }
}

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;
