//! Ready-to-execute statements.

use tracing::trace;

use crate::dialect::Dialect;
use crate::error::CompileError;
use crate::expr::{Fragment, OutputColumn};
use crate::schema::VersionKind;
use crate::value::SqlValue;

/// Final SQL text, its bound parameters and the columns it returns.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub sql: String,
    pub params: Vec<SqlValue>,
    /// Result columns, in order, when the statement is a generated SELECT.
    pub outputs: Vec<OutputColumn>,
}

impl QueryPlan {
    /// Assembles `fragment` for `dialect`.
    ///
    /// Placeholders are renumbered across segments, `/*dual*/` tokens are
    /// rewritten and parameters are ordered the way the driver binds them.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::ParameterOutOfRange`] if a placeholder has no
    /// parameter.
    pub fn assemble(
        fragment: &Fragment,
        outputs: Vec<OutputColumn>,
        dialect: &dyn Dialect,
    ) -> Result<Self, CompileError> {
        let (sql, params) = fragment.assemble(dialect)?;
        let sql = dialect.rewrite_dual(&sql);
        trace!(dialect = dialect.name(), sql = %sql, params = params.len(), "assembled statement");
        Ok(Self {
            sql,
            params,
            outputs,
        })
    }

    /// Assembles hand-written SQL that refers to `params` as `@0..`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::ParameterOutOfRange`] if a placeholder has no
    /// parameter.
    pub fn raw(
        sql: impl Into<String>,
        params: Vec<SqlValue>,
        dialect: &dyn Dialect,
    ) -> Result<Self, CompileError> {
        Self::assemble(&Fragment::new(sql, params), Vec::new(), dialect)
    }
}

/// How the key generated by an INSERT reaches the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyRetrieval {
    /// The INSERT itself returns the key as a single scalar.
    Returned,
    /// A follow-up scalar query returns the key.
    Query(QueryPlan),
    /// The key is not generated by the database.
    None,
}

/// Version column bookkeeping for a write.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionUpdate {
    pub kind: VersionKind,
    /// Field path of the version column.
    pub path: Vec<String>,
    /// Value the column holds after a successful write, when known upfront.
    pub next: Option<SqlValue>,
}

/// An INSERT statement and what to write back afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertPlan {
    pub statement: QueryPlan,
    pub key: KeyRetrieval,
    /// Field path receiving the generated key.
    pub key_path: Option<Vec<String>>,
    pub version: Option<VersionUpdate>,
}

/// An UPDATE statement and what to write back afterwards.
///
/// The statement affects zero rows when the version check fails.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    pub statement: QueryPlan,
    pub version: Option<VersionUpdate>,
    /// SELECT reading a database-maintained row version after the write.
    pub read_back: Option<QueryPlan>,
}
