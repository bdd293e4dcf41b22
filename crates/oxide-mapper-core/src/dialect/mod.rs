//! SQL dialect support.
//!
//! Database products disagree on identifier quoting, parameter markers,
//! paging syntax and how a freshly generated key is read back. The
//! [`Dialect`] trait captures those differences; everything else in the
//! mapper emits ANSI-style SQL with `@N` placeholders and lets the dialect
//! finish the job at assembly time.

mod generic;
mod mysql;
mod oracle;
mod paging;
mod postgres;
mod sqlite;
mod sqlserver;

use std::fmt;

pub use generic::GenericDialect;
pub use mysql::MySqlDialect;
pub use oracle::OracleDialect;
pub use paging::{PagedSelect, SelectParts};
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;
pub use sqlserver::{SqlServer2012Dialect, SqlServerDialect};

use crate::value::SqlValue;

/// Comment token that marks where a "no table" SELECT needs a dummy table.
///
/// `SELECT 1 /*dual*/` becomes `SELECT 1 FROM DUAL` on Oracle and
/// `SELECT 1` elsewhere.
pub const DUAL_TOKEN: &str = "/*dual*/";

/// How bound parameters are written in SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamStyle {
    /// `?`, bound strictly by occurrence.
    Positional,
    /// `$1`, `$2`, ... (1-based).
    Numbered,
    /// A prefix character followed by `p` and the 0-based index: `@p0`, `:p0`.
    Named(char),
}

/// How a SELECT is restricted to one page of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingStyle {
    /// `LIMIT @take OFFSET @skip`.
    LimitOffset,
    /// `ORDER BY .. OFFSET @skip ROWS FETCH NEXT @take ROWS ONLY`.
    OffsetFetch,
    /// A `ROW_NUMBER()` window over the base query, filtered by range.
    RowNumber,
}

impl PagingStyle {
    /// Returns whether the style needs an ORDER BY clause to be valid.
    #[must_use]
    pub const fn requires_order(self) -> bool {
        matches!(self, Self::OffsetFetch | Self::RowNumber)
    }
}

/// How the key generated by an INSERT is read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertIdStrategy {
    /// `INSERT .. RETURNING key`.
    Returning,
    /// `INSERT .. OUTPUT INSERTED.key VALUES ..`.
    Output,
    /// A separate scalar query, see [`Dialect::last_id_query`].
    LastIdQuery,
    /// The key cannot be read back.
    None,
}

/// Transaction isolation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
    Snapshot,
}

impl IsolationLevel {
    /// The level as written in `SET TRANSACTION ISOLATION LEVEL`.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
            Self::Snapshot => "SNAPSHOT",
        }
    }
}

/// Scalar functions whose names differ between products.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlFunction {
    Upper,
    Lower,
    Length,
}

/// Trait for SQL dialect-specific behavior.
pub trait Dialect: fmt::Debug + Send + Sync {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character.
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// Quotes an identifier, each dot-separated part on its own.
    fn quote_identifier(&self, name: &str) -> String {
        let quote = self.identifier_quote();
        name.split('.')
            .map(|part| {
                let escaped = part.replace(quote, &format!("{quote}{quote}"));
                format!("{quote}{escaped}{quote}")
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Returns the parameter style.
    fn param_style(&self) -> ParamStyle {
        ParamStyle::Positional
    }

    /// Renders the placeholder for the 0-based parameter `index`.
    fn placeholder(&self, index: usize) -> String {
        match self.param_style() {
            ParamStyle::Positional => String::from("?"),
            ParamStyle::Numbered => format!("${}", index + 1),
            ParamStyle::Named(prefix) => format!("{prefix}p{index}"),
        }
    }

    /// Returns the paging strategy.
    fn paging_style(&self) -> PagingStyle {
        PagingStyle::LimitOffset
    }

    /// ORDER BY clause injected when paging needs an order and has none.
    fn neutral_order_by(&self) -> &'static str {
        "ORDER BY (SELECT NULL)"
    }

    /// Returns how generated keys are read back after an INSERT.
    fn insert_id_strategy(&self) -> InsertIdStrategy {
        InsertIdStrategy::None
    }

    /// Scalar query returning the last generated key, for
    /// [`InsertIdStrategy::LastIdQuery`].
    fn last_id_query(&self, _sequence: Option<&str>) -> Option<String> {
        None
    }

    /// Returns the default transaction isolation level.
    fn default_isolation_level(&self) -> IsolationLevel {
        IsolationLevel::ReadCommitted
    }

    /// Escape character used in LIKE patterns.
    fn like_escape_char(&self) -> char {
        '\\'
    }

    /// The `ESCAPE` clause appended to LIKE comparisons.
    fn like_escape_clause(&self) -> String {
        format!(" ESCAPE '{}'", self.like_escape_char())
    }

    /// Escapes LIKE wildcards (and the escape character) in `text`.
    fn escape_like(&self, text: &str) -> String {
        let escape = self.like_escape_char();
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            if c == '%' || c == '_' || c == escape {
                out.push(escape);
            }
            out.push(c);
        }
        out
    }

    /// Name of a scalar function.
    fn function_name(&self, function: SqlFunction) -> &'static str {
        match function {
            SqlFunction::Upper => "UPPER",
            SqlFunction::Lower => "LOWER",
            SqlFunction::Length => "LENGTH",
        }
    }

    /// Expression yielding the next value of `sequence`.
    fn sequence_next_value(&self, sequence: &str) -> String {
        format!("nextval('{sequence}')")
    }

    /// Replacement for [`DUAL_TOKEN`].
    fn dual_table(&self) -> &'static str {
        ""
    }

    /// Rewrites every [`DUAL_TOKEN`] in `sql`.
    fn rewrite_dual(&self, sql: &str) -> String {
        if !sql.contains(DUAL_TOKEN) {
            return sql.to_string();
        }
        let replacement = self.dual_table();
        let rewritten = sql.replace(DUAL_TOKEN, replacement);
        if replacement.is_empty() {
            rewritten.trim_end().to_string()
        } else {
            rewritten
        }
    }

    /// Restricts `select` to one page.
    ///
    /// The two added placeholders are `@first_param` and
    /// `@first_param + 1`; the returned values bind them in that order.
    /// Negative bounds count as zero.
    fn page(&self, select: &SelectParts, first_param: usize, skip: i64, take: i64) -> PagedSelect {
        paging::page(self, select, first_param, skip, take)
    }

    /// Wraps a query so that it returns 1 if it yields any row, else 0.
    fn exists_query(&self, inner: &str) -> String {
        format!("SELECT CASE WHEN EXISTS ({inner}) THEN 1 ELSE 0 END {DUAL_TOKEN}")
    }

    /// Converts a boolean parameter into the form the driver expects.
    fn bool_value(&self, value: bool) -> SqlValue {
        SqlValue::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_per_style() {
        assert_eq!(GenericDialect::new().placeholder(3), "?");
        assert_eq!(PostgresDialect::new().placeholder(0), "$1");
        assert_eq!(SqlServerDialect::new().placeholder(2), "@p2");
        assert_eq!(OracleDialect::new().placeholder(2), ":p2");
    }

    #[test]
    fn test_quote_identifier_per_part() {
        assert_eq!(GenericDialect::new().quote_identifier("dbo.users"), r#""dbo"."users""#);
        assert_eq!(MySqlDialect::new().quote_identifier("users"), "`users`");
        assert_eq!(SqlServerDialect::new().quote_identifier("dbo.users"), "[dbo].[users]");
        assert_eq!(GenericDialect::new().quote_identifier(r#"a"b"#), r#""a""b""#);
    }

    #[test]
    fn test_escape_like() {
        let dialect = GenericDialect::new();
        assert_eq!(dialect.escape_like(r"50%_off\"), r"50\%\_off\\");
        assert_eq!(dialect.like_escape_clause(), r" ESCAPE '\'");
    }

    #[test]
    fn test_rewrite_dual() {
        let sql = "SELECT 1 /*dual*/";
        assert_eq!(OracleDialect::new().rewrite_dual(sql), "SELECT 1 FROM DUAL");
        assert_eq!(SqliteDialect::new().rewrite_dual(sql), "SELECT 1");
        assert_eq!(SqliteDialect::new().rewrite_dual("SELECT 2"), "SELECT 2");
    }

    #[test]
    fn test_isolation_levels() {
        assert_eq!(
            SqlServerDialect::new().default_isolation_level().as_sql(),
            "READ COMMITTED"
        );
        assert_eq!(
            SqliteDialect::new().default_isolation_level(),
            IsolationLevel::Serializable
        );
    }

    #[test]
    fn test_paging_requirements() {
        assert!(!PagingStyle::LimitOffset.requires_order());
        assert!(PagingStyle::OffsetFetch.requires_order());
        assert!(PagingStyle::RowNumber.requires_order());
    }
}
