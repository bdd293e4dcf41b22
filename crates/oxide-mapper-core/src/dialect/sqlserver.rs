//! SQL Server dialects.
//!
//! Releases before 2012 have no `OFFSET .. FETCH`, so [`SqlServerDialect`]
//! pages through a `ROW_NUMBER()` window; [`SqlServer2012Dialect`] uses the
//! native clause.

use super::{Dialect, InsertIdStrategy, PagingStyle, ParamStyle, SqlFunction};

fn quote_bracketed(name: &str) -> String {
    name.split('.')
        .map(|part| format!("[{}]", part.replace(']', "]]")))
        .collect::<Vec<_>>()
        .join(".")
}

/// SQL Server 2005-2008.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlServerDialect;

impl SqlServerDialect {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_bracketed(name)
    }

    fn param_style(&self) -> ParamStyle {
        ParamStyle::Named('@')
    }

    fn paging_style(&self) -> PagingStyle {
        PagingStyle::RowNumber
    }

    fn insert_id_strategy(&self) -> InsertIdStrategy {
        InsertIdStrategy::Output
    }

    fn last_id_query(&self, _sequence: Option<&str>) -> Option<String> {
        Some(String::from("SELECT SCOPE_IDENTITY()"))
    }

    fn function_name(&self, function: SqlFunction) -> &'static str {
        match function {
            SqlFunction::Upper => "UPPER",
            SqlFunction::Lower => "LOWER",
            SqlFunction::Length => "LEN",
        }
    }

    fn sequence_next_value(&self, sequence: &str) -> String {
        format!("NEXT VALUE FOR {}", quote_bracketed(sequence))
    }
}

/// SQL Server 2012 and later.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlServer2012Dialect;

impl SqlServer2012Dialect {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqlServer2012Dialect {
    fn name(&self) -> &'static str {
        "sqlserver2012"
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_bracketed(name)
    }

    fn param_style(&self) -> ParamStyle {
        ParamStyle::Named('@')
    }

    fn paging_style(&self) -> PagingStyle {
        PagingStyle::OffsetFetch
    }

    fn insert_id_strategy(&self) -> InsertIdStrategy {
        InsertIdStrategy::Output
    }

    fn last_id_query(&self, _sequence: Option<&str>) -> Option<String> {
        Some(String::from("SELECT SCOPE_IDENTITY()"))
    }

    fn function_name(&self, function: SqlFunction) -> &'static str {
        SqlServerDialect.function_name(function)
    }

    fn sequence_next_value(&self, sequence: &str) -> String {
        SqlServerDialect.sequence_next_value(sequence)
    }
}
