//! Splitting SELECT statements for paging.

use std::sync::LazyLock;

use regex::Regex;

use super::{Dialect, PagingStyle};
use crate::value::SqlValue;

static ORDER_BY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bORDER\s+BY\b").expect("Invalid ORDER BY regex")
});

static QUALIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:["\[`]?\w+["\]`]?)\.(["\[`]?\w+["\]`]?)"#)
        .expect("Invalid column qualifier regex")
});

/// A SELECT statement split around its top-level ORDER BY clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectParts {
    /// The full statement.
    pub sql: String,
    /// The statement without its ORDER BY clause.
    pub unordered: String,
    /// The ORDER BY clause, keyword included.
    pub order_by: Option<String>,
}

impl SelectParts {
    /// Splits `sql` at the last ORDER BY outside parentheses and quotes.
    #[must_use]
    pub fn parse(sql: &str) -> Self {
        let sql = sql.trim().trim_end_matches(';').trim_end();
        let split = ORDER_BY
            .find_iter(sql)
            .filter(|m| is_top_level(sql, m.start()))
            .last()
            .map(|m| m.start());

        match split {
            Some(at) => Self {
                sql: sql.to_string(),
                unordered: sql[..at].trim_end().to_string(),
                order_by: Some(sql[at..].trim().to_string()),
            },
            None => Self {
                sql: sql.to_string(),
                unordered: sql.to_string(),
                order_by: None,
            },
        }
    }
}

/// A paged statement and the values of its two paging parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PagedSelect {
    pub sql: String,
    pub params: [SqlValue; 2],
}

fn is_top_level(sql: &str, at: usize) -> bool {
    let mut depth = 0_i32;
    let mut in_string = false;
    for c in sql[..at].chars() {
        match c {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => depth -= 1,
            _ => {}
        }
    }
    depth == 0 && !in_string
}

pub(super) fn page<D: Dialect + ?Sized>(
    dialect: &D,
    select: &SelectParts,
    first_param: usize,
    skip: i64,
    take: i64,
) -> PagedSelect {
    let (a, b) = (first_param, first_param + 1);
    let (skip, take) = (skip.max(0), take.max(0));
    let order_by = || {
        select
            .order_by
            .clone()
            .unwrap_or_else(|| dialect.neutral_order_by().to_string())
    };

    match dialect.paging_style() {
        PagingStyle::LimitOffset => PagedSelect {
            sql: format!("{} LIMIT @{a} OFFSET @{b}", select.sql),
            params: [SqlValue::Int(take), SqlValue::Int(skip)],
        },
        PagingStyle::OffsetFetch => PagedSelect {
            sql: format!(
                "{} {} OFFSET @{a} ROWS FETCH NEXT @{b} ROWS ONLY",
                select.unordered,
                order_by()
            ),
            params: [SqlValue::Int(skip), SqlValue::Int(take)],
        },
        PagingStyle::RowNumber => {
            // The window runs outside the base query, so column qualifiers
            // of the original ORDER BY no longer resolve.
            let over = QUALIFIER.replace_all(&order_by(), "$1").into_owned();
            PagedSelect {
                sql: format!(
                    "SELECT * FROM (SELECT oxide_base.*, ROW_NUMBER() OVER ({over}) AS oxide_rn \
                     FROM ({}) oxide_base) oxide_paged WHERE oxide_rn > @{a} AND oxide_rn <= @{b}",
                    select.unordered
                ),
                params: [SqlValue::Int(skip), SqlValue::Int(skip.saturating_add(take))],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{
        OracleDialect, SqlServer2012Dialect, SqlServerDialect, SqliteDialect,
    };

    #[test]
    fn test_parse_finds_top_level_order_by() {
        let parts = SelectParts::parse(
            "SELECT a FROM t WHERE b IN (SELECT c FROM u ORDER BY c) ORDER BY a DESC;",
        );
        assert_eq!(
            parts.unordered,
            "SELECT a FROM t WHERE b IN (SELECT c FROM u ORDER BY c)"
        );
        assert_eq!(parts.order_by.as_deref(), Some("ORDER BY a DESC"));
    }

    #[test]
    fn test_parse_ignores_order_by_in_literals() {
        let parts = SelectParts::parse("SELECT a FROM t WHERE b = 'x order by y'");
        assert!(parts.order_by.is_none());
    }

    #[test]
    fn test_limit_offset() {
        let parts = SelectParts::parse("SELECT a FROM t WHERE a > @0");
        let paged = SqliteDialect::new().page(&parts, 1, 5, 5);
        assert_eq!(paged.sql, "SELECT a FROM t WHERE a > @0 LIMIT @1 OFFSET @2");
        assert_eq!(paged.params, [SqlValue::Int(5), SqlValue::Int(5)]);
    }

    #[test]
    fn test_offset_fetch_injects_neutral_order() {
        let parts = SelectParts::parse("SELECT a FROM t");
        let paged = SqlServer2012Dialect::new().page(&parts, 0, 10, 5);
        assert_eq!(
            paged.sql,
            "SELECT a FROM t ORDER BY (SELECT NULL) OFFSET @0 ROWS FETCH NEXT @1 ROWS ONLY"
        );
        assert_eq!(paged.params, [SqlValue::Int(10), SqlValue::Int(5)]);
    }

    #[test]
    fn test_offset_fetch_keeps_existing_order() {
        let parts = SelectParts::parse("SELECT a FROM t ORDER BY a");
        let paged = OracleDialect::new().page(&parts, 0, 0, 5);
        assert_eq!(
            paged.sql,
            "SELECT a FROM t ORDER BY a OFFSET @0 ROWS FETCH NEXT @1 ROWS ONLY"
        );
    }

    #[test]
    fn test_row_number_strips_qualifiers() {
        let parts = SelectParts::parse("SELECT u.a FROM t u ORDER BY u.a DESC, [u].[b]");
        let paged = SqlServerDialect::new().page(&parts, 0, 5, 5);
        assert_eq!(
            paged.sql,
            "SELECT * FROM (SELECT oxide_base.*, ROW_NUMBER() OVER (ORDER BY a DESC, [b]) AS oxide_rn \
             FROM (SELECT u.a FROM t u) oxide_base) oxide_paged WHERE oxide_rn > @0 AND oxide_rn <= @1"
        );
        assert_eq!(paged.params, [SqlValue::Int(5), SqlValue::Int(10)]);
    }

    #[test]
    fn test_row_number_upper_bound_saturates() {
        let parts = SelectParts::parse("SELECT a FROM t");
        let paged = SqlServerDialect::new().page(&parts, 0, 5, i64::MAX);
        assert_eq!(paged.params, [SqlValue::Int(5), SqlValue::Int(i64::MAX)]);
    }

    #[test]
    fn test_negative_bounds_clamp_to_zero() {
        let parts = SelectParts::parse("SELECT a FROM t");
        let paged = SqlServerDialect::new().page(&parts, 0, -3, -1);
        assert_eq!(paged.params, [SqlValue::Int(0), SqlValue::Int(0)]);
    }
}
