//! Parameter binding and row reading.

use oxide_mapper_core::hydrate::VecCursor;
use oxide_mapper_core::statement::QueryPlan;
use oxide_mapper_core::value::SqlValue;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Prepares `plan` with its parameters bound in order.
pub fn bound(plan: &QueryPlan) -> SqliteQuery<'_> {
    plan.params
        .iter()
        .fold(sqlx::query(&plan.sql), |query, value| bind_param(query, value))
}

/// Binds a [`SqlValue`] parameter to a query.
fn bind_param<'q>(query: SqliteQuery<'q>, value: &SqlValue) -> SqliteQuery<'q> {
    match value {
        SqlValue::Null => query.bind(Option::<i64>::None),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::Int(i) => query.bind(*i),
        SqlValue::Float(f) => query.bind(*f),
        SqlValue::Text(s) => query.bind(s.clone()),
        SqlValue::Blob(b) => query.bind(b.clone()),
        SqlValue::DateTime(dt) => query.bind(*dt),
        SqlValue::DateTimeUtc(dt) => query.bind(*dt),
    }
}

/// Reads one cell by its runtime storage class.
///
/// # Errors
///
/// Returns the sqlx decoding error for the cell.
pub fn cell(row: &SqliteRow, ordinal: usize) -> Result<SqlValue, sqlx::Error> {
    let raw = row.try_get_raw(ordinal)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let storage = raw.type_info().name().to_ascii_uppercase();
    Ok(match storage.as_str() {
        "INTEGER" => SqlValue::Int(row.try_get(ordinal)?),
        "REAL" => SqlValue::Float(row.try_get(ordinal)?),
        "BLOB" => SqlValue::Blob(row.try_get(ordinal)?),
        _ => SqlValue::Text(row.try_get(ordinal)?),
    })
}

/// Copies fetched rows into an in-memory cursor.
///
/// # Errors
///
/// Returns the sqlx decoding error of the first unreadable cell.
pub fn cursor(rows: &[SqliteRow]) -> Result<VecCursor, sqlx::Error> {
    let columns: Vec<String> = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();

    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        values.push(
            (0..columns.len())
                .map(|ordinal| cell(row, ordinal))
                .collect::<Result<Vec<_>, _>>()?,
        );
    }
    Ok(VecCursor::new(columns, values))
}
