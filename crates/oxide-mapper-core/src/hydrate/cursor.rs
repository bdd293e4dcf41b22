//! The row cursor boundary.

use std::collections::VecDeque;

use crate::error::HydrationError;
use crate::value::SqlValue;

/// A forward-only cursor over result rows.
///
/// Drivers implement this over their own row type; the hydrator only ever
/// reads the current row by ordinal.
pub trait RowCursor {
    /// Number of columns in every row.
    fn column_count(&self) -> usize;

    /// Name of the column at `ordinal`.
    fn column_name(&self, ordinal: usize) -> &str;

    /// Moves to the next row. Returns `false` once the rows are exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`HydrationError::Cursor`] if the driver fails to produce
    /// the next row.
    fn advance(&mut self) -> Result<bool, HydrationError>;

    /// Value of the current row at `ordinal`.
    fn value(&self, ordinal: usize) -> SqlValue;

    fn is_null(&self, ordinal: usize) -> bool {
        self.value(ordinal).is_null()
    }
}

/// A cursor over rows already held in memory.
#[derive(Debug, Clone, Default)]
pub struct VecCursor {
    columns: Vec<String>,
    rows: VecDeque<Vec<SqlValue>>,
    current: Vec<SqlValue>,
}

impl VecCursor {
    #[must_use]
    pub fn new<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: impl IntoIterator<Item = Vec<SqlValue>>,
    ) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: rows.into_iter().collect(),
            current: Vec::new(),
        }
    }

    /// Rows not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl RowCursor for VecCursor {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, ordinal: usize) -> &str {
        self.columns.get(ordinal).map_or("", String::as_str)
    }

    fn advance(&mut self) -> Result<bool, HydrationError> {
        match self.rows.pop_front() {
            Some(row) => {
                self.current = row;
                Ok(true)
            }
            None => {
                self.current.clear();
                Ok(false)
            }
        }
    }

    fn value(&self, ordinal: usize) -> SqlValue {
        self.current.get(ordinal).cloned().unwrap_or(SqlValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_cursor_walks_rows() {
        let mut cursor = VecCursor::new(
            ["id", "name"],
            vec![
                vec![SqlValue::Int(1), SqlValue::Text(String::from("a"))],
                vec![SqlValue::Int(2), SqlValue::Null],
            ],
        );
        assert_eq!(cursor.column_count(), 2);
        assert_eq!(cursor.column_name(1), "name");
        assert!(cursor.advance().unwrap());
        assert_eq!(cursor.value(0), SqlValue::Int(1));
        assert!(cursor.advance().unwrap());
        assert!(cursor.is_null(1));
        assert_eq!(cursor.remaining(), 0);
        assert!(!cursor.advance().unwrap());
        assert!(cursor.is_null(0));
    }
}
