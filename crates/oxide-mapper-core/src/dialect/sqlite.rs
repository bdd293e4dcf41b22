//! SQLite dialect.

use super::{Dialect, InsertIdStrategy, IsolationLevel};

/// SQLite. Keys are read back with `RETURNING` (SQLite 3.35+).
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn insert_id_strategy(&self) -> InsertIdStrategy {
        InsertIdStrategy::Returning
    }

    fn last_id_query(&self, _sequence: Option<&str>) -> Option<String> {
        Some(String::from("SELECT last_insert_rowid()"))
    }

    fn default_isolation_level(&self) -> IsolationLevel {
        IsolationLevel::Serializable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{PagingStyle, ParamStyle};

    #[test]
    fn test_sqlite_dialect() {
        let dialect = SqliteDialect::new();
        assert_eq!(dialect.name(), "sqlite");
        assert_eq!(dialect.quote_identifier("users"), "\"users\"");
        assert_eq!(dialect.param_style(), ParamStyle::Positional);
        assert_eq!(dialect.paging_style(), PagingStyle::LimitOffset);
        assert_eq!(dialect.insert_id_strategy(), InsertIdStrategy::Returning);
    }
}
