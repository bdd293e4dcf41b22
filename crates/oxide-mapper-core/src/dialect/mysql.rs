//! MySQL dialect.

use super::{Dialect, InsertIdStrategy, IsolationLevel};

/// MySQL / MariaDB.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDialect;

impl MySqlDialect {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn identifier_quote(&self) -> char {
        '`'
    }

    fn insert_id_strategy(&self) -> InsertIdStrategy {
        InsertIdStrategy::LastIdQuery
    }

    fn last_id_query(&self, _sequence: Option<&str>) -> Option<String> {
        Some(String::from("SELECT LAST_INSERT_ID()"))
    }

    fn default_isolation_level(&self) -> IsolationLevel {
        IsolationLevel::RepeatableRead
    }

    // Backslash is itself an escape inside MySQL string literals.
    fn like_escape_clause(&self) -> String {
        String::from(r" ESCAPE '\\'")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_dialect() {
        let dialect = MySqlDialect::new();
        assert_eq!(dialect.quote_identifier("order"), "`order`");
        assert_eq!(dialect.insert_id_strategy(), InsertIdStrategy::LastIdQuery);
        assert_eq!(
            dialect.last_id_query(None).as_deref(),
            Some("SELECT LAST_INSERT_ID()")
        );
        assert_eq!(dialect.like_escape_clause(), r" ESCAPE '\\'");
    }
}
