//! PostgreSQL dialect.

use super::{Dialect, InsertIdStrategy, ParamStyle};

/// PostgreSQL with `$n` parameters.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl PostgresDialect {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn param_style(&self) -> ParamStyle {
        ParamStyle::Numbered
    }

    fn insert_id_strategy(&self) -> InsertIdStrategy {
        InsertIdStrategy::Returning
    }

    fn last_id_query(&self, sequence: Option<&str>) -> Option<String> {
        sequence.map(|seq| format!("SELECT currval('{seq}')"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_dialect() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.placeholder(4), "$5");
        assert_eq!(dialect.sequence_next_value("users_id_seq"), "nextval('users_id_seq')");
        assert_eq!(
            dialect.last_id_query(Some("users_id_seq")).as_deref(),
            Some("SELECT currval('users_id_seq')")
        );
    }
}
