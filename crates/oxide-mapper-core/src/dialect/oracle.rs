//! Oracle dialect.

use super::{Dialect, InsertIdStrategy, PagingStyle, ParamStyle};
use crate::value::SqlValue;

/// Oracle 12c and later.
#[derive(Debug, Default, Clone, Copy)]
pub struct OracleDialect;

impl OracleDialect {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for OracleDialect {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn param_style(&self) -> ParamStyle {
        ParamStyle::Named(':')
    }

    fn paging_style(&self) -> PagingStyle {
        PagingStyle::OffsetFetch
    }

    fn neutral_order_by(&self) -> &'static str {
        "ORDER BY (SELECT NULL FROM DUAL)"
    }

    fn insert_id_strategy(&self) -> InsertIdStrategy {
        InsertIdStrategy::LastIdQuery
    }

    fn last_id_query(&self, sequence: Option<&str>) -> Option<String> {
        sequence.map(|seq| format!("SELECT {seq}.CURRVAL FROM DUAL"))
    }

    fn sequence_next_value(&self, sequence: &str) -> String {
        format!("{sequence}.NEXTVAL")
    }

    fn dual_table(&self) -> &'static str {
        "FROM DUAL"
    }

    fn bool_value(&self, value: bool) -> SqlValue {
        SqlValue::Int(i64::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_dialect() {
        let dialect = OracleDialect::new();
        assert_eq!(dialect.placeholder(0), ":p0");
        assert_eq!(dialect.sequence_next_value("users_seq"), "users_seq.NEXTVAL");
        assert_eq!(
            dialect.last_id_query(Some("users_seq")).as_deref(),
            Some("SELECT users_seq.CURRVAL FROM DUAL")
        );
        assert_eq!(dialect.last_id_query(None), None);
        assert_eq!(dialect.bool_value(true), SqlValue::Int(1));
        assert_eq!(
            dialect.exists_query("SELECT 1 FROM t"),
            "SELECT CASE WHEN EXISTS (SELECT 1 FROM t) THEN 1 ELSE 0 END /*dual*/"
        );
    }
}
