//! Query descriptions.

use crate::expr::{Expr, OrderKey, Projection};

/// A SELECT over one record type.
///
/// ```rust
/// use oxide_mapper_core::expr::member;
/// use oxide_mapper_core::statement::Query;
///
/// let query = Query::new()
///     .filter(member("age").ge(18))
///     .order_by("-created_at")
///     .page(20, 10);
/// assert_eq!(query.paging(), Some((20, 10)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filter: Option<Expr>,
    projection: Option<Projection>,
    order: Vec<OrderKey>,
    paging: Option<(i64, i64)>,
    distinct: bool,
    alias: Option<String>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a predicate; repeated calls are combined with AND.
    #[must_use]
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Replaces the default all-columns SELECT list.
    #[must_use]
    pub fn select(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Appends an ordering key, see [`OrderKey::parse`].
    #[must_use]
    pub fn order_by(self, key: &str) -> Self {
        self.order(OrderKey::parse(key))
    }

    #[must_use]
    pub fn order(mut self, key: OrderKey) -> Self {
        self.order.push(key);
        self
    }

    /// Skips `skip` rows and returns at most `take`.
    #[must_use]
    pub const fn page(mut self, skip: i64, take: i64) -> Self {
        self.paging = Some((skip, take));
        self
    }

    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Qualifies every column with a table alias.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub const fn filter_expr(&self) -> Option<&Expr> {
        self.filter.as_ref()
    }

    #[must_use]
    pub const fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    #[must_use]
    pub fn ordering(&self) -> &[OrderKey] {
        &self.order
    }

    #[must_use]
    pub const fn paging(&self) -> Option<(i64, i64)> {
        self.paging
    }

    #[must_use]
    pub const fn is_distinct(&self) -> bool {
        self.distinct
    }

    #[must_use]
    pub fn table_alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// The same query without paging.
    #[must_use]
    pub fn unpaged(&self) -> Self {
        Self {
            paging: None,
            ..self.clone()
        }
    }

    /// The same query without ordering.
    #[must_use]
    pub fn unordered(&self) -> Self {
        Self {
            order: Vec::new(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::member;

    #[test]
    fn test_filters_combine_with_and() {
        let query = Query::new()
            .filter(member("a").eq(1))
            .filter(member("b").eq(2));
        assert_eq!(
            query.filter_expr(),
            Some(&member("a").eq(1).and(member("b").eq(2)))
        );
    }

    #[test]
    fn test_builder_state() {
        let query = Query::new().order_by("-id").distinct().alias("u").page(0, 5);
        assert!(query.ordering()[0].descending);
        assert!(query.is_distinct());
        assert_eq!(query.table_alias(), Some("u"));
        assert_eq!(query.unpaged().paging(), None);
    }
}
