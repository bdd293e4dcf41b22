//! Projection lists and ordering keys.

use super::ast::{member, Expr};

/// One entry of a SELECT list.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

/// A selection of fields or computed expressions.
///
/// A member naming a nested field selects all of its leaf columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    items: Vec<ProjectionItem>,
}

impl Projection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the given member paths.
    #[must_use]
    pub fn members<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            items: paths
                .into_iter()
                .map(|path| ProjectionItem {
                    expr: member(path),
                    alias: None,
                })
                .collect(),
        }
    }

    /// Adds an expression under its natural name.
    #[must_use]
    pub fn item(mut self, expr: Expr) -> Self {
        self.items.push(ProjectionItem { expr, alias: None });
        self
    }

    /// Adds an expression under `alias`.
    #[must_use]
    pub fn aliased(mut self, expr: Expr, alias: impl Into<String>) -> Self {
        self.items.push(ProjectionItem {
            expr,
            alias: Some(alias.into()),
        });
        self
    }

    #[must_use]
    pub fn items(&self) -> &[ProjectionItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One ORDER BY key.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderKey {
    pub expr: Expr,
    pub descending: bool,
}

impl OrderKey {
    #[must_use]
    pub const fn asc(expr: Expr) -> Self {
        Self {
            expr,
            descending: false,
        }
    }

    #[must_use]
    pub const fn desc(expr: Expr) -> Self {
        Self {
            expr,
            descending: true,
        }
    }

    /// Parses a field path with an optional `-` (descending) or `+` prefix.
    ///
    /// ```rust
    /// use oxide_mapper_core::expr::{member, OrderKey};
    ///
    /// assert_eq!(OrderKey::parse("-created_at"), OrderKey::desc(member("created_at")));
    /// assert_eq!(OrderKey::parse("address.city"), OrderKey::asc(member("address.city")));
    /// ```
    #[must_use]
    pub fn parse(key: &str) -> Self {
        let key = key.trim();
        if let Some(path) = key.strip_prefix('-') {
            Self::desc(member(path.trim()))
        } else {
            Self::asc(member(key.trim_start_matches('+').trim()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_order_keys() {
        assert!(OrderKey::parse("-name").descending);
        assert!(!OrderKey::parse("+name").descending);
        assert_eq!(OrderKey::parse(" name ").expr, member("name"));
    }

    #[test]
    fn test_projection_builder() {
        let projection = Projection::members(["id", "address"])
            .aliased(member("name").upper(), "shout");
        assert_eq!(projection.items().len(), 3);
        assert_eq!(projection.items()[2].alias.as_deref(), Some("shout"));
        assert!(Projection::new().is_empty());
    }
}
