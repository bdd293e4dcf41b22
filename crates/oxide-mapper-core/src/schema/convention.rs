//! Naming conventions applied before any override.

use std::fmt;
use std::sync::Arc;

/// Delimiter between a nested field's prefix and its child column names.
///
/// Generated SELECT lists and the hydrator both rely on it, so hand-written
/// SQL must use it too: `address__city` maps to `address.city`.
pub const NESTING_DELIMITER: &str = "__";

type NameFn = Arc<dyn Fn(&str) -> String + Send + Sync>;
type ReferenceFn = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;
type SequenceFn = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Default naming rules for tables, keys and columns.
#[derive(Clone)]
pub struct Conventions {
    table_name: NameFn,
    primary_key: NameFn,
    column_name: NameFn,
    reference_column: ReferenceFn,
    sequence_name: SequenceFn,
    nest_records: bool,
    autoincrement: bool,
}

impl Default for Conventions {
    fn default() -> Self {
        Self {
            table_name: Arc::new(|type_name: &str| pluralize(&to_snake_case(type_name))),
            primary_key: Arc::new(|_: &str| String::from("id")),
            column_name: Arc::new(|field: &str| field.to_string()),
            reference_column: Arc::new(|field: &str, member: &str| format!("{field}_{member}")),
            sequence_name: Arc::new(|_: &str| None),
            nest_records: false,
            autoincrement: true,
        }
    }
}

impl fmt::Debug for Conventions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conventions")
            .field("nest_records", &self.nest_records)
            .field("autoincrement", &self.autoincrement)
            .finish_non_exhaustive()
    }
}

impl Conventions {
    /// Creates the default conventions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides how table names derive from type names.
    #[must_use]
    pub fn table_names(mut self, f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.table_name = Arc::new(f);
        self
    }

    /// Overrides how the primary key column derives from the type name.
    #[must_use]
    pub fn primary_keys(mut self, f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.primary_key = Arc::new(f);
        self
    }

    /// Overrides how column names derive from field names.
    #[must_use]
    pub fn column_names(mut self, f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.column_name = Arc::new(f);
        self
    }

    /// Overrides how reference columns are named from `(field, member)`.
    #[must_use]
    pub fn reference_columns(
        mut self,
        f: impl Fn(&str, &str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.reference_column = Arc::new(f);
        self
    }

    /// Derives a key sequence name from the table name.
    #[must_use]
    pub fn sequences(
        mut self,
        f: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.sequence_name = Arc::new(f);
        self
    }

    /// Treats every record-typed field as nested unless configured otherwise.
    #[must_use]
    pub const fn nest_records(mut self, nest: bool) -> Self {
        self.nest_records = nest;
        self
    }

    /// Sets whether single-column primary keys default to autoincrement.
    #[must_use]
    pub const fn autoincrement(mut self, autoincrement: bool) -> Self {
        self.autoincrement = autoincrement;
        self
    }

    pub(crate) fn table_name(&self, type_name: &str) -> String {
        (self.table_name)(type_name)
    }

    pub(crate) fn primary_key(&self, type_name: &str) -> String {
        (self.primary_key)(type_name)
    }

    pub(crate) fn column_name(&self, field: &str) -> String {
        (self.column_name)(field)
    }

    pub(crate) fn reference_column(&self, field: &str, member: &str) -> String {
        (self.reference_column)(field, member)
    }

    pub(crate) fn sequence_name(&self, table: &str) -> Option<String> {
        (self.sequence_name)(table)
    }

    pub(crate) const fn nests_records(&self) -> bool {
        self.nest_records
    }

    pub(crate) const fn default_autoincrement(&self) -> bool {
        self.autoincrement
    }
}

/// Computes the column prefix for the children of a nested field.
#[must_use]
pub fn nested_prefix(parent_column: &str) -> String {
    format!("{parent_column}{NESTING_DELIMITER}")
}

/// Converts `PascalCase` / `camelCase` to `snake_case`.
#[must_use]
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let chars: Vec<char> = name.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_uppercase();
            if prev_lower || (prev_upper && next_lower) {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// English pluralization good enough for table names.
#[must_use]
pub fn pluralize(word: &str) -> String {
    let lower = word.to_lowercase();
    if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        format!("{word}es")
    } else if lower.ends_with('y')
        && !lower.ends_with("ay")
        && !lower.ends_with("ey")
        && !lower.ends_with("oy")
        && !lower.ends_with("uy")
    {
        format!("{}ies", &word[..word.len() - 1])
    } else {
        format!("{word}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("User"), "user");
        assert_eq!(to_snake_case("OrderLine"), "order_line");
        assert_eq!(to_snake_case("HTTPRequest"), "http_request");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("Address2Line"), "address2_line");
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("user"), "users");
        assert_eq!(pluralize("address"), "addresses");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("survey"), "surveys");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("batch"), "batches");
    }

    #[test]
    fn test_default_conventions() {
        let conventions = Conventions::default();
        assert_eq!(conventions.table_name("OrderLine"), "order_lines");
        assert_eq!(conventions.primary_key("OrderLine"), "id");
        assert_eq!(conventions.column_name("email"), "email");
        assert_eq!(conventions.reference_column("author", "id"), "author_id");
        assert_eq!(conventions.sequence_name("order_lines"), None);
        assert!(!conventions.nests_records());
        assert!(conventions.default_autoincrement());
    }

    #[test]
    fn test_custom_conventions() {
        let conventions = Conventions::new()
            .table_names(|t| format!("tbl_{t}"))
            .primary_keys(|t| format!("{}_id", to_snake_case(t)))
            .sequences(|table| Some(format!("{table}_seq")))
            .nest_records(true);
        assert_eq!(conventions.table_name("User"), "tbl_User");
        assert_eq!(conventions.primary_key("User"), "user_id");
        assert_eq!(
            conventions.sequence_name("users").as_deref(),
            Some("users_seq")
        );
        assert!(conventions.nests_records());
    }

    #[test]
    fn test_nested_prefix() {
        assert_eq!(nested_prefix("address"), "address__");
    }
}
