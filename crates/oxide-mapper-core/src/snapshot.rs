//! Change tracking for partial updates.
//!
//! A [`Snapshot`] owns the tracked object together with a baseline copy of
//! its column values taken at creation. [`Snapshot::diff`] compares the
//! live object with that baseline column by column.

use std::sync::Arc;

use crate::error::SchemaError;
use crate::record::{Record, RecordValue};
use crate::schema::{SchemaFactory, TypeSchema};
use crate::value::SqlValue;

/// One changed column.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry {
    /// Dotted field path.
    pub field: String,
    /// Physical column name, the one UPDATE statements write. A configured
    /// alias only names the column in result sets and never appears here.
    pub column: String,
    pub old: SqlValue,
    pub new: SqlValue,
}

/// Changed columns in schema declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    entries: Vec<DiffEntry>,
}

impl Diff {
    #[must_use]
    pub fn entries(&self) -> &[DiffEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiffEntry> {
        self.entries.iter()
    }

    /// Changed column names.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.column.as_str())
    }

    /// Finds the entry for a dotted field path.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&DiffEntry> {
        self.entries.iter().find(|e| e.field == field)
    }
}

impl IntoIterator for Diff {
    type Item = DiffEntry;
    type IntoIter = std::vec::IntoIter<DiffEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A tracked object and the baseline it is compared against.
///
/// ```rust
/// use oxide_mapper_core::record::RecordValue;
/// use oxide_mapper_core::schema::SchemaFactory;
/// use oxide_mapper_core::snapshot::Snapshot;
/// use oxide_mapper_core::value::SqlValue;
///
/// let factory = SchemaFactory::new();
/// let schema = factory.dynamic_schema("Ticket").unwrap();
/// let ticket = RecordValue::new()
///     .with("id", SqlValue::Int(1))
///     .with("title", SqlValue::Text("Broken".into()));
///
/// let mut snapshot = Snapshot::new(schema, ticket);
/// snapshot
///     .tracked_mut()
///     .insert("title", SqlValue::Text("Fixed".into()));
/// let diff = snapshot.diff();
/// assert_eq!(diff.len(), 1);
/// assert_eq!(diff.entries()[0].column, "title");
/// ```
#[derive(Debug)]
pub struct Snapshot<T: Record> {
    schema: Arc<TypeSchema>,
    tracked: T,
    baseline: RecordValue,
}

impl<T: Record> Snapshot<T> {
    /// Captures the current values of `tracked`.
    #[must_use]
    pub fn new(schema: Arc<TypeSchema>, tracked: T) -> Self {
        let baseline = tracked.to_record();
        Self {
            schema,
            tracked,
            baseline,
        }
    }

    /// Captures `tracked` using the schema `factory` resolves for `T`.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if `T` does not resolve.
    pub fn capture(factory: &SchemaFactory, tracked: T) -> Result<Self, SchemaError> {
        Ok(Self::new(factory.schema::<T>()?, tracked))
    }

    #[must_use]
    pub fn schema(&self) -> &TypeSchema {
        &self.schema
    }

    #[must_use]
    pub const fn tracked(&self) -> &T {
        &self.tracked
    }

    pub fn tracked_mut(&mut self) -> &mut T {
        &mut self.tracked
    }

    #[must_use]
    pub const fn baseline(&self) -> &RecordValue {
        &self.baseline
    }

    /// Compares the tracked object with the baseline.
    #[must_use]
    pub fn diff(&self) -> Diff {
        let current = self.tracked.to_record();
        if self.schema.is_dynamic() {
            return dynamic_diff(&self.baseline, &current);
        }

        let entries = self
            .schema
            .leaf_columns()
            .into_iter()
            .filter_map(|column| {
                let old = column.value_in(&self.baseline);
                let new = column.value_in(&current);
                (old != new).then(|| DiffEntry {
                    field: column.field_path(),
                    column: column.column_name().to_string(),
                    old,
                    new,
                })
            })
            .collect();
        Diff { entries }
    }

    /// Swaps in a different live object; the baseline is kept.
    ///
    /// Returns the previously tracked object.
    pub fn override_tracked_object(&mut self, tracked: T) -> T {
        std::mem::replace(&mut self.tracked, tracked)
    }

    /// Re-captures the baseline from the live object, typically after its
    /// changes were written.
    pub fn accept_changes(&mut self) {
        self.baseline = self.tracked.to_record();
    }

    #[must_use]
    pub fn into_inner(self) -> T {
        self.tracked
    }
}

fn dynamic_diff(baseline: &RecordValue, current: &RecordValue) -> Diff {
    let mut entries = Vec::new();
    let mut names: Vec<&str> = baseline.keys().collect();
    names.extend(current.keys().filter(|k| !baseline.contains(k)));

    for name in names {
        let read = |record: &RecordValue| {
            record
                .get(name)
                .and_then(|v| v.as_scalar().cloned())
                .unwrap_or(SqlValue::Null)
        };
        let (old, new) = (read(baseline), read(current));
        if old != new {
            entries.push(DiffEntry {
                field: name.to_string(),
                column: name.to_string(),
                old,
                new,
            });
        }
    }
    Diff { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{read_field, HasValueType, ToValue, ValueError};
    use crate::schema::{ColumnOverrides, FieldInfo, Mappings, TypeInfo};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Profile {
        id: i64,
        display_name: String,
        tags: Vec<u8>,
    }

    impl Record for Profile {
        fn type_info() -> TypeInfo {
            TypeInfo::of::<Self>("Profile")
                .field(FieldInfo::new("id", i64::value_type()))
                .field(
                    FieldInfo::new("display_name", String::value_type()).with_overrides(
                        ColumnOverrides {
                            column_name: Some(String::from("screen_name")),
                            ..ColumnOverrides::default()
                        },
                    ),
                )
                .field(FieldInfo::new("tags", Vec::<u8>::value_type()))
        }

        fn to_record(&self) -> RecordValue {
            RecordValue::new()
                .with("id", self.id.to_value())
                .with("display_name", self.display_name.to_value())
                .with("tags", self.tags.to_value())
        }

        fn from_record(mut record: RecordValue) -> Result<Self, ValueError> {
            let mut out = Self::default();
            read_field(&mut record, "id", &mut out.id)?;
            read_field(&mut record, "display_name", &mut out.display_name)?;
            read_field(&mut record, "tags", &mut out.tags)?;
            Ok(out)
        }
    }

    fn profile() -> Profile {
        Profile {
            id: 7,
            display_name: String::from("ada"),
            tags: vec![1, 2],
        }
    }

    #[test]
    fn test_single_change_reports_column_name() {
        let factory = SchemaFactory::new();
        let mut snapshot = Snapshot::capture(&factory, profile()).unwrap();
        snapshot.tracked_mut().display_name = String::from("grace");

        let diff = snapshot.diff();
        assert_eq!(diff.len(), 1);
        let entry = &diff.entries()[0];
        assert_eq!(entry.field, "display_name");
        assert_eq!(entry.column, "screen_name");
        assert_eq!(entry.old, SqlValue::Text(String::from("ada")));
        assert_eq!(entry.new, SqlValue::Text(String::from("grace")));
    }

    #[test]
    fn test_aliased_field_reports_physical_column() {
        let factory = SchemaFactory::new().with_mappings(
            Mappings::new().map("Profile", |m| m.column("id", |c| c.alias("profile_id"))),
        );
        let mut snapshot = Snapshot::capture(&factory, profile()).unwrap();
        snapshot.tracked_mut().id = 9;
        let diff = snapshot.diff();
        assert_eq!(diff.columns().collect::<Vec<_>>(), ["id"]);
        assert_eq!(diff.entries()[0].old, SqlValue::Int(7));
    }

    #[test]
    fn test_unchanged_object_has_empty_diff() {
        let factory = SchemaFactory::new();
        let snapshot = Snapshot::capture(&factory, profile()).unwrap();
        assert!(snapshot.diff().is_empty());
    }

    #[test]
    fn test_accept_changes_moves_baseline() {
        let factory = SchemaFactory::new();
        let mut snapshot = Snapshot::capture(&factory, profile()).unwrap();
        snapshot.tracked_mut().id = 8;
        assert_eq!(snapshot.diff().len(), 1);
        snapshot.accept_changes();
        assert!(snapshot.diff().is_empty());
    }

    #[test]
    fn test_byte_arrays_compare_by_value() {
        let factory = SchemaFactory::new();
        let mut snapshot = Snapshot::capture(&factory, profile()).unwrap();
        snapshot.tracked_mut().tags = vec![1, 2];
        assert!(snapshot.diff().is_empty());
        snapshot.tracked_mut().tags.push(3);
        assert_eq!(snapshot.diff().columns().collect::<Vec<_>>(), ["tags"]);
    }

    #[test]
    fn test_entries_follow_declaration_order() {
        let factory = SchemaFactory::new();
        let mut snapshot = Snapshot::capture(&factory, profile()).unwrap();
        snapshot.tracked_mut().tags.clear();
        snapshot.tracked_mut().display_name.clear();
        let diff = snapshot.diff();
        let fields: Vec<&str> = diff.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["display_name", "tags"]);
    }

    #[test]
    fn test_override_tracked_object_keeps_baseline() {
        let factory = SchemaFactory::new();
        let mut snapshot = Snapshot::capture(&factory, profile()).unwrap();
        let replacement = Profile {
            id: 7,
            display_name: String::from("ada"),
            tags: Vec::new(),
        };
        let previous = snapshot.override_tracked_object(replacement);
        assert_eq!(previous, profile());
        assert_eq!(snapshot.diff().len(), 1);
        assert_eq!(snapshot.baseline().get("tags"), Some(&vec![1_u8, 2].to_value()));
        assert!(snapshot.into_inner().tags.is_empty());
    }

    #[test]
    fn test_dynamic_records_diff_by_key() {
        let factory = SchemaFactory::new();
        let schema = factory.dynamic_schema("Bag");
        let schema = schema.unwrap();
        let bag = RecordValue::new()
            .with("a", SqlValue::Int(1))
            .with("b", SqlValue::Text(String::from("x")));
        let mut snapshot = Snapshot::new(schema, bag);
        snapshot
            .tracked_mut()
            .insert("b", SqlValue::Text(String::from("y")));
        snapshot.tracked_mut().insert("c", SqlValue::Bool(true));

        let diff = snapshot.diff();
        assert_eq!(diff.columns().collect::<Vec<_>>(), ["b", "c"]);
        assert_eq!(diff.get("c").unwrap().old, SqlValue::Null);
    }
}
