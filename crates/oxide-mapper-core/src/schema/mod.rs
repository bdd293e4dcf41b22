//! Schema resolution: how a record type maps to a table and its columns.
//!
//! A [`TypeSchema`] is built once per (type, configuration) pair by a
//! [`SchemaFactory`] and shared read-only afterwards. It is the input of
//! every other stage: the expression compiler resolves member paths
//! through it, the statement builder reads its column flags and the
//! hydrator uses it to group result columns back into nested records.

mod config;
mod convention;
mod factory;
mod resolver;
mod type_info;

pub use config::{
    ColumnOverrides, ComputedKind, Mappings, TableOverrides, TypeMapping, VersionKind,
};
pub use convention::{nested_prefix, pluralize, to_snake_case, Conventions, NESTING_DELIMITER};
pub use factory::SchemaFactory;
pub use resolver::resolve;
pub use type_info::{EnumMember, FieldInfo, TypeInfo, TypeKey, ValueType};

use crate::record::{RecordValue, Value};
use crate::value::SqlValue;

/// Role flags of a column descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnFlags {
    pub primary_key: bool,
    pub result_only: bool,
    pub ignored: bool,
    pub version: Option<VersionKind>,
    pub computed: Option<ComputedKind>,
    pub nested: bool,
    pub reference: bool,
    pub serialized: bool,
    pub force_utc: bool,
    /// A record or collection field that is not stored in this table.
    pub relation: bool,
}

/// Children of a nested (complex) field.
#[derive(Debug, Clone)]
pub struct NestedColumns {
    pub type_name: String,
    /// Parent column name plus [`NESTING_DELIMITER`].
    pub prefix: String,
    pub columns: Vec<ColumnDescriptor>,
}

/// One field-to-column mapping entry.
#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub(crate) path: Vec<String>,
    pub(crate) column_name: String,
    pub(crate) output_name: String,
    pub(crate) alias: Option<String>,
    pub(crate) value_type: ValueType,
    pub(crate) nullable: bool,
    pub(crate) flags: ColumnFlags,
    pub(crate) reference_member: Option<String>,
    pub(crate) nested: Option<NestedColumns>,
}

impl ColumnDescriptor {
    /// Field path from the root record, e.g. `["address", "city"]`.
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Field path joined with `.`.
    #[must_use]
    pub fn field_path(&self) -> String {
        self.path.join(".")
    }

    /// The last segment of the field path.
    #[must_use]
    pub fn field_name(&self) -> &str {
        self.path.last().map_or("", String::as_str)
    }

    /// Physical column name (prefixed for nested fields).
    #[must_use]
    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    /// Name the column carries in result sets: the alias if configured,
    /// otherwise the column name.
    #[must_use]
    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    #[must_use]
    pub const fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    #[must_use]
    pub const fn flags(&self) -> &ColumnFlags {
        &self.flags
    }

    /// For record-typed reference fields, the member of the referenced type
    /// the column holds.
    #[must_use]
    pub fn reference_member(&self) -> Option<&str> {
        self.reference_member.as_deref()
    }

    /// Children of a nested field.
    #[must_use]
    pub const fn nested(&self) -> Option<&NestedColumns> {
        self.nested.as_ref()
    }

    /// Returns whether this descriptor stands for one physical column.
    #[must_use]
    pub const fn is_column(&self) -> bool {
        !self.flags.ignored && !self.flags.relation && self.nested.is_none()
    }

    #[must_use]
    pub const fn is_version(&self) -> bool {
        self.flags.version.is_some()
    }

    #[must_use]
    pub const fn is_computed(&self) -> bool {
        self.flags.computed.is_some()
    }

    /// Returns whether INSERT statements write this column.
    #[must_use]
    pub fn is_insertable(&self) -> bool {
        self.is_column()
            && !self.flags.result_only
            && self.flags.version != Some(VersionKind::RowVersion)
            && !self.flags.computed.is_some_and(ComputedKind::skips_insert)
    }

    /// Returns whether UPDATE statements may SET this column.
    #[must_use]
    pub fn is_updatable(&self) -> bool {
        self.is_column()
            && !self.flags.result_only
            && !self.flags.primary_key
            && self.flags.version.is_none()
            && !self.flags.computed.is_some_and(ComputedKind::skips_update)
    }

    /// Reads this column's value out of a captured record.
    ///
    /// Reference fields yield the referenced member; anything missing or
    /// not scalar reads as `NULL`.
    #[must_use]
    pub fn value_in(&self, record: &RecordValue) -> SqlValue {
        let value = match (&self.reference_member, record.get_path(&self.path)) {
            (Some(member), Some(Value::Record(target))) => target.get(member),
            (_, value) => value,
        };
        match value {
            Some(Value::Scalar(v)) => v.clone(),
            _ => SqlValue::Null,
        }
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a ColumnDescriptor>) {
        if let Some(nested) = &self.nested {
            for child in &nested.columns {
                child.collect_leaves(out);
            }
        } else if self.is_column() {
            out.push(self);
        }
    }
}

/// Resolved mapping of a record type to a table and its columns.
#[derive(Debug, Clone)]
pub struct TypeSchema {
    pub(crate) key: TypeKey,
    pub(crate) type_name: String,
    pub(crate) table_name: String,
    pub(crate) primary_keys: Vec<String>,
    pub(crate) autoincrement: bool,
    pub(crate) sequence: Option<String>,
    pub(crate) columns: Vec<ColumnDescriptor>,
}

impl TypeSchema {
    #[must_use]
    pub const fn key(&self) -> &TypeKey {
        &self.key
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Primary key column names.
    #[must_use]
    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    #[must_use]
    pub fn is_composite_key(&self) -> bool {
        self.primary_keys.len() > 1
    }

    #[must_use]
    pub const fn is_autoincrement(&self) -> bool {
        self.autoincrement
    }

    #[must_use]
    pub fn sequence(&self) -> Option<&str> {
        self.sequence.as_deref()
    }

    /// Returns whether this is a map-backed (variant) schema.
    #[must_use]
    pub const fn is_dynamic(&self) -> bool {
        matches!(self.key, TypeKey::Dynamic(_))
    }

    /// Top-level descriptors in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Every physical column, depth-first in declaration order.
    #[must_use]
    pub fn leaf_columns(&self) -> Vec<&ColumnDescriptor> {
        let mut out = Vec::new();
        for column in &self.columns {
            column.collect_leaves(&mut out);
        }
        out
    }

    /// Looks up a descriptor by field path (leaf or nested container).
    #[must_use]
    pub fn find_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&ColumnDescriptor> {
        let (first, rest) = path.split_first()?;
        let mut current = self.columns.iter().find(|c| c.field_name() == first.as_ref())?;
        for segment in rest {
            let nested = current.nested.as_ref()?;
            current = nested
                .columns
                .iter()
                .find(|c| c.field_name() == segment.as_ref())?;
        }
        Some(current)
    }

    /// Looks up a physical column by name, case-insensitively.
    #[must_use]
    pub fn find_column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.leaf_columns()
            .into_iter()
            .find(|c| c.column_name.eq_ignore_ascii_case(name))
    }

    /// Looks up a physical column by result-set name, case-insensitively.
    #[must_use]
    pub fn find_output(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.leaf_columns()
            .into_iter()
            .find(|c| c.output_name.eq_ignore_ascii_case(name))
    }

    /// Descriptors of the primary key columns, in key order.
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<&ColumnDescriptor> {
        self.primary_keys
            .iter()
            .filter_map(|pk| self.find_column(pk))
            .collect()
    }

    /// The version column, if one is configured.
    #[must_use]
    pub fn version_column(&self) -> Option<&ColumnDescriptor> {
        self.leaf_columns().into_iter().find(|c| c.is_version())
    }

    /// Top-level relation fields (records or collections stored elsewhere).
    #[must_use]
    pub fn relations(&self) -> Vec<&ColumnDescriptor> {
        self.columns.iter().filter(|c| c.flags.relation).collect()
    }
}
