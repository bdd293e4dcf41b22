//! Declarative mapping overrides.
//!
//! Overrides come from two places: annotations carried by a type's
//! [`TypeInfo`](super::TypeInfo) (usually generated by `#[derive(Record)]`),
//! and an explicit [`Mappings`] object keyed by type name. Both use the
//! same [`ColumnOverrides`] / [`TableOverrides`] shapes, and every property
//! is optional so that layering one source over another only replaces what
//! the upper source actually sets.
//!
//! ```rust
//! use oxide_mapper_core::schema::Mappings;
//!
//! let mappings = Mappings::new().map("User", |m| {
//!     m.table("app_users")
//!         .column("email", |c| c.name("email_address"))
//!         .column("password_hash", |c| c.ignore())
//! });
//! assert!(mappings.get("User").is_some());
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a version column participates in optimistic concurrency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionKind {
    /// Integer counter incremented by the UPDATE statement itself.
    Number,
    /// Database-maintained row version, read back after each write.
    RowVersion,
}

/// Which writes a computed column is produced by the database for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputedKind {
    /// Never written by the mapper.
    Always,
    /// Computed on INSERT, written on UPDATE.
    Insert,
    /// Computed on UPDATE, written on INSERT.
    Update,
}

impl ComputedKind {
    /// Returns whether the column is excluded from INSERT statements.
    #[must_use]
    pub const fn skips_insert(self) -> bool {
        matches!(self, Self::Always | Self::Insert)
    }

    /// Returns whether the column is excluded from UPDATE statements.
    #[must_use]
    pub const fn skips_update(self) -> bool {
        matches!(self, Self::Always | Self::Update)
    }
}

/// Per-field overrides. `None` means "not set by this source".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnOverrides {
    pub column_name: Option<String>,
    pub alias: Option<String>,
    pub primary_key: Option<bool>,
    pub ignore: Option<bool>,
    pub result_only: Option<bool>,
    pub version: Option<VersionKind>,
    pub computed: Option<ComputedKind>,
    pub nested: Option<bool>,
    pub reference: Option<String>,
    pub serialized: Option<bool>,
    pub force_utc: Option<bool>,
}

macro_rules! overlay_fields {
    ($base:ident, $upper:ident; $($field:ident),+) => {
        $(
            if $upper.$field.is_some() {
                $base.$field = $upper.$field.clone();
            }
        )+
    };
}

impl ColumnOverrides {
    /// Sets the column name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.column_name = Some(name.into());
        self
    }

    /// Sets the output alias used in SELECT lists and result mapping.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Marks the field as (part of) the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = Some(true);
        self
    }

    /// Excludes the field from mapping entirely.
    #[must_use]
    pub const fn ignore(mut self) -> Self {
        self.ignore = Some(true);
        self
    }

    /// Maps the field when reading but never writes it.
    #[must_use]
    pub const fn result_only(mut self) -> Self {
        self.result_only = Some(true);
        self
    }

    /// Marks the field as the version column.
    #[must_use]
    pub const fn version(mut self, kind: VersionKind) -> Self {
        self.version = Some(kind);
        self
    }

    /// Marks the field as database-computed.
    #[must_use]
    pub const fn computed(mut self, kind: ComputedKind) -> Self {
        self.computed = Some(kind);
        self
    }

    /// Flattens the field's record type into prefixed columns.
    #[must_use]
    pub const fn nested(mut self) -> Self {
        self.nested = Some(true);
        self
    }

    /// Stores the field as a foreign key pointing at `member` of its type.
    #[must_use]
    pub fn reference(mut self, member: impl Into<String>) -> Self {
        self.reference = Some(member.into());
        self
    }

    /// Marks the field as a serialized (JSON) column.
    #[must_use]
    pub const fn serialized(mut self) -> Self {
        self.serialized = Some(true);
        self
    }

    /// Normalizes date/time values of the field to UTC on read.
    #[must_use]
    pub const fn force_utc(mut self) -> Self {
        self.force_utc = Some(true);
        self
    }

    /// Layers `upper` over `self`, property by property.
    #[must_use]
    pub fn overlay(mut self, upper: &Self) -> Self {
        let base = &mut self;
        overlay_fields!(base, upper;
            column_name, alias, primary_key, ignore, result_only, version,
            computed, nested, reference, serialized, force_utc);
        self
    }
}

/// Per-type overrides. `None` means "not set by this source".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOverrides {
    pub table_name: Option<String>,
    pub primary_key: Option<Vec<String>>,
    pub autoincrement: Option<bool>,
    pub sequence: Option<String>,
}

impl TableOverrides {
    /// Sets the table name.
    #[must_use]
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// Sets the primary key column(s).
    #[must_use]
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Sets whether the primary key is generated by the database.
    #[must_use]
    pub const fn autoincrement(mut self, autoincrement: bool) -> Self {
        self.autoincrement = Some(autoincrement);
        self
    }

    /// Sets the sequence used to generate primary key values.
    #[must_use]
    pub fn sequence(mut self, name: impl Into<String>) -> Self {
        self.sequence = Some(name.into());
        self
    }

    /// Layers `upper` over `self`, property by property.
    #[must_use]
    pub fn overlay(mut self, upper: &Self) -> Self {
        let base = &mut self;
        overlay_fields!(base, upper; table_name, primary_key, autoincrement, sequence);
        self
    }
}

/// Explicit configuration for one type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeMapping {
    #[serde(flatten)]
    pub table: TableOverrides,
    /// Field overrides keyed by field name.
    pub columns: BTreeMap<String, ColumnOverrides>,
}

impl TypeMapping {
    /// Sets the table name.
    #[must_use]
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table = self.table.table(name);
        self
    }

    /// Sets the primary key column(s).
    #[must_use]
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.table = self.table.primary_key(columns);
        self
    }

    /// Sets whether the primary key is generated by the database.
    #[must_use]
    pub fn autoincrement(mut self, autoincrement: bool) -> Self {
        self.table = self.table.autoincrement(autoincrement);
        self
    }

    /// Sets the key sequence.
    #[must_use]
    pub fn sequence(mut self, name: impl Into<String>) -> Self {
        self.table = self.table.sequence(name);
        self
    }

    /// Configures one field. Repeated calls for the same field accumulate.
    #[must_use]
    pub fn column(
        mut self,
        field: impl Into<String>,
        configure: impl FnOnce(ColumnOverrides) -> ColumnOverrides,
    ) -> Self {
        let entry = self.columns.entry(field.into()).or_default();
        *entry = configure(std::mem::take(entry));
        self
    }

    /// Copies `parent`, then overlays this mapping on top of the copy.
    #[must_use]
    pub fn inherit(&self, parent: &Self) -> Self {
        let mut columns = parent.columns.clone();
        for (field, upper) in &self.columns {
            let merged = columns.remove(field).unwrap_or_default().overlay(upper);
            columns.insert(field.clone(), merged);
        }
        Self {
            table: parent.table.clone().overlay(&self.table),
            columns,
        }
    }
}

/// A configuration source: explicit mappings for any number of types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mappings {
    types: BTreeMap<String, TypeMapping>,
}

impl Mappings {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the type named `type_name`.
    #[must_use]
    pub fn map(
        mut self,
        type_name: impl Into<String>,
        configure: impl FnOnce(TypeMapping) -> TypeMapping,
    ) -> Self {
        let entry = self.types.entry(type_name.into()).or_default();
        *entry = configure(std::mem::take(entry));
        self
    }

    /// Configures `child` as `parent`'s configuration overlaid with the
    /// child's own (already registered) settings.
    #[must_use]
    pub fn inherit(mut self, child: impl Into<String>, parent: &str) -> Self {
        let child = child.into();
        let parent_mapping = self.types.get(parent).cloned().unwrap_or_default();
        let own = self.types.remove(&child).unwrap_or_default();
        self.types.insert(child, own.inherit(&parent_mapping));
        self
    }

    /// Returns the explicit mapping for `type_name`, if any.
    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<&TypeMapping> {
        self.types.get(type_name)
    }

    /// Parses mappings from a JSON object keyed by type name.
    ///
    /// # Errors
    ///
    /// Returns the serde error if the document does not describe mappings.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
