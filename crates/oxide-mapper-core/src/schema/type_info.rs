//! Introspection descriptors for record types.
//!
//! A [`TypeInfo`] is the static, declarative description of a record type:
//! its name, its fields in declaration order and whatever per-field
//! annotations were attached to them. `#[derive(Record)]` generates one per
//! struct; tests and dynamic callers can build them by hand.

use std::any::TypeId;
use std::fmt;

use super::config::{ColumnOverrides, TableOverrides};

/// Identity of a record type, used as the schema cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKey {
    /// A statically known Rust type.
    Static(TypeId),
    /// A map-backed (variant) record shape identified by name.
    Dynamic(String),
}

/// A named member of an enumerated column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumMember {
    /// Member name as stored in the database.
    pub name: &'static str,
    /// Discriminant, accepted when the database stores numbers.
    pub value: i64,
}

/// The declared value type of a record field.
#[derive(Clone)]
pub enum ValueType {
    Bool,
    Int,
    Float,
    Text,
    Blob,
    DateTime,
    DateTimeUtc,
    /// An enumeration with a fixed set of named members.
    Enum(&'static [EnumMember]),
    /// A value serialized to JSON text.
    Json,
    /// A composite record type (nested, reference or relation).
    Record(fn() -> TypeInfo),
    /// A collection; collections of records are one-to-many relations.
    List(Box<ValueType>),
    /// Untyped; values pass through unconverted.
    Any,
}

impl ValueType {
    /// Returns whether the type maps to a single column value.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        !matches!(self, Self::Record(_) | Self::List(_))
    }

    /// Human-readable name used in conversion errors.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Bool => String::from("bool"),
            Self::Int => String::from("integer"),
            Self::Float => String::from("float"),
            Self::Text => String::from("text"),
            Self::Blob => String::from("blob"),
            Self::DateTime => String::from("datetime"),
            Self::DateTimeUtc => String::from("datetime (utc)"),
            Self::Enum(members) => {
                let names: Vec<&str> = members.iter().map(|m| m.name).collect();
                format!("enum [{}]", names.join(", "))
            }
            Self::Json => String::from("json"),
            Self::Record(info) => format!("record {}", info().name()),
            Self::List(inner) => format!("list of {}", inner.describe()),
            Self::Any => String::from("any"),
        }
    }
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// One declared field of a record type.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    name: String,
    value_type: ValueType,
    nullable: bool,
    overrides: ColumnOverrides,
}

impl FieldInfo {
    /// Creates a field descriptor with no annotations.
    #[must_use]
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            nullable: false,
            overrides: ColumnOverrides::default(),
        }
    }

    /// Marks the field as nullable.
    #[must_use]
    pub const fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Attaches declarative per-field annotations.
    #[must_use]
    pub fn with_overrides(mut self, overrides: ColumnOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
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
    pub const fn overrides(&self) -> &ColumnOverrides {
        &self.overrides
    }
}

/// Static description of a record type.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    key: TypeKey,
    name: String,
    table: TableOverrides,
    fields: Vec<FieldInfo>,
}

impl TypeInfo {
    /// Starts a descriptor for the Rust type `T`.
    #[must_use]
    pub fn of<T: 'static>(name: impl Into<String>) -> Self {
        Self {
            key: TypeKey::Static(TypeId::of::<T>()),
            name: name.into(),
            table: TableOverrides::default(),
            fields: Vec::new(),
        }
    }

    /// Starts a descriptor for a map-backed record shape.
    ///
    /// Dynamic types declare no fields; every result column becomes a
    /// field of the hydrated [`RecordValue`](crate::record::RecordValue).
    #[must_use]
    pub fn dynamic(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            key: TypeKey::Dynamic(name.clone()),
            name,
            table: TableOverrides::default(),
            fields: Vec::new(),
        }
    }

    /// Attaches declarative table-level annotations.
    #[must_use]
    pub fn with_table(mut self, table: TableOverrides) -> Self {
        self.table = table;
        self
    }

    /// Appends a field.
    #[must_use]
    pub fn field(mut self, field: FieldInfo) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub const fn key(&self) -> &TypeKey {
        &self.key
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn table(&self) -> &TableOverrides {
        &self.table
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn find_field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns whether this describes a map-backed shape.
    #[must_use]
    pub const fn is_dynamic(&self) -> bool {
        matches!(self.key, TypeKey::Dynamic(_))
    }
}
