//! Error types for schema resolution, expression compilation and hydration.
//!
//! Each stage has its own error enum so callers can tell a configuration
//! mistake (raised once, at resolution time) from a bad query (raised at
//! compile time) or bad data (raised per row while hydrating).

use thiserror::Error;

use crate::record::ValueError;
use crate::value::SqlValue;

/// Errors raised while resolving a [`TypeSchema`](crate::schema::TypeSchema).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// Two mapped fields resolved to the same column name (case-insensitive).
    #[error("type `{type_name}`: column `{column}` is mapped by both `{first}` and `{second}`")]
    ColumnCollision {
        type_name: String,
        column: String,
        first: String,
        second: String,
    },

    /// A composite primary key was configured with autoincrement.
    #[error("type `{type_name}`: composite primary key ({columns}) cannot be autoincrement")]
    CompositeAutoIncrement { type_name: String, columns: String },

    /// A nested (complex) field nests its own type, directly or indirectly.
    #[error("type `{type_name}`: field `{field}` nests `{nested}` recursively")]
    RecursiveNesting {
        type_name: String,
        field: String,
        nested: String,
    },

    /// A reference field points at a member the referenced type does not declare.
    #[error("type `{type_name}`: field `{field}` references unknown member `{member}` of `{target}`")]
    UnknownReferenceMember {
        type_name: String,
        field: String,
        target: String,
        member: String,
    },

    /// An override names a field the type does not declare.
    #[error("type `{type_name}`: configuration refers to unknown field `{field}`")]
    UnknownField { type_name: String, field: String },

    /// A configured primary key names a column the type does not map.
    #[error("type `{type_name}`: primary key column `{column}` is not mapped")]
    UnknownPrimaryKey { type_name: String, column: String },

    /// A field marked nested is not a record type.
    #[error("type `{type_name}`: field `{field}` is marked nested but is not a record")]
    NotNestable { type_name: String, field: String },
}

/// Errors raised while compiling expressions or assembling statements.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// The expression tree contains a node the compiler cannot translate.
    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// A member path does not resolve to any column descriptor.
    #[error("unknown member `{member}` on type `{type_name}`")]
    UnknownMember { type_name: String, member: String },

    /// A member path resolves to a descriptor that has no physical column.
    #[error("member `{member}` on type `{type_name}` is not a column")]
    NotAColumn { type_name: String, member: String },

    /// A placeholder refers past the end of its fragment's parameter list.
    #[error("placeholder @{index} has no parameter (fragment binds {available})")]
    ParameterOutOfRange { index: usize, available: usize },

    /// The statement needs a primary key the schema does not declare.
    #[error("type `{0}` has no primary key")]
    MissingPrimaryKey(String),

    /// A write was requested for a record that carries no writable columns.
    #[error("type `{0}` has no writable columns")]
    NoWritableColumns(String),

    /// A page was requested with a negative skip or take.
    #[error("invalid page: skip {skip}, take {take}")]
    InvalidPage { skip: i64, take: i64 },

    /// A key lookup passed the wrong number of key values.
    #[error("type `{type_name}` has {expected} primary key column(s), got {found} value(s)")]
    KeyArity {
        type_name: String,
        expected: usize,
        found: usize,
    },
}

/// Errors raised while materializing rows into records.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HydrationError {
    /// A source value cannot be converted to the field's declared type.
    #[error("cannot convert {value:?} from column `{column}` into {target} for `{type_name}.{field}`")]
    Conversion {
        type_name: String,
        field: String,
        column: String,
        value: SqlValue,
        target: String,
    },

    /// An enumerated column holds a value with no matching member.
    #[error("unknown enum value {value:?} for `{type_name}.{field}` (expected one of: {expected})")]
    UnknownEnumValue {
        type_name: String,
        field: String,
        value: SqlValue,
        expected: String,
    },

    /// A materialized record was rejected by the type's field conversions.
    #[error("cannot build `{type_name}`: {source}")]
    Record {
        type_name: String,
        source: ValueError,
    },

    /// One-to-many hydration found no collection field for the child type.
    #[error("type `{type_name}` has no collection field of `{child}`")]
    MissingRelation { type_name: String, child: String },

    /// The row cursor reported a failure.
    #[error("row cursor error: {0}")]
    Cursor(String),
}

/// Top-level error type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Schema resolution failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Expression compilation or statement assembly failed.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Hydration failed.
    #[error(transparent)]
    Hydration(#[from] HydrationError),
}

/// Result type alias for mapper operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = SchemaError::ColumnCollision {
            type_name: String::from("User"),
            column: String::from("email"),
            first: String::from("email"),
            second: String::from("contact.email"),
        };
        let msg = err.to_string();
        assert!(msg.contains("User"));
        assert!(msg.contains("contact.email"));

        let err = HydrationError::Conversion {
            type_name: String::from("User"),
            field: String::from("age"),
            column: String::from("age"),
            value: SqlValue::Text(String::from("old")),
            target: String::from("integer"),
        };
        assert!(err.to_string().contains("User.age"));
        assert!(err.to_string().contains("old"));
    }

    #[test]
    fn test_from_conversions() {
        let err: Error = CompileError::UnsupportedExpression(String::from("x")).into();
        assert!(matches!(err, Error::Compile(_)));
    }
}
