//! The record model: how Rust types expose their fields to the mapper.
//!
//! A [`Record`] describes itself through a [`TypeInfo`] and converts to and
//! from a [`RecordValue`], an ordered map of field values. `#[derive(Record)]`
//! generates all of it; [`RecordValue`] itself is a `Record` too and serves
//! as the variant (map-backed) record whose fields are whatever a result set
//! carries.
//!
//! ```rust
//! use oxide_mapper_core::record::{Record, RecordValue};
//! use oxide_mapper_core::value::SqlValue;
//!
//! let row = RecordValue::new().with("id", SqlValue::Int(1));
//! assert!(RecordValue::type_info().is_dynamic());
//! assert_eq!(RecordValue::from_record(row.clone()).unwrap(), row);
//! ```

mod convert;
mod json;
mod value;

pub use convert::{read_field, FromValue, HasValueType, ToValue, ValueError};
pub use json::Json;
pub use value::{RecordValue, Value};

use crate::schema::{EnumMember, TypeInfo};
use crate::value::SqlValue;

/// A type that maps to a table row.
pub trait Record: Sized + Send + Sync + 'static {
    /// Static description of the type's fields and annotations.
    fn type_info() -> TypeInfo;

    /// Captures the current field values.
    fn to_record(&self) -> RecordValue;

    /// Builds an instance from field values, starting from defaults.
    ///
    /// Fields absent from `record` keep their default value.
    ///
    /// # Errors
    ///
    /// Returns a [`ValueError`] naming the first field whose value does not
    /// fit its type.
    fn from_record(record: RecordValue) -> Result<Self, ValueError>;

    /// Assigns the fields present in `record`, leaving the others as they
    /// are.
    ///
    /// # Errors
    ///
    /// Returns a [`ValueError`] naming the first field whose value does not
    /// fit its type.
    fn apply_record(&mut self, record: RecordValue) -> Result<(), ValueError> {
        *self = Self::from_record(record)?;
        Ok(())
    }
}

impl Record for RecordValue {
    fn type_info() -> TypeInfo {
        TypeInfo::dynamic("RecordValue")
    }

    fn to_record(&self) -> RecordValue {
        self.clone()
    }

    fn from_record(record: RecordValue) -> Result<Self, ValueError> {
        Ok(record)
    }
}

/// A fieldless enum stored by member name.
pub trait SqlEnum: Sized + 'static {
    /// Members in declaration order.
    const MEMBERS: &'static [EnumMember];

    /// Name of this member.
    fn member_name(&self) -> &'static str;

    /// Looks up a member by its exact name.
    fn from_member_name(name: &str) -> Option<Self>;
}

/// Converts an enum member to its stored form.
pub fn enum_to_value<E: SqlEnum>(member: &E) -> Value {
    Value::Scalar(SqlValue::Text(member.member_name().to_string()))
}

/// Reads an enum member by name (case-insensitive) or by discriminant.
///
/// # Errors
///
/// Returns a [`ValueError`] if no member matches.
pub fn enum_from_value<E: SqlEnum>(value: Value) -> Result<E, ValueError> {
    let member = match &value {
        Value::Scalar(SqlValue::Text(name)) => E::MEMBERS
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name)),
        Value::Scalar(SqlValue::Int(n)) => E::MEMBERS.iter().find(|m| m.value == *n),
        _ => None,
    };
    member
        .and_then(|m| E::from_member_name(m.name))
        .ok_or_else(|| {
            let names: Vec<&str> = E::MEMBERS.iter().map(|m| m.name).collect();
            ValueError::mismatch(format!("one of [{}]", names.join(", ")), &value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Status {
        Draft,
        Published,
    }

    impl SqlEnum for Status {
        const MEMBERS: &'static [EnumMember] = &[
            EnumMember {
                name: "Draft",
                value: 0,
            },
            EnumMember {
                name: "Published",
                value: 5,
            },
        ];

        fn member_name(&self) -> &'static str {
            match self {
                Self::Draft => "Draft",
                Self::Published => "Published",
            }
        }

        fn from_member_name(name: &str) -> Option<Self> {
            match name {
                "Draft" => Some(Self::Draft),
                "Published" => Some(Self::Published),
                _ => None,
            }
        }
    }

    #[test]
    fn test_enum_stored_by_name() {
        assert_eq!(
            enum_to_value(&Status::Published),
            Value::Scalar(SqlValue::Text(String::from("Published")))
        );
    }

    #[test]
    fn test_enum_read_by_name_or_discriminant() {
        let by_name: Status =
            enum_from_value(Value::Scalar(SqlValue::Text(String::from("published")))).unwrap();
        assert_eq!(by_name, Status::Published);
        let by_value: Status = enum_from_value(Value::Scalar(SqlValue::Int(0))).unwrap();
        assert_eq!(by_value, Status::Draft);
    }

    #[test]
    fn test_unknown_enum_member() {
        let err = enum_from_value::<Status>(Value::Scalar(SqlValue::Text(String::from("Gone"))))
            .unwrap_err();
        assert!(err.expected.contains("Draft, Published"));
    }

    #[test]
    fn test_record_value_is_a_variant_record() {
        assert!(RecordValue::type_info().is_dynamic());
        let record = RecordValue::new().with("n", SqlValue::Int(1));
        assert_eq!(record.to_record(), record);
    }
}
