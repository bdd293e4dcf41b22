//! Conversion of raw cell values into a column's declared type.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::HydrationError;
use crate::schema::{ColumnDescriptor, EnumMember, ValueType};
use crate::value::SqlValue;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Converts `value`, read from `column`, into the canonical form of the
/// descriptor's value type.
///
/// Enumerations are canonicalised to their member name.
pub(crate) fn convert_cell(
    value: SqlValue,
    type_name: &str,
    column: &ColumnDescriptor,
) -> Result<SqlValue, HydrationError> {
    if value.is_null() {
        return Ok(value);
    }
    let target = column.value_type();
    let force_utc = column.flags().force_utc;

    let converted = match target {
        ValueType::Enum(members) => {
            return enum_member(&value, members).ok_or_else(|| HydrationError::UnknownEnumValue {
                type_name: type_name.to_string(),
                field: column.field_path(),
                value,
                expected: members.iter().map(|m| m.name).collect::<Vec<_>>().join(", "),
            });
        }
        ValueType::Bool => to_bool(&value),
        ValueType::Int => to_int(&value),
        ValueType::Float => to_float(&value),
        ValueType::Text => to_text(&value),
        ValueType::Blob => to_blob(&value),
        ValueType::DateTime => to_naive(&value, force_utc),
        ValueType::DateTimeUtc => to_utc(&value),
        ValueType::Json => match &value {
            SqlValue::Blob(bytes) => String::from_utf8(bytes.clone()).ok().map(SqlValue::Text),
            SqlValue::Text(_) => Some(value.clone()),
            _ => None,
        },
        ValueType::Any => Some(value.clone()),
        ValueType::Record(_) | ValueType::List(_) => None,
    };

    converted.ok_or_else(|| HydrationError::Conversion {
        type_name: type_name.to_string(),
        field: column.field_path(),
        column: column.output_name().to_string(),
        target: target.describe(),
        value,
    })
}

fn enum_member(value: &SqlValue, members: &[EnumMember]) -> Option<SqlValue> {
    let member = match value {
        SqlValue::Text(name) => members
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name.trim())),
        SqlValue::Int(n) => members.iter().find(|m| m.value == *n),
        _ => None,
    }?;
    Some(SqlValue::Text(member.name.to_string()))
}

fn to_bool(value: &SqlValue) -> Option<SqlValue> {
    let b = match value {
        SqlValue::Bool(b) => *b,
        SqlValue::Int(n) => *n != 0,
        SqlValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" | "y" => true,
            "false" | "f" | "0" | "no" | "n" => false,
            _ => return None,
        },
        _ => return None,
    };
    Some(SqlValue::Bool(b))
}

#[allow(clippy::cast_possible_truncation)]
fn to_int(value: &SqlValue) -> Option<SqlValue> {
    let n = match value {
        SqlValue::Int(n) => *n,
        SqlValue::Bool(b) => i64::from(*b),
        SqlValue::Float(f) if f.fract() == 0.0 && f.is_finite() => *f as i64,
        SqlValue::Text(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    Some(SqlValue::Int(n))
}

#[allow(clippy::cast_precision_loss)]
fn to_float(value: &SqlValue) -> Option<SqlValue> {
    let f = match value {
        SqlValue::Float(f) => *f,
        SqlValue::Int(n) => *n as f64,
        SqlValue::Text(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    Some(SqlValue::Float(f))
}

fn to_text(value: &SqlValue) -> Option<SqlValue> {
    let text = match value {
        SqlValue::Text(s) => s.clone(),
        SqlValue::Int(n) => n.to_string(),
        SqlValue::Float(f) => f.to_string(),
        SqlValue::Bool(b) => b.to_string(),
        SqlValue::Blob(bytes) => String::from_utf8(bytes.clone()).ok()?,
        SqlValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        SqlValue::DateTimeUtc(dt) => dt.to_rfc3339(),
        SqlValue::Null => return None,
    };
    Some(SqlValue::Text(text))
}

fn to_blob(value: &SqlValue) -> Option<SqlValue> {
    match value {
        SqlValue::Blob(_) => Some(value.clone()),
        SqlValue::Text(s) => Some(SqlValue::Blob(s.clone().into_bytes())),
        _ => None,
    }
}

fn to_naive(value: &SqlValue, force_utc: bool) -> Option<SqlValue> {
    let dt = match value {
        SqlValue::DateTime(dt) => *dt,
        SqlValue::DateTimeUtc(dt) => dt.naive_utc(),
        SqlValue::Int(secs) => DateTime::from_timestamp(*secs, 0)?.naive_utc(),
        SqlValue::Text(s) => {
            let s = s.trim();
            match DateTime::parse_from_rfc3339(s) {
                Ok(parsed) if force_utc => parsed.naive_utc(),
                Ok(parsed) => parsed.naive_local(),
                Err(_) => parse_naive(s)?,
            }
        }
        _ => return None,
    };
    Some(SqlValue::DateTime(dt))
}

fn to_utc(value: &SqlValue) -> Option<SqlValue> {
    let dt = match value {
        SqlValue::DateTimeUtc(dt) => *dt,
        SqlValue::DateTime(dt) => dt.and_utc(),
        SqlValue::Int(secs) => DateTime::from_timestamp(*secs, 0)?,
        SqlValue::Text(s) => {
            let s = s.trim();
            match DateTime::parse_from_rfc3339(s) {
                Ok(parsed) => parsed.with_timezone(&Utc),
                Err(_) => parse_naive(s)?.and_utc(),
            }
        }
        _ => return None,
    };
    Some(SqlValue::DateTimeUtc(dt))
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{resolve, ColumnOverrides, Conventions, FieldInfo, Mappings, TypeInfo};

    const LEVELS: &[EnumMember] = &[
        EnumMember {
            name: "Low",
            value: 0,
        },
        EnumMember {
            name: "High",
            value: 10,
        },
    ];

    struct Reading;

    fn schema() -> crate::schema::TypeSchema {
        let info = TypeInfo::of::<Reading>("Reading")
            .field(FieldInfo::new("id", ValueType::Int))
            .field(FieldInfo::new("ok", ValueType::Bool))
            .field(FieldInfo::new("level", ValueType::Enum(LEVELS)))
            .field(FieldInfo::new("taken_at", ValueType::DateTime))
            .field(
                FieldInfo::new("synced_at", ValueType::DateTime)
                    .with_overrides(ColumnOverrides::default().force_utc()),
            )
            .field(FieldInfo::new("stored_at", ValueType::DateTimeUtc))
            .field(FieldInfo::new("ratio", ValueType::Float));
        resolve(&info, &Conventions::default(), &Mappings::default()).unwrap()
    }

    fn convert(field: &str, value: SqlValue) -> Result<SqlValue, HydrationError> {
        let schema = schema();
        let column = schema.find_path(&[field]).unwrap();
        convert_cell(value, "Reading", column)
    }

    fn naive(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_numeric_and_bool_coercions() {
        assert_eq!(convert("ok", SqlValue::Int(1)).unwrap(), SqlValue::Bool(true));
        assert_eq!(
            convert("ok", SqlValue::Text(String::from("false"))).unwrap(),
            SqlValue::Bool(false)
        );
        assert_eq!(convert("id", SqlValue::Text(String::from(" 42 "))).unwrap(), SqlValue::Int(42));
        assert_eq!(convert("ratio", SqlValue::Int(2)).unwrap(), SqlValue::Float(2.0));
        assert_eq!(convert("id", SqlValue::Null).unwrap(), SqlValue::Null);
    }

    #[test]
    fn test_conversion_error_names_field_and_value() {
        let err = convert("id", SqlValue::Text(String::from("abc"))).unwrap_err();
        assert_eq!(
            err,
            HydrationError::Conversion {
                type_name: String::from("Reading"),
                field: String::from("id"),
                column: String::from("id"),
                value: SqlValue::Text(String::from("abc")),
                target: String::from("integer"),
            }
        );
    }

    #[test]
    fn test_enum_by_name_or_discriminant() {
        assert_eq!(
            convert("level", SqlValue::Text(String::from("high"))).unwrap(),
            SqlValue::Text(String::from("High"))
        );
        assert_eq!(
            convert("level", SqlValue::Int(0)).unwrap(),
            SqlValue::Text(String::from("Low"))
        );
        let err = convert("level", SqlValue::Text(String::from("Medium"))).unwrap_err();
        assert!(matches!(
            err,
            HydrationError::UnknownEnumValue { ref expected, .. } if expected == "Low, High"
        ));
    }

    #[test]
    fn test_datetime_text_formats() {
        assert_eq!(
            convert("taken_at", SqlValue::Text(String::from("2024-03-01 10:20:30"))).unwrap(),
            SqlValue::DateTime(naive("2024-03-01 10:20:30"))
        );
        assert_eq!(
            convert("taken_at", SqlValue::Text(String::from("2024-03-01"))).unwrap(),
            SqlValue::DateTime(naive("2024-03-01 00:00:00"))
        );
        assert_eq!(
            convert("taken_at", SqlValue::Int(0)).unwrap(),
            SqlValue::DateTime(naive("1970-01-01 00:00:00"))
        );
    }

    #[test]
    fn test_forced_utc_normalises_offsets() {
        let text = SqlValue::Text(String::from("2024-03-01T12:00:00+02:00"));
        assert_eq!(
            convert("taken_at", text.clone()).unwrap(),
            SqlValue::DateTime(naive("2024-03-01 12:00:00"))
        );
        assert_eq!(
            convert("synced_at", text.clone()).unwrap(),
            SqlValue::DateTime(naive("2024-03-01 10:00:00"))
        );
        assert_eq!(
            convert("stored_at", text).unwrap(),
            SqlValue::DateTimeUtc(naive("2024-03-01 10:00:00").and_utc())
        );
    }
}
