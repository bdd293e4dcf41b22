//! Conversions between Rust field types and [`Value`]s.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

use super::{Record, RecordValue, Value};
use crate::schema::ValueType;
use crate::value::SqlValue;

/// A field value that does not fit the field's Rust type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field `{field}`: expected {expected}, found {found}")]
pub struct ValueError {
    pub field: String,
    pub expected: String,
    pub found: String,
}

impl ValueError {
    /// Creates an error for a value not yet attributed to a field.
    #[must_use]
    pub fn mismatch(expected: impl Into<String>, found: &Value) -> Self {
        Self {
            field: String::new(),
            expected: expected.into(),
            found: found.describe(),
        }
    }

    /// Attributes the error to `field`, prefixing any nested field path.
    #[must_use]
    pub fn in_field(mut self, field: &str) -> Self {
        self.field = if self.field.is_empty() {
            field.to_string()
        } else {
            format!("{field}.{}", self.field)
        };
        self
    }
}

/// Declares the [`ValueType`] of a field type.
pub trait HasValueType {
    fn value_type() -> ValueType;

    /// Whether the type admits `NULL`.
    fn nullable() -> bool {
        false
    }
}

/// Converts a field into a [`Value`].
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Reads a field back from a [`Value`].
pub trait FromValue: Sized {
    /// # Errors
    ///
    /// Returns a [`ValueError`] if `value` does not fit `Self`.
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

macro_rules! scalar_impls {
    ($ty:ty, $value_type:expr, |$s:ident| $to:expr, $expected:literal, { $($pat:pat => $from:expr),+ $(,)? }) => {
        impl HasValueType for $ty {
            fn value_type() -> ValueType {
                $value_type
            }
        }

        impl ToValue for $ty {
            fn to_value(&self) -> Value {
                let $s = self;
                Value::Scalar($to)
            }
        }

        impl FromValue for $ty {
            fn from_value(value: Value) -> Result<Self, ValueError> {
                match value {
                    $($pat => $from,)+
                    other => Err(ValueError::mismatch($expected, &other)),
                }
            }
        }
    };
}

macro_rules! int_impls {
    ($($ty:ty),+) => {
        $(
            scalar_impls!($ty, ValueType::Int, |v| SqlValue::Int(i64::from(*v)), "integer", {
                Value::Scalar(SqlValue::Int(n)) => <$ty>::try_from(n)
                    .map_err(|_| ValueError::mismatch(stringify!($ty), &Value::Scalar(SqlValue::Int(n)))),
                Value::Scalar(SqlValue::Bool(b)) => Ok(<$ty>::from(b)),
            });
        )+
    };
}

int_impls!(i8, i16, i32, i64, u8, u16, u32);

scalar_impls!(bool, ValueType::Bool, |v| SqlValue::Bool(*v), "bool", {
    Value::Scalar(SqlValue::Bool(b)) => Ok(b),
    Value::Scalar(SqlValue::Int(n)) => Ok(n != 0),
});

scalar_impls!(f64, ValueType::Float, |v| SqlValue::Float(*v), "float", {
    Value::Scalar(SqlValue::Float(f)) => Ok(f),
    Value::Scalar(SqlValue::Int(n)) => Ok(n as f64),
});

scalar_impls!(f32, ValueType::Float, |v| SqlValue::Float(f64::from(*v)), "float", {
    Value::Scalar(SqlValue::Float(f)) => Ok(f as f32),
    Value::Scalar(SqlValue::Int(n)) => Ok(n as f32),
});

scalar_impls!(String, ValueType::Text, |v| SqlValue::Text(v.clone()), "text", {
    Value::Scalar(SqlValue::Text(s)) => Ok(s),
});

scalar_impls!(Vec<u8>, ValueType::Blob, |v| SqlValue::Blob(v.clone()), "blob", {
    Value::Scalar(SqlValue::Blob(b)) => Ok(b),
});

scalar_impls!(NaiveDateTime, ValueType::DateTime, |v| SqlValue::DateTime(*v), "datetime", {
    Value::Scalar(SqlValue::DateTime(dt)) => Ok(dt),
    Value::Scalar(SqlValue::DateTimeUtc(dt)) => Ok(dt.naive_utc()),
});

scalar_impls!(NaiveDate, ValueType::DateTime, |v| SqlValue::DateTime(v.and_time(chrono::NaiveTime::MIN)), "date", {
    Value::Scalar(SqlValue::DateTime(dt)) => Ok(dt.date()),
    Value::Scalar(SqlValue::DateTimeUtc(dt)) => Ok(dt.date_naive()),
});

scalar_impls!(DateTime<Utc>, ValueType::DateTimeUtc, |v| SqlValue::DateTimeUtc(*v), "datetime (utc)", {
    Value::Scalar(SqlValue::DateTimeUtc(dt)) => Ok(dt),
    Value::Scalar(SqlValue::DateTime(dt)) => Ok(dt.and_utc()),
});

scalar_impls!(SqlValue, ValueType::Any, |v| v.clone(), "scalar", {
    Value::Scalar(v) => Ok(v),
});

impl<T: HasValueType> HasValueType for Option<T> {
    fn value_type() -> ValueType {
        T::value_type()
    }

    fn nullable() -> bool {
        true
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::NULL, ToValue::to_value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl<T: Record> HasValueType for Vec<T> {
    fn value_type() -> ValueType {
        ValueType::List(Box::new(ValueType::Record(T::type_info)))
    }
}

impl<T: Record> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(|r| Value::Record(r.to_record())).collect())
    }
}

impl<T: Record> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::List(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Record(r) => T::from_record(r),
                    other => Err(ValueError::mismatch("record", &other)),
                })
                .collect(),
            Value::Scalar(SqlValue::Null) => Ok(Vec::new()),
            other => Err(ValueError::mismatch("list", &other)),
        }
    }
}

impl HasValueType for RecordValue {
    fn value_type() -> ValueType {
        ValueType::Record(<Self as Record>::type_info)
    }
}

impl ToValue for RecordValue {
    fn to_value(&self) -> Value {
        Value::Record(self.clone())
    }
}

impl FromValue for RecordValue {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Record(r) => Ok(r),
            other => Err(ValueError::mismatch("record", &other)),
        }
    }
}

/// Reads the declared field `name` out of `record`, leaving `target`
/// untouched when the field is absent.
///
/// # Errors
///
/// Returns a [`ValueError`] attributed to `name` on a type mismatch.
pub fn read_field<T: FromValue>(
    record: &mut RecordValue,
    name: &str,
    target: &mut T,
) -> Result<(), ValueError> {
    if let Some(value) = record.remove(name) {
        *target = T::from_value(value).map_err(|e| e.in_field(name))?;
    }
    Ok(())
}
