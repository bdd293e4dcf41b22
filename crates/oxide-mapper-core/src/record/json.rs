//! Serialized (JSON) column values.

use std::ops::{Deref, DerefMut};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::{FromValue, HasValueType, ToValue, Value, ValueError};
use crate::schema::ValueType;
use crate::value::SqlValue;

/// Stores `T` as JSON text in a single column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T> HasValueType for Json<T> {
    fn value_type() -> ValueType {
        ValueType::Json
    }
}

impl<T: Serialize> ToValue for Json<T> {
    fn to_value(&self) -> Value {
        match serde_json::to_string(&self.0) {
            Ok(text) => Value::Scalar(SqlValue::Text(text)),
            Err(err) => {
                warn!(error = %err, "failed to serialize json column; writing NULL");
                Value::NULL
            }
        }
    }
}

impl<T: DeserializeOwned> FromValue for Json<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        let parsed = match &value {
            Value::Scalar(SqlValue::Text(text)) => serde_json::from_str(text),
            Value::Scalar(SqlValue::Blob(bytes)) => serde_json::from_slice(bytes),
            _ => return Err(ValueError::mismatch("json", &value)),
        };
        parsed
            .map(Json)
            .map_err(|err| ValueError::mismatch(format!("json ({err})"), &value))
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        theme: String,
        tabs: Vec<u8>,
    }

    #[test]
    fn test_json_column() {
        let prefs = Json(Prefs {
            theme: String::from("dark"),
            tabs: vec![1, 2],
        });
        let value = prefs.to_value();
        assert_eq!(
            value,
            Value::Scalar(SqlValue::Text(String::from(r#"{"theme":"dark","tabs":[1,2]}"#)))
        );
        assert_eq!(Json::<Prefs>::from_value(value).unwrap(), prefs);
    }

    #[test]
    fn test_invalid_json_is_a_value_error() {
        let err = Json::<Prefs>::from_value(Value::Scalar(SqlValue::Text(String::from("{"))))
            .unwrap_err();
        assert!(err.expected.starts_with("json"));
    }
}
