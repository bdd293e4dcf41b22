//! Structural values of record graphs.

use std::fmt;

use crate::value::SqlValue;

/// A node of a record graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A single column value.
    Scalar(SqlValue),
    /// A composite record.
    Record(RecordValue),
    /// A collection.
    List(Vec<Value>),
}

impl Value {
    /// The `NULL` scalar.
    pub const NULL: Self = Self::Scalar(SqlValue::Null);

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(SqlValue::Null))
    }

    #[must_use]
    pub const fn as_scalar(&self) -> Option<&SqlValue> {
        match self {
            Self::Scalar(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_record(&self) -> Option<&RecordValue> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Short description used in conversion errors.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Scalar(v) => format!("{v:?}"),
            Self::Record(_) => String::from("record"),
            Self::List(items) => format!("list of {}", items.len()),
        }
    }
}

impl From<SqlValue> for Value {
    fn from(value: SqlValue) -> Self {
        Self::Scalar(value)
    }
}

impl From<RecordValue> for Value {
    fn from(value: RecordValue) -> Self {
        Self::Record(value)
    }
}

/// An ordered field-name to [`Value`] map.
///
/// This is the exchange format between typed records and the mapper, and
/// doubles as the variant record: a bag of fields whose shape is only known
/// from the result set it was read from.
#[derive(Clone, Default, PartialEq)]
pub struct RecordValue {
    fields: Vec<(String, Value)>,
}

impl RecordValue {
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Sets `name`, replacing any previous value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Removes and returns the value of `name`.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(index).1)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Follows `path` through nested records.
    #[must_use]
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let (last, parents) = path.split_last()?;
        let mut current = self;
        for segment in parents {
            current = current.get(segment.as_ref())?.as_record()?;
        }
        current.get(last.as_ref())
    }

    /// Sets the value at `path`, creating intermediate records as needed.
    ///
    /// An intermediate that holds a non-record value is replaced.
    pub fn set_path<S: AsRef<str>>(&mut self, path: &[S], value: impl Into<Value>) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };
        let mut current = self;
        for segment in parents {
            let segment = segment.as_ref();
            if !matches!(current.get(segment), Some(Value::Record(_))) {
                current.insert(segment, RecordValue::new());
            }
            current = match current.get_mut(segment) {
                Some(Value::Record(child)) => child,
                _ => return,
            };
        }
        current.insert(last.as_ref(), value);
    }

    /// Returns whether a record exists at `path`.
    #[must_use]
    pub fn has_record_at<S: AsRef<str>>(&self, path: &[S]) -> bool {
        path.is_empty() || matches!(self.get_path(path), Some(Value::Record(_)))
    }
}

impl fmt::Debug for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.fields.iter().map(|(n, v)| (n, v)))
            .finish()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RecordValue {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl IntoIterator for RecordValue {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_order_and_replaces() {
        let mut record = RecordValue::new();
        record.insert("b", SqlValue::Int(1));
        record.insert("a", SqlValue::Int(2));
        record.insert("b", SqlValue::Int(3));
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(record.get("b"), Some(&Value::Scalar(SqlValue::Int(3))));
    }

    #[test]
    fn test_paths() {
        let mut record = RecordValue::new();
        record.set_path(&["address", "geo", "lat"], SqlValue::Float(1.5));
        record.set_path(&["address", "city"], SqlValue::Text(String::from("Lyon")));
        assert!(record.has_record_at(&["address", "geo"]));
        assert_eq!(
            record.get_path(&["address", "geo", "lat"]),
            Some(&Value::Scalar(SqlValue::Float(1.5)))
        );
        assert_eq!(record.get("address").and_then(Value::as_record).map(RecordValue::len), Some(2));
        assert!(record.get_path(&["address", "zip"]).is_none());
    }

    #[test]
    fn test_set_path_replaces_scalar_intermediate() {
        let mut record = RecordValue::new().with("author", Value::NULL);
        record.set_path(&["author", "id"], SqlValue::Int(7));
        assert_eq!(
            record.get_path(&["author", "id"]),
            Some(&Value::Scalar(SqlValue::Int(7)))
        );
    }

    #[test]
    fn test_structural_equality() {
        let a: RecordValue = [("x", SqlValue::Int(1))].into_iter().collect();
        let b = RecordValue::new().with("x", SqlValue::Int(1));
        assert_eq!(a, b);
        assert_ne!(a, b.with("y", Value::NULL));
    }

    #[test]
    fn test_remove() {
        let mut record = RecordValue::new().with("x", SqlValue::Int(1));
        assert_eq!(record.remove("x"), Some(Value::Scalar(SqlValue::Int(1))));
        assert!(record.is_empty());
        assert!(record.remove("x").is_none());
    }
}
