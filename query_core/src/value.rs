//! Bindable values
//!
//! [`QueryValue`] is the closed set of values the compiler knows how to bind.
//! Conversions are type-directed only: a `String` is always bound as text.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    /// Rendered as the literal `NULL`, never bound
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Json(Value),
    Bytes(Vec<u8>),
}

impl QueryValue {
    pub fn is_null(&self) -> bool {
        matches!(self, QueryValue::Null)
    }

    /// JSON form, as `row_to_json` would render the same column
    pub fn to_json(&self) -> Value {
        match self {
            QueryValue::Null => Value::Null,
            QueryValue::Bool(b) => Value::Bool(*b),
            QueryValue::I32(i) => Value::from(*i),
            QueryValue::I64(i) => Value::from(*i),
            QueryValue::F64(f) => Value::from(*f),
            QueryValue::Text(s) => Value::String(s.clone()),
            QueryValue::Uuid(u) => Value::String(u.to_string()),
            QueryValue::Timestamp(t) => Value::String(t.to_rfc3339()),
            QueryValue::Json(v) => v.clone(),
            QueryValue::Bytes(b) => Value::Array(b.iter().map(|x| Value::from(*x)).collect()),
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for QueryValue {
                fn from(value: $ty) -> Self {
                    QueryValue::$variant(value)
                }
            }
        )*
    };
}

impl_from_value! {
    bool => Bool,
    i32 => I32,
    i64 => I64,
    f64 => F64,
    String => Text,
    Uuid => Uuid,
    DateTime<Utc> => Timestamp,
    Value => Json,
    Vec<u8> => Bytes,
}

impl From<i16> for QueryValue {
    fn from(value: i16) -> Self {
        QueryValue::I32(value.into())
    }
}

impl From<f32> for QueryValue {
    fn from(value: f32) -> Self {
        QueryValue::F64(value.into())
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<&String> for QueryValue {
    fn from(value: &String) -> Self {
        QueryValue::Text(value.clone())
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(QueryValue::Null)
    }
}

/// Column → value map used as the input of insert and update
///
/// Ordered by column name so the same map always compiles to the same
/// statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    fields: BTreeMap<String, QueryValue>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<QueryValue>) {
        self.fields.insert(column.into(), value.into());
    }

    pub fn remove(&mut self, column: &str) -> Option<QueryValue> {
        self.fields.remove(column)
    }

    pub fn get(&self, column: &str) -> Option<&QueryValue> {
        self.fields.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

impl<K: Into<String>, V: Into<QueryValue>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (column, value) in iter {
            map.insert(column, value);
        }
        map
    }
}
