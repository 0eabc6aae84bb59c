//! Dynamic values and named-parameter maps.
//!
//! Statement definitions carry their bind values as [`Value`], an owned tagged
//! enum covering the scalar types the layer supports. A [`ParamMap`] is an
//! insertion-ordered `name -> Value` map keyed by placeholder name; keys are
//! accepted with or without the leading `:` and stored without it.

use crate::error::{StanzaError, StanzaResult};
use bytes::BytesMut;
use chrono::{DateTime, Utc};
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use uuid::Uuid;

/// An owned statement parameter value.
///
/// `Null` binds as a true SQL NULL.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
}

impl Value {
    /// Whether this value counts as "empty" for verb inference.
    ///
    /// A row whose primary key is NULL, an empty string, or zero has not been
    /// persisted yet, so a write against it is an INSERT rather than an UPDATE.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            Value::Int(n) => *n == 0,
            _ => false,
        }
    }

    /// Serialize this value to JSON text for serialize-flagged scheme fields.
    pub fn to_json_text(&self) -> StanzaResult<String> {
        let json = match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(v) => serde_json::Value::Bool(*v),
            Value::Int(v) => serde_json::Value::from(*v),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .ok_or_else(|| {
                    StanzaError::Serialization(format!("non-finite float {v} is not valid JSON"))
                })?,
            Value::Text(v) => serde_json::Value::String(v.clone()),
            Value::Bytes(_) => {
                return Err(StanzaError::Serialization(
                    "binary values cannot be serialized to JSON".into(),
                ));
            }
            Value::Timestamp(v) => serde_json::Value::String(v.to_rfc3339()),
            Value::Uuid(v) => serde_json::Value::String(v.to_string()),
            Value::Json(v) => v.clone(),
        };
        serde_json::to_string(&json).map_err(|e| StanzaError::Serialization(e.to_string()))
    }
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql(ty, out),
            Value::Int(v) => {
                // Narrow to the column's width so int2/int4 targets work.
                if *ty == Type::INT2 {
                    (*v as i16).to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    (*v as i32).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::Float(v) => {
                if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::Text(v) => v.to_sql(ty, out),
            Value::Bytes(v) => v.to_sql(ty, out),
            Value::Timestamp(v) => v.to_sql(ty, out),
            Value::Uuid(v) => v.to_sql(ty, out),
            Value::Json(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int(v.into())
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

/// An insertion-ordered map of placeholder name to [`Value`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamMap {
    entries: Vec<(String, Value)>,
}

impl ParamMap {
    /// Create a new empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Strip the optional leading `:` from a placeholder key.
    pub(crate) fn normalize_key(name: &str) -> &str {
        name.strip_prefix(':').unwrap_or(name)
    }

    /// Bind a value under the given placeholder name.
    ///
    /// A repeated name replaces the earlier value; when a subquery's params
    /// are merged into its parent, the later binding wins.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<Value>) {
        let key = Self::normalize_key(name.as_ref());
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key.to_string(), value));
        }
    }

    /// Look up a bound value by placeholder name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let key = Self::normalize_key(name);
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Whether a value is bound under the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of bound parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate placeholder names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Merge another map into this one; colliding names take the other's value.
    pub fn merge(&mut self, other: &ParamMap) {
        for (name, value) in other.iter() {
            self.insert(name, value.clone());
        }
    }

    /// Keep only entries whose name satisfies the predicate.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.entries.retain(|(k, _)| keep(k));
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for ParamMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ParamMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// Build a [`ParamMap`] from `name => value` pairs.
///
/// Keys may be written with or without the leading `:`.
///
/// # Example
/// ```ignore
/// let params = pgstanza::params! { ":id" => 7, "status" => "active" };
/// ```
#[macro_export]
macro_rules! params {
    () => { $crate::ParamMap::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::ParamMap::new();
        $( map.insert($name, $value); )+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_normalization() {
        let mut map = ParamMap::new();
        map.insert(":id", 7i64);
        assert_eq!(map.get("id"), Some(&Value::Int(7)));
        assert_eq!(map.get(":id"), Some(&Value::Int(7)));
    }

    #[test]
    fn test_insert_replaces_existing() {
        let mut map = ParamMap::new();
        map.insert("id", 1i64);
        map.insert(":id", 2i64);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("id"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let map = params! { "b" => 1i64, "a" => 2i64, "c" => 3i64 };
        let names: Vec<&str> = map.names().collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_option_binds_null() {
        let none: Option<i64> = None;
        assert_eq!(Value::from(none), Value::Null);
        assert_eq!(Value::from(Some(5i64)), Value::Int(5));
    }

    #[test]
    fn test_emptiness_for_inference() {
        assert!(Value::Null.is_empty());
        assert!(Value::Text(String::new()).is_empty());
        assert!(Value::Int(0).is_empty());
        assert!(!Value::Int(3).is_empty());
        assert!(!Value::Bool(false).is_empty());
    }

    #[test]
    fn test_json_text_for_serialized_fields() {
        let v = Value::Json(serde_json::json!({"theme": "dark"}));
        assert_eq!(v.to_json_text().unwrap(), r#"{"theme":"dark"}"#);
        assert_eq!(Value::Int(5).to_json_text().unwrap(), "5");
        assert!(Value::Bytes(vec![1, 2]).to_json_text().is_err());
    }
}
