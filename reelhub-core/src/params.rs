//! Request parameters sent to the backend API.
//!
//! Parameters are kept in a `BTreeMap`, so the same logical set of
//! parameters always iterates (and serializes) in the same order no matter
//! how the caller built it. Cache keys rely on this.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A scalar parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    /// Only for values above `i64::MAX`; smaller unsigned values are `Integer`.
    Unsigned(u64),
    Float(f64),
    String(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Integer(v) => write!(f, "{}", v),
            ParamValue::Unsigned(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::String(v) => f.write_str(v),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Integer(v.into())
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Integer(v)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Integer(v.into())
    }
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(ParamValue::Unsigned(v), ParamValue::Integer)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        // usize is at most 64 bits on supported targets.
        ParamValue::from(v as u64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::String(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::String(v)
    }
}

/// Parameter mapping for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestParams(BTreeMap<String, ParamValue>);

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any iterator of key/value pairs. Later duplicates win.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<ParamValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Insert only when a value is present. Empty strings count as absent,
    /// matching how unset filters arrive from a query string.
    pub fn insert_opt<V: Into<ParamValue>>(&mut self, key: impl Into<String>, value: Option<V>) {
        if let Some(value) = value {
            let value = value.into();
            if matches!(&value, ParamValue::String(s) if s.trim().is_empty()) {
                return;
            }
            self.0.insert(key.into(), value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Deterministic serialization used for cache key derivation.
    ///
    /// Keys appear in sorted order and values keep their JSON type, so
    /// `{"limit": 10}` and `{"limit": "10"}` produce different strings.
    /// Non-finite floats have no JSON form and are written as
    /// `{"float": "NaN"}` (or `inf`/`-inf`), which no other value can produce.
    pub fn canonical(&self) -> String {
        let tagged: serde_json::Map<String, serde_json::Value> = self
            .0
            .iter()
            .map(|(key, value)| (key.clone(), canonical_value(value)))
            .collect();
        serde_json::Value::Object(tagged).to_string()
    }
}

fn canonical_value(value: &ParamValue) -> serde_json::Value {
    match value {
        ParamValue::Bool(v) => serde_json::Value::Bool(*v),
        ParamValue::Integer(v) => serde_json::Value::from(*v),
        ParamValue::Unsigned(v) => serde_json::Value::from(*v),
        ParamValue::Float(v) if v.is_finite() => serde_json::Value::from(*v),
        ParamValue::Float(v) => serde_json::json!({ "float": v.to_string() }),
        ParamValue::String(v) => serde_json::Value::String(v.clone()),
    }
}

impl<K, V> FromIterator<(K, V)> for RequestParams
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}
