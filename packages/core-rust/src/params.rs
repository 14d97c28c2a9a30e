//! Request data: URI parameters, body and query values, and their merge.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Named values captured from the URI by the pattern that matched.
///
/// Keys are unique. Uses `BTreeMap` for deterministic iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UriParams(BTreeMap<String, String>);

impl UriParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for UriParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for UriParams {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A single query or body parameter value.
///
/// Form and query encodings allow nesting through bracket keys
/// (`tags[]=a`, `unit[test]=b`), so values are a small tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestValue {
    String(String),
    List(Vec<RequestValue>),
    Map(BTreeMap<String, RequestValue>),
}

impl RequestValue {
    /// Returns the scalar string, or `None` for lists and maps.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for RequestValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for RequestValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<serde_json::Value> for RequestValue {
    /// Scalars become strings (`null` becomes the empty string), arrays
    /// become lists and objects become maps.
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::String(String::new()),
            serde_json::Value::Bool(b) => Self::String(b.to_string()),
            serde_json::Value::Number(n) => Self::String(n.to_string()),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(fields) => Self::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Query or body parameters of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestData(BTreeMap<String, RequestValue>);

impl RequestData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds request data from decoded `key=value` pairs.
    ///
    /// `key[]` appends to a list and `key[sub]` sets an entry of a map.
    /// A plain key that appears twice keeps the last value.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut data = Self::new();
        for (key, value) in pairs {
            data.insert_pair(key.as_ref(), value.into());
        }
        data
    }

    fn insert_pair(&mut self, key: &str, value: String) {
        let Some((name, rest)) = split_bracket_key(key) else {
            self.0.insert(key.to_string(), RequestValue::String(value));
            return;
        };

        let slot = self.0.entry(name.to_string());
        if rest.is_empty() {
            match slot.or_insert_with(|| RequestValue::List(Vec::new())) {
                RequestValue::List(items) => items.push(RequestValue::String(value)),
                other => *other = RequestValue::List(vec![RequestValue::String(value)]),
            }
        } else {
            match slot.or_insert_with(|| RequestValue::Map(BTreeMap::new())) {
                RequestValue::Map(fields) => {
                    fields.insert(rest.to_string(), RequestValue::String(value));
                }
                other => {
                    let mut fields = BTreeMap::new();
                    fields.insert(rest.to_string(), RequestValue::String(value));
                    *other = RequestValue::Map(fields);
                }
            }
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RequestValue>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RequestValue> {
        self.0.get(key)
    }

    /// Returns the value for `key` when it is a scalar string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(RequestValue::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RequestValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overlays URI parameters onto this data.
    ///
    /// A URI parameter replaces the same-named entry wholesale, including
    /// nested lists and maps. Keys only present here are kept.
    #[must_use]
    pub fn merge_uri_params(mut self, params: UriParams) -> Self {
        for (key, value) in params {
            self.0.insert(key, RequestValue::String(value));
        }
        self
    }
}

impl<K: Into<String>, V: Into<RequestValue>> FromIterator<(K, V)> for RequestData {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for RequestData {
    fn from(fields: serde_json::Map<String, serde_json::Value>) -> Self {
        fields.into_iter().collect()
    }
}

/// Splits `name[rest]` into `("name", "rest")`.
fn split_bracket_key(key: &str) -> Option<(&str, &str)> {
    let open = key.find('[')?;
    let inner = key[open + 1..].strip_suffix(']')?;
    if open == 0 {
        return None;
    }
    Some((&key[..open], inner))
}
