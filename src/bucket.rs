use std::io::Read;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Result, TileError};

/// Field holding the geohash of an aggregation cell.
pub const KEY_FIELD: &str = "key";

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Number(f64),
    Text(String),
    /// Anything else an aggregation can return; never written to a tile.
    Other,
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::Number(n)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue::Number(n as f64)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Text(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Text(s)
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Number(n) => n.as_f64().map_or(PropertyValue::Other, PropertyValue::Number),
            Value::String(s) => PropertyValue::Text(s),
            _ => PropertyValue::Other,
        }
    }
}

/// One geohash grid aggregation cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bucket {
    key: Option<String>,
    properties: Vec<(String, PropertyValue)>,
}

impl Bucket {
    pub fn new<S: Into<String>>(key: S) -> Self {
        Bucket {
            key: Some(key.into()),
            properties: Vec::new(),
        }
    }

    /// Adds a property, replacing any previous value of the same name.
    /// The reserved `key` name is ignored.
    pub fn with_property<S, V>(mut self, name: S, value: V) -> Self
    where
        S: Into<String>,
        V: Into<PropertyValue>,
    {
        let name = name.into();
        if name == KEY_FIELD {
            return self;
        }

        let value = value.into();
        match self.properties.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.properties.push((name, value)),
        }
        self
    }

    pub fn from_json(object: Map<String, Value>) -> Self {
        let mut bucket = Bucket::default();
        for (name, value) in object {
            if name == KEY_FIELD {
                if let Value::String(key) = value {
                    bucket.key = Some(key);
                }
            } else {
                bucket.properties.push((name, value.into()));
            }
        }
        bucket
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Property names in insertion order, excluding `key`.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(n, _)| n.as_str())
    }
}

impl<'de> Deserialize<'de> for Bucket {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let object = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Bucket::from_json(object))
    }
}

/// Reads buckets from either a bare JSON array or a search response with a
/// bucket aggregation under `aggregations`.
pub fn load_buckets<R: Read>(reader: R) -> Result<Vec<Bucket>> {
    let document: Value = serde_json::from_reader(reader)?;
    buckets_from_value(document)
}

pub fn buckets_from_value(document: Value) -> Result<Vec<Bucket>> {
    let buckets = match document {
        Value::Array(buckets) => buckets,
        Value::Object(mut response) => {
            let aggregations = match response.remove("aggregations") {
                Some(Value::Object(aggregations)) => aggregations,
                _ => return Err(TileError::UnrecognizedBuckets),
            };

            aggregations
                .into_iter()
                .find_map(|(_, aggregation)| match aggregation {
                    Value::Object(mut aggregation) => match aggregation.remove("buckets") {
                        Some(Value::Array(buckets)) => Some(buckets),
                        _ => None,
                    },
                    _ => None,
                })
                .ok_or(TileError::UnrecognizedBuckets)?
        }
        _ => return Err(TileError::UnrecognizedBuckets),
    };

    buckets
        .into_iter()
        .map(|bucket| match bucket {
            Value::Object(object) => Ok(Bucket::from_json(object)),
            _ => Err(TileError::UnrecognizedBuckets),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_property_order_and_strips_key() {
        let bucket: Bucket = serde_json::from_value(json!({
            "zeta": 1,
            "key": "u1hx",
            "alpha": "a",
            "mid": 2.5
        }))
        .unwrap();

        assert_eq!(bucket.key(), Some("u1hx"));
        assert_eq!(
            bucket.property_names().collect::<Vec<_>>(),
            vec!["zeta", "alpha", "mid"]
        );
        assert_eq!(bucket.property("zeta"), Some(&PropertyValue::Number(1.0)));
        assert_eq!(bucket.property("alpha"), Some(&PropertyValue::Text("a".into())));
        assert_eq!(bucket.property("key"), None);
    }

    #[test]
    fn non_scalar_values_are_other() {
        let bucket: Bucket = serde_json::from_value(json!({
            "key": "u1hx",
            "flag": true,
            "nested": { "value": 3 },
            "list": [1, 2],
            "nothing": null
        }))
        .unwrap();

        for name in ["flag", "nested", "list", "nothing"] {
            assert_eq!(bucket.property(name), Some(&PropertyValue::Other));
        }
    }

    #[test]
    fn non_string_key_is_missing() {
        let bucket: Bucket = serde_json::from_value(json!({ "key": 12, "doc_count": 1 })).unwrap();
        assert_eq!(bucket.key(), None);
    }

    #[test]
    fn builder_ignores_reserved_key() {
        let bucket = Bucket::new("u1hx")
            .with_property("key", "other")
            .with_property("doc_count", 3.0)
            .with_property("doc_count", 4.0);

        assert_eq!(bucket.key(), Some("u1hx"));
        assert_eq!(bucket.property_names().count(), 1);
        assert_eq!(bucket.property("doc_count"), Some(&PropertyValue::Number(4.0)));
    }

    #[test]
    fn loads_bare_array() {
        let input = br#"[{"key": "u1hx", "doc_count": 3}, {"key": "u1hz", "doc_count": 5}]"#;
        let buckets = load_buckets(&input[..]).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[1].key(), Some("u1hz"));
    }

    #[test]
    fn loads_search_response() {
        let response = json!({
            "took": 3,
            "hits": { "total": 0, "hits": [] },
            "aggregations": {
                "grid": {
                    "buckets": [
                        { "key": "u1hx", "doc_count": 3 }
                    ]
                }
            }
        });
        let buckets = buckets_from_value(response).unwrap();
        assert_eq!(buckets, vec![Bucket::new("u1hx").with_property("doc_count", 3.0)]);
    }

    #[test]
    fn rejects_unknown_shapes() {
        assert!(matches!(
            buckets_from_value(json!({ "hits": [] })),
            Err(TileError::UnrecognizedBuckets)
        ));
        assert!(matches!(
            buckets_from_value(json!([1, 2])),
            Err(TileError::UnrecognizedBuckets)
        ));
        assert!(matches!(
            load_buckets(&b"not json"[..]),
            Err(TileError::Json(_))
        ));
    }
}
