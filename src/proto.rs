//! Vector tile messages for decoding tiles with prost.
//!
//! See <https://github.com/mapbox/vector-tile-spec/tree/master/2.1>.

use prost::{Enumeration, Message};

#[derive(Clone, PartialEq, Message)]
pub struct Tile {
    #[prost(message, repeated, tag = "3")]
    pub layers: Vec<Layer>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Layer {
    #[prost(uint32, required, tag = "15", default = "1")]
    pub version: u32,
    #[prost(string, required, tag = "1")]
    pub name: String,
    #[prost(message, repeated, tag = "2")]
    pub features: Vec<Feature>,
    #[prost(string, repeated, tag = "3")]
    pub keys: Vec<String>,
    #[prost(message, repeated, tag = "4")]
    pub values: Vec<Value>,
    #[prost(uint32, optional, tag = "5", default = "4096")]
    pub extent: Option<u32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Feature {
    #[prost(uint64, optional, tag = "1", default = "0")]
    pub id: Option<u64>,
    /// Alternating key and value indices into the layer's dictionaries.
    #[prost(uint32, repeated, tag = "2")]
    pub tags: Vec<u32>,
    #[prost(enumeration = "GeomType", optional, tag = "3", default = "Unknown")]
    pub r#type: Option<i32>,
    #[prost(uint32, repeated, tag = "4")]
    pub geometry: Vec<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enumeration)]
#[repr(i32)]
pub enum GeomType {
    Unknown = 0,
    Point = 1,
    Linestring = 2,
    Polygon = 3,
}

/// Exactly one field is set in a well formed value.
#[derive(Clone, PartialEq, Message)]
pub struct Value {
    #[prost(string, optional, tag = "1")]
    pub string_value: Option<String>,
    #[prost(float, optional, tag = "2")]
    pub float_value: Option<f32>,
    #[prost(double, optional, tag = "3")]
    pub double_value: Option<f64>,
    #[prost(int64, optional, tag = "4")]
    pub int_value: Option<i64>,
    #[prost(uint64, optional, tag = "5")]
    pub uint_value: Option<u64>,
    #[prost(sint64, optional, tag = "6")]
    pub sint_value: Option<i64>,
    #[prost(bool, optional, tag = "7")]
    pub bool_value: Option<bool>,
}

impl Value {
    /// Renders whichever field is set, or `null` when none is.
    pub fn display(&self) -> String {
        if let Some(s) = &self.string_value {
            format!("{s:?}")
        } else if let Some(n) = self.double_value {
            n.to_string()
        } else if let Some(n) = self.float_value {
            n.to_string()
        } else if let Some(n) = self.int_value.or(self.sint_value) {
            n.to_string()
        } else if let Some(n) = self.uint_value {
            n.to_string()
        } else if let Some(b) = self.bool_value {
            b.to_string()
        } else {
            "null".to_string()
        }
    }
}

impl Layer {
    /// Resolves a feature's tags into `(key, value)` pairs, skipping
    /// indices that fall outside the layer's dictionaries.
    pub fn properties<'a>(
        &'a self,
        feature: &'a Feature,
    ) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        feature.tags.chunks_exact(2).filter_map(move |pair| {
            let key = self.keys.get(pair[0] as usize)?;
            let value = self.values.get(pair[1] as usize)?;
            Some((key.as_str(), value))
        })
    }
}

pub fn decode_tile(bytes: &[u8]) -> Result<Tile, prost::DecodeError> {
    Tile::decode(bytes)
}
