use std::{fmt, str::FromStr};

use crate::{
    EXTENT,
    error::TileError,
    geometry::{self, Pixel},
};

pub const LAYER_VERSION: u32 = 2;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GeomType {
    Point = 1,
    Polygon = 3,
}

impl FromStr for GeomType {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "point" => Ok(GeomType::Point),
            "polygon" => Ok(GeomType::Polygon),
            _ => Err(TileError::UnknownGeometryType(s.to_string())),
        }
    }
}

impl fmt::Display for GeomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeomType::Point => write!(f, "point"),
            GeomType::Polygon => write!(f, "polygon"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Double(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geom_type: GeomType,
    pub geometry: Vec<u32>,
    /// Pairs of indices into the owning layer's keys and values.
    pub tags: Vec<u32>,
}

impl Feature {
    fn new(geom_type: GeomType, geometry: Vec<u32>) -> Self {
        Feature {
            geom_type,
            geometry,
            tags: Vec::new(),
        }
    }

    pub fn points(points: &[Pixel]) -> Self {
        let mut geometry = Vec::with_capacity(1 + points.len() * 2);
        geometry::encode_points(&mut geometry, Pixel::default(), points);
        Feature::new(GeomType::Point, geometry)
    }

    pub fn polygon(ring: &[Pixel]) -> Self {
        let mut geometry = Vec::with_capacity(3 + ring.len() * 2);
        geometry::encode_ring(&mut geometry, Pixel::default(), ring);
        Feature::new(GeomType::Polygon, geometry)
    }

    pub fn push_tag(&mut self, key: u32, value: u32) {
        self.tags.push(key);
        self.tags.push(value);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    pub version: u32,
    pub extent: u32,
    pub features: Vec<Feature>,
    pub keys: Vec<String>,
    pub values: Vec<Value>,
}

impl Layer {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Layer {
            name: name.into(),
            version: LAYER_VERSION,
            extent: EXTENT,
            features: Vec::new(),
            keys: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn add_feature(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    /// Appends a value and returns its index. Equal values are stored again.
    pub fn push_value(&mut self, value: Value) -> u32 {
        self.values.push(value);
        (self.values.len() - 1) as u32
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tile {
    pub layers: Vec<Layer>,
}

impl Tile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_layer(&mut self, layer: Layer) -> &mut Layer {
        self.layers.push(layer);
        let last = self.layers.len() - 1;
        &mut self.layers[last]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tile_with_one_layer() {
        let mut tile = Tile::new();
        let layer = tile.add_layer(Layer::new("test"));
        assert_eq!(layer.version, 2);
        assert_eq!(layer.extent, 4096);
        assert!(layer.features.is_empty());
        assert_eq!(tile.layers.len(), 1);
    }

    #[test]
    fn feature_geometry_is_encoded_from_origin() {
        let mut tile = Tile::new();
        let layer = tile.add_layer(Layer::new("stations"));
        layer.add_feature(Feature::points(&[Pixel::new(25, 17)]));
        layer.add_feature(Feature::points(&[Pixel::new(5, 7), Pixel::new(3, 2)]));
        layer.add_feature(Feature::polygon(&[
            Pixel::new(3, 6),
            Pixel::new(8, 12),
            Pixel::new(20, 34),
        ]));

        let features = &tile.layers[0].features;
        assert_eq!(features[0].geometry, vec![9, 50, 34]);
        assert_eq!(features[1].geometry, vec![17, 10, 14, 3, 9]);
        assert_eq!(features[2].geometry, vec![9, 6, 12, 18, 10, 12, 24, 44, 15]);
        assert_eq!(features[2].geom_type, GeomType::Polygon);
    }

    #[test]
    fn values_are_not_deduplicated() {
        let mut layer = Layer::new("grid");
        assert_eq!(layer.push_value(Value::Double(1.0)), 0);
        assert_eq!(layer.push_value(Value::Double(1.0)), 1);
        assert_eq!(layer.push_value(Value::String("a".into())), 2);
        assert_eq!(layer.values.len(), 3);
    }

    #[test]
    fn tags_alternate_key_and_value() {
        let mut feature = Feature::points(&[Pixel::default()]);
        feature.push_tag(0, 4);
        feature.push_tag(1, 5);
        assert_eq!(feature.tags, vec![0, 4, 1, 5]);
    }

    #[test]
    fn parses_geometry_type() {
        assert_eq!("point".parse::<GeomType>().unwrap(), GeomType::Point);
        assert_eq!("Polygon".parse::<GeomType>().unwrap(), GeomType::Polygon);
        assert!(matches!(
            "linestring".parse::<GeomType>(),
            Err(TileError::UnknownGeometryType(_))
        ));
    }
}
