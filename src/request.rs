use log::{debug, trace};

use crate::{
    MAX_PRECISION,
    bucket::{Bucket, PropertyValue},
    envelope,
    error::{Result, TileError},
    geometry::Pixel,
    mercator::{BoundingBox, TileId},
    tile::{Feature, GeomType, Layer, Tile, Value},
    writer,
};

pub const DEFAULT_LAYER: &str = "grid";

/// A single tile to render from geohash grid buckets.
///
/// The tile's geographic bounds and the geohash aligned search envelope are
/// computed once on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRequest {
    tile: TileId,
    precision: u8,
    geom_type: GeomType,
    margin: u32,
    bounding_box: BoundingBox,
    envelope: BoundingBox,
}

impl TileRequest {
    pub fn new(
        zoom: u8,
        x: u32,
        y: u32,
        precision: u8,
        geom_type: GeomType,
        margin: u32,
    ) -> Result<Self> {
        if !(1..=MAX_PRECISION).contains(&precision) {
            return Err(TileError::InvalidPrecision(precision));
        }

        let tile = TileId::new(zoom, x, y)?;
        let bounding_box = tile.bounding_box();
        let envelope = envelope::envelope(&bounding_box, precision as usize, margin)?;
        debug!(
            "tile {}/{}/{} precision {} margin {} envelope {:?}",
            zoom,
            x,
            y,
            precision,
            margin,
            envelope.to_array()
        );

        Ok(Self {
            tile,
            precision,
            geom_type,
            margin,
            bounding_box,
            envelope,
        })
    }

    pub fn tile(&self) -> TileId {
        self.tile
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn geom_type(&self) -> GeomType {
        self.geom_type
    }

    pub fn margin(&self) -> u32 {
        self.margin
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    /// Area to query for buckets, snapped outward to geohash cells.
    pub fn envelope(&self) -> &BoundingBox {
        &self.envelope
    }

    pub fn to_pixel(&self, lon: f64, lat: f64) -> Pixel {
        self.tile.to_pixel(lon, lat)
    }

    fn cell_feature(&self, cell: &BoundingBox) -> Feature {
        match self.geom_type {
            GeomType::Point => {
                let center = self.to_pixel(
                    (cell.min_lon + cell.max_lon) / 2.0,
                    (cell.min_lat + cell.max_lat) / 2.0,
                );
                Feature::points(&[center])
            }
            GeomType::Polygon => Feature::polygon(&[
                self.to_pixel(cell.min_lon, cell.max_lat),
                self.to_pixel(cell.max_lon, cell.max_lat),
                self.to_pixel(cell.max_lon, cell.min_lat),
                self.to_pixel(cell.min_lon, cell.min_lat),
            ]),
        }
    }

    /// Builds one layer holding a feature per bucket.
    ///
    /// Attribute keys come from the first bucket only; properties other
    /// buckets introduce are dropped. Fails on the first bucket without a
    /// decodable geohash key.
    pub fn build_layer(&self, buckets: &[Bucket], name: &str) -> Result<Layer> {
        let mut layer = Layer::new(name);
        if let Some(first) = buckets.first() {
            layer.keys = first.property_names().map(str::to_string).collect();
        }

        for (index, bucket) in buckets.iter().enumerate() {
            let key = bucket.key().ok_or(TileError::MissingKey { index })?;
            let cell = envelope::cell_bounds(key).map_err(|source| TileError::InvalidGeohash {
                key: key.to_string(),
                source,
            })?;
            let mut feature = self.cell_feature(&cell.into());

            for key_index in 0..layer.keys.len() {
                let property = layer.keys[key_index].as_str();
                let value = match bucket.property(property) {
                    Some(PropertyValue::Number(n)) => Value::Double(*n),
                    Some(PropertyValue::Text(s)) => Value::String(s.clone()),
                    Some(PropertyValue::Other) => {
                        trace!("bucket {index} property '{property}' is not a number or string");
                        continue;
                    }
                    None => continue,
                };

                let value_index = layer.push_value(value);
                feature.push_tag(key_index as u32, value_index);
            }

            layer.add_feature(feature);
        }

        Ok(layer)
    }

    pub fn build_tile(&self, buckets: &[Bucket], name: &str) -> Result<Tile> {
        let mut tile = Tile::new();
        tile.add_layer(self.build_layer(buckets, name)?);
        Ok(tile)
    }

    /// Renders the buckets into an encoded vector tile.
    pub fn make_tile(&self, buckets: &[Bucket], name: &str) -> Result<Vec<u8>> {
        let tile = self.build_tile(buckets, name)?;
        let bytes = writer::encode_tile(&tile);

        let layer = &tile.layers[0];
        debug!(
            "tile {}/{}/{} layer '{}': {} features, {} keys, {} values, {} bytes",
            self.tile.zoom,
            self.tile.column,
            self.tile.row,
            layer.name,
            layer.features.len(),
            layer.keys.len(),
            layer.values.len(),
            bytes.len()
        );

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(geom_type: GeomType) -> TileRequest {
        TileRequest::new(10, 524, 340, 5, geom_type, 0).unwrap()
    }

    #[test]
    fn rejects_bad_precision() {
        for precision in [0, 13, 40] {
            assert!(matches!(
                TileRequest::new(3, 1, 1, precision, GeomType::Point, 0),
                Err(TileError::InvalidPrecision(p)) if p == precision
            ));
        }
        assert!(TileRequest::new(3, 1, 1, 12, GeomType::Point, 0).is_ok());
    }

    #[test]
    fn rejects_bad_tile() {
        assert!(matches!(
            TileRequest::new(3, 8, 1, 4, GeomType::Point, 0),
            Err(TileError::InvalidTile { .. })
        ));
    }

    #[test]
    fn envelope_covers_bounding_box() {
        let request = TileRequest::new(10, 524, 340, 5, GeomType::Point, 2).unwrap();
        assert!(request.envelope().contains(request.bounding_box()));
    }

    #[test]
    fn empty_buckets() {
        let layer = request(GeomType::Point).build_layer(&[], "grid").unwrap();
        assert_eq!(layer.name, "grid");
        assert!(layer.features.is_empty());
        assert!(layer.keys.is_empty());
        assert!(layer.values.is_empty());
    }

    #[test]
    fn keys_come_from_first_bucket() {
        let buckets = vec![
            Bucket::new("u0uv3")
                .with_property("doc_count", 3.0)
                .with_property("label", "a"),
            Bucket::new("u0uv6")
                .with_property("label", "b")
                .with_property("extra", 9.0)
                .with_property("doc_count", 4.0),
            Bucket::new("u0uv9").with_property("extra", 1.0),
        ];

        let layer = request(GeomType::Point).build_layer(&buckets, "grid").unwrap();
        assert_eq!(layer.keys, vec!["doc_count", "label"]);
        assert_eq!(layer.features.len(), 3);
        assert_eq!(
            layer.values,
            vec![
                Value::Double(3.0),
                Value::String("a".into()),
                Value::Double(4.0),
                Value::String("b".into()),
            ]
        );
        assert_eq!(layer.features[0].tags, vec![0, 0, 1, 1]);
        assert_eq!(layer.features[1].tags, vec![0, 2, 1, 3]);
        assert!(layer.features[2].tags.is_empty());
    }

    #[test]
    fn equal_values_are_repeated() {
        let buckets: Vec<_> = ["u0uv3", "u0uv6", "u0uv9"]
            .into_iter()
            .map(|key| Bucket::new(key).with_property("doc_count", 1.0))
            .collect();

        let layer = request(GeomType::Point).build_layer(&buckets, "grid").unwrap();
        assert_eq!(layer.values.len(), 3);
        for (i, feature) in layer.features.iter().enumerate() {
            assert_eq!(feature.tags, vec![0, i as u32]);
        }
    }

    #[test]
    fn other_values_are_skipped() {
        let buckets = vec![
            Bucket::new("u0uv3")
                .with_property("nested", PropertyValue::Other)
                .with_property("doc_count", 2.0),
        ];

        let layer = request(GeomType::Point).build_layer(&buckets, "grid").unwrap();
        assert_eq!(layer.keys, vec!["nested", "doc_count"]);
        assert_eq!(layer.values, vec![Value::Double(2.0)]);
        assert_eq!(layer.features[0].tags, vec![1, 0]);
    }

    #[test]
    fn point_feature_at_cell_center() {
        let request = request(GeomType::Point);
        let layer = request
            .build_layer(&[Bucket::new("u0uv3")], "grid")
            .unwrap();

        let cell: BoundingBox = geohash::decode_bbox("u0uv3").unwrap().into();
        let center = request.to_pixel(
            (cell.min_lon + cell.max_lon) / 2.0,
            (cell.min_lat + cell.max_lat) / 2.0,
        );

        let feature = &layer.features[0];
        assert_eq!(feature.geom_type, GeomType::Point);
        assert_eq!(feature.geometry, Feature::points(&[center]).geometry);
    }

    #[test]
    fn polygon_feature_is_clockwise_cell() {
        let request = request(GeomType::Polygon);
        let layer = request
            .build_layer(&[Bucket::new("u0uv3")], "grid")
            .unwrap();

        let feature = &layer.features[0];
        assert_eq!(feature.geom_type, GeomType::Polygon);
        // MoveTo(1), 2 params, LineTo(3), 6 params, ClosePath
        assert_eq!(feature.geometry.len(), 11);
        assert_eq!(feature.geometry[0], 9);
        assert_eq!(feature.geometry[3], 26);
        assert_eq!(feature.geometry[10], 15);
    }

    #[test]
    fn missing_key_aborts() {
        let buckets = vec![Bucket::new("u0uv3"), Bucket::default()];
        assert!(matches!(
            request(GeomType::Point).make_tile(&buckets, "grid"),
            Err(TileError::MissingKey { index: 1 })
        ));
    }

    #[test]
    fn invalid_geohash_aborts() {
        let buckets = vec![Bucket::new("u0uv3"), Bucket::new("not-a-hash")];
        match request(GeomType::Polygon).make_tile(&buckets, "grid") {
            Err(TileError::InvalidGeohash { key, .. }) => assert_eq!(key, "not-a-hash"),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn empty_key_aborts() {
        let buckets = vec![Bucket::new("u0uv3"), Bucket::new("")];
        match request(GeomType::Point).make_tile(&buckets, "grid") {
            Err(TileError::InvalidGeohash { key, .. }) => assert!(key.is_empty()),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn east_edge_request_covers_tile() {
        let request = TileRequest::new(1, 1, 0, 3, GeomType::Point, 0).unwrap();
        let envelope = request.envelope();
        assert_eq!(envelope.max_lon, 180.0);
        assert!(envelope.min_lon < envelope.max_lon);
        assert!(envelope.contains(request.bounding_box()));
    }
}
