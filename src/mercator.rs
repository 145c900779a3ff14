use std::f64::consts::PI;

use serde::Serialize;

use crate::{
    EXTENT, MAX_ZOOM,
    error::{Result, TileError},
    geometry::Pixel,
};

/// Geographic rectangle in degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.min_lon <= other.min_lon
            && self.min_lat <= other.min_lat
            && self.max_lon >= other.max_lon
            && self.max_lat >= other.max_lat
    }
}

impl From<geo_types::Rect<f64>> for BoundingBox {
    fn from(rect: geo_types::Rect<f64>) -> Self {
        BoundingBox {
            min_lon: rect.min().x,
            min_lat: rect.min().y,
            max_lon: rect.max().x,
            max_lat: rect.max().y,
        }
    }
}

/// Slippy map tile address, row 0 at the north edge.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub struct TileId {
    pub zoom: u8,
    pub column: u32,
    pub row: u32,
}

impl TileId {
    pub fn new(zoom: u8, column: u32, row: u32) -> Result<Self> {
        let tile = TileId { zoom, column, row };
        if zoom > MAX_ZOOM || !tile.is_valid() {
            return Err(TileError::InvalidTile { zoom, column, row });
        }

        Ok(tile)
    }

    fn is_valid(&self) -> bool {
        self.row < self.limit() && self.column < self.limit()
    }

    fn limit(&self) -> u32 {
        1u32 << self.zoom
    }

    fn scale(&self) -> f64 {
        2.0_f64.powi(self.zoom as i32)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let n = self.scale();
        BoundingBox {
            min_lon: column_to_lon(self.column as f64, n),
            min_lat: row_to_lat((self.row + 1) as f64, n),
            max_lon: column_to_lon((self.column + 1) as f64, n),
            max_lat: row_to_lat(self.row as f64, n),
        }
    }

    /// Fractional tile position of a coordinate at this tile's zoom.
    ///
    /// No wrapping is applied across the antimeridian.
    pub fn tile_fraction(&self, lon: f64, lat: f64) -> (f64, f64) {
        let n = self.scale();
        let x = n * (lon / 360.0 + 0.5);
        let sin = lat.to_radians().sin();
        let y = n * (0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI);
        (x, y)
    }

    /// Projects a coordinate into this tile's pixel space. Results outside
    /// `0..EXTENT` are kept as is.
    pub fn to_pixel(&self, lon: f64, lat: f64) -> Pixel {
        let (x, y) = self.tile_fraction(lon, lat);
        let extent = EXTENT as f64;
        Pixel {
            x: ((x - self.column as f64) * extent).floor() as i32,
            y: ((y - self.row as f64) * extent).floor() as i32,
        }
    }
}

fn column_to_lon(column: f64, n: f64) -> f64 {
    column / n * 360.0 - 180.0
}

fn row_to_lat(row: f64, n: f64) -> f64 {
    (PI * (1.0 - 2.0 * row / n)).sinh().atan().to_degrees()
}
