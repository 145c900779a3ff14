//! Search envelopes snapped to the geohash grid.
//!
//! A tile's bounding box is widened to the edges of the geohash cells that
//! contain its corners, then pushed out by `margin` whole cells on every
//! side so that grid aggregation cells straddling the tile edge are still
//! returned by the query.

use geo_types::{Coord, Rect};
use geohash::GeohashError;

use crate::{error::Result, mercator::BoundingBox};

// geohash folds 180 and 90 onto the opposite edge of the grid, so the east
// and north limits sit just inside the last cell.
const MAX_LON: f64 = 180.0 - 1e-9;
const MAX_LAT: f64 = 90.0 - 1e-9;

/// Bounds of a geohash cell. An empty hash is rejected rather than read as
/// the whole world.
pub fn cell_bounds(hash: &str) -> Result<Rect<f64>, GeohashError> {
    if hash.is_empty() {
        return Err(GeohashError::InvalidLength(0));
    }
    geohash::decode_bbox(hash)
}

/// Geohash of the cell holding a position, clamped onto the globe.
pub fn encode_cell(lon: f64, lat: f64, precision: usize) -> Result<String> {
    let position = Coord {
        x: lon.clamp(-180.0, MAX_LON),
        y: lat.clamp(-90.0, MAX_LAT),
    };
    Ok(geohash::encode(position, precision)?)
}

/// Moves `rows` cells north (negative is south) and `columns` cells east
/// (negative is west) from `hash`, staying at the same precision.
///
/// Positions past the poles or the antimeridian are clamped to the edge
/// cell.
pub fn offset_cell(hash: &str, rows: i64, columns: i64) -> Result<String> {
    let cell = cell_bounds(hash)?;
    let center = cell.center();
    let lat = center.y + rows as f64 * cell.height();
    let lon = center.x + columns as f64 * cell.width();

    encode_cell(lon, lat, hash.len())
}

pub fn envelope(bbox: &BoundingBox, precision: usize, margin: u32) -> Result<BoundingBox> {
    let margin = margin as i64;
    let top_left = encode_cell(bbox.min_lon, bbox.max_lat, precision)?;
    let bottom_right = encode_cell(bbox.max_lon, bbox.min_lat, precision)?;

    let top_left = cell_bounds(&offset_cell(&top_left, margin, -margin)?)?;
    let bottom_right = cell_bounds(&offset_cell(&bottom_right, -margin, margin)?)?;

    Ok(BoundingBox {
        min_lon: top_left.min().x,
        min_lat: bottom_right.min().y,
        max_lon: bottom_right.max().x,
        max_lat: top_left.max().y,
    })
}
