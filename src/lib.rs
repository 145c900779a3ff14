//! Renders geohash grid aggregation buckets as Mapbox vector tiles.
//!
//! A [`TileRequest`] describes the tile to produce. Its
//! [`envelope`](TileRequest::envelope) is the area to aggregate over, and
//! [`make_tile`](TileRequest::make_tile) turns the returned buckets into
//! encoded tile bytes with one feature per bucket.

pub mod bucket;
pub mod compression;
pub mod envelope;
pub mod error;
pub mod geometry;
pub mod mercator;
pub mod proto;
pub mod request;
pub mod tile;
pub mod writer;

pub use bucket::{Bucket, PropertyValue, load_buckets};
pub use compression::Compression;
pub use error::{Result, TileError};
pub use mercator::{BoundingBox, TileId};
pub use request::{DEFAULT_LAYER, TileRequest};
pub use tile::{Feature, GeomType, Layer, Tile, Value};

/// Width and height of the tile coordinate space.
pub const EXTENT: u32 = 4096;

/// Deepest zoom at which any coordinate on earth projects into `i32` pixels
/// relative to any tile.
pub const MAX_ZOOM: u8 = 18;

pub const MAX_PRECISION: u8 = 12;
