use crate::MAX_ZOOM;

pub type Result<T, E = TileError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum TileError {
    #[error("geohash precision {0} is outside 1..=12")]
    InvalidPrecision(u8),
    #[error("tile {zoom}/{column}/{row} is not a valid tile (max zoom {max})", max = MAX_ZOOM)]
    InvalidTile { zoom: u8, column: u32, row: u32 },
    #[error("unknown geometry type '{0}', expected 'point' or 'polygon'")]
    UnknownGeometryType(String),
    #[error("unknown compression '{0}', expected 'none', 'gzip' or 'brotli'")]
    UnknownCompression(String),
    #[error("bucket {index} has no 'key' field")]
    MissingKey { index: usize },
    #[error("bucket key '{key}' is not a valid geohash")]
    InvalidGeohash {
        key: String,
        #[source]
        source: geohash::GeohashError,
    },
    #[error("unable to compute tile envelope")]
    Geohash(#[from] geohash::GeohashError),
    #[error("bucket input is not an array or an aggregation response")]
    UnrecognizedBuckets,
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
