use std::{fmt, io::Write, str::FromStr};

use libflate::gzip;

use crate::error::{Result, TileError};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Brotli,
}

impl Compression {
    pub fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(bytes.to_vec()),
            Compression::Gzip => {
                let mut encoder = gzip::Encoder::new(Vec::new())?;
                encoder.write_all(bytes)?;
                Ok(encoder.finish().into_result()?)
            }
            Compression::Brotli => {
                let mut out = Vec::new();
                let params = brotli::enc::BrotliEncoderParams::default();
                brotli::BrotliCompress(&mut &bytes[..], &mut out, &params)?;
                Ok(out)
            }
        }
    }
}

impl FromStr for Compression {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "identity" => Ok(Compression::None),
            "gzip" | "gz" => Ok(Compression::Gzip),
            "brotli" | "br" => Ok(Compression::Brotli),
            _ => Err(TileError::UnknownCompression(s.to_string())),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::Brotli => write!(f, "brotli"),
        }
    }
}
