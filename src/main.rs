use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;

use geohash_tiles::{
    BoundingBox, Compression, DEFAULT_LAYER, GeomType, TileRequest,
    geometry::{PathEvent, PathIter},
    load_buckets, proto,
};

/// Render geohash grid aggregations as vector tiles
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a JSON list of buckets, or a search response, into a tile
    Encode {
        #[command(flatten)]
        tile: TileArgs,
        /// Name of the generated layer
        #[arg(long, default_value = DEFAULT_LAYER)]
        layer: String,
        #[arg(long, default_value_t = Compression::None)]
        compression: Compression,
        /// Bucket JSON, stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,
        /// Tile destination, stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the geohash aligned search envelope of a tile as JSON
    Envelope {
        #[command(flatten)]
        tile: TileArgs,
    },
    /// Print the layers and features of an encoded tile
    Inspect {
        path: PathBuf,
        /// Brotli tiles must be named explicitly, gzip is detected
        #[arg(long, default_value_t = Compression::None)]
        compression: Compression,
    },
}

#[derive(clap::Args, Debug)]
struct TileArgs {
    #[arg(long, short)]
    zoom: u8,
    #[arg(long, short)]
    x: u32,
    #[arg(long, short)]
    y: u32,
    /// Geohash precision of the aggregation, 1 to 12
    #[arg(long, short)]
    precision: u8,
    #[arg(long, short, default_value_t = GeomType::Point)]
    geometry: GeomType,
    /// Extra geohash cells to include around the tile
    #[arg(long, short, default_value_t = 0)]
    margin: u32,
}

impl TileArgs {
    fn request(&self) -> Result<TileRequest> {
        let request = TileRequest::new(
            self.zoom,
            self.x,
            self.y,
            self.precision,
            self.geometry,
            self.margin,
        )
        .with_context(|| format!("invalid tile request {self:?}"))?;

        Ok(request)
    }
}

#[derive(Serialize)]
struct EnvelopeReport {
    bbox: BoundingBox,
    envelope: BoundingBox,
    geo_bounding_box: GeoBoundingBox,
}

/// Corner form accepted by a `geo_bounding_box` query.
#[derive(Serialize)]
struct GeoBoundingBox {
    top_left: [f64; 2],
    bottom_right: [f64; 2],
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Encode {
            tile,
            layer,
            compression,
            input,
            output,
        } => encode(&tile, &layer, compression, input.as_deref(), output.as_deref()),
        Command::Envelope { tile } => envelope(&tile),
        Command::Inspect { path, compression } => inspect(&path, compression),
    }
}

fn encode(
    args: &TileArgs,
    layer: &str,
    compression: Compression,
    input: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let request = args.request()?;

    let buckets = match input {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("unable to open {path:?}"))?;
            load_buckets(BufReader::new(file))
        }
        None => load_buckets(io::stdin().lock()),
    }
    .context("unable to read buckets")?;

    let tile = request.make_tile(&buckets, layer)?;
    let tile = compression.compress(&tile)?;
    info!(
        "encoded {} buckets into {} bytes ({})",
        buckets.len(),
        tile.len(),
        compression
    );

    match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("unable to create {path:?}"))?;
            let mut writer = BufWriter::new(file);
            writer.write_all(&tile)?;
            writer.flush()?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&tile)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

fn envelope(args: &TileArgs) -> Result<()> {
    let request = args.request()?;
    let envelope = *request.envelope();

    let report = EnvelopeReport {
        bbox: *request.bounding_box(),
        envelope,
        geo_bounding_box: GeoBoundingBox {
            top_left: [envelope.min_lon, envelope.max_lat],
            bottom_right: [envelope.max_lon, envelope.min_lat],
        },
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn inspect(path: &Path, compression: Compression) -> Result<()> {
    let mut bytes = Vec::new();
    File::open(path)
        .with_context(|| format!("unable to open {path:?}"))?
        .read_to_end(&mut bytes)?;

    let bytes = match compression {
        Compression::Brotli => {
            let mut out = Vec::new();
            brotli::BrotliDecompress(&mut bytes.as_slice(), &mut out)?;
            out
        }
        _ if bytes.starts_with(&[0x1f, 0x8b]) => {
            let mut decoder = libflate::gzip::Decoder::new(bytes.as_slice())?;
            let mut out = Vec::new();
            decoder.read_to_end(&mut out)?;
            out
        }
        _ => bytes,
    };

    let tile = proto::decode_tile(&bytes).context("not a vector tile")?;

    for layer in tile.layers.iter() {
        println!(
            "layer '{}' v{} extent {}: {} features, {} keys, {} values",
            layer.name,
            layer.version,
            layer.extent(),
            layer.features.len(),
            layer.keys.len(),
            layer.values.len()
        );

        for (idx, feature) in layer.features.iter().enumerate() {
            let path: Vec<String> = PathIter::new(feature.geometry.iter().copied())
                .map(|event| match event {
                    PathEvent::MoveTo(p) => format!("M{},{}", p.x, p.y),
                    PathEvent::LineTo(p) => format!("L{},{}", p.x, p.y),
                    PathEvent::ClosePath => "Z".to_string(),
                })
                .collect();
            let properties: Vec<String> = layer
                .properties(feature)
                .map(|(key, value)| format!("{key}={}", value.display()))
                .collect();

            println!(
                "  #{idx} {:?} {} [{}]",
                feature.r#type(),
                path.join(" "),
                properties.join(", ")
            );
        }
    }

    Ok(())
}
