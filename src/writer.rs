//! Protobuf encoding of [`Tile`] following the vector tile schema.
//!
//! See <https://github.com/mapbox/vector-tile-spec/blob/master/2.1/vector_tile.proto>.

use byteorder::{LittleEndian, WriteBytesExt};

use crate::{
    EXTENT,
    tile::{Feature, Layer, Tile, Value},
};

const WIRE_VARINT: u32 = 0;
const WIRE_FIXED64: u32 = 1;
const WIRE_LEN: u32 = 2;

mod field {
    pub const TILE_LAYERS: u32 = 3;

    pub const LAYER_NAME: u32 = 1;
    pub const LAYER_FEATURES: u32 = 2;
    pub const LAYER_KEYS: u32 = 3;
    pub const LAYER_VALUES: u32 = 4;
    pub const LAYER_EXTENT: u32 = 5;
    pub const LAYER_VERSION: u32 = 15;

    pub const FEATURE_TAGS: u32 = 2;
    pub const FEATURE_TYPE: u32 = 3;
    pub const FEATURE_GEOMETRY: u32 = 4;

    pub const VALUE_STRING: u32 = 1;
    pub const VALUE_DOUBLE: u32 = 3;
}

/// Schema default for `Layer.version`; a layer at this version omits it.
const DEFAULT_VERSION: u32 = 1;

pub fn encode_tile(tile: &Tile) -> Vec<u8> {
    let mut buf = Vec::new();
    for layer in tile.layers.iter() {
        write_message(&mut buf, field::TILE_LAYERS, |buf| write_layer(buf, layer));
    }
    buf
}

fn write_layer(buf: &mut Vec<u8>, layer: &Layer) {
    if layer.version != DEFAULT_VERSION {
        write_varint_field(buf, field::LAYER_VERSION, layer.version as u64);
    }
    if !layer.name.is_empty() {
        write_bytes_field(buf, field::LAYER_NAME, layer.name.as_bytes());
    }
    for feature in layer.features.iter() {
        write_message(buf, field::LAYER_FEATURES, |buf| write_feature(buf, feature));
    }
    for key in layer.keys.iter() {
        write_bytes_field(buf, field::LAYER_KEYS, key.as_bytes());
    }
    for value in layer.values.iter() {
        write_message(buf, field::LAYER_VALUES, |buf| write_value(buf, value));
    }
    if layer.extent != EXTENT {
        write_varint_field(buf, field::LAYER_EXTENT, layer.extent as u64);
    }
}

fn write_feature(buf: &mut Vec<u8>, feature: &Feature) {
    write_packed_field(buf, field::FEATURE_TAGS, &feature.tags);
    write_varint_field(buf, field::FEATURE_TYPE, feature.geom_type as u64);
    write_packed_field(buf, field::FEATURE_GEOMETRY, &feature.geometry);
}

fn write_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::String(s) => write_bytes_field(buf, field::VALUE_STRING, s.as_bytes()),
        Value::Double(n) => {
            write_key(buf, field::VALUE_DOUBLE, WIRE_FIXED64);
            buf.write_f64::<LittleEndian>(*n).expect("write to Vec");
        }
    }
}

fn write_key(buf: &mut Vec<u8>, field: u32, wire_type: u32) {
    write_varint(buf, ((field << 3) | wire_type) as u64);
}

pub(crate) fn write_varint(buf: &mut Vec<u8>, mut n: u64) {
    while n >= 0x80 {
        buf.push((n as u8 & 0x7f) | 0x80);
        n >>= 7;
    }
    buf.push(n as u8);
}

fn varint_len(n: u64) -> usize {
    let bits = 64 - (n | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

fn write_varint_field(buf: &mut Vec<u8>, field: u32, n: u64) {
    write_key(buf, field, WIRE_VARINT);
    write_varint(buf, n);
}

fn write_bytes_field(buf: &mut Vec<u8>, field: u32, bytes: &[u8]) {
    write_key(buf, field, WIRE_LEN);
    write_varint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn write_packed_field(buf: &mut Vec<u8>, field: u32, values: &[u32]) {
    if values.is_empty() {
        return;
    }

    let len: usize = values.iter().map(|v| varint_len(*v as u64)).sum();
    write_key(buf, field, WIRE_LEN);
    write_varint(buf, len as u64);
    for v in values {
        write_varint(buf, *v as u64);
    }
}

fn write_message<F: FnOnce(&mut Vec<u8>)>(buf: &mut Vec<u8>, field: u32, body: F) {
    let mut message = Vec::new();
    body(&mut message);
    write_bytes_field(buf, field, &message);
}
