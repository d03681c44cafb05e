//! WebAssembly bindings for kdpack
//!
//! Points cross the boundary as flat coordinate arrays of
//! `num_points * dimension` values.

use kdpack_core::entropy::{approximate_rans_frequency_table_bits, compute_shannon_entropy};
use kdpack_core::symbol::DEFAULT_SYMBOL_CODING_COMPRESSION_LEVEL;
use kdpack_core::{
    compress_points, compress_symbols, decompress_points, decompress_symbols, Error,
    SymbolCodingMethod,
};
use wasm_bindgen::prelude::*;

fn to_js(e: Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

// ============================================================================
// Symbols
// ============================================================================

/// Compress `values`, grouped in tuples of `num_components`
#[wasm_bindgen]
pub fn kdpack_encode_symbols(
    values: &[u32],
    num_components: u32,
    compression_level: u8,
) -> Result<Vec<u8>, JsValue> {
    compress_symbols(values, num_components as usize, compression_level).map_err(to_js)
}

/// Decompress `num_values` symbols
#[wasm_bindgen]
pub fn kdpack_decode_symbols(
    data: &[u8],
    num_values: u32,
    num_components: u32,
) -> Result<Vec<u32>, JsValue> {
    decompress_symbols(data, num_values as usize, num_components as usize).map_err(to_js)
}

// ============================================================================
// Points
// ============================================================================

fn encode_flat_points(
    flat: &[u32],
    dimension: u32,
    bit_length: u32,
    compression_level: u8,
) -> kdpack_core::Result<Vec<u8>> {
    if dimension == 0 || flat.len() % dimension as usize != 0 {
        return Err(Error::InvalidInput(format!(
            "{} coordinates do not form whole points of dimension {}",
            flat.len(),
            dimension
        )));
    }
    let points: Vec<&[u32]> = flat.chunks_exact(dimension as usize).collect();
    compress_points(&points, dimension, bit_length, compression_level)
}

fn decode_flat_points(
    data: &[u8],
    dimension: u32,
    compression_level: u8,
    max_points: u32,
) -> kdpack_core::Result<Vec<u32>> {
    let points = decompress_points(data, dimension, compression_level, max_points)?;
    Ok(points.concat())
}

/// Compress a flat coordinate array
#[wasm_bindgen]
pub fn kdpack_encode_points(
    flat: &[u32],
    dimension: u32,
    bit_length: u32,
    compression_level: u8,
) -> Result<Vec<u8>, JsValue> {
    encode_flat_points(flat, dimension, bit_length, compression_level).map_err(to_js)
}

/// Decompress points into a flat coordinate array.
///
/// Point order differs from the encoded input.
#[wasm_bindgen]
pub fn kdpack_decode_points(
    data: &[u8],
    dimension: u32,
    compression_level: u8,
    max_points: u32,
) -> Result<Vec<u32>, JsValue> {
    decode_flat_points(data, dimension, compression_level, max_points).map_err(to_js)
}

// ============================================================================
// Utilities
// ============================================================================

/// Get library version
#[wasm_bindgen]
pub fn kdpack_version() -> String {
    kdpack_core::VERSION.to_string()
}

fn analyze(values: &[u32]) -> kdpack_core::Result<serde_json::Value> {
    let max_value = values.iter().copied().max().unwrap_or(0);
    let (entropy_bits, unique_symbols) = compute_shannon_entropy(values, max_value);
    let table_bits =
        approximate_rans_frequency_table_bits(max_value.saturating_add(1), unique_symbols);
    let compressed = compress_symbols(values, 1, DEFAULT_SYMBOL_CODING_COMPRESSION_LEVEL)?;
    let method = match compressed.first() {
        Some(&byte) => Some(SymbolCodingMethod::try_from(byte)?),
        None => None,
    };

    Ok(serde_json::json!({
        "numValues": values.len(),
        "maxValue": max_value,
        "uniqueSymbols": unique_symbols,
        "entropyBits": entropy_bits,
        "tableBits": table_bits,
        "compressedSize": compressed.len(),
        "method": method,
    }))
}

/// Analyze symbols and report entropy statistics as JSON
#[wasm_bindgen]
pub fn kdpack_analyze(values: &[u32]) -> Result<String, JsValue> {
    analyze(values).map(|v| v.to_string()).map_err(to_js)
}
