//! kdpack - entropy coding for integer symbols and point clouds
//!
//! The bit and byte machinery under a geometry format, usable on its own:
//!
//! - **rANS / rABS coders**: asymmetric numeral systems with a truncated
//!   final state
//! - **Bit coders**: direct, rANS, adaptive, folded and symbol backed
//!   strategies behind one trait pair
//! - **Symbol codec**: bit-length tagged or raw rANS coding, picked from an
//!   entropy estimate
//! - **KD-tree point codec**: recursive midpoint splits of a bounded integer
//!   cube, tuned by a compression level
//!
//! # Example
//!
//! ```rust
//! use kdpack_core::{compress_points, decompress_points, compress_symbols, decompress_symbols};
//!
//! let points = vec![[1u32, 2, 3], [4, 5, 6], [1, 2, 3]];
//! let compressed = compress_points(&points, 3, 8, 7)?;
//! let mut decoded = decompress_points(&compressed, 3, 7, 100)?;
//! decoded.sort();
//! assert_eq!(decoded, vec![vec![1, 2, 3], vec![1, 2, 3], vec![4, 5, 6]]);
//!
//! let values = [7u32, 7, 7, 1, 0, 7];
//! let compressed = compress_symbols(&values, 1, 7)?;
//! assert_eq!(decompress_symbols(&compressed, values.len(), 1)?, values);
//! # Ok::<(), kdpack_core::Error>(())
//! ```

pub mod ans;
pub mod bit_coders;
pub mod bits;
pub mod buffer;
pub mod config;
pub mod encoding;
pub mod entropy;
pub mod error;
pub mod kd_tree;
pub mod symbol;

// Re-exports
pub use bit_coders::{BitCoderKind, BitDecoder, BitEncoder};
pub use buffer::{DecoderBuffer, EncoderBuffer};
pub use config::{KdTreeConfig, SymbolEncodingOptions};
pub use error::{Error, Result};
pub use kd_tree::{CompressionPolicy, KdTreeDecoder, KdTreeEncoder, Traversal};
pub use symbol::{decode_symbols, encode_symbols, SymbolCodingMethod};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compress a symbol array at `compression_level`.
///
/// The output holds no value count; pass the same count and
/// `num_components` to [`decompress_symbols`].
pub fn compress_symbols(
    symbols: &[u32],
    num_components: usize,
    compression_level: u8,
) -> Result<Vec<u8>> {
    let options = SymbolEncodingOptions {
        compression_level,
        ..Default::default()
    };
    let mut buffer = EncoderBuffer::new();
    encode_symbols(symbols, num_components, &options, &mut buffer)?;
    Ok(buffer.into_vec())
}

/// Decompress data written by [`compress_symbols`]
pub fn decompress_symbols(
    input: &[u8],
    num_values: usize,
    num_components: usize,
) -> Result<Vec<u32>> {
    let mut source = DecoderBuffer::new(input);
    decode_symbols(num_values, num_components, &mut source)
}

/// Compress `points` with the policy of `compression_level`.
pub fn compress_points<P: AsRef<[u32]>>(
    points: &[P],
    dimension: u32,
    bit_length: u32,
    compression_level: u8,
) -> Result<Vec<u8>> {
    let encoder = KdTreeEncoder::from_config(&KdTreeConfig::new(dimension, compression_level))?;
    let mut buffer = EncoderBuffer::new();
    encoder.encode_points(points, bit_length, &mut buffer)?;
    Ok(buffer.into_vec())
}

/// Decompress data written by [`compress_points`] with the same dimension
/// and level. Streams declaring more than `max_num_points` are rejected.
pub fn decompress_points(
    input: &[u8],
    dimension: u32,
    compression_level: u8,
    max_num_points: u32,
) -> Result<Vec<Vec<u32>>> {
    let decoder = KdTreeDecoder::from_config(&KdTreeConfig::new(dimension, compression_level))?;
    let mut source = DecoderBuffer::new(input);
    decoder.decode_points_to_vec(&mut source, max_num_points)
}
