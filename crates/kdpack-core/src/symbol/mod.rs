//! Symbol codec
//!
//! Compresses arrays of unsigned integers grouped into `num_components`
//! tuples. Two schemes are available and the cheaper one is picked from an
//! entropy estimate:
//!
//! - **Tagged**: each tuple gets a bit-length tag (entropy coded with rANS);
//!   the values follow as plain bits of that length.
//! - **Raw**: every value is a rANS symbol of its own.
//!
//! ```text
//! tagged: [0u8][tag table][tag ans size: varint][tag ans][value bits]
//! raw:    [1u8][bit length: u8][table][ans size: varint][ans]
//! ```
//!
//! Tags are stored as `bit_length - 1` so the tag alphabet is exactly 32
//! symbols.

mod coder;
mod table;

pub use coder::{
    compute_rans_precision_from_unique_symbols_bit_length, compute_rans_unclamped_precision,
    RAnsSymbolDecoder, RAnsSymbolEncoder,
};
pub use table::{decode_table, encode_table, ProbabilityTable};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bits::most_significant_bit;
use crate::buffer::{DecoderBuffer, EncoderBuffer};
use crate::config::SymbolEncodingOptions;
use crate::encoding::{zigzag_decode, zigzag_encode};
use crate::entropy::{approximate_rans_frequency_table_bits, compute_shannon_entropy};
use crate::{Error, Result};

/// Largest bit length a tag can describe
pub const MAX_TAG_SYMBOL_BIT_LENGTH: u32 = 32;

/// Values wider than this are always coded with the tagged scheme
pub const MAX_RAW_ENCODING_BIT_LENGTH: u32 = 18;

pub const DEFAULT_SYMBOL_CODING_COMPRESSION_LEVEL: u8 = 7;

/// Bit length passed to the tag coder; resolves to 12 bits of precision.
const TAG_SYMBOLS_BIT_LENGTH: u32 = 5;

/// Symbol coding scheme, stored as the first byte of the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SymbolCodingMethod {
    Tagged = 0,
    Raw = 1,
}

impl TryFrom<u8> for SymbolCodingMethod {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Tagged),
            1 => Ok(Self::Raw),
            other => Err(Error::UnsupportedScheme(other)),
        }
    }
}

/// Compress `symbols` into `target`.
///
/// `symbols.len()` must be a multiple of `num_components` (0 is read as 1).
/// Nothing is written for an empty input.
pub fn encode_symbols(
    symbols: &[u32],
    num_components: usize,
    options: &SymbolEncodingOptions,
    target: &mut EncoderBuffer,
) -> Result<()> {
    if symbols.is_empty() {
        return Ok(());
    }
    let num_components = num_components.max(1);
    if symbols.len() % num_components != 0 {
        return Err(Error::InvalidInput(format!(
            "{} values do not form whole groups of {} components",
            symbols.len(),
            num_components
        )));
    }

    let (bit_lengths, max_value) = compute_bit_lengths(symbols, num_components);
    let max_value_bit_length = most_significant_bit(max_value.max(1)) + 1;

    let method = match options.method {
        Some(method) => method,
        None => {
            let tagged_bits = approximate_tagged_scheme_bits(&bit_lengths, num_components);
            if max_value_bit_length > MAX_RAW_ENCODING_BIT_LENGTH {
                SymbolCodingMethod::Tagged
            } else {
                let (raw_bits, _) = approximate_raw_scheme_bits(symbols, max_value);
                debug!(tagged_bits, raw_bits, "symbol scheme estimates");
                if tagged_bits < raw_bits {
                    SymbolCodingMethod::Tagged
                } else {
                    SymbolCodingMethod::Raw
                }
            }
        }
    };
    debug!(
        num_values = symbols.len(),
        num_components,
        max_value,
        ?method,
        "encoding symbols"
    );

    if method == SymbolCodingMethod::Raw && max_value_bit_length > MAX_RAW_ENCODING_BIT_LENGTH {
        return Err(Error::InvalidInput(format!(
            "raw symbol coding supports at most {} bit values, got {}",
            MAX_RAW_ENCODING_BIT_LENGTH, max_value_bit_length
        )));
    }

    target.encode_u8(method as u8);
    match method {
        SymbolCodingMethod::Tagged => {
            encode_tagged_symbols(symbols, num_components, &bit_lengths, target)
        }
        SymbolCodingMethod::Raw => {
            encode_raw_symbols(symbols, max_value, options.compression_level, target)
        }
    }
}

/// Map signed values onto symbols, interleaving negatives with positives
/// (`0, -1, 1, -2, ...` become `0, 1, 2, 3, ...`).
pub fn convert_signed_ints_to_symbols(values: &[i32]) -> Vec<u32> {
    values
        .iter()
        .map(|&v| zigzag_encode(v as i64) as u32)
        .collect()
}

/// Inverse of [`convert_signed_ints_to_symbols`]
pub fn convert_symbols_to_signed_ints(symbols: &[u32]) -> Vec<i32> {
    symbols
        .iter()
        .map(|&s| zigzag_decode(s as u64) as i32)
        .collect()
}

/// Decode `num_values` symbols written by [`encode_symbols`].
pub fn decode_symbols(
    num_values: usize,
    num_components: usize,
    source: &mut DecoderBuffer<'_>,
) -> Result<Vec<u32>> {
    if num_values == 0 {
        return Ok(Vec::new());
    }
    let num_components = num_components.max(1);
    if num_values % num_components != 0 {
        return Err(Error::InvalidInput(format!(
            "{} values do not form whole groups of {} components",
            num_values, num_components
        )));
    }

    let method = SymbolCodingMethod::try_from(source.decode_u8()?)?;
    match method {
        SymbolCodingMethod::Tagged => decode_tagged_symbols(num_values, num_components, source),
        SymbolCodingMethod::Raw => decode_raw_symbols(num_values, source),
    }
}

/// Bit length of the largest component in every group, and the overall
/// maximum value.
fn compute_bit_lengths(symbols: &[u32], num_components: usize) -> (Vec<u32>, u32) {
    let mut max_value = 0u32;
    let bit_lengths = symbols
        .chunks_exact(num_components)
        .map(|group| {
            let group_max = group.iter().copied().max().unwrap_or(0);
            max_value = max_value.max(group_max);
            most_significant_bit(group_max.max(1)) + 1
        })
        .collect();
    (bit_lengths, max_value)
}

fn approximate_tagged_scheme_bits(bit_lengths: &[u32], num_components: usize) -> i64 {
    let total_bit_length: i64 = bit_lengths
        .iter()
        .map(|&b| b as i64 * num_components as i64)
        .sum();
    let tags: Vec<u32> = bit_lengths.iter().map(|&b| b - 1).collect();
    let (tag_bits, num_unique) = compute_shannon_entropy(&tags, MAX_TAG_SYMBOL_BIT_LENGTH - 1);
    let tag_table_bits = approximate_rans_frequency_table_bits(num_unique, num_unique);
    tag_bits + tag_table_bits + total_bit_length
}

fn approximate_raw_scheme_bits(symbols: &[u32], max_value: u32) -> (i64, u32) {
    let (data_bits, num_unique) = compute_shannon_entropy(symbols, max_value);
    let table_bits = approximate_rans_frequency_table_bits(max_value, num_unique);
    (data_bits + table_bits, num_unique)
}

fn encode_tagged_symbols(
    symbols: &[u32],
    num_components: usize,
    bit_lengths: &[u32],
    target: &mut EncoderBuffer,
) -> Result<()> {
    let mut frequencies = vec![0u64; MAX_TAG_SYMBOL_BIT_LENGTH as usize];
    for &bit_length in bit_lengths {
        frequencies[(bit_length - 1) as usize] += 1;
    }

    let mut tag_encoder = RAnsSymbolEncoder::create(&frequencies, TAG_SYMBOLS_BIT_LENGTH, target)?;
    tag_encoder.start_encoding();
    for &bit_length in bit_lengths.iter().rev() {
        tag_encoder.encode_symbol(bit_length - 1);
    }
    tag_encoder.end_encoding(target)?;

    // Values go in forward order, after the tag stream.
    target.start_bit_encoding(false);
    for (group, &bit_length) in symbols.chunks_exact(num_components).zip(bit_lengths) {
        for &value in group {
            target.encode_least_significant_bits32(bit_length, value);
        }
    }
    target.end_bit_encoding();
    Ok(())
}

fn decode_tagged_symbols(
    num_values: usize,
    num_components: usize,
    source: &mut DecoderBuffer<'_>,
) -> Result<Vec<u32>> {
    let mut tag_decoder = RAnsSymbolDecoder::create(source, TAG_SYMBOLS_BIT_LENGTH)?;
    tag_decoder.start_decoding(source)?;
    if tag_decoder.num_symbols() == 0 {
        return Err(Error::DecodeError("empty bit length tag table".into()));
    }

    let mut values = Vec::with_capacity(num_values.min(source.remaining_size() * 8));
    source.start_bit_decoding(false)?;
    let result = (|| {
        for _ in 0..num_values / num_components {
            let bit_length = tag_decoder.decode_symbol() + 1;
            if bit_length > MAX_TAG_SYMBOL_BIT_LENGTH {
                return Err(Error::DecodeError(format!(
                    "invalid bit length tag {}",
                    bit_length
                )));
            }
            for _ in 0..num_components {
                values.push(source.decode_least_significant_bits32(bit_length)?);
            }
        }
        Ok(())
    })();
    source.end_bit_decoding();
    let clean_end = tag_decoder.end_decoding();
    result?;
    if !clean_end {
        return Err(Error::DecodeError("bit length tag stream is corrupt".into()));
    }
    Ok(values)
}

fn encode_raw_symbols(
    symbols: &[u32],
    max_value: u32,
    compression_level: u8,
    target: &mut EncoderBuffer,
) -> Result<()> {
    let mut frequencies = vec![0u64; max_value as usize + 1];
    for &symbol in symbols {
        frequencies[symbol as usize] += 1;
    }
    let num_unique = frequencies.iter().filter(|&&f| f > 0).count() as u32;

    let mut unique_symbols_bit_length = most_significant_bit(num_unique) as i32 + 1;
    unique_symbols_bit_length += match compression_level {
        0..=3 => -2,
        4..=5 => -1,
        8..=9 => 1,
        10..=u8::MAX => 2,
        _ => 0,
    };
    let unique_symbols_bit_length =
        unique_symbols_bit_length.clamp(1, MAX_RAW_ENCODING_BIT_LENGTH as i32) as u32;
    debug!(num_unique, unique_symbols_bit_length, "raw symbol table");

    target.encode_u8(unique_symbols_bit_length as u8);
    let mut encoder = RAnsSymbolEncoder::create(&frequencies, unique_symbols_bit_length, target)?;
    encoder.start_encoding();
    for &symbol in symbols.iter().rev() {
        encoder.encode_symbol(symbol);
    }
    encoder.end_encoding(target)
}

fn decode_raw_symbols(num_values: usize, source: &mut DecoderBuffer<'_>) -> Result<Vec<u32>> {
    let unique_symbols_bit_length = source.decode_u8()? as u32;
    if !(1..=MAX_RAW_ENCODING_BIT_LENGTH).contains(&unique_symbols_bit_length) {
        return Err(Error::DecodeError(format!(
            "invalid raw symbol bit length {}",
            unique_symbols_bit_length
        )));
    }
    let mut decoder = RAnsSymbolDecoder::create(source, unique_symbols_bit_length)?;
    if decoder.num_symbols() == 0 {
        return Err(Error::DecodeError("empty raw symbol table".into()));
    }
    decoder.start_decoding(source)?;
    // A single-symbol table codes any count in a few bytes, so only the
    // initial reservation is bounded.
    let mut values = Vec::with_capacity(num_values.min(1 << 16));
    for _ in 0..num_values {
        values.push(decoder.decode_symbol());
    }
    if !decoder.end_decoding() {
        return Err(Error::DecodeError("raw symbol stream is corrupt".into()));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(symbols: &[u32], num_components: usize, options: &SymbolEncodingOptions) -> Vec<u8> {
        let mut buffer = EncoderBuffer::new();
        encode_symbols(symbols, num_components, options, &mut buffer).unwrap();
        buffer.encode_u8(0xA5);
        let data = buffer.into_vec();

        let mut source = DecoderBuffer::new(&data);
        let decoded = decode_symbols(symbols.len(), num_components, &mut source).unwrap();
        assert_eq!(decoded, symbols);
        assert_eq!(source.decode_u8().unwrap(), 0xA5);
        data
    }

    fn forced(method: SymbolCodingMethod) -> SymbolEncodingOptions {
        SymbolEncodingOptions {
            method: Some(method),
            ..Default::default()
        }
    }

    #[test]
    fn test_small_alphabet_picks_raw() {
        let symbols: Vec<u32> = (0..1000).map(|i| [3, 3, 3, 7, 1][i % 5]).collect();
        let data = roundtrip(&symbols, 1, &SymbolEncodingOptions::default());
        assert_eq!(data[0], SymbolCodingMethod::Raw as u8);
        assert!(data.len() < 300);
    }

    #[test]
    fn test_wide_values_pick_tagged() {
        let symbols: Vec<u32> = (0..500u32).map(|i| i.wrapping_mul(0x9E37_79B9) | 1 << 20).collect();
        let data = roundtrip(&symbols, 1, &SymbolEncodingOptions::default());
        assert_eq!(data[0], SymbolCodingMethod::Tagged as u8);
    }

    #[test]
    fn test_full_range_values() {
        let symbols = [u32::MAX, 0, 1, u32::MAX - 1, 1 << 31, 0];
        let data = roundtrip(&symbols, 2, &SymbolEncodingOptions::default());
        assert_eq!(data[0], SymbolCodingMethod::Tagged as u8);
    }

    #[test]
    fn test_forced_methods_roundtrip() {
        let symbols: Vec<u32> = (0..900u32).map(|i| (i * i) % 1000).collect();
        let tagged = roundtrip(&symbols, 3, &forced(SymbolCodingMethod::Tagged));
        assert_eq!(tagged[0], 0);
        let raw = roundtrip(&symbols, 3, &forced(SymbolCodingMethod::Raw));
        assert_eq!(raw[0], 1);
    }

    #[test]
    fn test_compression_levels_roundtrip() {
        let symbols: Vec<u32> = (0..2000u32).map(|i| (i * 7919) % 3001).collect();
        for level in 0..=10 {
            let options = SymbolEncodingOptions {
                method: Some(SymbolCodingMethod::Raw),
                compression_level: level,
            };
            let data = roundtrip(&symbols, 1, &options);
            let expected = match level {
                0..=3 => 9,
                4..=5 => 10,
                6..=7 => 11,
                8..=9 => 12,
                _ => 13,
            };
            assert_eq!(data[1], expected, "level {}", level);
        }
    }

    #[test]
    fn test_single_repeated_value() {
        roundtrip(&[42; 100], 1, &SymbolEncodingOptions::default());
        roundtrip(&[0; 64], 4, &SymbolEncodingOptions::default());
    }

    #[test]
    fn test_empty_input_writes_nothing() {
        let mut buffer = EncoderBuffer::new();
        encode_symbols(&[], 3, &SymbolEncodingOptions::default(), &mut buffer).unwrap();
        assert!(buffer.is_empty());
        let mut source = DecoderBuffer::new(&[]);
        assert!(decode_symbols(0, 3, &mut source).unwrap().is_empty());
    }

    #[test]
    fn test_forced_raw_rejects_wide_values() {
        let mut buffer = EncoderBuffer::new();
        let err = encode_symbols(&[1 << 20], 1, &forced(SymbolCodingMethod::Raw), &mut buffer);
        assert!(matches!(err, Err(Error::InvalidInput(_))));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_signed_values() {
        let values = [0, -1, 1, -2, 2, i32::MIN, i32::MAX];
        let symbols = convert_signed_ints_to_symbols(&values);
        assert_eq!(&symbols[..5], &[0, 1, 2, 3, 4]);
        assert_eq!(symbols[5], u32::MAX);
        assert_eq!(convert_symbols_to_signed_ints(&symbols), values);

        let deltas: Vec<i32> = (0..500).map(|i| (i % 7) - 3).collect();
        let symbols = convert_signed_ints_to_symbols(&deltas);
        let mut buffer = EncoderBuffer::new();
        encode_symbols(&symbols, 1, &SymbolEncodingOptions::default(), &mut buffer).unwrap();
        let data = buffer.into_vec();
        let decoded = decode_symbols(symbols.len(), 1, &mut DecoderBuffer::new(&data)).unwrap();
        assert_eq!(convert_symbols_to_signed_ints(&decoded), deltas);
    }

    #[test]
    fn test_ragged_groups_rejected() {
        let mut buffer = EncoderBuffer::new();
        let err = encode_symbols(&[1, 2, 3, 4], 3, &SymbolEncodingOptions::default(), &mut buffer);
        assert!(err.is_err());
    }

    #[test]
    fn test_unknown_scheme_rejected() {
        let data = [7u8, 0, 0, 0];
        let mut source = DecoderBuffer::new(&data);
        assert!(matches!(
            decode_symbols(4, 1, &mut source),
            Err(Error::UnsupportedScheme(7))
        ));
    }

    #[test]
    fn test_bad_raw_bit_length_rejected() {
        for bits in [0u8, 19, 200] {
            let data = [1u8, bits, 1, 0x02, 0x40];
            let mut source = DecoderBuffer::new(&data);
            assert!(decode_symbols(1, 1, &mut source).is_err());
        }
    }

    #[test]
    fn test_truncated_stream_rejected() {
        let symbols: Vec<u32> = (0..300u32).map(|i| i * 977).collect();
        let mut buffer = EncoderBuffer::new();
        encode_symbols(&symbols, 1, &forced(SymbolCodingMethod::Tagged), &mut buffer).unwrap();
        let data = buffer.into_vec();
        for cut in [1, data.len() / 2, data.len() - 1] {
            let mut source = DecoderBuffer::new(&data[..cut]);
            assert!(decode_symbols(symbols.len(), 1, &mut source).is_err(), "cut {}", cut);
        }
    }

    #[test]
    fn test_corrupt_payload_rejected() {
        let symbols: Vec<u32> = (0..2000u32).map(|i| (i * i + 3 * i) % 53).collect();
        let mut buffer = EncoderBuffer::new();
        encode_symbols(&symbols, 1, &forced(SymbolCodingMethod::Raw), &mut buffer).unwrap();
        let data = buffer.into_vec();
        assert!(data.len() > 500);

        for pos in data.len() - 64..data.len() {
            let mut corrupt = data.clone();
            corrupt[pos] ^= 0xFF;
            let result = decode_symbols(symbols.len(), 1, &mut DecoderBuffer::new(&corrupt));
            assert!(result.is_err(), "byte {} of {}", pos, data.len());
        }
    }

    #[test]
    fn test_raw_ceiling_values() {
        let max = (1u32 << MAX_RAW_ENCODING_BIT_LENGTH) - 1;

        let data = roundtrip(&[0, max, 5, max], 1, &forced(SymbolCodingMethod::Raw));
        assert_eq!(data[0], SymbolCodingMethod::Raw as u8);

        let widest = vec![max; 4000];
        let data = roundtrip(&widest, 1, &SymbolEncodingOptions::default());
        assert_eq!(data[0], SymbolCodingMethod::Raw as u8);
    }

    #[test]
    fn test_past_raw_ceiling_uses_tagged() {
        let too_wide = vec![1u32 << MAX_RAW_ENCODING_BIT_LENGTH; 4000];
        let data = roundtrip(&too_wide, 1, &SymbolEncodingOptions::default());
        assert_eq!(data[0], SymbolCodingMethod::Tagged as u8);

        let mut buffer = EncoderBuffer::new();
        let err = encode_symbols(&too_wide, 1, &forced(SymbolCodingMethod::Raw), &mut buffer);
        assert!(matches!(err, Err(Error::InvalidInput(_))));
        assert!(buffer.is_empty());
    }
}
