//! Bit coder backed by the symbol codec
//!
//! Every call is one symbol: a single bit becomes 0 or 1, an `nbits` value
//! its low `nbits`. Stream: `[count: u32][encode_symbols output]`.
//!
//! A single-symbol table codes any count in a handful of bytes, so the
//! decoder refuses counts above its `max_symbols` bound.

use super::{assert_valid_nbits, BitDecoder, BitEncoder};
use crate::bits::low_bits;
use crate::buffer::{DecoderBuffer, EncoderBuffer};
use crate::config::SymbolEncodingOptions;
use crate::symbol::{decode_symbols, encode_symbols};
use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct SymbolBitEncoder {
    symbols: Vec<u32>,
}

impl SymbolBitEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BitEncoder for SymbolBitEncoder {
    fn start_encoding(&mut self) {
        self.symbols.clear();
    }

    #[inline]
    fn encode_bit(&mut self, bit: bool) {
        self.symbols.push(bit as u32);
    }

    fn encode_least_significant_bits32(&mut self, nbits: u32, value: u32) {
        assert_valid_nbits(nbits);
        self.symbols.push(low_bits(value, nbits));
    }

    fn end_encoding(&mut self, target: &mut EncoderBuffer) -> Result<()> {
        let count = u32::try_from(self.symbols.len())
            .map_err(|_| Error::EncodeError("Too many symbols for one stream".into()))?;
        target.encode_u32(count);
        encode_symbols(&self.symbols, 1, &SymbolEncodingOptions::default(), target)?;
        self.symbols.clear();
        Ok(())
    }
}

/// Symbol count accepted by [`SymbolBitDecoder::new`]
pub const DEFAULT_MAX_SYMBOLS: u32 = 1 << 24;

/// Holds the decoded symbols in reverse so each read is a pop.
#[derive(Debug, Clone)]
pub struct SymbolBitDecoder {
    symbols: Vec<u32>,
    max_symbols: u32,
}

impl Default for SymbolBitDecoder {
    fn default() -> Self {
        Self::with_max_symbols(DEFAULT_MAX_SYMBOLS)
    }
}

impl SymbolBitDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder rejecting streams that declare more than `max_symbols` symbols
    pub fn with_max_symbols(max_symbols: u32) -> Self {
        Self {
            symbols: Vec::new(),
            max_symbols,
        }
    }

    pub fn max_symbols(&self) -> u32 {
        self.max_symbols
    }
}

impl<'a> BitDecoder<'a> for SymbolBitDecoder {
    fn start_decoding(&mut self, source: &mut DecoderBuffer<'a>) -> Result<()> {
        let count = source.decode_u32()?;
        if count > self.max_symbols {
            return Err(Error::DecodeError(format!(
                "{} symbols exceed the limit of {}",
                count, self.max_symbols
            )));
        }
        let mut symbols = decode_symbols(count as usize, 1, source)?;
        symbols.reverse();
        self.symbols = symbols;
        Ok(())
    }

    #[inline]
    fn decode_next_bit(&mut self) -> bool {
        self.symbols.pop().unwrap_or(0) != 0
    }

    fn decode_least_significant_bits32(&mut self, nbits: u32) -> u32 {
        assert_valid_nbits(nbits);
        low_bits(self.symbols.pop().unwrap_or(0), nbits)
    }

    fn end_decoding(&mut self) {
        self.symbols.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_are_masked() {
        let mut enc = SymbolBitEncoder::new();
        enc.start_encoding();
        enc.encode_least_significant_bits32(4, 0xFF);
        enc.encode_bit(true);
        enc.encode_least_significant_bits32(32, 0xDEAD_BEEF);

        let mut buffer = EncoderBuffer::new();
        enc.end_encoding(&mut buffer).unwrap();
        let data = buffer.into_vec();
        assert_eq!(&data[..4], &3u32.to_le_bytes());

        let mut source = DecoderBuffer::new(&data);
        let mut dec = SymbolBitDecoder::new();
        dec.start_decoding(&mut source).unwrap();
        assert_eq!(dec.decode_least_significant_bits32(8), 0x0F);
        assert!(dec.decode_next_bit());
        assert_eq!(dec.decode_least_significant_bits32(32), 0xDEAD_BEEF);
        assert_eq!(dec.decode_least_significant_bits32(32), 0);
    }

    #[test]
    fn test_repetitive_values_compress() {
        let mut enc = SymbolBitEncoder::new();
        enc.start_encoding();
        for i in 0..4000u32 {
            enc.encode_least_significant_bits32(16, i % 3);
        }
        let mut buffer = EncoderBuffer::new();
        enc.end_encoding(&mut buffer).unwrap();
        assert!(buffer.len() < 4000 * 2 / 8);
    }

    /// One-symbol raw table: the payload codes any count for free.
    fn constant_stream(count: u32) -> Vec<u8> {
        let mut data = count.to_le_bytes().to_vec();
        data.extend_from_slice(&[1, 1, 1, 0x01, 0x40, 1, 0x00]);
        data
    }

    #[test]
    fn test_oversized_count_rejected() {
        let data = constant_stream(100_000_000);
        let mut dec = SymbolBitDecoder::with_max_symbols(1000);
        let err = dec.start_decoding(&mut DecoderBuffer::new(&data)).unwrap_err();
        assert!(matches!(err, Error::DecodeError(_)));

        let data = constant_stream(u32::MAX);
        let mut dec = SymbolBitDecoder::new();
        assert!(dec.start_decoding(&mut DecoderBuffer::new(&data)).is_err());
    }

    #[test]
    fn test_count_at_limit_accepted() {
        let data = constant_stream(1000);
        let mut source = DecoderBuffer::new(&data);
        let mut dec = SymbolBitDecoder::with_max_symbols(1000);
        dec.start_decoding(&mut source).unwrap();
        assert_eq!(source.remaining_size(), 0);
        for _ in 0..1000 {
            assert_eq!(dec.decode_least_significant_bits32(8), 0);
        }
    }
}
