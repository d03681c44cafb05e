//! Uncompressed bit coder
//!
//! Bits are packed MSB first into 32-bit words. The stream is
//! `[size_in_bytes: u32][words: u32 LE]` and always holds at least one word.

use super::{assert_valid_nbits, BitDecoder, BitEncoder};
use crate::bits::low_bits;
use crate::buffer::{DecoderBuffer, EncoderBuffer};
use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct DirectBitEncoder {
    bits: Vec<u32>,
    local_bits: u32,
    num_local_bits: u32,
}

impl DirectBitEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn clear(&mut self) {
        self.bits.clear();
        self.local_bits = 0;
        self.num_local_bits = 0;
    }

    fn flush_word(&mut self) {
        self.bits.push(self.local_bits);
        self.local_bits = 0;
        self.num_local_bits = 0;
    }
}

impl BitEncoder for DirectBitEncoder {
    fn start_encoding(&mut self) {
        self.clear();
    }

    #[inline]
    fn encode_bit(&mut self, bit: bool) {
        if bit {
            self.local_bits |= 1 << (31 - self.num_local_bits);
        }
        self.num_local_bits += 1;
        if self.num_local_bits == 32 {
            self.flush_word();
        }
    }

    fn encode_least_significant_bits32(&mut self, nbits: u32, value: u32) {
        assert_valid_nbits(nbits);
        let value = low_bits(value, nbits);
        let remaining = 32 - self.num_local_bits;
        if nbits <= remaining {
            self.local_bits |= value << (remaining - nbits);
            self.num_local_bits += nbits;
            if self.num_local_bits == 32 {
                self.flush_word();
            }
        } else {
            // Split across two words.
            let overflow = nbits - remaining;
            self.local_bits |= value >> overflow;
            self.flush_word();
            self.local_bits = value << (32 - overflow);
            self.num_local_bits = overflow;
        }
    }

    fn end_encoding(&mut self, target: &mut EncoderBuffer) -> Result<()> {
        self.bits.push(self.local_bits);
        let size_in_bytes = u32::try_from(self.bits.len() * 4)
            .map_err(|_| Error::EncodeError("Direct bit stream exceeds 4 GiB".into()))?;
        target.encode_u32(size_in_bytes);
        for word in &self.bits {
            target.encode_u32(*word);
        }
        self.clear();
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DirectBitDecoder {
    bits: Vec<u32>,
    pos: usize,
    num_used_bits: u32,
}

impl DirectBitDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn advance_word(&mut self) {
        self.pos += 1;
        self.num_used_bits = 0;
    }
}

impl<'a> BitDecoder<'a> for DirectBitDecoder {
    fn start_decoding(&mut self, source: &mut DecoderBuffer<'a>) -> Result<()> {
        let size_in_bytes = source.decode_u32()? as usize;
        // The encoder always writes whole, non-empty 32-bit words.
        if size_in_bytes == 0 || size_in_bytes % 4 != 0 {
            return Err(Error::DecodeError(format!(
                "Invalid direct bit stream size {}",
                size_in_bytes
            )));
        }
        let bytes = source.decode_bytes(size_in_bytes)?;
        self.bits = bytes
            .chunks_exact(4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .collect();
        self.pos = 0;
        self.num_used_bits = 0;
        Ok(())
    }

    #[inline]
    fn decode_next_bit(&mut self) -> bool {
        let Some(&word) = self.bits.get(self.pos) else {
            return false;
        };
        let bit = word & (1 << (31 - self.num_used_bits)) != 0;
        self.num_used_bits += 1;
        if self.num_used_bits == 32 {
            self.advance_word();
        }
        bit
    }

    fn decode_least_significant_bits32(&mut self, nbits: u32) -> u32 {
        assert_valid_nbits(nbits);
        let remaining = 32 - self.num_used_bits;
        if nbits <= remaining {
            let Some(&word) = self.bits.get(self.pos) else {
                return 0;
            };
            let value = (word << self.num_used_bits) >> (32 - nbits);
            self.num_used_bits += nbits;
            if self.num_used_bits == 32 {
                self.advance_word();
            }
            value
        } else {
            if self.pos + 1 >= self.bits.len() {
                return 0;
            }
            let value_l = self.bits[self.pos] << self.num_used_bits;
            let overflow = nbits - remaining;
            self.pos += 1;
            let value_r = self.bits[self.pos] >> (32 - overflow);
            self.num_used_bits = overflow;
            (value_l >> (32 - nbits)) | value_r
        }
    }

    fn end_decoding(&mut self) {
        self.bits.clear();
        self.pos = 0;
        self.num_used_bits = 0;
    }
}
