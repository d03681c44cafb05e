//! Encoder and decoder byte buffers
//!
//! Both buffers expose byte-aligned typed access (little-endian) and a bit
//! sub-mode used for literal bit packing. The bit sub-mode has to be entered
//! and left explicitly; byte-aligned calls made while it is active are a
//! programming error and panic.
//!
//! ```text
//! byte mode:  [u8][u32 LE][varint]...
//! bit mode:   [size varint]? [bits, LSB first within each byte]
//! ```

use bitvec::prelude::*;

use crate::encoding::{decode_varint, encode_varint};
use crate::{Error, Result};

/// Append-only output buffer
#[derive(Debug, Default, Clone)]
pub struct EncoderBuffer {
    data: Vec<u8>,
    bit_section: Option<BitSection>,
}

#[derive(Debug, Clone)]
struct BitSection {
    bits: BitVec<u8, Lsb0>,
    encode_size: bool,
}

impl EncoderBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoded bytes so far (excluding an open bit section)
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        assert!(self.bit_section.is_none(), "bit encoding still active");
        self.data
    }

    pub fn bit_encoder_active(&self) -> bool {
        self.bit_section.is_some()
    }

    pub fn encode_u8(&mut self, value: u8) {
        self.assert_byte_mode();
        self.data.push(value);
    }

    pub fn encode_u32(&mut self, value: u32) {
        self.assert_byte_mode();
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn encode_varint(&mut self, value: u64) {
        self.assert_byte_mode();
        encode_varint(value, &mut self.data);
    }

    pub fn encode_bytes(&mut self, bytes: &[u8]) {
        self.assert_byte_mode();
        self.data.extend_from_slice(bytes);
    }

    /// Enter bit mode. With `encode_size` the section is prefixed by its
    /// byte length when it is closed.
    pub fn start_bit_encoding(&mut self, encode_size: bool) {
        assert!(self.bit_section.is_none(), "bit encoding already active");
        self.bit_section = Some(BitSection {
            bits: BitVec::new(),
            encode_size,
        });
    }

    /// Write the low `nbits` of `value`, least significant bit first.
    pub fn encode_least_significant_bits32(&mut self, nbits: u32, value: u32) {
        assert!(nbits <= 32, "cannot encode {} bits", nbits);
        let section = self
            .bit_section
            .as_mut()
            .expect("bit encoding not active");
        for i in 0..nbits {
            section.bits.push((value >> i) & 1 == 1);
        }
    }

    /// Leave bit mode, flushing the section padded to a whole byte.
    pub fn end_bit_encoding(&mut self) {
        let section = self.bit_section.take().expect("bit encoding not active");
        let bytes = section.bits.as_raw_slice();
        if section.encode_size {
            encode_varint(bytes.len() as u64, &mut self.data);
        }
        self.data.extend_from_slice(bytes);
    }

    fn assert_byte_mode(&self) {
        assert!(
            self.bit_section.is_none(),
            "byte-aligned write while bit encoding is active"
        );
    }
}

/// Read cursor over an immutable byte slice
#[derive(Debug, Clone)]
pub struct DecoderBuffer<'a> {
    data: &'a [u8],
    pos: usize,
    bit_cursor: Option<BitCursor>,
}

#[derive(Debug, Clone, Copy)]
struct BitCursor {
    start: usize,
    end: usize,
    bit_pos: usize,
    sized: bool,
}

impl<'a> DecoderBuffer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            bit_cursor: None,
        }
    }

    pub fn remaining_size(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn bit_decoder_active(&self) -> bool {
        self.bit_cursor.is_some()
    }

    pub fn decode_u8(&mut self) -> Result<u8> {
        let bytes = self.decode_bytes(1)?;
        Ok(bytes[0])
    }

    pub fn decode_u32(&mut self) -> Result<u32> {
        let bytes = self.decode_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn decode_varint(&mut self) -> Result<u64> {
        self.assert_byte_mode();
        let (value, len) = decode_varint(&self.data[self.pos..])?;
        self.pos += len;
        Ok(value)
    }

    pub fn decode_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.assert_byte_mode();
        self.check_remaining(len)?;
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Enter bit mode. With `decode_size` the section length is read first
    /// and the cursor skips exactly that many bytes when bit mode ends.
    pub fn start_bit_decoding(&mut self, decode_size: bool) -> Result<()> {
        assert!(self.bit_cursor.is_none(), "bit decoding already active");
        let end = if decode_size {
            let size = self.decode_varint()?;
            let size = usize::try_from(size)
                .map_err(|_| Error::DecodeError("Bit section too large".into()))?;
            self.check_remaining(size)?;
            self.pos + size
        } else {
            self.data.len()
        };
        self.bit_cursor = Some(BitCursor {
            start: self.pos,
            end,
            bit_pos: 0,
            sized: decode_size,
        });
        Ok(())
    }

    /// Read `nbits` bits written by [`EncoderBuffer::encode_least_significant_bits32`].
    pub fn decode_least_significant_bits32(&mut self, nbits: u32) -> Result<u32> {
        assert!(nbits <= 32, "cannot decode {} bits", nbits);
        let cursor = self.bit_cursor.as_mut().expect("bit decoding not active");
        let bits = self.data[cursor.start..cursor.end].view_bits::<Lsb0>();
        let nbits = nbits as usize;
        if cursor.bit_pos + nbits > bits.len() {
            return Err(Error::BufferUnderflow {
                needed: (cursor.bit_pos + nbits + 7) / 8,
                remaining: cursor.end - cursor.start,
            });
        }
        let mut value = 0u32;
        for (i, bit) in bits[cursor.bit_pos..cursor.bit_pos + nbits].iter().enumerate() {
            if *bit {
                value |= 1 << i;
            }
        }
        cursor.bit_pos += nbits;
        Ok(value)
    }

    /// Leave bit mode and move past the consumed (or declared) bytes.
    pub fn end_bit_decoding(&mut self) {
        let cursor = self.bit_cursor.take().expect("bit decoding not active");
        self.pos = if cursor.sized {
            cursor.end
        } else {
            cursor.start + (cursor.bit_pos + 7) / 8
        };
    }

    fn check_remaining(&self, needed: usize) -> Result<()> {
        let remaining = self.remaining_size();
        if needed > remaining {
            return Err(Error::BufferUnderflow { needed, remaining });
        }
        Ok(())
    }

    fn assert_byte_mode(&self) {
        assert!(
            self.bit_cursor.is_none(),
            "byte-aligned read while bit decoding is active"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_roundtrip() {
        let mut enc = EncoderBuffer::new();
        enc.encode_u8(7);
        enc.encode_u32(0xDEAD_BEEF);
        enc.encode_varint(300);
        enc.encode_bytes(b"xyz");

        let data = enc.into_vec();
        let mut dec = DecoderBuffer::new(&data);
        assert_eq!(dec.decode_u8().unwrap(), 7);
        assert_eq!(dec.decode_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(dec.decode_varint().unwrap(), 300);
        assert_eq!(dec.decode_bytes(3).unwrap(), b"xyz");
        assert_eq!(dec.remaining_size(), 0);
    }

    #[test]
    fn test_u32_is_little_endian() {
        let mut enc = EncoderBuffer::new();
        enc.encode_u32(0x0102_0304);
        assert_eq!(enc.data(), &[4, 3, 2, 1]);
    }

    #[test]
    fn test_underflow() {
        let data = [1u8, 2];
        let mut dec = DecoderBuffer::new(&data);
        assert!(matches!(
            dec.decode_u32(),
            Err(Error::BufferUnderflow { needed: 4, remaining: 2 })
        ));
        // A failed read does not move the cursor.
        assert_eq!(dec.decode_u8().unwrap(), 1);
    }

    #[test]
    fn test_bit_section_unsized() {
        let mut enc = EncoderBuffer::new();
        enc.encode_u8(0xAA);
        enc.start_bit_encoding(false);
        enc.encode_least_significant_bits32(3, 0b101);
        enc.encode_least_significant_bits32(32, u32::MAX);
        enc.encode_least_significant_bits32(7, 0x55);
        enc.end_bit_encoding();
        enc.encode_u8(0xBB);

        let data = enc.into_vec();
        // 1 + ceil(42 / 8) + 1
        assert_eq!(data.len(), 8);

        let mut dec = DecoderBuffer::new(&data);
        assert_eq!(dec.decode_u8().unwrap(), 0xAA);
        dec.start_bit_decoding(false).unwrap();
        assert_eq!(dec.decode_least_significant_bits32(3).unwrap(), 0b101);
        assert_eq!(dec.decode_least_significant_bits32(32).unwrap(), u32::MAX);
        assert_eq!(dec.decode_least_significant_bits32(7).unwrap(), 0x55);
        dec.end_bit_decoding();
        assert_eq!(dec.decode_u8().unwrap(), 0xBB);
    }

    #[test]
    fn test_bit_section_sized() {
        let mut enc = EncoderBuffer::new();
        enc.start_bit_encoding(true);
        enc.encode_least_significant_bits32(12, 0xABC);
        enc.end_bit_encoding();
        enc.encode_u8(9);

        let data = enc.into_vec();
        assert_eq!(data[0], 2);

        let mut dec = DecoderBuffer::new(&data);
        dec.start_bit_decoding(true).unwrap();
        assert_eq!(dec.decode_least_significant_bits32(4).unwrap(), 0xC);
        // Skips the unread remainder of the section.
        dec.end_bit_decoding();
        assert_eq!(dec.decode_u8().unwrap(), 9);
    }

    #[test]
    fn test_bit_read_past_end_fails() {
        let data = [0xFFu8];
        let mut dec = DecoderBuffer::new(&data);
        dec.start_bit_decoding(false).unwrap();
        assert_eq!(dec.decode_least_significant_bits32(8).unwrap(), 0xFF);
        assert!(dec.decode_least_significant_bits32(1).is_err());
    }

    #[test]
    #[should_panic(expected = "bit encoding is active")]
    fn test_byte_write_in_bit_mode_panics() {
        let mut enc = EncoderBuffer::new();
        enc.start_bit_encoding(false);
        enc.encode_u8(1);
    }
}
