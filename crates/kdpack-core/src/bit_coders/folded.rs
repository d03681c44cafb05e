//! Bit-position folding
//!
//! Multi-bit values are split across 32 independent inner coders, one per
//! bit index counted from the most significant bit of the encoded slice, so
//! each position learns its own statistics. Single bits go to a separate
//! 33rd coder. The 32 position streams are written first, then the
//! single-bit stream.

use super::{assert_valid_nbits, BitDecoder, BitEncoder};
use crate::buffer::{DecoderBuffer, EncoderBuffer};
use crate::Result;

#[derive(Debug, Clone)]
pub struct FoldedBit32Encoder<E> {
    folded_number_encoders: [E; 32],
    bit_encoder: E,
}

impl<E: BitEncoder + Default> FoldedBit32Encoder<E> {
    pub fn new() -> Self {
        Self {
            folded_number_encoders: std::array::from_fn(|_| E::default()),
            bit_encoder: E::default(),
        }
    }
}

impl<E: BitEncoder + Default> Default for FoldedBit32Encoder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BitEncoder> BitEncoder for FoldedBit32Encoder<E> {
    fn start_encoding(&mut self) {
        for encoder in &mut self.folded_number_encoders {
            encoder.start_encoding();
        }
        self.bit_encoder.start_encoding();
    }

    #[inline]
    fn encode_bit(&mut self, bit: bool) {
        self.bit_encoder.encode_bit(bit);
    }

    fn encode_least_significant_bits32(&mut self, nbits: u32, value: u32) {
        assert_valid_nbits(nbits);
        for (i, encoder) in self.folded_number_encoders[..nbits as usize]
            .iter_mut()
            .enumerate()
        {
            let shift = nbits - 1 - i as u32;
            encoder.encode_bit((value >> shift) & 1 == 1);
        }
    }

    fn end_encoding(&mut self, target: &mut EncoderBuffer) -> Result<()> {
        for encoder in &mut self.folded_number_encoders {
            encoder.end_encoding(target)?;
        }
        self.bit_encoder.end_encoding(target)
    }
}

#[derive(Debug, Clone)]
pub struct FoldedBit32Decoder<D> {
    folded_number_decoders: [D; 32],
    bit_decoder: D,
}

impl<D: Default> FoldedBit32Decoder<D> {
    pub fn new() -> Self {
        Self {
            folded_number_decoders: std::array::from_fn(|_| D::default()),
            bit_decoder: D::default(),
        }
    }
}

impl<D: Default> Default for FoldedBit32Decoder<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, D: BitDecoder<'a>> BitDecoder<'a> for FoldedBit32Decoder<D> {
    fn start_decoding(&mut self, source: &mut DecoderBuffer<'a>) -> Result<()> {
        for decoder in &mut self.folded_number_decoders {
            decoder.start_decoding(source)?;
        }
        self.bit_decoder.start_decoding(source)
    }

    #[inline]
    fn decode_next_bit(&mut self) -> bool {
        self.bit_decoder.decode_next_bit()
    }

    fn decode_least_significant_bits32(&mut self, nbits: u32) -> u32 {
        assert_valid_nbits(nbits);
        self.folded_number_decoders[..nbits as usize]
            .iter_mut()
            .fold(0u32, |acc, decoder| (acc << 1) | decoder.decode_next_bit() as u32)
    }

    fn end_decoding(&mut self) {
        for decoder in &mut self.folded_number_decoders {
            decoder.end_decoding();
        }
        self.bit_decoder.end_decoding();
    }
}
