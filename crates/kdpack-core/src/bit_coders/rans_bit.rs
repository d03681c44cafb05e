//! rABS bit coder with a single, stream-wide probability
//!
//! The encoder buffers every bit, derives `p0` from the final zero/one counts
//! and replays the bits in reverse so the decoder can read them forward.
//! Stream: `[p0: u8][size: varint][ans bytes]`.

use bitvec::prelude::*;
use tracing::debug;

use super::{assert_valid_nbits, BitDecoder, BitEncoder};
use crate::ans::{AnsDecoder, AnsEncoder};
use crate::buffer::{DecoderBuffer, EncoderBuffer};
use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct RAnsBitEncoder {
    bits: BitVec,
    bit_counts: [u64; 2],
}

impl RAnsBitEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn clear(&mut self) {
        self.bits.clear();
        self.bit_counts = [0; 2];
    }

    /// Probability of zero mapped to `[1, 255]` (128 is one half).
    fn zero_probability(&self) -> u8 {
        let total = (self.bit_counts[0] + self.bit_counts[1]).max(1);
        let raw = ((self.bit_counts[0] as f64 / total as f64) * 256.0 + 0.5) as u32;
        raw.clamp(1, 255) as u8
    }
}

impl BitEncoder for RAnsBitEncoder {
    fn start_encoding(&mut self) {
        self.clear();
    }

    #[inline]
    fn encode_bit(&mut self, bit: bool) {
        self.bit_counts[bit as usize] += 1;
        self.bits.push(bit);
    }

    fn encode_least_significant_bits32(&mut self, nbits: u32, value: u32) {
        assert_valid_nbits(nbits);
        let ones = crate::bits::count_one_bits32(crate::bits::low_bits(value, nbits));
        self.bit_counts[1] += ones as u64;
        self.bit_counts[0] += (nbits - ones) as u64;
        for i in (0..nbits).rev() {
            self.bits.push((value >> i) & 1 == 1);
        }
    }

    fn end_encoding(&mut self, target: &mut EncoderBuffer) -> Result<()> {
        let zero_prob = self.zero_probability();

        let mut ans = AnsEncoder::with_capacity(self.bits.len() / 8 + 8);
        for bit in self.bits.iter().by_vals().rev() {
            ans.rabs_write(bit, zero_prob);
        }
        let data = ans.write_end();
        debug!(
            bits = self.bits.len(),
            zero_prob,
            bytes = data.len(),
            "rABS bit stream encoded"
        );

        target.encode_u8(zero_prob);
        target.encode_varint(data.len() as u64);
        target.encode_bytes(&data);
        self.clear();
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RAnsBitDecoder<'a> {
    ans: Option<AnsDecoder<'a>>,
    prob_zero: u8,
}

impl<'a> RAnsBitDecoder<'a> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<'a> BitDecoder<'a> for RAnsBitDecoder<'a> {
    fn start_decoding(&mut self, source: &mut DecoderBuffer<'a>) -> Result<()> {
        self.ans = None;
        self.prob_zero = source.decode_u8()?;
        if self.prob_zero == 0 {
            return Err(Error::DecodeError("Zero probability in rABS header".into()));
        }
        let size = source.decode_varint()?;
        let size = usize::try_from(size)
            .map_err(|_| Error::DecodeError("rABS stream too large".into()))?;
        let data = source.decode_bytes(size)?;
        self.ans = Some(AnsDecoder::new(data)?);
        Ok(())
    }

    #[inline]
    fn decode_next_bit(&mut self) -> bool {
        match self.ans.as_mut() {
            Some(ans) if !ans.is_exhausted() => ans.rabs_read(self.prob_zero),
            _ => false,
        }
    }

    fn end_decoding(&mut self) {
        self.ans = None;
    }
}
