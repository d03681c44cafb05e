//! rABS bit coder with a per-bit adaptive probability
//!
//! The probability of zero starts at 0.5 and after every bit moves towards
//! the observed value: `p0' = p0 * 127/128 + (!bit) / 128`. The decoder
//! replays the same update, so the encoder has to feed the ANS state the
//! probabilities of the *forward* sequence while writing the bits in
//! reverse. Stream: `[size: u32][ans bytes]`.

use bitvec::prelude::*;
use tracing::debug;

use super::{BitDecoder, BitEncoder};
use crate::ans::{AnsDecoder, AnsEncoder};
use crate::buffer::{DecoderBuffer, EncoderBuffer};
use crate::{Error, Result};

const ADAPTATION_WINDOW: f64 = 128.0;
const INITIAL_PROBABILITY: f64 = 0.5;

/// Map a probability in `[0, 1]` to the `[1, 255]` range used by rABS.
pub fn clamp_probability(p: f64) -> u8 {
    debug_assert!((0.0..=1.0).contains(&p));
    let p_int = (p * 256.0 + 0.5) as u32;
    p_int.clamp(1, 255) as u8
}

#[inline]
fn update_probability(old_p: f64, bit: bool) -> f64 {
    const W0: f64 = (ADAPTATION_WINDOW - 1.0) / ADAPTATION_WINDOW;
    const W1: f64 = 1.0 / ADAPTATION_WINDOW;
    old_p * W0 + (!bit as u8 as f64) * W1
}

#[derive(Debug, Clone, Default)]
pub struct AdaptiveRAnsBitEncoder {
    bits: BitVec,
}

impl AdaptiveRAnsBitEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BitEncoder for AdaptiveRAnsBitEncoder {
    fn start_encoding(&mut self) {
        self.bits.clear();
    }

    #[inline]
    fn encode_bit(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    fn end_encoding(&mut self, target: &mut EncoderBuffer) -> Result<()> {
        let mut p0_f = INITIAL_PROBABILITY;
        let mut p0s = Vec::with_capacity(self.bits.len());
        for bit in self.bits.iter().by_vals() {
            p0s.push(clamp_probability(p0_f));
            p0_f = update_probability(p0_f, bit);
        }

        let mut ans = AnsEncoder::with_capacity(self.bits.len() / 8 + 16);
        for (bit, &p0) in self.bits.iter().by_vals().rev().zip(p0s.iter().rev()) {
            ans.rabs_write(bit, p0);
        }
        let data = ans.write_end();
        debug!(bits = self.bits.len(), bytes = data.len(), "adaptive rABS bit stream encoded");

        let size = u32::try_from(data.len())
            .map_err(|_| Error::EncodeError("Adaptive bit stream exceeds 4 GiB".into()))?;
        target.encode_u32(size);
        target.encode_bytes(&data);
        self.bits.clear();
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AdaptiveRAnsBitDecoder<'a> {
    ans: Option<AnsDecoder<'a>>,
    p0_f: f64,
}

impl<'a> AdaptiveRAnsBitDecoder<'a> {
    pub fn new() -> Self {
        Self {
            ans: None,
            p0_f: INITIAL_PROBABILITY,
        }
    }
}

impl<'a> Default for AdaptiveRAnsBitDecoder<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> BitDecoder<'a> for AdaptiveRAnsBitDecoder<'a> {
    fn start_decoding(&mut self, source: &mut DecoderBuffer<'a>) -> Result<()> {
        self.ans = None;
        self.p0_f = INITIAL_PROBABILITY;
        let size = source.decode_u32()? as usize;
        let data = source.decode_bytes(size)?;
        self.ans = Some(AnsDecoder::new(data)?);
        Ok(())
    }

    #[inline]
    fn decode_next_bit(&mut self) -> bool {
        let Some(ans) = self.ans.as_mut() else {
            return false;
        };
        if ans.is_exhausted() {
            return false;
        }
        let bit = ans.rabs_read(clamp_probability(self.p0_f));
        self.p0_f = update_probability(self.p0_f, bit);
        bit
    }

    fn end_decoding(&mut self) {
        self.ans = None;
    }
}
