//! Asymmetric numeral system primitives
//!
//! Two coders share the same state machine and trailer format:
//!
//! - **rABS**: binary coder with an 8-bit probability of zero (`p0`) over a
//!   precision of 256 (descending spread).
//! - **rANS**: multi-symbol coder over a power-of-two precision chosen at
//!   compile time (`RAnsEncoder<PRECISION_BITS>`), with a lookup table for
//!   O(1) decoding.
//!
//! The encoder emits renormalization bytes forward and appends the final
//! state as a 1-4 byte trailer. The decoder starts from that trailer and
//! consumes bytes from the tail, so symbols come back in the reverse of the
//! order they were written. Callers that want forward decoding encode in
//! reverse.
//!
//! Trailer layout (`state - L_BASE`, little-endian, tag in the top 2 bits of
//! the last byte):
//!
//! ```text
//! 00 | 6 bits            (1 byte)
//! 01 | 14 bits           (2 bytes)
//! 10 | 22 bits           (3 bytes)
//! 11 | 30 bits           (4 bytes, rANS only)
//! ```

mod rans;

pub use rans::{
    RAnsDecoder, RAnsDecoderDispatch, RAnsEncoder, RAnsEncoderDispatch, RAnsSymbol,
    MAX_RANS_PRECISION_BITS, MIN_RANS_PRECISION_BITS,
};

use crate::{Error, Result};

/// Precision of the rABS probability
pub const ANS_P8_PRECISION: u32 = 256;
/// Lower bound of the rABS state
pub const ANS_L_BASE: u32 = 4096;
/// Renormalization radix
pub const ANS_IO_BASE: u32 = 256;

/// rABS encoder
#[derive(Debug, Clone)]
pub struct AnsEncoder {
    buf: Vec<u8>,
    state: u32,
}

impl AnsEncoder {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            state: ANS_L_BASE,
        }
    }

    /// Encode `bit` with probability of zero `p0 / 256`.
    #[inline]
    pub fn rabs_write(&mut self, bit: bool, p0: u8) {
        debug_assert!(p0 > 0, "p0 must be in [1, 255]");
        let p0 = p0 as u32;
        let p = ANS_P8_PRECISION - p0;
        let l_s = if bit { p } else { p0 };
        if self.state >= ANS_L_BASE / ANS_P8_PRECISION * ANS_IO_BASE * l_s {
            self.buf.push((self.state % ANS_IO_BASE) as u8);
            self.state /= ANS_IO_BASE;
        }
        let quot = self.state / l_s;
        let rem = self.state % l_s;
        self.state = quot * ANS_P8_PRECISION + rem + if bit { 0 } else { p };
    }

    /// Append the state trailer and return the encoded bytes.
    pub fn write_end(mut self) -> Vec<u8> {
        debug_assert!(self.state >= ANS_L_BASE);
        debug_assert!(self.state < ANS_L_BASE * ANS_IO_BASE);
        write_state(&mut self.buf, self.state - ANS_L_BASE, false);
        self.buf
    }
}

impl Default for AnsEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// rABS decoder
#[derive(Debug, Clone)]
pub struct AnsDecoder<'a> {
    buf: &'a [u8],
    offset: usize,
    state: u32,
}

impl<'a> AnsDecoder<'a> {
    /// Initialize from a complete rABS stream (`read_init`).
    pub fn new(buf: &'a [u8]) -> Result<Self> {
        let (offset, state) = read_state(buf, false)?;
        let state = state + ANS_L_BASE;
        if state >= ANS_L_BASE * ANS_IO_BASE {
            return Err(Error::DecodeError("ANS state out of range".into()));
        }
        Ok(Self { buf, offset, state })
    }

    /// Decode one bit given the probability of zero `p0 / 256`.
    #[inline]
    pub fn rabs_read(&mut self, p0: u8) -> bool {
        let p = ANS_P8_PRECISION - p0 as u32;
        if self.state < ANS_L_BASE && self.offset > 0 {
            self.offset -= 1;
            self.state = self.state * ANS_IO_BASE + self.buf[self.offset] as u32;
        }
        let x = self.state;
        let quot = x / ANS_P8_PRECISION;
        let rem = x % ANS_P8_PRECISION;
        let xn = quot * p;
        let bit = rem < p;
        self.state = if bit { xn + rem } else { x - xn - p };
        bit
    }

    /// True when the decoder returned to the initial encoder state.
    pub fn read_end(&self) -> bool {
        self.state == ANS_L_BASE
    }

    /// True once every encoded bit has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.offset == 0 && self.state == ANS_L_BASE
    }
}

/// Append `state` (already offset by `L_BASE`) as a tagged trailer.
pub(crate) fn write_state(buf: &mut Vec<u8>, state: u32, allow_four_bytes: bool) {
    if state < (1 << 6) {
        buf.push(state as u8);
    } else if state < (1 << 14) {
        buf.extend_from_slice(&((0x01 << 14) + state as u16).to_le_bytes());
    } else if state < (1 << 22) {
        let v = (0x02 << 22) + state;
        buf.extend_from_slice(&v.to_le_bytes()[..3]);
    } else if allow_four_bytes && state < (1 << 30) {
        buf.extend_from_slice(&((0x03 << 30) + state).to_le_bytes());
    } else {
        panic!("ANS state {} is too large to be serialized", state);
    }
}

/// Parse the trailer at the end of `buf`; returns the offset of the first
/// trailer byte and the raw state (without `L_BASE`).
pub(crate) fn read_state(buf: &[u8], allow_four_bytes: bool) -> Result<(usize, u32)> {
    let Some(&last) = buf.last() else {
        return Err(Error::DecodeError("Empty ANS stream".into()));
    };
    let len = buf.len();
    let truncated = || Error::DecodeError("Truncated ANS state".into());
    match last >> 6 {
        0 => Ok((len - 1, (last & 0x3F) as u32)),
        1 => {
            if len < 2 {
                return Err(truncated());
            }
            let v = u16::from_le_bytes([buf[len - 2], buf[len - 1]]) as u32;
            Ok((len - 2, v & 0x3FFF))
        }
        2 => {
            if len < 3 {
                return Err(truncated());
            }
            let v = u32::from_le_bytes([buf[len - 3], buf[len - 2], buf[len - 1], 0]);
            Ok((len - 3, v & 0x3F_FFFF))
        }
        _ if allow_four_bytes => {
            if len < 4 {
                return Err(truncated());
            }
            let v = u32::from_le_bytes([buf[len - 4], buf[len - 3], buf[len - 2], buf[len - 1]]);
            Ok((len - 4, v & 0x3FFF_FFFF))
        }
        tag => Err(Error::DecodeError(format!("Invalid ANS state tag {}", tag))),
    }
}
