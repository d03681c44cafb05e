//! Multi-symbol rANS coder with a compile-time precision

use super::{read_state, write_state, ANS_IO_BASE};
use crate::{Error, Result};

pub const MIN_RANS_PRECISION_BITS: u32 = 12;
pub const MAX_RANS_PRECISION_BITS: u32 = 20;

/// Probability slot of one symbol
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RAnsSymbol {
    pub prob: u32,
    pub cum_prob: u32,
}

/// rANS encoder over a precision of `2^PRECISION_BITS`
#[derive(Debug, Clone)]
pub struct RAnsEncoder<const PRECISION_BITS: u32> {
    buf: Vec<u8>,
    state: u32,
}

impl<const PRECISION_BITS: u32> RAnsEncoder<PRECISION_BITS> {
    pub const PRECISION: u32 = 1 << PRECISION_BITS;
    pub const L_BASE: u32 = Self::PRECISION * 4;

    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        debug_assert!(
            (MIN_RANS_PRECISION_BITS..=MAX_RANS_PRECISION_BITS).contains(&PRECISION_BITS)
        );
        Self {
            buf: Vec::with_capacity(capacity),
            state: Self::L_BASE,
        }
    }

    /// Encode one symbol. `sym.prob` must be non-zero.
    #[inline]
    pub fn rans_write(&mut self, sym: &RAnsSymbol) {
        let p = sym.prob;
        debug_assert!(p > 0, "cannot encode a zero-probability symbol");
        while self.state >= Self::L_BASE / Self::PRECISION * ANS_IO_BASE * p {
            self.buf.push((self.state % ANS_IO_BASE) as u8);
            self.state /= ANS_IO_BASE;
        }
        self.state = (self.state / p) * Self::PRECISION + self.state % p + sym.cum_prob;
    }

    pub fn write_end(mut self) -> Vec<u8> {
        debug_assert!(self.state >= Self::L_BASE);
        write_state(&mut self.buf, self.state - Self::L_BASE, true);
        self.buf
    }
}

impl<const PRECISION_BITS: u32> Default for RAnsEncoder<PRECISION_BITS> {
    fn default() -> Self {
        Self::new()
    }
}

/// rANS decoder over a precision of `2^PRECISION_BITS`
///
/// The probability table is installed with
/// [`rans_build_look_up_table`](Self::rans_build_look_up_table) before the
/// stream is attached with [`read_init`](Self::read_init).
#[derive(Debug, Clone)]
pub struct RAnsDecoder<'a, const PRECISION_BITS: u32> {
    buf: &'a [u8],
    offset: usize,
    state: u32,
    lut: Vec<u32>,
    probability_table: Vec<RAnsSymbol>,
}

impl<'a, const PRECISION_BITS: u32> RAnsDecoder<'a, PRECISION_BITS> {
    pub const PRECISION: u32 = 1 << PRECISION_BITS;
    pub const L_BASE: u32 = Self::PRECISION * 4;

    pub fn new() -> Self {
        Self {
            buf: &[],
            offset: 0,
            state: Self::L_BASE,
            lut: Vec::new(),
            probability_table: Vec::new(),
        }
    }

    /// Map every remainder in `[0, precision)` to its owning symbol.
    pub fn rans_build_look_up_table(&mut self, probs: &[u32]) -> Result<()> {
        self.lut.clear();
        self.lut.reserve(Self::PRECISION as usize);
        self.probability_table.clear();
        self.probability_table.reserve(probs.len());

        let mut cum_prob: u32 = 0;
        for (symbol, &prob) in probs.iter().enumerate() {
            self.probability_table.push(RAnsSymbol { prob, cum_prob });
            cum_prob = cum_prob
                .checked_add(prob)
                .filter(|&c| c <= Self::PRECISION)
                .ok_or_else(|| {
                    Error::InvalidProbabilityTable(format!(
                        "cumulative probability exceeds {}",
                        Self::PRECISION
                    ))
                })?;
            self.lut
                .extend(std::iter::repeat(symbol as u32).take(prob as usize));
        }

        if cum_prob != Self::PRECISION {
            return Err(Error::InvalidProbabilityTable(format!(
                "probabilities sum to {}, expected {}",
                cum_prob,
                Self::PRECISION
            )));
        }
        Ok(())
    }

    pub fn read_init(&mut self, buf: &'a [u8]) -> Result<()> {
        let (offset, state) = read_state(buf, true)?;
        let state = state + Self::L_BASE;
        if state >= Self::L_BASE * ANS_IO_BASE {
            return Err(Error::DecodeError("rANS state out of range".into()));
        }
        self.buf = buf;
        self.offset = offset;
        self.state = state;
        Ok(())
    }

    #[inline]
    pub fn rans_read(&mut self) -> u32 {
        while self.state < Self::L_BASE && self.offset > 0 {
            self.offset -= 1;
            self.state = self.state * ANS_IO_BASE + self.buf[self.offset] as u32;
        }
        let quo = self.state / Self::PRECISION;
        let rem = self.state % Self::PRECISION;
        let symbol = self.lut[rem as usize];
        let sym = self.probability_table[symbol as usize];
        self.state = quo * sym.prob + rem - sym.cum_prob;
        symbol
    }

    pub fn read_end(&self) -> bool {
        self.state == Self::L_BASE
    }

    pub fn reader_has_error(&self) -> bool {
        self.state < Self::L_BASE && self.offset == 0
    }
}

impl<'a, const PRECISION_BITS: u32> Default for RAnsDecoder<'a, PRECISION_BITS> {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! for_each_precision {
    ($value:expr, $inner:ident => $body:expr) => {
        match $value {
            Self::P12($inner) => $body,
            Self::P13($inner) => $body,
            Self::P14($inner) => $body,
            Self::P15($inner) => $body,
            Self::P16($inner) => $body,
            Self::P17($inner) => $body,
            Self::P18($inner) => $body,
            Self::P19($inner) => $body,
            Self::P20($inner) => $body,
        }
    };
}

/// [`RAnsEncoder`] with its precision picked at run time
#[derive(Debug, Clone)]
pub enum RAnsEncoderDispatch {
    P12(RAnsEncoder<12>),
    P13(RAnsEncoder<13>),
    P14(RAnsEncoder<14>),
    P15(RAnsEncoder<15>),
    P16(RAnsEncoder<16>),
    P17(RAnsEncoder<17>),
    P18(RAnsEncoder<18>),
    P19(RAnsEncoder<19>),
    P20(RAnsEncoder<20>),
}

impl RAnsEncoderDispatch {
    /// Panics when `precision_bits` is outside `12..=20`.
    pub fn new(precision_bits: u32, capacity: usize) -> Self {
        match precision_bits {
            12 => Self::P12(RAnsEncoder::with_capacity(capacity)),
            13 => Self::P13(RAnsEncoder::with_capacity(capacity)),
            14 => Self::P14(RAnsEncoder::with_capacity(capacity)),
            15 => Self::P15(RAnsEncoder::with_capacity(capacity)),
            16 => Self::P16(RAnsEncoder::with_capacity(capacity)),
            17 => Self::P17(RAnsEncoder::with_capacity(capacity)),
            18 => Self::P18(RAnsEncoder::with_capacity(capacity)),
            19 => Self::P19(RAnsEncoder::with_capacity(capacity)),
            20 => Self::P20(RAnsEncoder::with_capacity(capacity)),
            _ => panic!("unsupported rANS precision: {} bits", precision_bits),
        }
    }

    #[inline]
    pub fn rans_write(&mut self, sym: &RAnsSymbol) {
        for_each_precision!(self, ans => ans.rans_write(sym))
    }

    pub fn write_end(self) -> Vec<u8> {
        for_each_precision!(self, ans => ans.write_end())
    }
}

/// [`RAnsDecoder`] with its precision picked at run time
#[derive(Debug, Clone)]
pub enum RAnsDecoderDispatch<'a> {
    P12(RAnsDecoder<'a, 12>),
    P13(RAnsDecoder<'a, 13>),
    P14(RAnsDecoder<'a, 14>),
    P15(RAnsDecoder<'a, 15>),
    P16(RAnsDecoder<'a, 16>),
    P17(RAnsDecoder<'a, 17>),
    P18(RAnsDecoder<'a, 18>),
    P19(RAnsDecoder<'a, 19>),
    P20(RAnsDecoder<'a, 20>),
}

impl<'a> RAnsDecoderDispatch<'a> {
    pub fn new(precision_bits: u32) -> Result<Self> {
        Ok(match precision_bits {
            12 => Self::P12(RAnsDecoder::new()),
            13 => Self::P13(RAnsDecoder::new()),
            14 => Self::P14(RAnsDecoder::new()),
            15 => Self::P15(RAnsDecoder::new()),
            16 => Self::P16(RAnsDecoder::new()),
            17 => Self::P17(RAnsDecoder::new()),
            18 => Self::P18(RAnsDecoder::new()),
            19 => Self::P19(RAnsDecoder::new()),
            20 => Self::P20(RAnsDecoder::new()),
            _ => {
                return Err(Error::InvalidHeader(format!(
                    "unsupported rANS precision: {} bits",
                    precision_bits
                )))
            }
        })
    }

    pub fn rans_build_look_up_table(&mut self, probs: &[u32]) -> Result<()> {
        for_each_precision!(self, ans => ans.rans_build_look_up_table(probs))
    }

    pub fn read_init(&mut self, buf: &'a [u8]) -> Result<()> {
        for_each_precision!(self, ans => ans.read_init(buf))
    }

    #[inline]
    pub fn rans_read(&mut self) -> u32 {
        for_each_precision!(self, ans => ans.rans_read())
    }

    pub fn read_end(&self) -> bool {
        for_each_precision!(self, ans => ans.read_end())
    }
}
