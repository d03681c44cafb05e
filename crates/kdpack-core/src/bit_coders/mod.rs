//! Bit coders
//!
//! Every coder implements the same contract: a session is opened with
//! `start_*`, fed bits or the low `nbits` of a `u32` (most significant bit of
//! that slice first), and closed with `end_*`. Decoders never fail once the
//! stream has been attached; reading past the end yields zero bits, so
//! callers bound the number of reads themselves.
//!
//! | Coder | Storage |
//! |---|---|
//! | [`DirectBitEncoder`] | raw 32-bit words, no compression |
//! | [`RAnsBitEncoder`] | rABS with one probability for the whole stream |
//! | [`AdaptiveRAnsBitEncoder`] | rABS with a running probability |
//! | [`FoldedBit32Encoder`] | one inner coder per bit position |
//! | [`SymbolBitEncoder`] | each value is one symbol of the symbol codec |

mod adaptive;
mod direct;
mod folded;
mod rans_bit;
mod symbol_bit;

pub use adaptive::{clamp_probability, AdaptiveRAnsBitDecoder, AdaptiveRAnsBitEncoder};
pub use direct::{DirectBitDecoder, DirectBitEncoder};
pub use folded::{FoldedBit32Decoder, FoldedBit32Encoder};
pub use rans_bit::{RAnsBitDecoder, RAnsBitEncoder};
pub use symbol_bit::{SymbolBitDecoder, SymbolBitEncoder, DEFAULT_MAX_SYMBOLS};

use serde::{Deserialize, Serialize};

use crate::buffer::{DecoderBuffer, EncoderBuffer};
use crate::Result;

/// Encoding half of the bit coder contract
pub trait BitEncoder {
    fn start_encoding(&mut self);

    fn encode_bit(&mut self, bit: bool);

    /// Encode the low `nbits` of `value`, most significant first.
    /// `nbits` must be in `1..=32`.
    fn encode_least_significant_bits32(&mut self, nbits: u32, value: u32) {
        assert_valid_nbits(nbits);
        for i in (0..nbits).rev() {
            self.encode_bit((value >> i) & 1 == 1);
        }
    }

    /// Flush the session into `target`.
    fn end_encoding(&mut self, target: &mut EncoderBuffer) -> Result<()>;
}

/// Decoding half of the bit coder contract
pub trait BitDecoder<'a> {
    /// Attach the stream at the cursor and move the cursor past it.
    fn start_decoding(&mut self, source: &mut DecoderBuffer<'a>) -> Result<()>;

    fn decode_next_bit(&mut self) -> bool;

    fn decode_least_significant_bits32(&mut self, nbits: u32) -> u32 {
        assert_valid_nbits(nbits);
        let mut result = 0u32;
        for _ in 0..nbits {
            result = (result << 1) | self.decode_next_bit() as u32;
        }
        result
    }

    fn end_decoding(&mut self) {}
}

#[inline]
pub(crate) fn assert_valid_nbits(nbits: u32) {
    assert!(
        (1..=32).contains(&nbits),
        "bit count must be in [1, 32], got {}",
        nbits
    );
}

/// Selects one of the concrete coders at run time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitCoderKind {
    Direct,
    RAns,
    AdaptiveRAns,
    FoldedRAns,
    FoldedAdaptiveRAns,
    Symbol,
}

/// Encoder for any [`BitCoderKind`]
#[derive(Debug, Clone)]
pub enum AnyBitEncoder {
    Direct(DirectBitEncoder),
    RAns(RAnsBitEncoder),
    AdaptiveRAns(AdaptiveRAnsBitEncoder),
    FoldedRAns(Box<FoldedBit32Encoder<RAnsBitEncoder>>),
    FoldedAdaptiveRAns(Box<FoldedBit32Encoder<AdaptiveRAnsBitEncoder>>),
    Symbol(SymbolBitEncoder),
}

macro_rules! dispatch_coder {
    ($value:expr, $inner:ident => $body:expr) => {
        match $value {
            Self::Direct($inner) => $body,
            Self::RAns($inner) => $body,
            Self::AdaptiveRAns($inner) => $body,
            Self::FoldedRAns($inner) => $body,
            Self::FoldedAdaptiveRAns($inner) => $body,
            Self::Symbol($inner) => $body,
        }
    };
}

impl AnyBitEncoder {
    pub fn new(kind: BitCoderKind) -> Self {
        match kind {
            BitCoderKind::Direct => Self::Direct(DirectBitEncoder::new()),
            BitCoderKind::RAns => Self::RAns(RAnsBitEncoder::new()),
            BitCoderKind::AdaptiveRAns => Self::AdaptiveRAns(AdaptiveRAnsBitEncoder::new()),
            BitCoderKind::FoldedRAns => Self::FoldedRAns(Box::default()),
            BitCoderKind::FoldedAdaptiveRAns => Self::FoldedAdaptiveRAns(Box::default()),
            BitCoderKind::Symbol => Self::Symbol(SymbolBitEncoder::new()),
        }
    }

    pub fn kind(&self) -> BitCoderKind {
        match self {
            Self::Direct(_) => BitCoderKind::Direct,
            Self::RAns(_) => BitCoderKind::RAns,
            Self::AdaptiveRAns(_) => BitCoderKind::AdaptiveRAns,
            Self::FoldedRAns(_) => BitCoderKind::FoldedRAns,
            Self::FoldedAdaptiveRAns(_) => BitCoderKind::FoldedAdaptiveRAns,
            Self::Symbol(_) => BitCoderKind::Symbol,
        }
    }
}

impl BitEncoder for AnyBitEncoder {
    fn start_encoding(&mut self) {
        dispatch_coder!(self, coder => coder.start_encoding())
    }

    #[inline]
    fn encode_bit(&mut self, bit: bool) {
        dispatch_coder!(self, coder => coder.encode_bit(bit))
    }

    #[inline]
    fn encode_least_significant_bits32(&mut self, nbits: u32, value: u32) {
        dispatch_coder!(self, coder => coder.encode_least_significant_bits32(nbits, value))
    }

    fn end_encoding(&mut self, target: &mut EncoderBuffer) -> Result<()> {
        dispatch_coder!(self, coder => coder.end_encoding(target))
    }
}

/// Decoder for any [`BitCoderKind`]
#[derive(Debug, Clone)]
pub enum AnyBitDecoder<'a> {
    Direct(DirectBitDecoder),
    RAns(RAnsBitDecoder<'a>),
    AdaptiveRAns(AdaptiveRAnsBitDecoder<'a>),
    FoldedRAns(Box<FoldedBit32Decoder<RAnsBitDecoder<'a>>>),
    FoldedAdaptiveRAns(Box<FoldedBit32Decoder<AdaptiveRAnsBitDecoder<'a>>>),
    Symbol(SymbolBitDecoder),
}

impl<'a> AnyBitDecoder<'a> {
    pub fn new(kind: BitCoderKind) -> Self {
        match kind {
            BitCoderKind::Direct => Self::Direct(DirectBitDecoder::new()),
            BitCoderKind::RAns => Self::RAns(RAnsBitDecoder::new()),
            BitCoderKind::AdaptiveRAns => Self::AdaptiveRAns(AdaptiveRAnsBitDecoder::new()),
            BitCoderKind::FoldedRAns => Self::FoldedRAns(Box::default()),
            BitCoderKind::FoldedAdaptiveRAns => Self::FoldedAdaptiveRAns(Box::default()),
            BitCoderKind::Symbol => Self::Symbol(SymbolBitDecoder::new()),
        }
    }

    /// Like [`new`](Self::new), with symbol backed decoders refusing streams
    /// of more than `max_symbols` symbols. Other kinds read no count.
    pub fn with_max_symbols(kind: BitCoderKind, max_symbols: u32) -> Self {
        match kind {
            BitCoderKind::Symbol => Self::Symbol(SymbolBitDecoder::with_max_symbols(max_symbols)),
            _ => Self::new(kind),
        }
    }
}

impl<'a> BitDecoder<'a> for AnyBitDecoder<'a> {
    fn start_decoding(&mut self, source: &mut DecoderBuffer<'a>) -> Result<()> {
        dispatch_coder!(self, coder => coder.start_decoding(source))
    }

    #[inline]
    fn decode_next_bit(&mut self) -> bool {
        dispatch_coder!(self, coder => coder.decode_next_bit())
    }

    #[inline]
    fn decode_least_significant_bits32(&mut self, nbits: u32) -> u32 {
        dispatch_coder!(self, coder => coder.decode_least_significant_bits32(nbits))
    }

    fn end_decoding(&mut self) {
        dispatch_coder!(self, coder => coder.end_decoding())
    }
}
