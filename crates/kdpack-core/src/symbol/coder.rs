//! rANS coder over a serialized probability table
//!
//! Stream: `[table][ans size: varint][ans bytes]`. The table is written by
//! [`RAnsSymbolEncoder::create`]; symbols have to be fed in reverse so the
//! decoder returns them in order.

use crate::ans::{RAnsDecoderDispatch, RAnsEncoderDispatch};
use crate::buffer::{DecoderBuffer, EncoderBuffer};
use crate::{Error, Result};

use super::table::ProbabilityTable;

/// Precision bits before clamping, 1.5x the symbol bit length.
pub fn compute_rans_unclamped_precision(symbols_bit_length: u32) -> u32 {
    (3 * symbols_bit_length) / 2
}

/// Precision for an alphabet of about `2^symbols_bit_length` symbols,
/// clamped to `12..=20` bits.
pub fn compute_rans_precision_from_unique_symbols_bit_length(symbols_bit_length: u32) -> u32 {
    compute_rans_unclamped_precision(symbols_bit_length).clamp(12, 20)
}

#[derive(Debug, Clone)]
pub struct RAnsSymbolEncoder {
    table: ProbabilityTable,
    ans: Option<RAnsEncoderDispatch>,
    num_expected_bits: u64,
}

impl RAnsSymbolEncoder {
    /// Build the table for `frequencies` and write it to `target`.
    pub fn create(
        frequencies: &[u64],
        unique_symbols_bit_length: u32,
        target: &mut EncoderBuffer,
    ) -> Result<Self> {
        let precision_bits =
            compute_rans_precision_from_unique_symbols_bit_length(unique_symbols_bit_length);
        let table = ProbabilityTable::from_frequencies(frequencies, precision_bits)?;
        let num_expected_bits = table.expected_bits(frequencies);
        table.encode(target)?;
        Ok(Self {
            table,
            ans: None,
            num_expected_bits,
        })
    }

    pub fn table(&self) -> &ProbabilityTable {
        &self.table
    }

    pub fn num_expected_bits(&self) -> u64 {
        self.num_expected_bits
    }

    pub fn start_encoding(&mut self) {
        let capacity = (self.num_expected_bits / 8) as usize + 8;
        self.ans = Some(RAnsEncoderDispatch::new(
            self.table.precision_bits(),
            capacity,
        ));
    }

    /// Panics when `symbol` has no probability in the table.
    #[inline]
    pub fn encode_symbol(&mut self, symbol: u32) {
        let ans = self.ans.as_mut().expect("symbol encoding not started");
        ans.rans_write(self.table.symbol(symbol));
    }

    pub fn end_encoding(&mut self, target: &mut EncoderBuffer) -> Result<()> {
        let ans = self.ans.take().expect("symbol encoding not started");
        let data = ans.write_end();
        target.encode_varint(data.len() as u64);
        target.encode_bytes(&data);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RAnsSymbolDecoder<'a> {
    ans: RAnsDecoderDispatch<'a>,
    num_symbols: usize,
}

impl<'a> RAnsSymbolDecoder<'a> {
    /// Read the probability table at the cursor.
    pub fn create(source: &mut DecoderBuffer<'a>, unique_symbols_bit_length: u32) -> Result<Self> {
        let precision_bits =
            compute_rans_precision_from_unique_symbols_bit_length(unique_symbols_bit_length);
        let table = ProbabilityTable::decode(source, precision_bits)?;
        let mut ans = RAnsDecoderDispatch::new(precision_bits)?;
        ans.rans_build_look_up_table(&table.probabilities())?;
        Ok(Self {
            ans,
            num_symbols: table.num_symbols(),
        })
    }

    pub fn num_symbols(&self) -> usize {
        self.num_symbols
    }

    pub fn start_decoding(&mut self, source: &mut DecoderBuffer<'a>) -> Result<()> {
        let bytes_encoded = source.decode_varint()?;
        let bytes_encoded = usize::try_from(bytes_encoded)
            .map_err(|_| Error::DecodeError("rANS symbol stream too large".into()))?;
        let data = source.decode_bytes(bytes_encoded)?;
        self.ans.read_init(data)
    }

    #[inline]
    pub fn decode_symbol(&mut self) -> u32 {
        self.ans.rans_read()
    }

    pub fn end_decoding(&mut self) -> bool {
        self.ans.read_end()
    }
}
