//! Probability tables for the rANS symbol coder
//!
//! A table assigns each symbol a slice of the rANS precision; the slices sum
//! to exactly `2^precision_bits`. On the wire a table is
//!
//! ```text
//! [num_symbols: varint]
//! per symbol, one of
//!   [offset << 2 | 3]                  run of offset + 1 zero-probability symbols
//!   [prob << 2 | n][n bytes]           prob in 6 + 8n bits, n in 0..=2
//! ```

use tracing::debug;

use crate::ans::{RAnsSymbol, MAX_RANS_PRECISION_BITS, MIN_RANS_PRECISION_BITS};
use crate::buffer::{DecoderBuffer, EncoderBuffer};
use crate::{Error, Result};

/// Longest zero run a single table byte can describe.
const MAX_ZERO_RUN: usize = 64;

/// Symbol probabilities quantized to a rANS precision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbabilityTable {
    precision_bits: u32,
    symbols: Vec<RAnsSymbol>,
}

impl ProbabilityTable {
    /// Quantize `frequencies` to `2^precision_bits`.
    ///
    /// Trailing zero frequencies are dropped. Every symbol with a non-zero
    /// frequency keeps a probability of at least one.
    pub fn from_frequencies(frequencies: &[u64], precision_bits: u32) -> Result<Self> {
        check_precision(precision_bits)?;
        let precision = 1u32 << precision_bits;

        let Some(last_used) = frequencies.iter().rposition(|&f| f > 0) else {
            return Err(Error::InvalidProbabilityTable(
                "no symbol has a non-zero frequency".into(),
            ));
        };
        let frequencies = &frequencies[..=last_used];
        let total_freq: u64 = frequencies.iter().sum();

        let mut probs: Vec<u32> = frequencies
            .iter()
            .map(|&freq| {
                let prob = freq as f64 / total_freq as f64;
                let rans_prob = (prob * precision as f64 + 0.5) as u32;
                if rans_prob == 0 && freq > 0 {
                    1
                } else {
                    rans_prob
                }
            })
            .collect();

        let total: u32 = probs.iter().sum();
        if total != precision {
            rebalance(&mut probs, total, precision)?;
        }

        let table = Self::from_probabilities(&probs, precision_bits)?;
        debug!(
            num_symbols = table.num_symbols(),
            precision_bits, "probability table built"
        );
        Ok(table)
    }

    /// Wrap already quantized probabilities. They must sum to the precision.
    pub fn from_probabilities(probs: &[u32], precision_bits: u32) -> Result<Self> {
        check_precision(precision_bits)?;
        let precision = 1u64 << precision_bits;
        let mut cum_prob = 0u64;
        let mut symbols = Vec::with_capacity(probs.len());
        for &prob in probs {
            symbols.push(RAnsSymbol {
                prob,
                cum_prob: cum_prob as u32,
            });
            cum_prob += prob as u64;
            if cum_prob > precision {
                break;
            }
        }
        if cum_prob != precision {
            return Err(Error::InvalidProbabilityTable(format!(
                "probabilities sum to {}, expected {}",
                cum_prob, precision
            )));
        }
        Ok(Self {
            precision_bits,
            symbols,
        })
    }

    pub fn precision_bits(&self) -> u32 {
        self.precision_bits
    }

    pub fn num_symbols(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbols(&self) -> &[RAnsSymbol] {
        &self.symbols
    }

    pub fn symbol(&self, symbol: u32) -> &RAnsSymbol {
        &self.symbols[symbol as usize]
    }

    pub fn probabilities(&self) -> Vec<u32> {
        self.symbols.iter().map(|s| s.prob).collect()
    }

    /// Bits needed to code `frequencies` with this table.
    pub fn expected_bits(&self, frequencies: &[u64]) -> u64 {
        let precision = (1u64 << self.precision_bits) as f64;
        let num_bits: f64 = self
            .symbols
            .iter()
            .zip(frequencies)
            .filter(|(sym, _)| sym.prob > 0)
            .map(|(sym, &freq)| freq as f64 * (sym.prob as f64 / precision).log2())
            .sum();
        (-num_bits).ceil() as u64
    }

    pub fn encode(&self, target: &mut EncoderBuffer) -> Result<()> {
        encode_table(&self.probabilities(), target)
    }

    pub fn decode(source: &mut DecoderBuffer<'_>, precision_bits: u32) -> Result<Self> {
        let probs = decode_table(source)?;
        Self::from_probabilities(&probs, precision_bits)
    }
}

fn check_precision(precision_bits: u32) -> Result<()> {
    if !(MIN_RANS_PRECISION_BITS..=MAX_RANS_PRECISION_BITS).contains(&precision_bits) {
        return Err(Error::InvalidInput(format!(
            "rANS precision of {} bits is out of range",
            precision_bits
        )));
    }
    Ok(())
}

/// Move the quantized total onto `precision`.
///
/// A shortfall goes to the most probable symbol. An excess is shaved off the
/// most probable symbols first, proportionally, never taking a symbol below
/// one.
fn rebalance(probs: &mut [u32], mut total: u32, precision: u32) -> Result<()> {
    let num_symbols = probs.len();
    let mut order: Vec<usize> = (0..num_symbols).collect();
    order.sort_by_key(|&i| probs[i]);

    if total < precision {
        probs[order[num_symbols - 1]] += precision - total;
        return Ok(());
    }

    let mut error = total - precision;
    while error > 0 {
        let ratio = precision as f64 / total as f64;
        let mut progressed = false;
        for j in (1..num_symbols).rev() {
            let id = order[j];
            let prob = probs[id];
            if prob <= 1 {
                if j == num_symbols - 1 {
                    return Err(Error::InvalidProbabilityTable(
                        "most probable symbol would be emptied".into(),
                    ));
                }
                break;
            }
            let new_prob = (prob as f64 * ratio).floor() as u32;
            let fix = (prob - new_prob).max(1).min(prob - 1).min(error);
            probs[id] -= fix;
            total -= fix;
            error -= fix;
            progressed = true;
            if total == precision {
                break;
            }
        }
        if !progressed {
            return Err(Error::InvalidProbabilityTable(format!(
                "cannot fit {} symbols into precision {}",
                num_symbols, precision
            )));
        }
    }
    Ok(())
}

/// Serialize probabilities, collapsing zero runs.
pub fn encode_table(probs: &[u32], target: &mut EncoderBuffer) -> Result<()> {
    target.encode_varint(probs.len() as u64);
    let mut i = 0;
    while i < probs.len() {
        let prob = probs[i];
        if prob == 0 {
            let run = probs[i..]
                .iter()
                .take(MAX_ZERO_RUN)
                .take_while(|&&p| p == 0)
                .count();
            target.encode_u8((((run - 1) << 2) | 3) as u8);
            i += run;
            continue;
        }

        let num_extra_bytes = match prob {
            p if p < 1 << 6 => 0,
            p if p < 1 << 14 => 1,
            p if p < 1 << 22 => 2,
            p => {
                return Err(Error::EncodeError(format!(
                    "probability {} does not fit a table entry",
                    p
                )))
            }
        };
        target.encode_u8(((prob << 2) | num_extra_bytes) as u8);
        for b in 0..num_extra_bytes {
            target.encode_u8((prob >> (8 * (b + 1) - 2)) as u8);
        }
        i += 1;
    }
    Ok(())
}

/// Parse a table written by [`encode_table`].
pub fn decode_table(source: &mut DecoderBuffer<'_>) -> Result<Vec<u32>> {
    let num_symbols = source.decode_varint()?;
    // Every table byte covers at most 64 symbols.
    if num_symbols / MAX_ZERO_RUN as u64 > source.remaining_size() as u64 {
        return Err(Error::InvalidProbabilityTable(format!(
            "{} symbols cannot fit in {} bytes",
            num_symbols,
            source.remaining_size()
        )));
    }
    let num_symbols = num_symbols as usize;

    let mut probs = vec![0u32; num_symbols];
    let mut i = 0;
    while i < num_symbols {
        let prob_data = source.decode_u8()?;
        let token = prob_data & 3;
        if token == 3 {
            let offset = (prob_data >> 2) as usize;
            if i + offset >= num_symbols {
                return Err(Error::InvalidProbabilityTable(
                    "zero run overruns the symbol count".into(),
                ));
            }
            i += offset + 1;
        } else {
            let mut prob = (prob_data >> 2) as u32;
            for b in 0..token as u32 {
                let extra = source.decode_u8()? as u32;
                prob |= extra << (8 * (b + 1) - 2);
            }
            probs[i] = prob;
            i += 1;
        }
    }
    Ok(probs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_table_layout() {
        let table = ProbabilityTable::from_frequencies(&[10, 0, 5, 0, 0, 1], 12).unwrap();
        assert_eq!(table.probabilities(), vec![2560, 0, 1280, 0, 0, 256]);
        assert_eq!(table.symbol(2).cum_prob, 2560);
        assert_eq!(table.symbol(5).cum_prob, 3840);

        let mut buffer = EncoderBuffer::new();
        table.encode(&mut buffer).unwrap();
        assert_eq!(
            buffer.data(),
            &[6, 0x01, 0x28, 0x03, 0x01, 0x14, 0x07, 0x01, 0x04]
        );

        let data = buffer.into_vec();
        let mut source = DecoderBuffer::new(&data);
        let decoded = ProbabilityTable::decode(&mut source, 12).unwrap();
        assert_eq!(decoded, table);
        assert_eq!(source.remaining_size(), 0);
    }

    #[test]
    fn test_trailing_zeros_dropped() {
        let table = ProbabilityTable::from_frequencies(&[3, 1, 0, 0, 0], 12).unwrap();
        assert_eq!(table.num_symbols(), 2);
    }

    #[test]
    fn test_rare_symbols_keep_a_slot() {
        let mut freqs = vec![1_000_000u64];
        freqs.extend(std::iter::repeat(1).take(100));
        let table = ProbabilityTable::from_frequencies(&freqs, 12).unwrap();
        let probs = table.probabilities();
        assert!(probs.iter().all(|&p| p >= 1));
        assert_eq!(probs.iter().sum::<u32>(), 4096);
        assert_eq!(probs[0], 4096 - 100);
    }

    #[test]
    fn test_over_allocation_is_shaved() {
        // Six equal symbols round up to 683 each, two slots too many.
        let table = ProbabilityTable::from_frequencies(&[1; 6], 12).unwrap();
        // The stable order shaves the highest ids first.
        assert_eq!(table.probabilities(), vec![683, 683, 683, 683, 682, 682]);
    }

    #[test]
    fn test_under_allocation_goes_to_largest() {
        // 341 * 5 + 2389 leaves two slots unassigned.
        let table = ProbabilityTable::from_frequencies(&[1, 1, 1, 1, 1, 7], 12).unwrap();
        assert_eq!(table.probabilities(), vec![341, 341, 341, 341, 341, 2391]);
    }

    #[test]
    fn test_expected_bits() {
        let freqs = [1u64, 1, 1, 1];
        let table = ProbabilityTable::from_frequencies(&freqs, 12).unwrap();
        assert_eq!(table.expected_bits(&freqs), 8);
    }

    #[test]
    fn test_long_zero_runs() {
        let mut probs = vec![0u32; 200];
        probs.push(4096);
        let mut buffer = EncoderBuffer::new();
        encode_table(&probs, &mut buffer).unwrap();
        // varint(201) is two bytes, then 64 + 64 + 64 + 8 zeros and one entry.
        assert_eq!(buffer.len(), 2 + 4 + 2);

        let data = buffer.into_vec();
        let mut source = DecoderBuffer::new(&data);
        assert_eq!(decode_table(&mut source).unwrap(), probs);
    }

    #[test]
    fn test_rejects_zero_run_overrun() {
        // Two symbols but the run byte claims four.
        let data = [2u8, (3 << 2) | 3];
        let mut source = DecoderBuffer::new(&data);
        assert!(decode_table(&mut source).is_err());
    }

    #[test]
    fn test_rejects_oversized_symbol_count() {
        let mut data = Vec::new();
        crate::encoding::encode_varint(1 << 20, &mut data);
        data.push(0);
        let mut source = DecoderBuffer::new(&data);
        assert!(decode_table(&mut source).is_err());
    }

    #[test]
    fn test_rejects_bad_sum() {
        assert!(ProbabilityTable::from_probabilities(&[100, 200], 12).is_err());
        assert!(ProbabilityTable::from_probabilities(&[4096, 1], 12).is_err());
        assert!(ProbabilityTable::from_frequencies(&[0, 0], 12).is_err());
        assert!(ProbabilityTable::from_frequencies(&[1], 30).is_err());
    }
}
