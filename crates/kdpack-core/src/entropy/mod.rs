//! Entropy estimation
//!
//! Cheap cost models used to pick between symbol coding schemes before any
//! bytes are produced. All estimates are in bits.

use std::collections::{BTreeMap, HashMap};

/// Alphabets up to this size are counted in a dense table.
const DENSE_FREQUENCY_LIMIT: u32 = 1 << 20;

/// Shannon entropy of `symbols` in whole bits, plus the number of distinct
/// values. Every symbol must be `<= max_value`.
pub fn compute_shannon_entropy(symbols: &[u32], max_value: u32) -> (i64, u32) {
    let num_symbols = symbols.len() as f64;
    let mut total_bits = 0.0f64;
    let mut num_unique = 0u32;
    let mut accumulate = |frequency: u64| {
        if frequency > 0 {
            num_unique += 1;
            total_bits += frequency as f64 * (frequency as f64 / num_symbols).log2();
        }
    };

    if max_value < DENSE_FREQUENCY_LIMIT {
        let mut frequencies = vec![0u64; max_value as usize + 1];
        for &symbol in symbols {
            debug_assert!(symbol <= max_value);
            frequencies[symbol as usize] += 1;
        }
        frequencies.into_iter().for_each(&mut accumulate);
    } else {
        let mut frequencies = BTreeMap::new();
        for &symbol in symbols {
            *frequencies.entry(symbol).or_insert(0u64) += 1;
        }
        frequencies.into_values().for_each(&mut accumulate);
    }

    ((-total_bits) as i64, num_unique)
}

/// Entropy in bits per value of a boolean source with `num_true` ones.
pub fn compute_binary_shannon_entropy(num_values: u32, num_true: u32) -> f64 {
    if num_values == 0 || num_true == 0 || num_true == num_values {
        return 0.0;
    }
    let true_freq = num_true as f64 / num_values as f64;
    let false_freq = 1.0 - true_freq;
    -(true_freq * true_freq.log2() + false_freq * false_freq.log2())
}

/// Rough size of a serialized probability table: one byte per used symbol
/// plus one byte per run of up to 64 unused ones.
pub fn approximate_rans_frequency_table_bits(max_value: u32, num_unique: u32) -> i64 {
    let table_zero_frequency_bits =
        8 * (num_unique as i64 + max_value.saturating_sub(num_unique) as i64 / 64);
    8 * num_unique as i64 + table_zero_frequency_bits
}

/// Accumulated statistics of a [`ShannonEntropyTracker`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EntropyData {
    /// `Σ f·log2(f)` over all symbol frequencies
    pub entropy_norm: f64,
    pub num_values: u64,
    pub max_symbol: u32,
    pub num_unique_symbols: u32,
}

impl EntropyData {
    pub fn data_bits(&self) -> i64 {
        if self.num_values < 2 {
            return 0;
        }
        let n = self.num_values as f64;
        (n * n.log2() - self.entropy_norm).ceil() as i64
    }

    pub fn rans_table_bits(&self) -> i64 {
        approximate_rans_frequency_table_bits(self.max_symbol + 1, self.num_unique_symbols)
    }
}

/// Incremental entropy over a growing symbol stream
///
/// [`peek`](Self::peek) answers "what would the entropy be if these symbols
/// were added" without changing the tracker; [`push`](Self::push) commits.
#[derive(Debug, Clone, Default)]
pub struct ShannonEntropyTracker {
    frequencies: Vec<u64>,
    data: EntropyData,
}

impl ShannonEntropyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peek(&self, symbols: &[u32]) -> EntropyData {
        let mut overlay: HashMap<u32, u64> = HashMap::new();
        let mut data = self.data;
        for &symbol in symbols {
            let base = self.frequencies.get(symbol as usize).copied().unwrap_or(0);
            let extra = overlay.entry(symbol).or_insert(0);
            Self::count(&mut data, symbol, base + *extra);
            *extra += 1;
        }
        data
    }

    pub fn push(&mut self, symbols: &[u32]) -> EntropyData {
        for &symbol in symbols {
            let index = symbol as usize;
            if self.frequencies.len() <= index {
                self.frequencies.resize(index + 1, 0);
            }
            Self::count(&mut self.data, symbol, self.frequencies[index]);
            self.frequencies[index] += 1;
        }
        self.data
    }

    pub fn data(&self) -> EntropyData {
        self.data
    }

    pub fn number_of_data_bits(&self) -> i64 {
        self.data.data_bits()
    }

    pub fn number_of_rans_table_bits(&self) -> i64 {
        self.data.rans_table_bits()
    }

    /// Account for one more occurrence of `symbol` seen `frequency` times.
    fn count(data: &mut EntropyData, symbol: u32, frequency: u64) {
        data.num_values += 1;
        let old_norm = if frequency > 1 {
            frequency as f64 * (frequency as f64).log2()
        } else {
            if frequency == 0 {
                data.num_unique_symbols += 1;
                data.max_symbol = data.max_symbol.max(symbol);
            }
            0.0
        };
        let new_frequency = (frequency + 1) as f64;
        data.entropy_norm += new_frequency * new_frequency.log2() - old_norm;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_uniform() {
        let symbols: Vec<u32> = (0..1024).map(|i| i % 4).collect();
        let (bits, unique) = compute_shannon_entropy(&symbols, 3);
        assert_eq!(unique, 4);
        assert_eq!(bits, 2048);
    }

    #[test]
    fn test_shannon_entropy_constant() {
        let (bits, unique) = compute_shannon_entropy(&[7; 100], 7);
        assert_eq!(bits, 0);
        assert_eq!(unique, 1);
    }

    #[test]
    fn test_shannon_entropy_sparse_large_alphabet() {
        let symbols = [0, u32::MAX, 0, u32::MAX];
        let (bits, unique) = compute_shannon_entropy(&symbols, u32::MAX);
        assert_eq!(unique, 2);
        assert_eq!(bits, 4);
    }

    #[test]
    fn test_binary_entropy() {
        assert_eq!(compute_binary_shannon_entropy(0, 0), 0.0);
        assert_eq!(compute_binary_shannon_entropy(10, 0), 0.0);
        assert_eq!(compute_binary_shannon_entropy(10, 10), 0.0);
        assert!((compute_binary_shannon_entropy(10, 5) - 1.0).abs() < 1e-12);
        let skewed = compute_binary_shannon_entropy(100, 1);
        assert!(skewed > 0.0 && skewed < 0.1);
    }

    #[test]
    fn test_table_bits_approximation() {
        assert_eq!(approximate_rans_frequency_table_bits(4, 4), 64);
        // 128 unused symbols cost two zero-run bytes.
        assert_eq!(approximate_rans_frequency_table_bits(132, 4), 64 + 16);
        assert_eq!(approximate_rans_frequency_table_bits(2, 4), 64);
    }

    #[test]
    fn test_tracker_matches_direct_computation() {
        let symbols: Vec<u32> = (0..500u32).map(|i| (i * i) % 13).collect();
        let mut tracker = ShannonEntropyTracker::new();
        tracker.push(&symbols[..200]);
        tracker.push(&symbols[200..]);

        let (bits, unique) = compute_shannon_entropy(&symbols, 12);
        assert_eq!(tracker.data().num_unique_symbols, unique);
        assert_eq!(tracker.data().num_values, 500);
        assert!((tracker.number_of_data_bits() - bits).abs() <= 1);
        assert_eq!(
            tracker.number_of_rans_table_bits(),
            approximate_rans_frequency_table_bits(tracker.data().max_symbol + 1, unique)
        );
    }

    #[test]
    fn test_tracker_peek_does_not_commit() {
        let mut tracker = ShannonEntropyTracker::new();
        tracker.push(&[1, 1, 2]);
        let before = tracker.data();

        let peeked = tracker.peek(&[3, 3, 3, 1]);
        assert_eq!(tracker.data(), before);
        assert_eq!(peeked.num_values, 7);
        assert_eq!(peeked.num_unique_symbols, 3);
        assert_eq!(peeked.max_symbol, 3);

        let pushed = tracker.push(&[3, 3, 3, 1]);
        assert!((pushed.entropy_norm - peeked.entropy_norm).abs() < 1e-9);
        assert_eq!(pushed.num_values, peeked.num_values);
    }

    #[test]
    fn test_tracker_small_inputs_cost_nothing() {
        let mut tracker = ShannonEntropyTracker::new();
        assert_eq!(tracker.number_of_data_bits(), 0);
        tracker.push(&[5]);
        assert_eq!(tracker.number_of_data_bits(), 0);
    }
}
