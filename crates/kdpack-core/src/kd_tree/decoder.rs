use tracing::debug;

use super::encoder::least_refined_axis;
use super::policy::CompressionPolicy;
use super::worklist::{AnyWorklist, Weighted, Worklist};
use super::{check_dimension, AXIS_BITS, MAX_BIT_LENGTH, MIN_POINTS_FOR_AXIS_SEARCH};
use crate::bit_coders::{AnyBitDecoder, BitDecoder};
use crate::bits::{increment_mod, most_significant_bit};
use crate::buffer::DecoderBuffer;
use crate::config::KdTreeConfig;
use crate::{Error, Result};

/// Pending split of `num_points` points sharing `base`
struct DecodingItem {
    num_points: u32,
    base: Vec<u32>,
    levels: Vec<u32>,
    last_axis: u32,
}

impl Weighted for DecodingItem {
    fn weight(&self) -> u64 {
        self.num_points as u64
    }
}

struct Coders<'a> {
    numbers: AnyBitDecoder<'a>,
    remaining_bits: AnyBitDecoder<'a>,
    axis: AnyBitDecoder<'a>,
    half: AnyBitDecoder<'a>,
}

impl<'a> Coders<'a> {
    /// `max_reads` bounds the reads of every stream, which caps the symbol
    /// count a symbol backed stream may declare.
    fn start(
        policy: &CompressionPolicy,
        max_reads: u32,
        source: &mut DecoderBuffer<'a>,
    ) -> Result<Self> {
        let mut coders = Self {
            numbers: AnyBitDecoder::with_max_symbols(policy.numbers, max_reads),
            remaining_bits: AnyBitDecoder::with_max_symbols(policy.remaining_bits, max_reads),
            axis: AnyBitDecoder::with_max_symbols(policy.axis, max_reads),
            half: AnyBitDecoder::with_max_symbols(policy.half, max_reads),
        };
        coders.numbers.start_decoding(source)?;
        coders.remaining_bits.start_decoding(source)?;
        coders.axis.start_decoding(source)?;
        coders.half.start_decoding(source)?;
        Ok(coders)
    }

    fn finish(&mut self) {
        self.numbers.end_decoding();
        self.remaining_bits.end_decoding();
        self.axis.end_decoding();
        self.half.end_decoding();
    }
}

/// Inverse of [`KdTreeEncoder`](super::KdTreeEncoder); must use the same
/// dimension and policy.
#[derive(Debug, Clone)]
pub struct KdTreeDecoder {
    dimension: u32,
    policy: CompressionPolicy,
}

impl KdTreeDecoder {
    pub fn new(dimension: u32, policy: CompressionPolicy) -> Result<Self> {
        check_dimension(dimension)?;
        Ok(Self { dimension, policy })
    }

    pub fn from_config(config: &KdTreeConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.dimension, config.policy())
    }

    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    /// Decode the point stream at the cursor, handing each point to `sink`.
    ///
    /// A stream declaring more than `max_num_points` points is rejected
    /// before anything is decoded. Returns the number of decoded points.
    pub fn decode_points<'a, F>(
        &self,
        source: &mut DecoderBuffer<'a>,
        max_num_points: u32,
        mut sink: F,
    ) -> Result<u32>
    where
        F: FnMut(&[u32]),
    {
        let bit_length = source.decode_u32()?;
        if bit_length > MAX_BIT_LENGTH {
            return Err(Error::InvalidHeader(format!(
                "bit length {} exceeds {}",
                bit_length, MAX_BIT_LENGTH
            )));
        }
        let num_points = source.decode_u32()?;
        if num_points > max_num_points {
            return Err(Error::InvalidHeader(format!(
                "{} points exceed the limit of {}",
                num_points, max_num_points
            )));
        }
        if num_points == 0 {
            return Ok(0);
        }

        let max_reads = self.max_reads(bit_length, num_points);
        let mut coders = Coders::start(&self.policy, max_reads, source)?;
        let result = self.decode_internal(bit_length, num_points, &mut coders, &mut sink);
        coders.finish();
        let num_decoded = result?;
        debug!(num_decoded, bit_length, "points decoded");
        Ok(num_decoded)
    }

    /// [`decode_points`](Self::decode_points) collecting into a vector.
    pub fn decode_points_to_vec(
        &self,
        source: &mut DecoderBuffer<'_>,
        max_num_points: u32,
    ) -> Result<Vec<Vec<u32>>> {
        let mut points = Vec::new();
        self.decode_points(source, max_num_points, |p| points.push(p.to_vec()))?;
        Ok(points)
    }

    /// Upper bound on the reads of any one stream. Every split refines one
    /// axis by a level, so a point passes at most `dimension * bit_length + 1`
    /// items, and a leaf reads at most `dimension` remaining-bit values.
    fn max_reads(&self, bit_length: u32, num_points: u32) -> u32 {
        let per_point = self.dimension as u64 * bit_length.max(1) as u64 + 1;
        u32::try_from(num_points as u64 * per_point).unwrap_or(u32::MAX)
    }

    fn decode_internal<F>(
        &self,
        bit_length: u32,
        num_points: u32,
        coders: &mut Coders<'_>,
        sink: &mut F,
    ) -> Result<u32>
    where
        F: FnMut(&[u32]),
    {
        let dimension = self.dimension as usize;
        let mut num_decoded = 0u32;
        let mut point = vec![0u32; dimension];
        let mut emit = |p: &[u32], num_decoded: &mut u32| -> Result<()> {
            if *num_decoded >= num_points {
                return Err(Error::DecodeError("more points than declared".into()));
            }
            *num_decoded += 1;
            sink(p);
            Ok(())
        };

        let mut worklist = AnyWorklist::new(self.policy.traversal);
        worklist.push(DecodingItem {
            num_points,
            base: vec![0; dimension],
            levels: vec![0; dimension],
            last_axis: 0,
        });

        while let Some(item) = worklist.pop() {
            let DecodingItem {
                num_points: num_remaining_points,
                base,
                mut levels,
                last_axis,
            } = item;
            if num_remaining_points > num_points {
                return Err(Error::DecodeError(format!(
                    "split of {} points exceeds the total of {}",
                    num_remaining_points, num_points
                )));
            }

            let axis = self.decode_axis(num_remaining_points, &levels, last_axis, coders)?;
            let level = levels[axis as usize];

            if bit_length - level == 0 {
                for _ in 0..num_remaining_points {
                    emit(base.as_slice(), &mut num_decoded)?;
                }
                continue;
            }

            if num_remaining_points <= 2 {
                for _ in 0..num_remaining_points {
                    let mut ax = axis;
                    for _ in 0..self.dimension {
                        let a = ax as usize;
                        let num_remaining_bits = bit_length - levels[a];
                        let low = if num_remaining_bits > 0 {
                            coders
                                .remaining_bits
                                .decode_least_significant_bits32(num_remaining_bits)
                        } else {
                            0
                        };
                        point[a] = base[a] | low;
                        ax = increment_mod(ax, self.dimension);
                    }
                    emit(point.as_slice(), &mut num_decoded)?;
                }
                continue;
            }

            let num_remaining_bits = bit_length - level;
            let modifier = 1u32 << (num_remaining_bits - 1);
            let mut upper_base = base.clone();
            upper_base[axis as usize] += modifier;

            let incoming_bits = most_significant_bit(num_remaining_points);
            let number = coders.numbers.decode_least_significant_bits32(incoming_bits);
            let half = num_remaining_points / 2;
            if number > half {
                return Err(Error::DecodeError(format!(
                    "split number {} exceeds half of {} points",
                    number, num_remaining_points
                )));
            }
            let mut first_half = half - number;
            let mut second_half = num_remaining_points - first_half;
            if first_half != second_half && !coders.half.decode_next_bit() {
                std::mem::swap(&mut first_half, &mut second_half);
            }

            levels[axis as usize] += 1;
            if first_half > 0 {
                worklist.push(DecodingItem {
                    num_points: first_half,
                    base,
                    levels: levels.clone(),
                    last_axis: axis,
                });
            }
            if second_half > 0 {
                worklist.push(DecodingItem {
                    num_points: second_half,
                    base: upper_base,
                    levels,
                    last_axis: axis,
                });
            }
        }

        if num_decoded != num_points {
            return Err(Error::DecodeError(format!(
                "decoded {} of {} points",
                num_decoded, num_points
            )));
        }
        Ok(num_decoded)
    }

    fn decode_axis(
        &self,
        num_remaining_points: u32,
        levels: &[u32],
        last_axis: u32,
        coders: &mut Coders<'_>,
    ) -> Result<u32> {
        if !self.policy.select_axis() {
            return Ok(increment_mod(last_axis, self.dimension));
        }
        if (num_remaining_points as usize) < MIN_POINTS_FOR_AXIS_SEARCH {
            return Ok(least_refined_axis(levels));
        }
        let axis = coders.axis.decode_least_significant_bits32(AXIS_BITS);
        if axis >= self.dimension {
            return Err(Error::DecodeError(format!(
                "axis {} out of range for dimension {}",
                axis, self.dimension
            )));
        }
        Ok(axis)
    }
}
