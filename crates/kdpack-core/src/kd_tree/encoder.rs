use tracing::debug;

use super::policy::CompressionPolicy;
use super::worklist::{AnyWorklist, Weighted, Worklist};
use super::{check_dimension, AXIS_BITS, MAX_BIT_LENGTH, MIN_POINTS_FOR_AXIS_SEARCH};
use crate::bit_coders::{AnyBitEncoder, BitEncoder};
use crate::bits::{increment_mod, most_significant_bit};
use crate::buffer::EncoderBuffer;
use crate::config::KdTreeConfig;
use crate::{Error, Result};

/// Pending split over `points[begin..end]`
struct EncodingItem {
    begin: usize,
    end: usize,
    base: Vec<u32>,
    levels: Vec<u32>,
    last_axis: u32,
}

impl Weighted for EncodingItem {
    fn weight(&self) -> u64 {
        (self.end - self.begin) as u64
    }
}

/// Per-call coder state
struct Coders {
    numbers: AnyBitEncoder,
    remaining_bits: AnyBitEncoder,
    axis: AnyBitEncoder,
    half: AnyBitEncoder,
}

impl Coders {
    fn new(policy: &CompressionPolicy) -> Self {
        let mut coders = Self {
            numbers: AnyBitEncoder::new(policy.numbers),
            remaining_bits: AnyBitEncoder::new(policy.remaining_bits),
            axis: AnyBitEncoder::new(policy.axis),
            half: AnyBitEncoder::new(policy.half),
        };
        coders.numbers.start_encoding();
        coders.remaining_bits.start_encoding();
        coders.axis.start_encoding();
        coders.half.start_encoding();
        coders
    }

    fn finish(mut self, target: &mut EncoderBuffer) -> Result<()> {
        let start = target.len();
        self.numbers.end_encoding(target)?;
        let numbers = target.len() - start;
        self.remaining_bits.end_encoding(target)?;
        let remaining_bits = target.len() - start - numbers;
        self.axis.end_encoding(target)?;
        let axis = target.len() - start - numbers - remaining_bits;
        self.half.end_encoding(target)?;
        let half = target.len() - start - numbers - remaining_bits - axis;
        debug!(numbers, remaining_bits, axis, half, "point streams encoded");
        Ok(())
    }
}

/// KD-tree encoder for points with `dimension` unsigned coordinates
///
/// Points are split recursively at the midpoint of the remaining coordinate
/// range; only the size of one half is coded per split, so dense clouds cost
/// far less than their raw coordinates.
#[derive(Debug, Clone)]
pub struct KdTreeEncoder {
    dimension: u32,
    policy: CompressionPolicy,
}

impl KdTreeEncoder {
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

    pub fn policy(&self) -> &CompressionPolicy {
        &self.policy
    }

    /// Encode `points`, each coordinate below `2^bit_length`.
    ///
    /// The point order is not preserved; the decoder returns the same
    /// multiset.
    pub fn encode_points<P: AsRef<[u32]>>(
        &self,
        points: &[P],
        bit_length: u32,
        target: &mut EncoderBuffer,
    ) -> Result<()> {
        if bit_length > MAX_BIT_LENGTH {
            return Err(Error::InvalidInput(format!(
                "bit length {} exceeds {}",
                bit_length, MAX_BIT_LENGTH
            )));
        }
        let num_points = u32::try_from(points.len())
            .map_err(|_| Error::InvalidInput("too many points".into()))?;
        let mut refs: Vec<&[u32]> = Vec::with_capacity(points.len());
        for point in points {
            let point = point.as_ref();
            self.check_point(point, bit_length)?;
            refs.push(point);
        }

        target.encode_u32(bit_length);
        target.encode_u32(num_points);
        if num_points == 0 {
            return Ok(());
        }

        let mut coders = Coders::new(&self.policy);
        self.encode_internal(&mut refs, bit_length, &mut coders);
        coders.finish(target)?;
        debug!(
            num_points,
            bit_length,
            dimension = self.dimension,
            bytes = target.len(),
            "points encoded"
        );
        Ok(())
    }

    fn check_point(&self, point: &[u32], bit_length: u32) -> Result<()> {
        if point.len() != self.dimension as usize {
            return Err(Error::InvalidInput(format!(
                "point has {} coordinates, expected {}",
                point.len(),
                self.dimension
            )));
        }
        if bit_length < 32 {
            if let Some(&c) = point.iter().find(|&&c| c >> bit_length != 0) {
                return Err(Error::InvalidInput(format!(
                    "coordinate {} does not fit in {} bits",
                    c, bit_length
                )));
            }
        }
        Ok(())
    }

    fn encode_internal(&self, points: &mut [&[u32]], bit_length: u32, coders: &mut Coders) {
        let dimension = self.dimension as usize;
        let mut worklist = AnyWorklist::new(self.policy.traversal);
        worklist.push(EncodingItem {
            begin: 0,
            end: points.len(),
            base: vec![0; dimension],
            levels: vec![0; dimension],
            last_axis: 0,
        });

        while let Some(item) = worklist.pop() {
            let EncodingItem {
                begin,
                end,
                mut base,
                mut levels,
                last_axis,
            } = item;
            let group = &mut points[begin..end];
            let num_remaining_points = group.len() as u32;

            let axis = self.encode_axis(group, &base, &levels, last_axis, bit_length, coders);
            let level = levels[axis as usize];

            // Every coordinate is fixed; the decoder repeats the base.
            if bit_length - level == 0 {
                continue;
            }

            if num_remaining_points <= 2 {
                for point in group.iter() {
                    let mut ax = axis;
                    for _ in 0..self.dimension {
                        let num_remaining_bits = bit_length - levels[ax as usize];
                        if num_remaining_bits > 0 {
                            coders
                                .remaining_bits
                                .encode_least_significant_bits32(num_remaining_bits, point[ax as usize]);
                        }
                        ax = increment_mod(ax, self.dimension);
                    }
                }
                continue;
            }

            let num_remaining_bits = bit_length - level;
            let modifier = 1u32 << (num_remaining_bits - 1);
            let mut upper_base = base.clone();
            upper_base[axis as usize] += modifier;
            let split = partition(group, axis as usize, upper_base[axis as usize]);

            let required_bits = most_significant_bit(num_remaining_points);
            let first_half = split as u32;
            let second_half = num_remaining_points - first_half;
            let left = first_half < second_half;
            if first_half != second_half {
                coders.half.encode_bit(left);
            }
            let smaller = first_half.min(second_half);
            coders
                .numbers
                .encode_least_significant_bits32(required_bits, num_remaining_points / 2 - smaller);

            levels[axis as usize] += 1;
            if split != 0 {
                worklist.push(EncodingItem {
                    begin,
                    end: begin + split,
                    base: std::mem::take(&mut base),
                    levels: levels.clone(),
                    last_axis: axis,
                });
            }
            if begin + split != end {
                worklist.push(EncodingItem {
                    begin: begin + split,
                    end,
                    base: upper_base,
                    levels,
                    last_axis: axis,
                });
            }
        }
    }

    /// Choose the split axis, writing it to the axis stream when it cannot
    /// be derived by the decoder.
    fn encode_axis(
        &self,
        group: &[&[u32]],
        base: &[u32],
        levels: &[u32],
        last_axis: u32,
        bit_length: u32,
        coders: &mut Coders,
    ) -> u32 {
        if !self.policy.select_axis() {
            return increment_mod(last_axis, self.dimension);
        }

        if group.len() < MIN_POINTS_FOR_AXIS_SEARCH {
            return least_refined_axis(levels);
        }

        // Keep as many points together as possible: prefer the axis whose
        // split is most one-sided.
        let size = group.len() as u32;
        let mut best_axis = 0u32;
        let mut max_deviation = 0u32;
        for axis in 0..self.dimension as usize {
            let num_remaining_bits = bit_length - levels[axis];
            if num_remaining_bits == 0 {
                continue;
            }
            let split = base[axis] + (1 << (num_remaining_bits - 1));
            let below = group.iter().filter(|p| p[axis] < split).count() as u32;
            let deviation = below.max(size - below);
            if max_deviation < deviation {
                max_deviation = deviation;
                best_axis = axis as u32;
            }
        }
        coders
            .axis
            .encode_least_significant_bits32(AXIS_BITS, best_axis);
        best_axis
    }
}

/// First axis with the fewest splits so far.
pub(super) fn least_refined_axis(levels: &[u32]) -> u32 {
    let mut best_axis = 0;
    for axis in 1..levels.len() {
        if levels[best_axis] > levels[axis] {
            best_axis = axis;
        }
    }
    best_axis as u32
}

/// Move points with `p[axis] < value` to the front; returns their count.
fn partition(points: &mut [&[u32]], axis: usize, value: u32) -> usize {
    let mut split = 0;
    for i in 0..points.len() {
        if points[i][axis] < value {
            points.swap(split, i);
            split += 1;
        }
    }
    split
}
