//! Compression level to coder mapping

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::bit_coders::BitCoderKind;

bitflags! {
    /// Optional behaviours of the point codec
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PolicyFlags: u8 {
        /// Pick the split axis from the data instead of round robin
        const SELECT_AXIS = 0b0000_0001;
    }
}

/// Order in which pending splits are processed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Traversal {
    /// Depth first, upper half before lower half
    #[default]
    Lifo,
    /// Breadth first
    Fifo,
    /// Largest pending group first; ties in push order
    PriorityByCount,
}

/// Coders and traversal used by the point codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionPolicy {
    /// Split counts
    pub numbers: BitCoderKind,
    /// Explicit split axes
    pub axis: BitCoderKind,
    /// Which half is the smaller one
    pub half: BitCoderKind,
    /// Low bits of groups of one or two points
    pub remaining_bits: BitCoderKind,
    pub flags: PolicyFlags,
    pub traversal: Traversal,
}

impl CompressionPolicy {
    /// Policy for `level` (0-10). Levels above 8 behave like 8.
    ///
    /// | level | numbers | axis, half | select axis | traversal |
    /// |---|---|---|---|---|
    /// | 0-1 | direct | direct | no | LIFO |
    /// | 2-3 | rANS | direct | no | LIFO |
    /// | 4-5 | folded rANS | direct | no | LIFO |
    /// | 6 | folded rANS | direct | yes | LIFO |
    /// | 7 | folded adaptive rANS | adaptive rANS | yes | LIFO |
    /// | 8+ | folded adaptive rANS | adaptive rANS | yes | by count |
    pub fn for_level(level: u8) -> Self {
        use BitCoderKind::*;

        let (numbers, side, flags, traversal) = match level {
            0..=1 => (Direct, Direct, PolicyFlags::empty(), Traversal::Lifo),
            2..=3 => (RAns, Direct, PolicyFlags::empty(), Traversal::Lifo),
            4..=5 => (FoldedRAns, Direct, PolicyFlags::empty(), Traversal::Lifo),
            6 => (FoldedRAns, Direct, PolicyFlags::SELECT_AXIS, Traversal::Lifo),
            7 => (
                FoldedAdaptiveRAns,
                AdaptiveRAns,
                PolicyFlags::SELECT_AXIS,
                Traversal::Lifo,
            ),
            _ => (
                FoldedAdaptiveRAns,
                AdaptiveRAns,
                PolicyFlags::SELECT_AXIS,
                Traversal::PriorityByCount,
            ),
        };
        Self {
            numbers,
            axis: side,
            half: side,
            remaining_bits: Direct,
            flags,
            traversal,
        }
    }

    pub fn with_traversal(mut self, traversal: Traversal) -> Self {
        self.traversal = traversal;
        self
    }

    #[inline]
    pub fn select_axis(&self) -> bool {
        self.flags.contains(PolicyFlags::SELECT_AXIS)
    }
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self::for_level(7)
    }
}
