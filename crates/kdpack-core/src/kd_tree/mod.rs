//! KD-tree compression of integer point clouds
//!
//! The encoder splits the bounding cube `[0, 2^bit_length)^dimension` at the
//! midpoint of one axis at a time and records how many points fall into each
//! half. Groups of one or two points write their remaining low bits
//! directly; groups whose coordinates are fully determined write nothing.
//!
//! ```text
//! [bit_length: u32][num_points: u32]
//! [numbers stream][remaining bits stream][axis stream][half stream]
//! ```
//!
//! The four sub-streams are produced by the bit coders chosen by a
//! [`CompressionPolicy`]. Only the header is written for an empty set.

mod decoder;
mod encoder;
mod policy;
mod worklist;

pub use decoder::KdTreeDecoder;
pub use encoder::KdTreeEncoder;
pub use policy::{CompressionPolicy, PolicyFlags, Traversal};
pub use worklist::{
    AnyWorklist, FifoWorklist, LifoWorklist, PriorityWorklist, Weighted, Worklist,
};

use crate::{Error, Result};

/// Axis ids are written in four bits.
pub const MAX_DIMENSION: u32 = 16;

pub const MAX_BIT_LENGTH: u32 = 32;

const AXIS_BITS: u32 = 4;

/// Below this many points the split axis is derived from the levels alone.
const MIN_POINTS_FOR_AXIS_SEARCH: usize = 64;

fn check_dimension(dimension: u32) -> Result<()> {
    if dimension == 0 || dimension > MAX_DIMENSION {
        return Err(Error::InvalidInput(format!(
            "dimension must be in 1..={}, got {}",
            MAX_DIMENSION, dimension
        )));
    }
    Ok(())
}
