//! Bit twiddling helpers shared by the coders

/// Index of the highest set bit. `n` must be non-zero.
#[inline]
pub fn most_significant_bit(n: u32) -> u32 {
    debug_assert!(n > 0, "most_significant_bit of zero");
    31 - n.leading_zeros()
}

#[inline]
pub fn count_one_bits32(n: u32) -> u32 {
    n.count_ones()
}

/// `(x + 1) % modulus` without the division.
#[inline]
pub fn increment_mod(x: u32, modulus: u32) -> u32 {
    if x + 1 == modulus {
        0
    } else {
        x + 1
    }
}

/// Keeps the low `nbits` of `value`; `nbits` may be 32.
#[inline]
pub fn low_bits(value: u32, nbits: u32) -> u32 {
    if nbits >= 32 {
        value
    } else {
        value & ((1u32 << nbits) - 1)
    }
}
