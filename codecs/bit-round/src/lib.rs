//! Float32 bit reinterpretation and mantissa bit rounding.
//!
//! Bit rounding drops trailing mantissa bits from floating-point values with
//! a round-to-nearest rule, leaving an array that is far more amenable to
//! lossless compression. The number of bits to keep should be determined by
//! information analysis of the data to be compressed.
//!
//! The approach is based on the paper by Klöwer et al. 2021
//! (<https://www.nature.com/articles/s43588-021-00156-2>).

use thiserror::Error;

/// Number of explicit mantissa bits of an IEEE-754 float32.
pub const MANTISSA_BITS: u32 = f32::MANTISSA_DIGITS - 1;

const SIGN_MASK: u32 = 0x8000_0000;
const EXPONENT_MASK: u32 = 0x7F80_0000;
const MANTISSA_MASK: u32 = 0x007F_FFFF;
const EXPONENT_BIAS: i32 = 127;

/// Errors that may occur when applying the bit rounder.
#[derive(Debug, Error)]
pub enum BitRoundError {
    /// The number of mantissa bits to keep is outside `1..=23`.
    #[error("cannot keep {nsb} mantissa bits, the valid range is 1..=23")]
    InvalidKeepBits {
        /// The rejected keep-bits count.
        nsb: u8,
    },
}

/// Remaps the biased exponent of a float32 bit image to a sign-magnitude
/// representation within the same 8 exponent bits.
///
/// Adjacent values then share their most significant bits whether they sit
/// near zero or far from it, which is what makes the mutual-information
/// estimate of neighbouring elements meaningful. Zero, infinity, and NaN are
/// not preserved bit-exactly; the information estimator consumes only the
/// remapped words.
#[must_use]
pub const fn signed_exponent(word: u32) -> u32 {
    let sign_and_mantissa = word & (SIGN_MASK | MANTISSA_MASK);

    #[allow(clippy::cast_possible_wrap)]
    let exponent = (((word & EXPONENT_MASK) >> MANTISSA_BITS) as i32) - EXPONENT_BIAS;
    let magnitude = exponent.unsigned_abs();
    let exponent_sign = if exponent < 0 { SIGN_MASK >> 1 } else { 0 };

    sign_and_mantissa | exponent_sign | (magnitude << MANTISSA_BITS)
}

/// Applies [`signed_exponent`] to the bit image of every element.
pub fn signed_exponent_inplace(data: &mut [f32]) {
    for x in data {
        *x = f32::from_bits(signed_exponent(x.to_bits()));
    }
}

/// The rounding mask pair derived from a keep-bits count.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RoundingMask {
    /// Keeps the sign, the exponent, and the upper `nsb` mantissa bits.
    pub mask: u32,
    /// Half-shift value: adding it before masking rounds to nearest.
    pub hshv: u32,
}

impl RoundingMask {
    /// Rounds one float32 bit image.
    ///
    /// The caller guarantees the word does not represent NaN, infinity, or a
    /// fill value.
    #[must_use]
    pub const fn round(self, word: u32) -> u32 {
        word.wrapping_add(self.hshv) & self.mask
    }
}

/// Derives the rounding mask pair for keeping `nsb` mantissa bits.
///
/// The mask zeroes the low `23 - nsb` mantissa bits; the half-shift is the
/// highest zeroed bit, so that `(word + hshv) & mask` matches the reference
/// codec bit for bit.
///
/// # Errors
///
/// Errors with [`BitRoundError::InvalidKeepBits`] if `nsb` is outside
/// `1..=23`.
pub const fn bitround_mask(nsb: u8) -> Result<RoundingMask, BitRoundError> {
    if nsb < 1 || nsb as u32 > MANTISSA_BITS {
        return Err(BitRoundError::InvalidKeepBits { nsb });
    }

    let zero_bits = MANTISSA_BITS - nsb as u32;
    let mask = (!0_u32) << zero_bits;
    let hshv = (!mask) & (mask >> 1);

    Ok(RoundingMask { mask, hshv })
}

/// Rounds one float32 bit image to `nsb` kept mantissa bits.
///
/// # Errors
///
/// Errors with [`BitRoundError::InvalidKeepBits`] if `nsb` is outside
/// `1..=23`.
pub const fn apply_round(word: u32, nsb: u8) -> Result<u32, BitRoundError> {
    match bitround_mask(nsb) {
        Ok(mask) => Ok(mask.round(word)),
        Err(err) => Err(err),
    }
}

/// Rounds a float32 buffer in place, keeping `nsb` mantissa bits.
///
/// NaN elements and elements equal to `missing` (if set) are left unchanged,
/// so the written data never has a rewritten sentinel position. An empty
/// buffer is a no-op. Applying the same `nsb` twice equals applying it once.
///
/// # Errors
///
/// Errors with [`BitRoundError::InvalidKeepBits`] if `nsb` is outside
/// `1..=23`; the buffer is untouched in that case.
pub fn bitround_inplace(
    data: &mut [f32],
    nsb: u8,
    missing: Option<f32>,
) -> Result<(), BitRoundError> {
    let mask = bitround_mask(nsb)?;

    for x in data {
        if x.is_nan() {
            continue;
        }
        if let Some(missing) = missing {
            if *x == missing {
                continue;
            }
        }
        *x = f32::from_bits(mask.round(x.to_bits()));
    }

    Ok(())
}
