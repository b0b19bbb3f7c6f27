//! Bitwise mutual-information estimation for float32 data.
//!
//! For every bit position of the (signed-exponent remapped) 32-bit image,
//! the estimator measures the mutual information between that bit in one
//! element and the same bit in the next element. Bits that carry real
//! structure score high; bits that are effectively random score at the
//! statistical noise floor and are zeroed.
//!
//! The approach is based on the paper by Klöwer et al. 2021
//! (<https://www.nature.com/articles/s43588-021-00156-2>).

mod keepbits;
mod stats;

pub use keepbits::{get_keepbits, KeepBitsRule, NON_MANTISSA_BITS};
pub use stats::{binary_entropy, binom_confidence, binom_free_entropy, normal_inv};

use ncbits_bit_round::signed_exponent;
use thiserror::Error;

/// Number of analysed bit positions of a float32 word.
pub const NBITS: usize = 32;

/// Confidence level of the binomial noise floor.
pub const DEFAULT_CONFIDENCE: f64 = 0.99;

/// Per-bit mutual information in bits, indexed from the MSB (index 0) to the
/// LSB (index 31).
pub type BitInformation = [f64; NBITS];

/// Errors that may occur when estimating bit information.
#[derive(Debug, Error)]
pub enum BitInfoError {
    /// The estimator needs at least two values to form one adjacent pair.
    #[error("cannot estimate bit information from {n} values, at least 2 are required")]
    InsufficientSamples {
        /// Number of values provided.
        n: usize,
    },
}

/// Streaming 32×2×2 contingency table over adjacent-element bit pairs.
///
/// The table is the only per-variable state the estimator keeps; it is
/// constant-size and meant to be reused across variables via [`reset`]
/// [`BitpairCounter::reset`].
#[derive(Clone, Debug)]
pub struct BitpairCounter {
    counts: [[[u64; 2]; 2]; NBITS],
    pairs: u64,
}

impl Default for BitpairCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl BitpairCounter {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counts: [[[0; 2]; 2]; NBITS],
            pairs: 0,
        }
    }

    /// Clears all counts for reuse.
    pub fn reset(&mut self) {
        self.counts = [[[0; 2]; 2]; NBITS];
        self.pairs = 0;
    }

    /// Number of recorded pairs.
    #[must_use]
    pub const fn pairs(&self) -> u64 {
        self.pairs
    }

    /// Records one adjacent pair of 32-bit words.
    pub fn record_pair(&mut self, a: u32, b: u32) {
        for bit in 0..NBITS {
            let i = ((a >> bit) & 1) as usize;
            let j = ((b >> bit) & 1) as usize;
            self.counts[NBITS - bit - 1][i][j] += 1;
        }
        self.pairs += 1;
    }

    /// Computes the per-bit mutual information of the recorded pairs, in
    /// bits, without any noise floor applied.
    ///
    /// An empty table yields all zeros.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mutual_information(&self) -> BitInformation {
        let mut info = [0.0; NBITS];
        if self.pairs == 0 {
            return info;
        }
        let total = self.pairs as f64;

        for (bit, cell) in self.counts.iter().enumerate() {
            let p = [
                [cell[0][0] as f64 / total, cell[0][1] as f64 / total],
                [cell[1][0] as f64 / total, cell[1][1] as f64 / total],
            ];
            let px = [p[0][0] + p[0][1], p[1][0] + p[1][1]];
            let py = [p[0][0] + p[1][0], p[0][1] + p[1][1]];

            let mut sum = 0.0;
            for i in 0..2 {
                for j in 0..2 {
                    // empty cells contribute nothing (0 · ln 0 = 0)
                    if p[i][j] > 0.0 {
                        sum += p[i][j] * (p[i][j] / px[i] / py[j]).ln();
                    }
                }
            }
            info[bit] = sum / std::f64::consts::LN_2;
        }

        info
    }
}

/// Zeroes every entry at or below the binomial free-entropy floor for
/// `pairs` observations at confidence `confidence`.
pub fn set_zero_insignificant(info: &mut BitInformation, pairs: u64, confidence: f64) {
    let floor = binom_free_entropy(pairs, confidence);
    for entry in info {
        if *entry <= floor {
            *entry = 0.0;
        }
    }
}

/// Estimates the bit information of `data` using a caller-provided counter,
/// which is reset first.
///
/// The estimator consumes the signed-exponent remap of each element's bit
/// image and makes a single pass over the data, keeping one previous word of
/// state.
///
/// # Errors
///
/// Errors with [`BitInfoError::InsufficientSamples`] if `data` holds fewer
/// than two values.
pub fn bitinformation_with(
    counter: &mut BitpairCounter,
    data: &[f32],
) -> Result<BitInformation, BitInfoError> {
    let Some((&first, rest)) = data.split_first() else {
        return Err(BitInfoError::InsufficientSamples { n: 0 });
    };
    if rest.is_empty() {
        return Err(BitInfoError::InsufficientSamples { n: 1 });
    }

    counter.reset();
    let mut prev = signed_exponent(first.to_bits());
    for &x in rest {
        let cur = signed_exponent(x.to_bits());
        counter.record_pair(prev, cur);
        prev = cur;
    }

    let mut info = counter.mutual_information();
    set_zero_insignificant(&mut info, counter.pairs(), DEFAULT_CONFIDENCE);
    Ok(info)
}

/// Estimates the bit information of `data`.
///
/// # Errors
///
/// Errors with [`BitInfoError::InsufficientSamples`] if `data` holds fewer
/// than two values.
pub fn bitinformation(data: &[f32]) -> Result<BitInformation, BitInfoError> {
    let mut counter = BitpairCounter::new();
    bitinformation_with(&mut counter, data)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn too_few_samples() {
        assert!(matches!(
            bitinformation(&[]),
            Err(BitInfoError::InsufficientSamples { n: 0 })
        ));
        assert!(matches!(
            bitinformation(&[1.0]),
            Err(BitInfoError::InsufficientSamples { n: 1 })
        ));
    }

    #[test]
    fn constant_data_carries_no_information() {
        let data = vec![42.5_f32; 4096];
        let info = bitinformation(&data).unwrap();
        assert_eq!(info, [0.0; NBITS]);
    }

    #[test]
    fn alternating_bits_carry_one_bit() {
        // 1.0 remaps to 0x00000000, 0.5 to 0x40800000: bits 1 and 8 from the
        // MSB alternate perfectly, every other bit is constant
        let data: Vec<f32> = (0..2001)
            .map(|k| if k % 2 == 0 { 1.0 } else { 0.5 })
            .collect();
        let info = bitinformation(&data).unwrap();

        for (bit, &entry) in info.iter().enumerate() {
            if bit == 1 || bit == 8 {
                assert!((entry - 1.0).abs() < 1.0e-12, "bit {bit}: {entry}");
            } else {
                assert_eq!(entry, 0.0, "bit {bit}");
            }
        }
    }

    #[test]
    fn noise_floor_zeroes_weak_signals() {
        let mut info = [0.0; NBITS];
        info[9] = 0.5;
        info[30] = 1.0e-9;
        set_zero_insignificant(&mut info, 1_000_000, DEFAULT_CONFIDENCE);

        assert_eq!(info[9], 0.5);
        assert_eq!(info[30], 0.0);
    }

    #[test]
    fn counter_reuse_matches_fresh_counter() {
        let first = [1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let second = [7.0_f32, 3.5, 1.75, 0.875];

        let mut counter = BitpairCounter::new();
        let _ = bitinformation_with(&mut counter, &first).unwrap();
        let reused = bitinformation_with(&mut counter, &second).unwrap();

        assert_eq!(reused, bitinformation(&second).unwrap());
    }

    #[test]
    fn pair_count_is_n_minus_one() {
        let mut counter = BitpairCounter::new();
        let _ = bitinformation_with(&mut counter, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(counter.pairs(), 3);
    }
}
