//! Keep-bits selection from a bit-information spectrum.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{BitInformation, NBITS};

/// Number of float32 bits preceding the mantissa: 1 sign + 8 exponent bits.
pub const NON_MANTISSA_BITS: usize = 9;

/// Rule used to clean the information spectrum before the cumulative cut.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum KeepBitsRule {
    /// Suppress the noise plateau at the bottom of the mantissa: entries not
    /// exceeding 1.5 times the maximum of the four LSB positions are zeroed.
    #[default]
    TailFilteredCdf,
    /// Keep only the non-decreasing prefix of the spectrum, guarding against
    /// multi-peak information spectra.
    Monotonic,
}

/// Selects how many of the 23 float32 mantissa bits to retain so that the
/// cleaned cumulative information passes `inflevel`.
///
/// `inflevel` is the caller's target fraction of total cleaned information to
/// preserve, in `[0, 1]`; argument validation happens at the tool boundary.
/// A spectrum with no confident structure keeps all 23 mantissa bits. The
/// selector is a pure function of its inputs; the first index whose
/// cumulative fraction strictly exceeds `inflevel` decides.
#[must_use]
pub fn get_keepbits(info: &BitInformation, inflevel: f64, rule: KeepBitsRule) -> u8 {
    let cleaned = match rule {
        KeepBitsRule::TailFilteredCdf => {
            let tail_max = 1.5
                * info[NBITS - 4..]
                    .iter()
                    .fold(f64::NEG_INFINITY, |acc, &m| acc.max(m));

            let mut cleaned = *info;
            for entry in &mut cleaned {
                if *entry <= tail_max {
                    *entry = 0.0;
                }
            }
            cleaned
        }
        KeepBitsRule::Monotonic => {
            let mut cleaned = *info;
            let mut cut = false;
            for i in 1..NBITS {
                if cut || info[i] < info[i - 1] {
                    cut = true;
                    cleaned[i] = 0.0;
                }
            }
            cleaned
        }
    };

    let total: f64 = cleaned.iter().sum();
    if total <= 0.0 {
        // no confident structure: keep the full mantissa
        return 23;
    }

    let mut running = 0.0;
    for (i, entry) in cleaned.iter().enumerate() {
        running += entry;
        if running / total > inflevel {
            #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
            let raw = i as i32 + 1 - NON_MANTISSA_BITS as i32;
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            return raw.clamp(1, 23) as u8;
        }
    }

    23
}
