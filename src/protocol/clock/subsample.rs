//! Fixed-point sub-sample arithmetic.
//!
//! Phase is tracked in eighths of a sample so that rounding to whole
//! samples happens exactly once, when a value is written to hardware.
//! Converting a nanosecond PTP time to sub-samples multiplies three
//! factors whose product overflows 64 bits beyond roughly 2.3e9 seconds
//! at 48 kHz, so the product is formed in `u128`.

use super::timestamp::TimestampPair;

/// Sub-samples per whole sample.
pub const SUB_SAMPLES_PER_SAMPLE: u64 = 8;

/// Sub-sample remainder at and above which rounding goes up.
const ROUND_UP_REMAINDER: u64 = SUB_SAMPLES_PER_SAMPLE / 2;

/// A phase value in 1/8-sample units.
///
/// The underlying word is `u64`; subtraction of a sample count wraps
/// modulo 2^64 so a wrapped 32-bit media counter still yields a
/// consistent residual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SubSamples(pub u64);

impl SubSamples {
    /// Zero phase.
    pub const ZERO: Self = Self(0);

    /// Convert a PTP time to sub-samples at `sample_rate`.
    ///
    /// Computes `floor(ptp_nanos * sample_rate * 8 / 1e9)` without
    /// precision loss. Results that do not fit 64 bits (only reachable
    /// with sample rates far beyond audio range) wrap modulo 2^64.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Sub-sample word is modular by definition"
    )]
    pub fn from_ptp_nanos(ptp_nanos: u64, sample_rate: u32) -> Self {
        let product = u128::from(ptp_nanos)
            * u128::from(sample_rate)
            * u128::from(SUB_SAMPLES_PER_SAMPLE);
        Self((product / u128::from(TimestampPair::NANOS_PER_SEC)) as u64)
    }

    /// Express a whole-sample count as sub-samples.
    #[must_use]
    pub fn from_samples(samples: u32) -> Self {
        Self(u64::from(samples) * SUB_SAMPLES_PER_SAMPLE)
    }

    /// Raw sub-sample count.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    /// Round half-up to whole samples, wrapping modulo 2^32.
    ///
    /// `n*8 + r` rounds to `n` for `r < 4` and to `n + 1` otherwise.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Hardware offset register is 32 bits wide and wraps"
    )]
    pub fn round_to_samples(self) -> u32 {
        let whole = self.0 / SUB_SAMPLES_PER_SAMPLE;
        let rounded = if self.0 % SUB_SAMPLES_PER_SAMPLE >= ROUND_UP_REMAINDER {
            whole + 1
        } else {
            whole
        };
        rounded as u32
    }

    /// Signed difference `self - other`, treating both as unbounded integers.
    ///
    /// Saturates at `±i64::MAX` so that `a.diff(b) == -b.diff(a)` holds
    /// for every pair.
    #[must_use]
    pub fn diff(self, other: Self) -> i64 {
        let d = i128::from(self.0) - i128::from(other.0);
        let clamped = d.clamp(-i128::from(i64::MAX), i128::from(i64::MAX));
        i64::try_from(clamped).unwrap_or(if d < 0 { -i64::MAX } else { i64::MAX })
    }

    /// Signed difference `self - other` modulo 2^64.
    ///
    /// Use this for values produced by [`Self::subtract_samples`]: a
    /// residual that steps from `+2` to `-5` lands near `u64::MAX`, and
    /// only the modular difference reports the real distance of `-7`.
    #[must_use]
    #[allow(
        clippy::cast_possible_wrap,
        reason = "Interpreting the modular difference as two's complement"
    )]
    pub fn wrapping_diff(self, other: Self) -> i64 {
        self.0.wrapping_sub(other.0) as i64
    }

    /// Subtract a whole-sample count, modulo 2^64.
    #[must_use]
    pub fn subtract_samples(self, samples: u32) -> Self {
        Self(self.0.wrapping_sub(Self::from_samples(samples).0))
    }
}

impl From<u64> for SubSamples {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl From<SubSamples> for u64 {
    fn from(v: SubSamples) -> Self {
        v.0
    }
}

impl std::fmt::Display for SubSamples {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}+{}/{}",
            self.0 / SUB_SAMPLES_PER_SAMPLE,
            self.0 % SUB_SAMPLES_PER_SAMPLE,
            SUB_SAMPLES_PER_SAMPLE
        )
    }
}
