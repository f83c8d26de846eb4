//! Hysteresis-controlled global sample offset estimation.
//!
//! Each tick turns a [`TimestampPair`] into the residual phase between
//! PTP time and the FPGA media counter. Small movements of that residual
//! are ignored; larger ones are rounded to whole samples and reported
//! as a correction when the rounded value differs from what the hardware
//! already runs with.

use super::subsample::SubSamples;
use super::timestamp::TimestampPair;

/// A change of the global sample offset register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OffsetCorrection {
    /// Offset the hardware ran with before this correction.
    pub old_offset: u32,
    /// Offset to write.
    pub new_offset: u32,
}

impl OffsetCorrection {
    /// Signed distance from old to new offset, modulo 2^32.
    #[must_use]
    #[allow(
        clippy::cast_possible_wrap,
        reason = "Interpreting the modular difference as two's complement"
    )]
    pub fn delta(&self) -> i32 {
        self.new_offset.wrapping_sub(self.old_offset) as i32
    }
}

/// Clock offset estimator for one device.
///
/// Owns the last residual phase and the last offset written to hardware.
/// It performs no I/O; the caller writes the returned correction.
#[derive(Debug, Clone)]
pub struct ClockOffsetEstimator {
    /// Residual phase from the previous tick.
    last_sub_samples: SubSamples,
    /// Offset most recently handed out for writing.
    last_applied_offset: u32,
    /// Media clock sample rate in Hz.
    sample_rate: u32,
    /// Minimum residual movement, in sub-samples, that is acted upon.
    drift_threshold: u64,
}

impl ClockOffsetEstimator {
    /// Default drift threshold: a quarter sample.
    pub const DEFAULT_DRIFT_THRESHOLD: u64 = 2;

    /// Create an estimator for a device currently running with `initial_offset`.
    #[must_use]
    pub fn new(sample_rate: u32, initial_offset: u32) -> Self {
        Self {
            last_sub_samples: SubSamples::from_samples(initial_offset),
            last_applied_offset: initial_offset,
            sample_rate,
            drift_threshold: Self::DEFAULT_DRIFT_THRESHOLD,
        }
    }

    /// Set the drift threshold in sub-samples (clamped to at least 1).
    #[must_use]
    pub fn with_drift_threshold(mut self, threshold: u64) -> Self {
        self.drift_threshold = threshold.max(1);
        self
    }

    /// Media clock sample rate in Hz.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Drift threshold in sub-samples.
    #[must_use]
    pub fn drift_threshold(&self) -> u64 {
        self.drift_threshold
    }

    /// Offset most recently handed out for writing.
    #[must_use]
    pub fn last_applied_offset(&self) -> u32 {
        self.last_applied_offset
    }

    /// Residual phase seen on the previous tick.
    #[must_use]
    pub fn last_sub_samples(&self) -> SubSamples {
        self.last_sub_samples
    }

    /// Residual phase between PTP time and the media counter.
    #[must_use]
    pub fn residual(&self, pair: TimestampPair) -> SubSamples {
        SubSamples::from_ptp_nanos(pair.ptp_nanos, self.sample_rate)
            .subtract_samples(pair.media_samples)
    }

    /// Feed one timestamp pair.
    ///
    /// Returns a correction when the residual moved by at least the
    /// drift threshold and rounds to an offset different from the last
    /// applied one. The residual is always remembered.
    pub fn process(&mut self, pair: TimestampPair) -> Option<OffsetCorrection> {
        let residual = self.residual(pair);
        let drift = residual.wrapping_diff(self.last_sub_samples);
        self.last_sub_samples = residual;

        if drift.unsigned_abs() < self.drift_threshold {
            return None;
        }

        let new_offset = residual.round_to_samples();
        if new_offset == self.last_applied_offset {
            return None;
        }

        let correction = OffsetCorrection {
            old_offset: self.last_applied_offset,
            new_offset,
        };
        self.last_applied_offset = new_offset;

        tracing::trace!(
            drift,
            old_offset = correction.old_offset,
            new_offset = correction.new_offset,
            "Offset correction due"
        );

        Some(correction)
    }
}
