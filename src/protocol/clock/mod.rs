//! PTP to media clock phase alignment.
//!
//! The FPGA counts samples on its own word clock. To keep that counter
//! phase-aligned with network PTP time, a global sample offset register
//! is adjusted whenever the two drift apart.
//!
//! ## Pipeline
//!
//! ```text
//! TimestampPair (ptp_ns, media_samples)
//!   |  SubSamples::from_ptp_nanos(ptp_ns, rate)      (u128 wide multiply)
//!   |  .subtract_samples(media_samples)               (mod 2^64)
//!   v
//! residual --- |diff| < threshold ---> no action
//!   |
//!   |  round_to_samples()                             (half-up, mod 2^32)
//!   v
//! offset == last applied ---> no action
//!   |
//!   v
//! OffsetCorrection { old_offset, new_offset }
//! ```

pub mod estimator;
pub mod subsample;
pub mod timestamp;

#[cfg(test)]
mod tests;

pub use estimator::{ClockOffsetEstimator, OffsetCorrection};
pub use subsample::{SUB_SAMPLES_PER_SAMPLE, SubSamples};
pub use timestamp::TimestampPair;
