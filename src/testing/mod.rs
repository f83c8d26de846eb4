//! Test doubles for the hardware collaborators.
//!
//! All mocks are cheap to clone and share their state, so a test can hand
//! one clone to the code under test and inspect another.

#[cfg(feature = "tokio-runtime")]
pub mod mock_clock;
pub mod mock_device;

#[cfg(feature = "tokio-runtime")]
pub use mock_clock::{MockRegister, MockTimestampSource};
pub use mock_device::{MockControlChannel, RecordedCommand};

use crate::protocol::clock::TimestampPair;

/// Timestamp pair whose residual against `sample_rate` is `offset` whole
/// samples at PTP second `seconds`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    reason = "The media counter is 32 bits wide and wraps"
)]
pub fn pair_with_offset(seconds: u64, sample_rate: u32, offset: u32) -> TimestampPair {
    let media = seconds
        .wrapping_mul(u64::from(sample_rate))
        .wrapping_sub(u64::from(offset));
    TimestampPair::new(
        seconds.wrapping_mul(TimestampPair::NANOS_PER_SEC),
        media as u32,
    )
}
