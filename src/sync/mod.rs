//! Keeps the FPGA media clock phase-aligned with PTP time.
//!
//! A [`SyncLoop`] polls a [`TimestampSource`] on a fixed interval, feeds
//! each reading to a [`ClockOffsetEstimator`](crate::protocol::clock::ClockOffsetEstimator)
//! and writes corrections through a [`RegisterChannel`]. Read failures
//! are logged and skipped; a failed write stops the loop.

#[cfg(feature = "tokio-runtime")]
mod sync_loop;
mod traits;


#[cfg(feature = "tokio-runtime")]
pub use sync_loop::{SyncHandle, SyncLoop, SyncState, TickOutcome};
pub use traits::{RegisterChannel, TimestampSource};
