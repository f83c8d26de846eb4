//! # ravenna
//!
//! Clock synchronization and stream control for RAVENNA / AES67 FPGA
//! audio interfaces.
//!
//! ## Features
//!
//! - PTP to media clock phase alignment with hysteresis
//! - RX and TX stream descriptors with their binary wire layout
//! - Stream device control over `ioctl`
//! - Receive and transmit telemetry decoding
//! - Sysfs access to the PTP clock and network device attributes
//!
//! ## Example
//!
//! ```rust,no_run
//! use ravenna::device::{NetworkDevice, PtpDevice};
//! use ravenna::sync::SyncLoop;
//! use ravenna::types::SyncConfig;
//!
//! # async fn example() -> Result<(), ravenna::RavennaError> {
//! let config = SyncConfig::builder().ptp_clock_index(1).build();
//! let source = PtpDevice::from_config(&config);
//! let register = NetworkDevice::from_config(&config);
//!
//! let handle = SyncLoop::from_register(source, register, &config)
//!     .await?
//!     .spawn(|correction| println!("offset now {}", correction.new_offset));
//!
//! // ...
//! handle.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Hardware**: [`device`] - stream device node and sysfs attributes
//! - **Control**: [`sync`] - the periodic clock alignment loop
//! - **Pure logic**: [`protocol`] - offset estimation and wire codecs, no I/O

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
/// Error types
pub mod error;
/// Core types
pub mod types;

/// Testing utilities
pub mod testing;

pub mod device;
pub mod protocol;
pub mod sync;

// Re-exports
pub use device::{ControlChannel, DeleteError, DeviceFile, RxStream, StreamDevice, TxStream};
#[cfg(feature = "tokio-runtime")]
pub use device::{NetworkDevice, PtpDevice};
pub use error::{RavennaError, Result};
pub use protocol::clock::{ClockOffsetEstimator, OffsetCorrection, TimestampPair};
pub use protocol::stream::{
    Codec, RxStreamDescriptor, RxTelemetry, TxEndpoint, TxStreamDescriptor, TxTelemetry,
};
#[cfg(feature = "tokio-runtime")]
pub use sync::{SyncHandle, SyncLoop};
pub use sync::{RegisterChannel, TimestampSource};
pub use types::{StreamDeviceConfig, SyncConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
///
/// Convenient re-exports
pub mod prelude {
    pub use crate::{
        Codec, RavennaError, RxStreamDescriptor, StreamDevice, StreamDeviceConfig, SyncConfig,
        TimestampPair, TxEndpoint, TxStreamDescriptor,
    };
    #[cfg(feature = "tokio-runtime")]
    pub use crate::{NetworkDevice, PtpDevice, SyncLoop};
}
