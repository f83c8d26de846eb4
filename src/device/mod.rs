//! Hardware access: the stream device node and sysfs attributes.
//!
//! [`StreamDevice`] issues stream commands through a [`ControlChannel`];
//! [`PtpDevice`] and [`NetworkDevice`] implement the sync loop's
//! collaborators over sysfs.

mod control;
mod stream_device;
#[cfg(feature = "tokio-runtime")]
mod sysfs;

#[cfg(test)]
mod tests;

pub use control::{ControlChannel, DeviceFile};
pub use stream_device::{DeleteError, RxStream, StreamDevice, TxStream};
#[cfg(feature = "tokio-runtime")]
pub use sysfs::{Counter, NetworkDevice, PtpDevice};
