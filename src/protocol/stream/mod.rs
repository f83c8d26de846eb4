//! Stream device control protocol.
//!
//! Descriptors for RX and TX audio streams, their fixed binary layout,
//! the packed command codes that carry them, and the RTCP telemetry
//! decoded from replies.

pub mod codec;
pub mod command;
pub mod descriptor;
pub mod rtcp;
pub mod tracks;
pub mod types;

#[cfg(test)]
mod tests;

pub use codec::{DeviceInfo, Request};
pub use command::{Command, CommandCode, Direction};
pub use descriptor::{
    RxStreamBuilder, RxStreamDescriptor, TxEndpoint, TxStreamBuilder, TxStreamDescriptor,
};
pub use rtcp::{RxInterfaceTelemetry, RxTelemetry, TxInterfaceTelemetry, TxTelemetry};
pub use tracks::TrackMap;
pub use types::{Codec, DeviceState, MAX_CHANNELS, MAX_TRACKS, MacAddress, TRACK_NULL};
