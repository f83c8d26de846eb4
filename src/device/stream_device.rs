use std::io;
use std::time::Duration;

use bytes::BytesMut;

use super::control::{ControlChannel, DeviceFile};
use crate::error::RavennaError;
use crate::protocol::stream::command::DEVICE_INFO_SIZE;
use crate::protocol::stream::{
    Command, DeviceInfo, Request, RxStreamDescriptor, RxTelemetry, TxStreamDescriptor,
    TxTelemetry,
};
use crate::types::StreamDeviceConfig;

/// A live RX stream.
///
/// Not `Clone`: a successful delete consumes the handle.
#[derive(Debug)]
pub struct RxStream {
    index: u32,
    descriptor: RxStreamDescriptor,
}

impl RxStream {
    /// Index assigned by the device.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Descriptor the stream currently runs with.
    #[must_use]
    pub fn descriptor(&self) -> &RxStreamDescriptor {
        &self.descriptor
    }
}

/// A live TX stream.
///
/// Not `Clone`: a successful delete consumes the handle.
#[derive(Debug)]
pub struct TxStream {
    index: u32,
    descriptor: TxStreamDescriptor,
}

/// A delete the device rejected.
///
/// The stream is still live on the device, so the handle comes back
/// for a retry.
#[derive(Debug)]
pub struct DeleteError<S> {
    /// The handle passed to the delete call
    pub stream: S,
    /// Why the device rejected it
    pub source: RavennaError,
}

impl<S> DeleteError<S> {
    /// Split into the handle and the device error.
    pub fn into_parts(self) -> (S, RavennaError) {
        (self.stream, self.source)
    }
}

impl<S> std::fmt::Display for DeleteError<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stream delete rejected: {}", self.source)
    }
}

impl<S: std::fmt::Debug> std::error::Error for DeleteError<S> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl<S> From<DeleteError<S>> for RavennaError {
    fn from(err: DeleteError<S>) -> Self {
        err.source
    }
}

impl TxStream {
    /// Index assigned by the device.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Descriptor the stream currently runs with.
    #[must_use]
    pub fn descriptor(&self) -> &TxStreamDescriptor {
        &self.descriptor
    }
}

/// Stream management on one device.
///
/// Methods take `&mut self`: the device executes one command at a time and
/// stream indices are not reentrant.
#[derive(Debug)]
pub struct StreamDevice<C> {
    channel: C,
    info: DeviceInfo,
    telemetry_timeout: Duration,
}

#[cfg(unix)]
impl StreamDevice<DeviceFile> {
    /// Open the configured device node and query its capabilities.
    ///
    /// # Errors
    /// Returns [`RavennaError::InvalidConfig`] if the node cannot be opened
    /// and [`RavennaError::TransientRead`] if device info cannot be read.
    pub fn open(config: &StreamDeviceConfig) -> Result<Self, RavennaError> {
        config.validate()?;
        let file = DeviceFile::open(&config.path).map_err(|e| RavennaError::InvalidConfig {
            message: format!("failed to open {}", config.path.display()),
            source: Some(Box::new(e)),
        })?;
        Self::with_channel(file, config.telemetry_timeout)
    }
}

impl<C: ControlChannel> StreamDevice<C> {
    /// Wrap a control channel and query device capabilities.
    ///
    /// # Errors
    /// Returns [`RavennaError::TransientRead`] if device info cannot be read.
    pub fn with_channel(mut channel: C, telemetry_timeout: Duration) -> Result<Self, RavennaError> {
        let mut payload = Request::DeviceInfo.encode()?;
        channel
            .execute(Command::DeviceInfo, &mut payload)
            .map_err(|source| RavennaError::TransientRead {
                what: Command::DeviceInfo.to_string(),
                source,
            })?;

        let reply: &[u8; DEVICE_INFO_SIZE] = payload[..].try_into().map_err(|_| {
            RavennaError::MalformedPayload {
                what: Command::DeviceInfo.to_string(),
                payload: format!("{} bytes", payload.len()),
            }
        })?;
        let info = DeviceInfo::decode(reply);

        tracing::debug!(
            max_tracks = info.max_tracks,
            max_rx_streams = info.max_rx_streams,
            max_tx_streams = info.max_tx_streams,
            "Stream device opened"
        );

        Ok(Self {
            channel,
            info,
            telemetry_timeout,
        })
    }

    /// Capabilities reported by the device.
    #[must_use]
    pub fn info(&self) -> DeviceInfo {
        self.info
    }

    /// Default timeout for telemetry reads.
    #[must_use]
    pub fn telemetry_timeout(&self) -> Duration {
        self.telemetry_timeout
    }

    /// Change the default telemetry timeout.
    pub fn set_telemetry_timeout(&mut self, timeout: Duration) {
        self.telemetry_timeout = timeout;
    }

    /// Release the underlying channel.
    pub fn into_channel(self) -> C {
        self.channel
    }

    fn submit(&mut self, request: &Request<'_>) -> Result<u32, RavennaError> {
        let command = request.command();
        let mut payload = request.encode()?;
        tracing::debug!(%command, code = %command.code(), len = payload.len(), "Issuing command");

        self.channel
            .execute(command, &mut payload)
            .map_err(|source| RavennaError::HardwareWrite {
                what: command.to_string(),
                source,
            })
    }

    fn query(&mut self, request: &Request<'_>, timeout: Duration) -> Result<BytesMut, RavennaError> {
        let command = request.command();
        let mut payload = request.encode()?;
        tracing::debug!(%command, ?timeout, "Reading telemetry");

        match self.channel.execute(command, &mut payload) {
            Ok(_) => Ok(payload),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                Err(RavennaError::TelemetryTimeout { timeout })
            }
            Err(source) => Err(RavennaError::TransientRead {
                what: command.to_string(),
                source,
            }),
        }
    }

    // ===== RX =====

    /// Create an RX stream.
    ///
    /// # Errors
    /// Returns a validation error if the descriptor does not fit this
    /// device and [`RavennaError::HardwareWrite`] if the device rejects it.
    pub fn add_rx_stream(
        &mut self,
        descriptor: RxStreamDescriptor,
    ) -> Result<RxStream, RavennaError> {
        descriptor.validate(self.info.max_tracks)?;
        let index = self.submit(&Request::AddRx(&descriptor))?;
        tracing::info!(index, channels = descriptor.num_channels, "RX stream added");
        Ok(RxStream { index, descriptor })
    }

    /// Replace the descriptor of an RX stream.
    ///
    /// The handle keeps its old descriptor if the update fails.
    ///
    /// # Errors
    /// As for [`add_rx_stream`](Self::add_rx_stream).
    pub fn update_rx_stream(
        &mut self,
        stream: &mut RxStream,
        descriptor: RxStreamDescriptor,
    ) -> Result<(), RavennaError> {
        descriptor.validate(self.info.max_tracks)?;
        self.submit(&Request::UpdateRx {
            index: stream.index,
            descriptor: &descriptor,
        })?;
        tracing::debug!(index = stream.index, "RX stream updated");
        stream.descriptor = descriptor;
        Ok(())
    }

    /// Delete an RX stream.
    ///
    /// The handle is consumed only when the device accepts the command.
    ///
    /// # Errors
    /// Returns a [`DeleteError`] holding the handle and a
    /// [`RavennaError::HardwareWrite`] if the device rejects the command.
    pub fn delete_rx_stream(
        &mut self,
        stream: RxStream,
    ) -> Result<(), DeleteError<RxStream>> {
        if let Err(source) = self.submit(&Request::DeleteRx {
            index: stream.index,
        }) {
            tracing::warn!(index = stream.index, error = %source, "RX stream delete rejected");
            return Err(DeleteError { stream, source });
        }
        tracing::info!(index = stream.index, "RX stream deleted");
        Ok(())
    }

    /// Read RX telemetry with the default timeout.
    ///
    /// # Errors
    /// See [`read_rx_telemetry_with_timeout`](Self::read_rx_telemetry_with_timeout).
    pub fn read_rx_telemetry(&mut self, stream: &RxStream) -> Result<RxTelemetry, RavennaError> {
        self.read_rx_telemetry_with_timeout(stream, self.telemetry_timeout)
    }

    /// Read RX telemetry, waiting up to `timeout` for the next report.
    ///
    /// # Errors
    /// Returns [`RavennaError::TelemetryTimeout`] if no report arrived and
    /// [`RavennaError::TransientRead`] for any other device error.
    pub fn read_rx_telemetry_with_timeout(
        &mut self,
        stream: &RxStream,
        timeout: Duration,
    ) -> Result<RxTelemetry, RavennaError> {
        let command = Request::ReadRxTelemetry {
            index: stream.index,
            timeout,
        };
        let reply = self.query(&command, timeout)?;
        RxTelemetry::from_reply(&reply).ok_or_else(|| RavennaError::MalformedPayload {
            what: Command::ReadRxTelemetry.to_string(),
            payload: format!("{} bytes", reply.len()),
        })
    }

    // ===== TX =====

    /// Create a TX stream.
    ///
    /// # Errors
    /// Returns a validation error if the descriptor does not fit this
    /// device and [`RavennaError::HardwareWrite`] if the device rejects it.
    pub fn add_tx_stream(
        &mut self,
        descriptor: TxStreamDescriptor,
    ) -> Result<TxStream, RavennaError> {
        descriptor.validate(self.info.max_tracks)?;
        let index = self.submit(&Request::AddTx(&descriptor))?;
        tracing::info!(index, channels = descriptor.num_channels, "TX stream added");
        Ok(TxStream { index, descriptor })
    }

    /// Replace the descriptor of a TX stream.
    ///
    /// The handle keeps its old descriptor if the update fails.
    ///
    /// # Errors
    /// As for [`add_tx_stream`](Self::add_tx_stream).
    pub fn update_tx_stream(
        &mut self,
        stream: &mut TxStream,
        descriptor: TxStreamDescriptor,
    ) -> Result<(), RavennaError> {
        descriptor.validate(self.info.max_tracks)?;
        self.submit(&Request::UpdateTx {
            index: stream.index,
            descriptor: &descriptor,
        })?;
        tracing::debug!(index = stream.index, "TX stream updated");
        stream.descriptor = descriptor;
        Ok(())
    }

    /// Delete a TX stream.
    ///
    /// The handle is consumed only when the device accepts the command.
    ///
    /// # Errors
    /// Returns a [`DeleteError`] holding the handle and a
    /// [`RavennaError::HardwareWrite`] if the device rejects the command.
    pub fn delete_tx_stream(
        &mut self,
        stream: TxStream,
    ) -> Result<(), DeleteError<TxStream>> {
        if let Err(source) = self.submit(&Request::DeleteTx {
            index: stream.index,
        }) {
            tracing::warn!(index = stream.index, error = %source, "TX stream delete rejected");
            return Err(DeleteError { stream, source });
        }
        tracing::info!(index = stream.index, "TX stream deleted");
        Ok(())
    }

    /// Read TX telemetry with the default timeout.
    ///
    /// # Errors
    /// See [`read_tx_telemetry_with_timeout`](Self::read_tx_telemetry_with_timeout).
    pub fn read_tx_telemetry(&mut self, stream: &TxStream) -> Result<TxTelemetry, RavennaError> {
        self.read_tx_telemetry_with_timeout(stream, self.telemetry_timeout)
    }

    /// Read TX telemetry, waiting up to `timeout` for the next report.
    ///
    /// # Errors
    /// Returns [`RavennaError::TelemetryTimeout`] if no report arrived and
    /// [`RavennaError::TransientRead`] for any other device error.
    pub fn read_tx_telemetry_with_timeout(
        &mut self,
        stream: &TxStream,
        timeout: Duration,
    ) -> Result<TxTelemetry, RavennaError> {
        let command = Request::ReadTxTelemetry {
            index: stream.index,
            timeout,
        };
        let reply = self.query(&command, timeout)?;
        TxTelemetry::from_reply(&reply).ok_or_else(|| RavennaError::MalformedPayload {
            what: Command::ReadTxTelemetry.to_string(),
            payload: format!("{} bytes", reply.len()),
        })
    }
}
