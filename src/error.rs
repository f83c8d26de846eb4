use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while synchronizing clocks or driving the stream device
#[derive(Debug, Error)]
pub enum RavennaError {
    // ===== Read Errors =====
    /// Reading a timestamp, register or telemetry block failed
    #[error("read failed on {what}: {source}")]
    TransientRead {
        /// What was being read (attribute path or command name)
        what: String,
        /// The underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// A raw attribute did not have the expected shape
    #[error("malformed payload from {what}: {payload:?}")]
    MalformedPayload {
        /// What was being read
        what: String,
        /// The offending payload, trimmed
        payload: String,
    },

    /// Telemetry did not arrive within the caller's timeout
    #[error("telemetry read timed out after {timeout:?}")]
    TelemetryTimeout {
        /// The timeout passed to the control channel
        timeout: Duration,
    },

    // ===== Write Errors =====
    /// Writing the offset register or issuing a control command failed
    #[error("hardware write failed on {what}: {source}")]
    HardwareWrite {
        /// The register or command that was written
        what: String,
        /// The underlying I/O failure
        #[source]
        source: io::Error,
    },

    // ===== Protocol Errors =====
    /// A field is outside the range the wire format can carry
    #[error("{field} out of range: {value} (allowed {min}..={max})")]
    ProtocolRange {
        /// Name of the field
        field: &'static str,
        /// The rejected value
        value: i64,
        /// Smallest accepted value
        min: i64,
        /// Largest accepted value
        max: i64,
    },

    /// A codec byte that does not name a supported codec
    #[error("unsupported codec value: {0}")]
    UnsupportedCodec(u8),

    /// A descriptor that is structurally unusable
    #[error("invalid stream descriptor: {reason}")]
    InvalidDescriptor {
        /// Why the descriptor was rejected
        reason: String,
    },

    // ===== Configuration Errors =====
    /// Configuration failed to parse or validate
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem
        message: String,
        /// The underlying source of the error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl RavennaError {
    /// Build a [`RavennaError::ProtocolRange`] for a value outside `min..=max`
    #[must_use]
    pub fn out_of_range(
        field: &'static str,
        value: impl Into<i64>,
        min: impl Into<i64>,
        max: impl Into<i64>,
    ) -> Self {
        Self::ProtocolRange {
            field,
            value: value.into(),
            min: min.into(),
            max: max.into(),
        }
    }

    /// Check if this error is a read failure the sync loop skips over
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransientRead { .. } | Self::MalformedPayload { .. } | Self::TelemetryTimeout { .. }
        )
    }

    /// Check if this error invalidates the hardware state
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::HardwareWrite { .. })
    }

    /// Check if this error was raised before anything reached the hardware
    #[must_use]
    pub fn is_protocol_range(&self) -> bool {
        matches!(
            self,
            Self::ProtocolRange { .. } | Self::UnsupportedCodec(_) | Self::InvalidDescriptor { .. }
        )
    }
}

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, RavennaError>;
