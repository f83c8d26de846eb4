//! PTP / media-clock timestamp pairs.
//!
//! The PTP hardware latches the network PTP time and the FPGA's free
//! running media sample counter on the same edge. The pair is exposed
//! as two decimal tokens, `"<ptp_nanoseconds> <media_samples>"`.

use std::str::FromStr;

use crate::error::RavennaError;

/// A simultaneous reading of PTP time and the local media sample counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TimestampPair {
    /// PTP time in nanoseconds since the PTP epoch.
    pub ptp_nanos: u64,
    /// Local media clock in samples, wrapping modulo 2^32.
    pub media_samples: u32,
}

impl TimestampPair {
    /// Nanoseconds per second.
    pub const NANOS_PER_SEC: u64 = 1_000_000_000;

    /// Zero pair.
    pub const ZERO: Self = Self {
        ptp_nanos: 0,
        media_samples: 0,
    };

    /// Create a new pair.
    #[must_use]
    pub fn new(ptp_nanos: u64, media_samples: u32) -> Self {
        Self {
            ptp_nanos,
            media_samples,
        }
    }

    /// Whole PTP seconds.
    #[must_use]
    pub fn ptp_seconds(&self) -> u64 {
        self.ptp_nanos / Self::NANOS_PER_SEC
    }

    /// Nanoseconds within the current PTP second.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Remainder of a division by 1e9 always fits in u32"
    )]
    pub fn ptp_subsec_nanos(&self) -> u32 {
        (self.ptp_nanos % Self::NANOS_PER_SEC) as u32
    }

    /// Parse the sysfs representation, naming `what` in errors.
    ///
    /// # Errors
    /// Returns [`RavennaError::MalformedPayload`] unless the text holds
    /// exactly two decimal tokens that fit `u64` and `u32` respectively.
    pub fn parse_attribute(text: &str, what: &str) -> Result<Self, RavennaError> {
        let malformed = || RavennaError::MalformedPayload {
            what: what.to_string(),
            payload: text.trim().to_string(),
        };

        let mut tokens = text.split_whitespace();
        let (Some(ptp), Some(media), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            return Err(malformed());
        };

        let ptp_nanos = ptp.parse::<u64>().map_err(|_| malformed())?;
        let media_samples = media.parse::<u32>().map_err(|_| malformed())?;

        Ok(Self {
            ptp_nanos,
            media_samples,
        })
    }
}

impl FromStr for TimestampPair {
    type Err = RavennaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_attribute(s, "timestamp pair")
    }
}

impl std::fmt::Display for TimestampPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.ptp_nanos, self.media_samples)
    }
}

impl From<(u64, u32)> for TimestampPair {
    fn from((ptp_nanos, media_samples): (u64, u32)) -> Self {
        Self::new(ptp_nanos, media_samples)
    }
}
