use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RavennaError;

/// Serialize a [`Duration`] as whole milliseconds.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

fn parse_error(what: &str, err: serde_json::Error) -> RavennaError {
    RavennaError::InvalidConfig {
        message: format!("failed to parse {what}: {err}"),
        source: Some(Box::new(err)),
    }
}

#[cfg(feature = "tokio-runtime")]
async fn read_config_file(path: &Path) -> Result<Vec<u8>, RavennaError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| RavennaError::InvalidConfig {
            message: format!("failed to read {}", path.display()),
            source: Some(Box::new(e)),
        })
}

/// Configuration of the PTP to media clock sync loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Index N of the `raN` network device (default: 0)
    pub net_device_index: u32,

    /// Index N of the `ptpN` clock bound to that device (default: 0)
    pub ptp_clock_index: u32,

    /// Media clock sample rate in Hz (default: 48000)
    pub sample_rate: u32,

    /// Interval between timestamp reads (default: 1 second)
    #[serde(rename = "poll_interval_ms", with = "duration_ms")]
    pub poll_interval: Duration,

    /// Minimum residual movement in sub-samples before a correction (default: 2)
    pub drift_threshold: u64,

    /// Root of the sysfs mount (default: `/sys`)
    pub sysfs_root: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            net_device_index: 0,
            ptp_clock_index: 0,
            sample_rate: 48_000,
            poll_interval: Duration::from_secs(1),
            drift_threshold: 2,
            sysfs_root: PathBuf::from("/sys"),
        }
    }
}

impl SyncConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Check that the loop can run with these values.
    ///
    /// # Errors
    /// Returns [`RavennaError::InvalidConfig`] for a zero sample rate,
    /// poll interval or drift threshold.
    pub fn validate(&self) -> Result<(), RavennaError> {
        let invalid = |message: &str| {
            Err(RavennaError::InvalidConfig {
                message: message.to_string(),
                source: None,
            })
        };

        if self.sample_rate == 0 {
            return invalid("sample_rate must be non-zero");
        }
        if self.poll_interval.is_zero() {
            return invalid("poll_interval must be non-zero");
        }
        if self.drift_threshold == 0 {
            return invalid("drift_threshold must be non-zero");
        }
        Ok(())
    }

    /// Parse and validate a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns [`RavennaError::InvalidConfig`] on parse or validation failure.
    pub fn from_json_str(json: &str) -> Result<Self, RavennaError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| parse_error("sync config", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file.
    ///
    /// # Errors
    /// Returns [`RavennaError::InvalidConfig`] if the file cannot be read,
    /// parsed or validated.
    #[cfg(feature = "tokio-runtime")]
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RavennaError> {
        let bytes = read_config_file(path.as_ref()).await?;
        let config: Self =
            serde_json::from_slice(&bytes).map_err(|e| parse_error("sync config", e))?;
        config.validate()?;
        Ok(config)
    }
}

/// Builder for `SyncConfig`
#[derive(Debug, Clone, Default)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    /// Set the `raN` network device index
    #[must_use]
    pub fn net_device_index(mut self, index: u32) -> Self {
        self.config.net_device_index = index;
        self
    }

    /// Set the `ptpN` clock index
    #[must_use]
    pub fn ptp_clock_index(mut self, index: u32) -> Self {
        self.config.ptp_clock_index = index;
        self
    }

    /// Set the media clock sample rate
    #[must_use]
    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.config.sample_rate = rate;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set the drift threshold in sub-samples
    #[must_use]
    pub fn drift_threshold(mut self, threshold: u64) -> Self {
        self.config.drift_threshold = threshold;
        self
    }

    /// Set the sysfs root (useful for tests)
    #[must_use]
    pub fn sysfs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.sysfs_root = root.into();
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> SyncConfig {
        self.config
    }
}

/// Configuration of the stream device control node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamDeviceConfig {
    /// Device node (default: `/dev/ravenna-stream-device`)
    pub path: PathBuf,

    /// Maximum wait for a telemetry report (default: 1 second)
    #[serde(rename = "telemetry_timeout_ms", with = "duration_ms")]
    pub telemetry_timeout: Duration,
}

impl Default for StreamDeviceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/dev/ravenna-stream-device"),
            telemetry_timeout: Duration::from_secs(1),
        }
    }
}

impl StreamDeviceConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> StreamDeviceConfigBuilder {
        StreamDeviceConfigBuilder::default()
    }

    /// Check the values.
    ///
    /// # Errors
    /// Returns [`RavennaError::InvalidConfig`] for an empty path or a
    /// timeout that does not fit the command's millisecond field.
    pub fn validate(&self) -> Result<(), RavennaError> {
        if self.path.as_os_str().is_empty() {
            return Err(RavennaError::InvalidConfig {
                message: "device path must not be empty".to_string(),
                source: None,
            });
        }
        if u32::try_from(self.telemetry_timeout.as_millis()).is_err() {
            return Err(RavennaError::InvalidConfig {
                message: format!(
                    "telemetry_timeout {:?} exceeds the 32-bit millisecond field",
                    self.telemetry_timeout
                ),
                source: None,
            });
        }
        Ok(())
    }

    /// Parse and validate a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns [`RavennaError::InvalidConfig`] on parse or validation failure.
    pub fn from_json_str(json: &str) -> Result<Self, RavennaError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| parse_error("stream device config", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file.
    ///
    /// # Errors
    /// Returns [`RavennaError::InvalidConfig`] if the file cannot be read,
    /// parsed or validated.
    #[cfg(feature = "tokio-runtime")]
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RavennaError> {
        let bytes = read_config_file(path.as_ref()).await?;
        let config: Self = serde_json::from_slice(&bytes)
            .map_err(|e| parse_error("stream device config", e))?;
        config.validate()?;
        Ok(config)
    }
}

/// Builder for `StreamDeviceConfig`
#[derive(Debug, Clone, Default)]
pub struct StreamDeviceConfigBuilder {
    config: StreamDeviceConfig,
}

impl StreamDeviceConfigBuilder {
    /// Set the device node path
    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Set the telemetry timeout
    #[must_use]
    pub fn telemetry_timeout(mut self, timeout: Duration) -> Self {
        self.config.telemetry_timeout = timeout;
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> StreamDeviceConfig {
        self.config
    }
}
