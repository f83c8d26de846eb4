//! Sysfs attributes of the PTP clock and the RAVENNA network device.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;

use crate::error::RavennaError;
use crate::protocol::clock::TimestampPair;
use crate::sync::{RegisterChannel, TimestampSource};
use crate::types::SyncConfig;

async fn read_attribute(path: &Path) -> Result<String, RavennaError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| RavennaError::TransientRead {
            what: path.display().to_string(),
            source,
        })
}

async fn write_attribute(path: &Path, value: &str) -> Result<(), RavennaError> {
    tokio::fs::write(path, value)
        .await
        .map_err(|source| RavennaError::HardwareWrite {
            what: path.display().to_string(),
            source,
        })
}

fn parse_number<T: FromStr>(text: &str, path: &Path) -> Result<T, RavennaError> {
    text.trim()
        .parse()
        .map_err(|_| RavennaError::MalformedPayload {
            what: path.display().to_string(),
            payload: text.trim().to_string(),
        })
}

/// The PTP clock's `rtp_timestamp` attribute.
#[derive(Debug, Clone)]
pub struct PtpDevice {
    timestamp_path: PathBuf,
}

impl PtpDevice {
    /// Clock `ptp<index>` under `sysfs_root`.
    #[must_use]
    pub fn new(sysfs_root: impl AsRef<Path>, index: u32) -> Self {
        Self {
            timestamp_path: sysfs_root
                .as_ref()
                .join("class/ptp")
                .join(format!("ptp{index}"))
                .join("device/rtp_timestamp"),
        }
    }

    /// Clock named by the sync configuration.
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(&config.sysfs_root, config.ptp_clock_index)
    }

    /// Path of the timestamp attribute.
    #[must_use]
    pub fn timestamp_path(&self) -> &Path {
        &self.timestamp_path
    }
}

#[async_trait]
impl TimestampSource for PtpDevice {
    async fn read_timestamp_pair(&self) -> Result<TimestampPair, RavennaError> {
        let text = read_attribute(&self.timestamp_path).await?;
        TimestampPair::parse_attribute(&text, &self.timestamp_path.display().to_string())
    }
}

/// Packet counters exported by the network device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    /// UDP packets throttled before reaching the host
    UdpThrottledPackets,
    /// Packets parsed by the RX path
    RxPacketsParsed,
    /// RX queue errors
    RxQueueErrors,
    /// RX checksum errors
    RxChecksumErrors,
    /// Stream packets dropped
    RxStreamPacketsDropped,
    /// Stream packets received
    RxStreamPackets,
    /// Non-stream packets received
    RxLegacyPackets,
    /// Stream packets sent
    TxStreamPackets,
    /// Non-stream packets sent
    TxLegacyPackets,
    /// Stream packets lost on transmit
    TxStreamPacketsLost,
}

impl Counter {
    /// Every counter.
    pub const ALL: [Self; 10] = [
        Self::UdpThrottledPackets,
        Self::RxPacketsParsed,
        Self::RxQueueErrors,
        Self::RxChecksumErrors,
        Self::RxStreamPacketsDropped,
        Self::RxStreamPackets,
        Self::RxLegacyPackets,
        Self::TxStreamPackets,
        Self::TxLegacyPackets,
        Self::TxStreamPacketsLost,
    ];

    /// Attribute file name.
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::UdpThrottledPackets => "udp_throttled_packets",
            Self::RxPacketsParsed => "rx_packets_parsed",
            Self::RxQueueErrors => "rx_queue_errors",
            Self::RxChecksumErrors => "rx_checksum_errors",
            Self::RxStreamPacketsDropped => "rx_stream_packets_dropped",
            Self::RxStreamPackets => "rx_stream_packets",
            Self::RxLegacyPackets => "rx_legacy_packets",
            Self::TxStreamPackets => "tx_stream_packets",
            Self::TxLegacyPackets => "tx_legacy_packets",
            Self::TxStreamPacketsLost => "tx_stream_packets_lost",
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// The `ra_net` attribute directory of network device `ra<N>`.
#[derive(Debug, Clone)]
pub struct NetworkDevice {
    dir: PathBuf,
}

impl NetworkDevice {
    const GLOBAL_OFFSET: &'static str = "rtp_global_offset";
    const UDP_FILTER_PORT: &'static str = "udp_filter_port";
    const COUNTER_RESET: &'static str = "counter_reset";

    /// Device `ra<index>` under `sysfs_root`.
    #[must_use]
    pub fn new(sysfs_root: impl AsRef<Path>, index: u32) -> Self {
        Self {
            dir: sysfs_root
                .as_ref()
                .join("class/net")
                .join(format!("ra{index}"))
                .join("ra_net"),
        }
    }

    /// Device named by the sync configuration.
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(&config.sysfs_root, config.net_device_index)
    }

    /// Attribute directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_number<T: FromStr>(&self, name: &str) -> Result<T, RavennaError> {
        let path = self.dir.join(name);
        let text = read_attribute(&path).await?;
        parse_number(&text, &path)
    }

    async fn read_text(&self, name: &str) -> Result<String, RavennaError> {
        Ok(read_attribute(&self.dir.join(name)).await?.trim().to_string())
    }

    /// UDP port the device diverts to the stream engine.
    ///
    /// # Errors
    /// Returns a read or parse error.
    pub async fn udp_filter_port(&self) -> Result<u16, RavennaError> {
        self.read_number(Self::UDP_FILTER_PORT).await
    }

    /// Change the UDP filter port.
    ///
    /// # Errors
    /// Returns [`RavennaError::HardwareWrite`] if the attribute rejects the value.
    pub async fn set_udp_filter_port(&self, port: u16) -> Result<(), RavennaError> {
        write_attribute(&self.dir.join(Self::UDP_FILTER_PORT), &port.to_string()).await
    }

    /// Reset all packet counters.
    ///
    /// # Errors
    /// Returns [`RavennaError::HardwareWrite`] if the reset is rejected.
    pub async fn reset_counters(&self) -> Result<(), RavennaError> {
        write_attribute(&self.dir.join(Self::COUNTER_RESET), "1").await
    }

    /// FPGA core version string.
    ///
    /// # Errors
    /// Returns a read error.
    pub async fn rav_core_version(&self) -> Result<String, RavennaError> {
        self.read_text("rav_core_version").await
    }

    /// Driver version string.
    ///
    /// # Errors
    /// Returns a read error.
    pub async fn driver_version(&self) -> Result<String, RavennaError> {
        self.read_text("driver_version").await
    }

    /// Read one packet counter.
    ///
    /// # Errors
    /// Returns a read or parse error.
    pub async fn counter(&self, counter: Counter) -> Result<u64, RavennaError> {
        self.read_number(counter.file_name()).await
    }

    /// Read every packet counter.
    ///
    /// # Errors
    /// Returns the first read or parse error.
    pub async fn counters(&self) -> Result<Vec<(Counter, u64)>, RavennaError> {
        let mut values = Vec::with_capacity(Counter::ALL.len());
        for counter in Counter::ALL {
            values.push((counter, self.counter(counter).await?));
        }
        Ok(values)
    }
}

#[async_trait]
impl RegisterChannel for NetworkDevice {
    async fn read_global_offset(&self) -> Result<u32, RavennaError> {
        self.read_number(Self::GLOBAL_OFFSET).await
    }

    async fn write_global_offset(&self, offset: u32) -> Result<(), RavennaError> {
        write_attribute(&self.dir.join(Self::GLOBAL_OFFSET), &offset.to_string()).await
    }
}
