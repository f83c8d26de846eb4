//! Shared stream device constants and small wire types.

use std::str::FromStr;

use crate::error::RavennaError;

/// Current control protocol version, prefixed to every add/update/delete command.
pub const PROTOCOL_VERSION: u32 = 0;

/// Maximum number of channels in one stream.
pub const MAX_CHANNELS: usize = 256;

/// Upper bound of the hardware track table; devices may report fewer.
pub const MAX_TRACKS: u32 = 256;

/// Track index routing a channel nowhere.
pub const TRACK_NULL: i16 = -1;

/// Largest IP packet the FPGA transmits.
pub const MAX_ETHERNET_PACKET_SIZE: usize = 1460;

/// IP + UDP + RTP header bytes in front of every audio payload.
pub const PACKET_HEADER_OVERHEAD: usize = 20 + 8 + 12;

/// Largest VLAN identifier.
pub const MAX_VLAN_ID: u16 = 4095;

/// Largest DSCP/ToS value (6 bits).
pub const MAX_DSCP: u8 = 63;

/// Audio sample encoding carried by a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Codec {
    /// AES3 over IEC 61883-6 (AM824), 8 bytes per sample slot.
    Am824 = 0,
    /// 32-bit linear PCM.
    L32 = 1,
    /// 24-bit linear PCM.
    #[default]
    L24 = 2,
    /// 16-bit linear PCM.
    L16 = 3,
}

impl Codec {
    /// Bytes one sample of one channel occupies in the RTP payload.
    #[must_use]
    pub fn sample_length(self) -> usize {
        match self {
            Self::Am824 => 8,
            Self::L32 => 4,
            Self::L24 => 3,
            Self::L16 => 2,
        }
    }

    /// Wire value.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Codec {
    type Error = RavennaError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Am824),
            1 => Ok(Self::L32),
            2 => Ok(Self::L24),
            3 => Ok(Self::L16),
            other => Err(RavennaError::UnsupportedCodec(other)),
        }
    }
}

impl FromStr for Codec {
    type Err = RavennaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AM824" => Ok(Self::Am824),
            "L32" => Ok(Self::L32),
            "L24" => Ok(Self::L24),
            "L16" => Ok(Self::L16),
            _ => Err(RavennaError::InvalidDescriptor {
                reason: format!("unknown codec name {s:?}"),
            }),
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Am824 => write!(f, "AM824"),
            Self::L32 => write!(f, "L32"),
            Self::L24 => write!(f, "L24"),
            Self::L16 => write!(f, "L16"),
        }
    }
}

/// Receiver lock state reported in RX telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DeviceState {
    /// Stream just created.
    Initializing = 0,
    /// Estimating the offset of the first path.
    EstimatingFirst = 1,
    /// Locked to the first path.
    LockedFirst = 2,
    /// Estimating the offset of the second path.
    EstimatingSecond = 3,
    /// Locked to both paths.
    LockedSecond = 4,
    /// Re-aligning after a disturbance.
    Realign = 5,
}

impl DeviceState {
    /// Parse from the raw telemetry byte.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Initializing),
            1 => Some(Self::EstimatingFirst),
            2 => Some(Self::LockedFirst),
            3 => Some(Self::EstimatingSecond),
            4 => Some(Self::LockedSecond),
            5 => Some(Self::Realign),
            _ => None,
        }
    }

    /// Whether the receiver is locked on at least one path.
    #[must_use]
    pub fn is_locked(self) -> bool {
        matches!(self, Self::LockedFirst | Self::LockedSecond)
    }
}

/// Ethernet hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// All-zero address.
    pub const ZERO: Self = Self([0; 6]);

    /// Multicast MAC for an IPv4 group (01:00:5e + low 23 bits).
    #[must_use]
    pub fn ipv4_multicast(ip: std::net::Ipv4Addr) -> Self {
        let o = ip.octets();
        Self([0x01, 0x00, 0x5e, o[1] & 0x7f, o[2], o[3]])
    }

    /// Raw bytes.
    #[must_use]
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddress {
    type Err = RavennaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RavennaError::InvalidDescriptor {
            reason: format!("invalid MAC address {s:?}"),
        };

        let mut bytes = [0u8; 6];
        let mut parts = s.split([':', '-']);
        for byte in &mut bytes {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(bytes))
    }
}

impl std::fmt::Display for MacAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}
