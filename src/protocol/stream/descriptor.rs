//! RX / TX stream descriptors and their builders.
//!
//! A descriptor is the complete, fixed-size description of one stream
//! as the FPGA consumes it. Builders apply the track defaulting policy
//! and reject anything the hardware would refuse before a command is
//! ever issued.

use std::net::{Ipv4Addr, SocketAddrV4};

use super::tracks::TrackMap;
use super::types::{
    Codec, MAX_CHANNELS, MAX_DSCP, MAX_ETHERNET_PACKET_SIZE, MAX_TRACKS, MAX_VLAN_ID, MacAddress,
    PACKET_HEADER_OVERHEAD,
};
use crate::error::RavennaError;

/// Default RTP dynamic payload type.
pub const DEFAULT_RTP_PAYLOAD_TYPE: u8 = 98;

/// Check the RTP payload type against channel count and codec (RFC 3551 static types).
///
/// # Errors
/// Returns [`RavennaError::ProtocolRange`] for payload types outside
/// `95..=127` other than the static L16 types 10 and 11, and
/// [`RavennaError::InvalidDescriptor`] when a static type does not match
/// its fixed format.
pub fn validate_payload_type(
    payload_type: u8,
    num_channels: u16,
    codec: Codec,
) -> Result<(), RavennaError> {
    let static_format = |channels: u16| {
        if num_channels == channels && codec == Codec::L16 {
            Ok(())
        } else {
            Err(RavennaError::InvalidDescriptor {
                reason: format!(
                    "RTP payload type {payload_type} requires {channels} channel(s) of L16, \
                     got {num_channels} of {codec}"
                ),
            })
        }
    };

    match payload_type {
        10 => static_format(2),
        11 => static_format(1),
        95..=127 => Ok(()),
        other => Err(RavennaError::out_of_range("rtp_payload_type", other, 95, 127)),
    }
}

fn check_channels(num_channels: u16) -> Result<(), RavennaError> {
    if usize::from(num_channels) > MAX_CHANNELS {
        return Err(RavennaError::out_of_range(
            "num_channels",
            num_channels,
            0,
            MAX_CHANNELS as u32,
        ));
    }
    Ok(())
}

fn check_endpoint_port(addr: &SocketAddrV4, role: &str) -> Result<(), RavennaError> {
    if !addr.ip().is_unspecified() && addr.port() == 0 {
        return Err(RavennaError::InvalidDescriptor {
            reason: format!("{role} address {} has no port", addr.ip()),
        });
    }
    Ok(())
}

// ===== RX =====

/// Description of a stream the FPGA receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RxStreamDescriptor {
    /// Destination address on the primary interface.
    pub primary: Option<SocketAddrV4>,
    /// Destination address on the secondary interface.
    pub secondary: Option<SocketAddrV4>,
    /// Use this stream as the media clock sync source.
    pub sync_source: bool,
    /// Merge primary and secondary paths for seamless failover.
    pub hitless_protection: bool,
    /// Lock to absolute sample phase rather than only frequency.
    pub synchronous: bool,
    /// Drop packets whose SSRC does not match `rtp_ssrc`.
    pub rtp_filter: bool,
    /// Stream is enabled.
    pub active: bool,
    /// Sample encoding.
    pub codec: Codec,
    /// Expected RTP payload type.
    pub rtp_payload_type: u8,
    /// Jitter buffer margin in samples.
    pub jitter_buffer_margin: u16,
    /// RTP timestamp offset in samples.
    pub rtp_offset: u32,
    /// Expected RTP SSRC.
    pub rtp_ssrc: u32,
    /// Number of channels.
    pub num_channels: u16,
    /// Channel to track routing.
    pub tracks: TrackMap,
}

impl RxStreamDescriptor {
    /// Create a new builder.
    #[must_use]
    pub fn builder() -> RxStreamBuilder {
        RxStreamBuilder::default()
    }

    /// Whether a secondary path is configured; secondary telemetry is
    /// meaningless otherwise.
    #[must_use]
    pub fn uses_secondary(&self) -> bool {
        self.secondary.is_some()
    }

    /// Check the descriptor against a device with `max_tracks` tracks.
    ///
    /// # Errors
    /// Returns the first violated constraint.
    pub fn validate(&self, max_tracks: u32) -> Result<(), RavennaError> {
        let has_address =
            |ep: &Option<SocketAddrV4>| ep.is_some_and(|a| !a.ip().is_unspecified());
        if !has_address(&self.primary) && !has_address(&self.secondary) {
            return Err(RavennaError::InvalidDescriptor {
                reason: "RX stream needs a primary or secondary destination".to_string(),
            });
        }
        if let Some(addr) = &self.primary {
            check_endpoint_port(addr, "primary")?;
        }
        if let Some(addr) = &self.secondary {
            check_endpoint_port(addr, "secondary")?;
        }

        check_channels(self.num_channels)?;
        validate_payload_type(self.rtp_payload_type, self.num_channels, self.codec)?;
        self.tracks.validate(max_tracks)?;

        if let Some(track) = self.tracks.first_duplicate(self.num_channels) {
            return Err(RavennaError::InvalidDescriptor {
                reason: format!("track {track} is routed from more than one channel"),
            });
        }
        Ok(())
    }
}

/// Builder for [`RxStreamDescriptor`].
#[derive(Debug, Clone)]
pub struct RxStreamBuilder {
    descriptor: RxStreamDescriptor,
    track_list: Option<String>,
    explicit_tracks: Option<TrackMap>,
    max_tracks: u32,
}

impl Default for RxStreamBuilder {
    fn default() -> Self {
        Self {
            descriptor: RxStreamDescriptor {
                primary: None,
                secondary: None,
                sync_source: false,
                hitless_protection: false,
                synchronous: false,
                rtp_filter: false,
                active: true,
                codec: Codec::L24,
                rtp_payload_type: DEFAULT_RTP_PAYLOAD_TYPE,
                jitter_buffer_margin: 500,
                rtp_offset: 500,
                rtp_ssrc: 0,
                num_channels: 2,
                tracks: TrackMap::unmapped(),
            },
            track_list: None,
            explicit_tracks: None,
            max_tracks: MAX_TRACKS,
        }
    }
}

impl RxStreamBuilder {
    /// Set the primary destination
    #[must_use]
    pub fn primary(mut self, destination: SocketAddrV4) -> Self {
        self.descriptor.primary = Some(destination);
        self
    }

    /// Set the secondary destination
    #[must_use]
    pub fn secondary(mut self, destination: SocketAddrV4) -> Self {
        self.descriptor.secondary = Some(destination);
        self
    }

    /// Use as sync source
    #[must_use]
    pub fn sync_source(mut self, enable: bool) -> Self {
        self.descriptor.sync_source = enable;
        self
    }

    /// Enable hitless protection
    #[must_use]
    pub fn hitless_protection(mut self, enable: bool) -> Self {
        self.descriptor.hitless_protection = enable;
        self
    }

    /// Synchronous instead of syntonous reception
    #[must_use]
    pub fn synchronous(mut self, enable: bool) -> Self {
        self.descriptor.synchronous = enable;
        self
    }

    /// Enable SSRC filtering
    #[must_use]
    pub fn rtp_filter(mut self, enable: bool) -> Self {
        self.descriptor.rtp_filter = enable;
        self
    }

    /// Create the stream enabled or disabled
    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.descriptor.active = active;
        self
    }

    /// Set the codec
    #[must_use]
    pub fn codec(mut self, codec: Codec) -> Self {
        self.descriptor.codec = codec;
        self
    }

    /// Set the RTP payload type
    #[must_use]
    pub fn rtp_payload_type(mut self, payload_type: u8) -> Self {
        self.descriptor.rtp_payload_type = payload_type;
        self
    }

    /// Set the jitter buffer margin in samples
    #[must_use]
    pub fn jitter_buffer_margin(mut self, margin: u16) -> Self {
        self.descriptor.jitter_buffer_margin = margin;
        self
    }

    /// Set the RTP timestamp offset
    #[must_use]
    pub fn rtp_offset(mut self, offset: u32) -> Self {
        self.descriptor.rtp_offset = offset;
        self
    }

    /// Set the expected SSRC
    #[must_use]
    pub fn rtp_ssrc(mut self, ssrc: u32) -> Self {
        self.descriptor.rtp_ssrc = ssrc;
        self
    }

    /// Set the channel count
    #[must_use]
    pub fn channels(mut self, channels: u16) -> Self {
        self.descriptor.num_channels = channels;
        self
    }

    /// Route channels from a comma separated track list
    #[must_use]
    pub fn track_list(mut self, list: impl Into<String>) -> Self {
        self.track_list = Some(list.into());
        self
    }

    /// Route channels with an explicit table, overriding any track list
    #[must_use]
    pub fn tracks(mut self, tracks: TrackMap) -> Self {
        self.explicit_tracks = Some(tracks);
        self
    }

    /// Limit track indices to what the device reports
    #[must_use]
    pub fn max_tracks(mut self, max_tracks: u32) -> Self {
        self.max_tracks = max_tracks.min(MAX_TRACKS);
        self
    }

    /// Apply track defaulting and validate.
    ///
    /// # Errors
    /// Returns the first violated constraint.
    pub fn build(self) -> Result<RxStreamDescriptor, RavennaError> {
        let mut descriptor = self.descriptor;
        descriptor.tracks = match self.explicit_tracks {
            Some(tracks) => tracks,
            None => TrackMap::for_channels(
                self.track_list.as_deref(),
                descriptor.num_channels,
                self.max_tracks,
            )?,
        };
        descriptor.validate(self.max_tracks)?;
        Ok(descriptor)
    }
}

// ===== TX =====

/// One network path of a TX stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxEndpoint {
    /// Destination address and port.
    pub destination: SocketAddrV4,
    /// Source address and port written into outgoing packets.
    pub source: SocketAddrV4,
    /// VLAN identifier, used when the stream is VLAN tagged.
    pub vlan_tag: u16,
    /// Destination Ethernet address.
    pub destination_mac: MacAddress,
}

impl TxEndpoint {
    /// Create an endpoint; multicast destinations get their group MAC.
    #[must_use]
    pub fn new(destination: SocketAddrV4, source: SocketAddrV4) -> Self {
        let destination_mac = if destination.ip().is_multicast() {
            MacAddress::ipv4_multicast(*destination.ip())
        } else {
            MacAddress::ZERO
        };
        Self {
            destination,
            source,
            vlan_tag: 0,
            destination_mac,
        }
    }

    /// Set the VLAN identifier
    #[must_use]
    pub fn with_vlan(mut self, vlan_tag: u16) -> Self {
        self.vlan_tag = vlan_tag;
        self
    }

    /// Set the destination MAC
    #[must_use]
    pub fn with_mac(mut self, mac: MacAddress) -> Self {
        self.destination_mac = mac;
        self
    }

    fn validate(&self, role: &str, vlan_tagged: bool) -> Result<(), RavennaError> {
        let unset = |a: &SocketAddrV4| a.ip().is_unspecified() || a.port() == 0;
        if unset(&self.destination) || unset(&self.source) {
            return Err(RavennaError::InvalidDescriptor {
                reason: format!("{role} TX path needs source and destination address and port"),
            });
        }
        if vlan_tagged && self.vlan_tag > MAX_VLAN_ID {
            return Err(RavennaError::out_of_range(
                "vlan_tag",
                self.vlan_tag,
                0,
                MAX_VLAN_ID,
            ));
        }
        Ok(())
    }
}

/// Description of a stream the FPGA transmits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxStreamDescriptor {
    /// Primary path, transmitted on when present.
    pub primary: Option<TxEndpoint>,
    /// Secondary path, transmitted on when present.
    pub secondary: Option<TxEndpoint>,
    /// Insert 802.1Q tags.
    pub vlan_tagged: bool,
    /// Destinations are multicast groups.
    pub multicast: bool,
    /// Stream is enabled.
    pub active: bool,
    /// Sample encoding.
    pub codec: Codec,
    /// Samples per channel in each packet.
    pub num_samples: u8,
    /// RTP payload type.
    pub rtp_payload_type: u8,
    /// Scheduling slot of the next packet.
    pub next_rtp_tx_time: u8,
    /// First RTP sequence number.
    pub next_rtp_sequence_num: u16,
    /// IP time to live.
    pub ttl: u8,
    /// DSCP / ToS bits.
    pub dscp_tos: u8,
    /// RTP timestamp offset in samples.
    pub rtp_offset: u32,
    /// RTP SSRC.
    pub rtp_ssrc: u32,
    /// Number of channels.
    pub num_channels: u16,
    /// Channel to track routing.
    pub tracks: TrackMap,
}

impl TxStreamDescriptor {
    /// Create a new builder.
    #[must_use]
    pub fn builder() -> TxStreamBuilder {
        TxStreamBuilder::default()
    }

    /// Whether packets go out on the primary path.
    #[must_use]
    pub fn uses_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Whether packets go out on the secondary path.
    #[must_use]
    pub fn uses_secondary(&self) -> bool {
        self.secondary.is_some()
    }

    /// IP packet length produced by this stream.
    #[must_use]
    pub fn ip_packet_length(&self) -> usize {
        PACKET_HEADER_OVERHEAD
            + usize::from(self.num_channels)
                * usize::from(self.num_samples)
                * self.codec.sample_length()
    }

    /// Check the descriptor against a device with `max_tracks` tracks.
    ///
    /// # Errors
    /// Returns the first violated constraint.
    pub fn validate(&self, max_tracks: u32) -> Result<(), RavennaError> {
        if self.primary.is_none() && self.secondary.is_none() {
            return Err(RavennaError::InvalidDescriptor {
                reason: "TX stream needs a primary or secondary path".to_string(),
            });
        }
        if let Some(ep) = &self.primary {
            ep.validate("primary", self.vlan_tagged)?;
        }
        if let Some(ep) = &self.secondary {
            ep.validate("secondary", self.vlan_tagged)?;
        }

        if self.dscp_tos > MAX_DSCP {
            return Err(RavennaError::out_of_range("dscp_tos", self.dscp_tos, 0, MAX_DSCP));
        }
        if self.rtp_ssrc == 0 {
            return Err(RavennaError::InvalidDescriptor {
                reason: "TX stream needs a non-zero SSRC".to_string(),
            });
        }

        check_channels(self.num_channels)?;
        validate_payload_type(self.rtp_payload_type, self.num_channels, self.codec)?;
        self.tracks.validate(max_tracks)?;

        let length = self.ip_packet_length();
        if length > MAX_ETHERNET_PACKET_SIZE {
            return Err(RavennaError::out_of_range(
                "ip_packet_length",
                u32::try_from(length).unwrap_or(u32::MAX),
                0,
                MAX_ETHERNET_PACKET_SIZE as u32,
            ));
        }
        Ok(())
    }
}

/// Builder for [`TxStreamDescriptor`].
#[derive(Debug, Clone)]
pub struct TxStreamBuilder {
    descriptor: TxStreamDescriptor,
    track_list: Option<String>,
    explicit_tracks: Option<TrackMap>,
    max_tracks: u32,
}

impl Default for TxStreamBuilder {
    fn default() -> Self {
        Self {
            descriptor: TxStreamDescriptor {
                primary: None,
                secondary: None,
                vlan_tagged: false,
                multicast: false,
                active: true,
                codec: Codec::L24,
                num_samples: 8,
                rtp_payload_type: DEFAULT_RTP_PAYLOAD_TYPE,
                next_rtp_tx_time: 0,
                next_rtp_sequence_num: 0,
                ttl: 1,
                dscp_tos: 0,
                rtp_offset: 0,
                rtp_ssrc: 1,
                num_channels: 2,
                tracks: TrackMap::unmapped(),
            },
            track_list: None,
            explicit_tracks: None,
            max_tracks: MAX_TRACKS,
        }
    }
}

impl TxStreamBuilder {
    /// Set the primary path
    #[must_use]
    pub fn primary(mut self, endpoint: TxEndpoint) -> Self {
        self.descriptor.primary = Some(endpoint);
        self
    }

    /// Set the secondary path
    #[must_use]
    pub fn secondary(mut self, endpoint: TxEndpoint) -> Self {
        self.descriptor.secondary = Some(endpoint);
        self
    }

    /// Insert VLAN tags
    #[must_use]
    pub fn vlan_tagged(mut self, enable: bool) -> Self {
        self.descriptor.vlan_tagged = enable;
        self
    }

    /// Mark destinations as multicast
    #[must_use]
    pub fn multicast(mut self, enable: bool) -> Self {
        self.descriptor.multicast = enable;
        self
    }

    /// Create the stream enabled or disabled
    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.descriptor.active = active;
        self
    }

    /// Set the codec
    #[must_use]
    pub fn codec(mut self, codec: Codec) -> Self {
        self.descriptor.codec = codec;
        self
    }

    /// Set samples per packet
    #[must_use]
    pub fn samples_per_packet(mut self, samples: u8) -> Self {
        self.descriptor.num_samples = samples;
        self
    }

    /// Set the RTP payload type
    #[must_use]
    pub fn rtp_payload_type(mut self, payload_type: u8) -> Self {
        self.descriptor.rtp_payload_type = payload_type;
        self
    }

    /// Set the next RTP TX time slot
    #[must_use]
    pub fn next_rtp_tx_time(mut self, slot: u8) -> Self {
        self.descriptor.next_rtp_tx_time = slot;
        self
    }

    /// Set the first RTP sequence number
    #[must_use]
    pub fn next_rtp_sequence_num(mut self, sequence: u16) -> Self {
        self.descriptor.next_rtp_sequence_num = sequence;
        self
    }

    /// Set the IP TTL
    #[must_use]
    pub fn ttl(mut self, ttl: u8) -> Self {
        self.descriptor.ttl = ttl;
        self
    }

    /// Set DSCP / ToS
    #[must_use]
    pub fn dscp_tos(mut self, dscp: u8) -> Self {
        self.descriptor.dscp_tos = dscp;
        self
    }

    /// Set the RTP timestamp offset
    #[must_use]
    pub fn rtp_offset(mut self, offset: u32) -> Self {
        self.descriptor.rtp_offset = offset;
        self
    }

    /// Set the SSRC
    #[must_use]
    pub fn rtp_ssrc(mut self, ssrc: u32) -> Self {
        self.descriptor.rtp_ssrc = ssrc;
        self
    }

    /// Set the channel count
    #[must_use]
    pub fn channels(mut self, channels: u16) -> Self {
        self.descriptor.num_channels = channels;
        self
    }

    /// Route channels from a comma separated track list
    #[must_use]
    pub fn track_list(mut self, list: impl Into<String>) -> Self {
        self.track_list = Some(list.into());
        self
    }

    /// Route channels with an explicit table, overriding any track list
    #[must_use]
    pub fn tracks(mut self, tracks: TrackMap) -> Self {
        self.explicit_tracks = Some(tracks);
        self
    }

    /// Limit track indices to what the device reports
    #[must_use]
    pub fn max_tracks(mut self, max_tracks: u32) -> Self {
        self.max_tracks = max_tracks.min(MAX_TRACKS);
        self
    }

    /// Apply track defaulting and validate.
    ///
    /// # Errors
    /// Returns the first violated constraint.
    pub fn build(self) -> Result<TxStreamDescriptor, RavennaError> {
        let mut descriptor = self.descriptor;
        descriptor.tracks = match self.explicit_tracks {
            Some(tracks) => tracks,
            None => TrackMap::for_channels(
                self.track_list.as_deref(),
                descriptor.num_channels,
                self.max_tracks,
            )?,
        };
        descriptor.validate(self.max_tracks)?;
        Ok(descriptor)
    }
}

/// Unspecified IPv4 socket address used for absent endpoints.
pub(crate) const UNSPECIFIED_ENDPOINT: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
