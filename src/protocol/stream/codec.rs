//! Fixed-layout encoding of descriptors and command payloads.
//!
//! Addresses and ports are written in network byte order, every other
//! scalar little-endian. Padding is always zero.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian};
use bytes::{Buf, BufMut, BytesMut};

use super::command::{
    Command, DEVICE_INFO_SIZE, RX_DESCRIPTOR_SIZE, RX_TELEMETRY_SIZE, TX_DESCRIPTOR_SIZE,
    TX_TELEMETRY_SIZE,
};
use super::descriptor::{RxStreamDescriptor, TxEndpoint, TxStreamDescriptor, UNSPECIFIED_ENDPOINT};
use super::tracks::TrackMap;
use super::types::{Codec, MAX_CHANNELS, MAX_TRACKS, MacAddress, PROTOCOL_VERSION};
use crate::error::RavennaError;

fn check_encodable(num_channels: u16, tracks: &TrackMap) -> Result<(), RavennaError> {
    if usize::from(num_channels) > MAX_CHANNELS {
        return Err(RavennaError::out_of_range(
            "num_channels",
            num_channels,
            0,
            MAX_CHANNELS as u32,
        ));
    }
    tracks.validate(MAX_TRACKS)
}

fn put_tracks(buf: &mut impl BufMut, tracks: &TrackMap) {
    for &track in tracks.as_array() {
        buf.put_i16_le(track);
    }
}

fn get_tracks(buf: &mut &[u8]) -> Result<TrackMap, RavennaError> {
    let mut tracks = [0i16; MAX_CHANNELS];
    for track in &mut tracks {
        *track = buf.get_i16_le();
    }
    TrackMap::from_tracks(&tracks, MAX_TRACKS)
}

fn get_addr(buf: &mut &[u8]) -> Ipv4Addr {
    Ipv4Addr::from(buf.get_u32())
}

fn is_unset(addr: &SocketAddrV4) -> bool {
    addr.ip().is_unspecified() && addr.port() == 0
}

// ===== RX descriptor =====

impl RxStreamDescriptor {
    /// Encoded size in bytes.
    pub const SIZE: usize = RX_DESCRIPTOR_SIZE;

    /// Append the wire form to `buf`.
    ///
    /// # Errors
    /// Returns [`RavennaError::ProtocolRange`] for a channel count or
    /// track outside the wire range; nothing is written in that case.
    pub fn encode_into(&self, buf: &mut impl BufMut) -> Result<(), RavennaError> {
        check_encodable(self.num_channels, &self.tracks)?;

        for endpoint in [self.primary, self.secondary] {
            let addr = endpoint.unwrap_or(UNSPECIFIED_ENDPOINT);
            buf.put_slice(&addr.ip().octets());
            buf.put_u16(addr.port());
            buf.put_bytes(0, 2);
        }

        buf.put_u8(u8::from(self.sync_source));
        buf.put_u8(0);
        buf.put_u8(u8::from(self.hitless_protection));
        buf.put_u8(u8::from(self.synchronous));
        buf.put_u8(u8::from(self.rtp_filter));
        buf.put_u8(self.codec.as_u8());
        buf.put_u8(self.rtp_payload_type);
        buf.put_u8(u8::from(self.active));
        buf.put_u16(0);
        buf.put_u16_le(self.jitter_buffer_margin);
        buf.put_u32_le(self.rtp_offset);
        buf.put_u32_le(self.rtp_ssrc);
        buf.put_u16_le(self.num_channels);
        put_tracks(buf, &self.tracks);
        buf.put_bytes(0, 2);
        Ok(())
    }

    /// Encode into a fresh buffer.
    ///
    /// # Errors
    /// See [`encode_into`](Self::encode_into).
    pub fn encode(&self) -> Result<BytesMut, RavennaError> {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    /// Decode the wire form.
    ///
    /// An endpoint whose address and port are both zero decodes as absent.
    ///
    /// # Errors
    /// Returns [`RavennaError::UnsupportedCodec`] for an unknown codec byte
    /// and [`RavennaError::ProtocolRange`] for out-of-range channels or tracks.
    pub fn decode(data: &[u8; RX_DESCRIPTOR_SIZE]) -> Result<Self, RavennaError> {
        let mut buf = &data[..];

        let mut endpoints = [None, None];
        for endpoint in &mut endpoints {
            let ip = get_addr(&mut buf);
            let port = buf.get_u16();
            buf.advance(2);
            let addr = SocketAddrV4::new(ip, port);
            *endpoint = (!is_unset(&addr)).then_some(addr);
        }

        let sync_source = buf.get_u8() != 0;
        buf.advance(1);
        let hitless_protection = buf.get_u8() != 0;
        let synchronous = buf.get_u8() != 0;
        let rtp_filter = buf.get_u8() != 0;
        let codec = Codec::try_from(buf.get_u8())?;
        let rtp_payload_type = buf.get_u8();
        let active = buf.get_u8() != 0;
        buf.advance(2);
        let jitter_buffer_margin = buf.get_u16_le();
        let rtp_offset = buf.get_u32_le();
        let rtp_ssrc = buf.get_u32_le();
        let num_channels = buf.get_u16_le();
        let tracks = get_tracks(&mut buf)?;
        check_encodable(num_channels, &tracks)?;

        let [primary, secondary] = endpoints;
        Ok(Self {
            primary,
            secondary,
            sync_source,
            hitless_protection,
            synchronous,
            rtp_filter,
            active,
            codec,
            rtp_payload_type,
            jitter_buffer_margin,
            rtp_offset,
            rtp_ssrc,
            num_channels,
            tracks,
        })
    }
}

// ===== TX descriptor =====

fn put_tx_endpoint(buf: &mut impl BufMut, endpoint: Option<&TxEndpoint>) {
    let (dst, src, vlan, mac) = endpoint.map_or(
        (UNSPECIFIED_ENDPOINT, UNSPECIFIED_ENDPOINT, 0, MacAddress::ZERO),
        |ep| (ep.destination, ep.source, ep.vlan_tag, ep.destination_mac),
    );
    buf.put_slice(&dst.ip().octets());
    buf.put_slice(&src.ip().octets());
    buf.put_u16(dst.port());
    buf.put_u16(src.port());
    buf.put_u16(vlan);
    buf.put_slice(&mac.octets());
}

fn get_tx_endpoint(buf: &mut &[u8]) -> TxEndpoint {
    let dst_ip = get_addr(buf);
    let src_ip = get_addr(buf);
    let dst_port = buf.get_u16();
    let src_port = buf.get_u16();
    let vlan_tag = buf.get_u16();
    let mut mac = [0u8; 6];
    buf.copy_to_slice(&mut mac);
    TxEndpoint {
        destination: SocketAddrV4::new(dst_ip, dst_port),
        source: SocketAddrV4::new(src_ip, src_port),
        vlan_tag,
        destination_mac: MacAddress(mac),
    }
}

impl TxStreamDescriptor {
    /// Encoded size in bytes.
    pub const SIZE: usize = TX_DESCRIPTOR_SIZE;

    /// Append the wire form to `buf`.
    ///
    /// Unused endpoints are written as zeros.
    ///
    /// # Errors
    /// Returns [`RavennaError::ProtocolRange`] for a channel count or
    /// track outside the wire range; nothing is written in that case.
    pub fn encode_into(&self, buf: &mut impl BufMut) -> Result<(), RavennaError> {
        check_encodable(self.num_channels, &self.tracks)?;

        put_tx_endpoint(buf, self.primary.as_ref());
        put_tx_endpoint(buf, self.secondary.as_ref());

        buf.put_u8(u8::from(self.vlan_tagged));
        buf.put_u8(u8::from(self.multicast));
        buf.put_u8(u8::from(self.uses_primary()));
        buf.put_u8(u8::from(self.uses_secondary()));
        buf.put_u8(self.codec.as_u8());
        buf.put_u8(self.rtp_payload_type);
        buf.put_u8(self.next_rtp_tx_time);
        buf.put_u8(self.ttl);
        buf.put_u8(self.dscp_tos);
        buf.put_u8(self.num_samples);
        buf.put_u8(u8::from(self.active));
        buf.put_u8(0);
        buf.put_u16_le(self.next_rtp_sequence_num);
        buf.put_u16_le(self.num_channels);
        buf.put_u32_le(self.rtp_offset);
        buf.put_u32_le(self.rtp_ssrc);
        put_tracks(buf, &self.tracks);
        Ok(())
    }

    /// Encode into a fresh buffer.
    ///
    /// # Errors
    /// See [`encode_into`](Self::encode_into).
    pub fn encode(&self) -> Result<BytesMut, RavennaError> {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    /// Decode the wire form.
    ///
    /// Endpoints are present exactly when their `use_*` flag is set.
    ///
    /// # Errors
    /// Returns [`RavennaError::UnsupportedCodec`] for an unknown codec byte
    /// and [`RavennaError::ProtocolRange`] for out-of-range channels or tracks.
    pub fn decode(data: &[u8; TX_DESCRIPTOR_SIZE]) -> Result<Self, RavennaError> {
        let mut buf = &data[..];

        let primary = get_tx_endpoint(&mut buf);
        let secondary = get_tx_endpoint(&mut buf);
        let vlan_tagged = buf.get_u8() != 0;
        let multicast = buf.get_u8() != 0;
        let use_primary = buf.get_u8() != 0;
        let use_secondary = buf.get_u8() != 0;
        let codec = Codec::try_from(buf.get_u8())?;
        let rtp_payload_type = buf.get_u8();
        let next_rtp_tx_time = buf.get_u8();
        let ttl = buf.get_u8();
        let dscp_tos = buf.get_u8();
        let num_samples = buf.get_u8();
        let active = buf.get_u8() != 0;
        buf.advance(1);
        let next_rtp_sequence_num = buf.get_u16_le();
        let num_channels = buf.get_u16_le();
        let rtp_offset = buf.get_u32_le();
        let rtp_ssrc = buf.get_u32_le();
        let tracks = get_tracks(&mut buf)?;
        check_encodable(num_channels, &tracks)?;

        Ok(Self {
            primary: use_primary.then_some(primary),
            secondary: use_secondary.then_some(secondary),
            vlan_tagged,
            multicast,
            active,
            codec,
            num_samples,
            rtp_payload_type,
            next_rtp_tx_time,
            next_rtp_sequence_num,
            ttl,
            dscp_tos,
            rtp_offset,
            rtp_ssrc,
            num_channels,
            tracks,
        })
    }
}

// ===== Device info =====

/// Capabilities reported by the device-info command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceInfo {
    /// Number of hardware tracks.
    pub max_tracks: u32,
    /// Number of RX stream slots.
    pub max_rx_streams: u32,
    /// Number of TX stream slots.
    pub max_tx_streams: u32,
}

impl DeviceInfo {
    /// Decode a device-info reply (version prefix included).
    #[must_use]
    pub fn decode(data: &[u8; DEVICE_INFO_SIZE]) -> Self {
        Self {
            max_tracks: LittleEndian::read_u32(&data[4..8]),
            max_rx_streams: LittleEndian::read_u32(&data[8..12]),
            max_tx_streams: LittleEndian::read_u32(&data[12..16]),
        }
    }

    /// Encode as a device-info reply.
    #[must_use]
    pub fn encode(&self) -> [u8; DEVICE_INFO_SIZE] {
        let mut data = [0u8; DEVICE_INFO_SIZE];
        LittleEndian::write_u32(&mut data[0..4], PROTOCOL_VERSION);
        LittleEndian::write_u32(&mut data[4..8], self.max_tracks);
        LittleEndian::write_u32(&mut data[8..12], self.max_rx_streams);
        LittleEndian::write_u32(&mut data[12..16], self.max_tx_streams);
        data
    }
}

// ===== Requests =====

/// One control request, ready to be encoded into its command payload.
#[derive(Debug, Clone, Copy)]
pub enum Request<'a> {
    /// Query device capabilities.
    DeviceInfo,
    /// Create an RX stream.
    AddRx(&'a RxStreamDescriptor),
    /// Replace an RX stream's descriptor.
    UpdateRx {
        /// Stream index.
        index: u32,
        /// New descriptor.
        descriptor: &'a RxStreamDescriptor,
    },
    /// Remove an RX stream.
    DeleteRx {
        /// Stream index.
        index: u32,
    },
    /// Read RX telemetry, waiting up to `timeout` for a report.
    ReadRxTelemetry {
        /// Stream index.
        index: u32,
        /// Maximum wait.
        timeout: Duration,
    },
    /// Create a TX stream.
    AddTx(&'a TxStreamDescriptor),
    /// Replace a TX stream's descriptor.
    UpdateTx {
        /// Stream index.
        index: u32,
        /// New descriptor.
        descriptor: &'a TxStreamDescriptor,
    },
    /// Remove a TX stream.
    DeleteTx {
        /// Stream index.
        index: u32,
    },
    /// Read TX telemetry, waiting up to `timeout` for a report.
    ReadTxTelemetry {
        /// Stream index.
        index: u32,
        /// Maximum wait.
        timeout: Duration,
    },
}

fn timeout_ms(timeout: Duration) -> u32 {
    u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX)
}

impl Request<'_> {
    /// Command this request is issued with.
    #[must_use]
    pub fn command(&self) -> Command {
        match self {
            Self::DeviceInfo => Command::DeviceInfo,
            Self::AddRx(_) => Command::AddRxStream,
            Self::UpdateRx { .. } => Command::UpdateRxStream,
            Self::DeleteRx { .. } => Command::DeleteRxStream,
            Self::ReadRxTelemetry { .. } => Command::ReadRxTelemetry,
            Self::AddTx(_) => Command::AddTxStream,
            Self::UpdateTx { .. } => Command::UpdateTxStream,
            Self::DeleteTx { .. } => Command::DeleteTxStream,
            Self::ReadTxTelemetry { .. } => Command::ReadTxTelemetry,
        }
    }

    /// Encode the full command payload; its length always equals
    /// [`Command::payload_len`].
    ///
    /// # Errors
    /// Returns [`RavennaError::ProtocolRange`] if a descriptor is not encodable.
    pub fn encode(&self) -> Result<BytesMut, RavennaError> {
        let mut buf = BytesMut::with_capacity(self.command().payload_len());

        match *self {
            Self::DeviceInfo => {
                buf.put_u32_le(PROTOCOL_VERSION);
                buf.put_bytes(0, DEVICE_INFO_SIZE - 4);
            }
            Self::AddRx(descriptor) => {
                buf.put_u32_le(PROTOCOL_VERSION);
                descriptor.encode_into(&mut buf)?;
            }
            Self::UpdateRx { index, descriptor } => {
                buf.put_u32_le(PROTOCOL_VERSION);
                buf.put_u32_le(index);
                descriptor.encode_into(&mut buf)?;
            }
            Self::AddTx(descriptor) => {
                buf.put_u32_le(PROTOCOL_VERSION);
                descriptor.encode_into(&mut buf)?;
            }
            Self::UpdateTx { index, descriptor } => {
                buf.put_u32_le(PROTOCOL_VERSION);
                buf.put_u32_le(index);
                descriptor.encode_into(&mut buf)?;
            }
            Self::DeleteRx { index } | Self::DeleteTx { index } => {
                buf.put_u32_le(PROTOCOL_VERSION);
                buf.put_u32_le(index);
            }
            Self::ReadRxTelemetry { index, timeout } => {
                buf.put_u32_le(index);
                buf.put_u32_le(timeout_ms(timeout));
                buf.put_bytes(0, RX_TELEMETRY_SIZE);
            }
            Self::ReadTxTelemetry { index, timeout } => {
                buf.put_u32_le(index);
                buf.put_u32_le(timeout_ms(timeout));
                buf.put_bytes(0, TX_TELEMETRY_SIZE);
            }
        }

        debug_assert_eq!(buf.len(), self.command().payload_len());
        Ok(buf)
    }
}
