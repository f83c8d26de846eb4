//! RTCP-style stream telemetry decoding.
//!
//! Telemetry always carries a primary and a secondary interface block of
//! equal size. The secondary block holds stale data when the stream has
//! no secondary path; use the `active_interfaces` helpers to skip it.

use bytes::{Buf, BufMut};

use super::command::{RX_TELEMETRY_SIZE, TX_TELEMETRY_SIZE};
use super::types::DeviceState;

/// Encoded size of one RX interface block.
pub const RX_INTERFACE_TELEMETRY_SIZE: usize = 36;

/// Encoded size of one TX interface block.
pub const TX_INTERFACE_TELEMETRY_SIZE: usize = 8;

/// Per-interface receive counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RxInterfaceTelemetry {
    /// Packets received out of order.
    pub misordered_packets: u16,
    /// First sequence number seen.
    pub base_sequence_nr: u16,
    /// Highest sequence number seen, extended with the wrap count.
    pub extended_max_sequence_nr: u32,
    /// Packets received.
    pub received_packets: u32,
    /// Peak interarrival jitter.
    pub peak_jitter: u16,
    /// RFC 3550 jitter estimate.
    pub estimated_jitter: u16,
    /// Transit time of the last packet.
    pub last_transit_time: u16,
    /// Current per-path offset estimate.
    pub current_offset_estimation: u16,
    /// SSRC of the last packet.
    pub last_ssrc: u32,
    /// Smallest jitter buffer margin seen.
    pub buffer_margin_min: u16,
    /// Largest jitter buffer margin seen.
    pub buffer_margin_max: u16,
    /// Packets that arrived too late to play.
    pub late_packets: u16,
    /// Packets that arrived too early to buffer.
    pub early_packets: u16,
    /// Number of receive timeouts.
    pub timeout_counter: u16,
    /// Interface is in error.
    pub error: bool,
    /// Interface is feeding the playout buffer.
    pub playing: bool,
}

impl RxInterfaceTelemetry {
    fn decode(buf: &mut &[u8]) -> Self {
        Self {
            misordered_packets: buf.get_u16_le(),
            base_sequence_nr: buf.get_u16_le(),
            extended_max_sequence_nr: buf.get_u32_le(),
            received_packets: buf.get_u32_le(),
            peak_jitter: buf.get_u16_le(),
            estimated_jitter: buf.get_u16_le(),
            last_transit_time: buf.get_u16_le(),
            current_offset_estimation: buf.get_u16_le(),
            last_ssrc: buf.get_u32_le(),
            buffer_margin_min: buf.get_u16_le(),
            buffer_margin_max: buf.get_u16_le(),
            late_packets: buf.get_u16_le(),
            early_packets: buf.get_u16_le(),
            timeout_counter: buf.get_u16_le(),
            error: buf.get_u8() != 0,
            playing: buf.get_u8() != 0,
        }
    }

    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u16_le(self.misordered_packets);
        buf.put_u16_le(self.base_sequence_nr);
        buf.put_u32_le(self.extended_max_sequence_nr);
        buf.put_u32_le(self.received_packets);
        buf.put_u16_le(self.peak_jitter);
        buf.put_u16_le(self.estimated_jitter);
        buf.put_u16_le(self.last_transit_time);
        buf.put_u16_le(self.current_offset_estimation);
        buf.put_u32_le(self.last_ssrc);
        buf.put_u16_le(self.buffer_margin_min);
        buf.put_u16_le(self.buffer_margin_max);
        buf.put_u16_le(self.late_packets);
        buf.put_u16_le(self.early_packets);
        buf.put_u16_le(self.timeout_counter);
        buf.put_u8(u8::from(self.error));
        buf.put_u8(u8::from(self.playing));
    }
}

/// Receive telemetry of one RX stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RxTelemetry {
    /// RTP timestamp of the report.
    pub rtp_timestamp: u32,
    /// Raw receiver state byte; see [`device_state`](Self::device_state).
    pub dev_state: u8,
    /// Payload type of received packets.
    pub rtp_payload_id: u8,
    /// Combined offset estimate.
    pub offset_estimation: u16,
    /// Arrival time difference between primary and secondary path.
    pub path_differential: i32,
    /// Primary interface counters.
    pub primary: RxInterfaceTelemetry,
    /// Secondary interface counters.
    pub secondary: RxInterfaceTelemetry,
}

impl RxTelemetry {
    /// Encoded size.
    pub const SIZE: usize = RX_TELEMETRY_SIZE;

    /// Decode a telemetry block.
    #[must_use]
    pub fn decode(data: &[u8; RX_TELEMETRY_SIZE]) -> Self {
        let mut buf = &data[..];
        Self {
            rtp_timestamp: buf.get_u32_le(),
            dev_state: buf.get_u8(),
            rtp_payload_id: buf.get_u8(),
            offset_estimation: buf.get_u16_le(),
            path_differential: buf.get_i32_le(),
            primary: RxInterfaceTelemetry::decode(&mut buf),
            secondary: RxInterfaceTelemetry::decode(&mut buf),
        }
    }

    /// Decode the telemetry part of a read-rx-telemetry reply.
    ///
    /// Returns `None` unless `payload` is exactly index, timeout and block.
    #[must_use]
    pub fn from_reply(payload: &[u8]) -> Option<Self> {
        if payload.len() != 8 + Self::SIZE {
            return None;
        }
        let block: &[u8; RX_TELEMETRY_SIZE] = payload.get(8..)?.try_into().ok()?;
        Some(Self::decode(block))
    }

    /// Encode as a telemetry block.
    #[must_use]
    pub fn encode(&self) -> [u8; RX_TELEMETRY_SIZE] {
        let mut data = [0u8; RX_TELEMETRY_SIZE];
        let mut buf = &mut data[..];
        buf.put_u32_le(self.rtp_timestamp);
        buf.put_u8(self.dev_state);
        buf.put_u8(self.rtp_payload_id);
        buf.put_u16_le(self.offset_estimation);
        buf.put_i32_le(self.path_differential);
        self.primary.encode(&mut buf);
        self.secondary.encode(&mut buf);
        data
    }

    /// Typed receiver state, `None` for unknown values.
    #[must_use]
    pub fn device_state(&self) -> Option<DeviceState> {
        DeviceState::from_u8(self.dev_state)
    }

    /// Interface blocks that carry live data.
    pub fn active_interfaces(
        &self,
        secondary_enabled: bool,
    ) -> impl Iterator<Item = &RxInterfaceTelemetry> {
        std::iter::once(&self.primary).chain(secondary_enabled.then_some(&self.secondary))
    }
}

/// Per-interface transmit counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TxInterfaceTelemetry {
    /// Packets sent.
    pub sent_packets: u32,
    /// RTP payload bytes sent.
    pub sent_rtp_bytes: u32,
}

/// Transmit telemetry of one TX stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TxTelemetry {
    /// RTP timestamp of the report.
    pub rtp_timestamp: u32,
    /// Primary interface counters.
    pub primary: TxInterfaceTelemetry,
    /// Secondary interface counters.
    pub secondary: TxInterfaceTelemetry,
}

impl TxTelemetry {
    /// Encoded size.
    pub const SIZE: usize = TX_TELEMETRY_SIZE;

    /// Decode a telemetry block.
    #[must_use]
    pub fn decode(data: &[u8; TX_TELEMETRY_SIZE]) -> Self {
        let mut buf = &data[..];
        let rtp_timestamp = buf.get_u32_le();
        let mut iface = || TxInterfaceTelemetry {
            sent_packets: buf.get_u32_le(),
            sent_rtp_bytes: buf.get_u32_le(),
        };
        let primary = iface();
        let secondary = iface();
        Self {
            rtp_timestamp,
            primary,
            secondary,
        }
    }

    /// Decode the telemetry part of a read-tx-telemetry reply.
    ///
    /// Returns `None` unless `payload` is exactly index, timeout and block.
    #[must_use]
    pub fn from_reply(payload: &[u8]) -> Option<Self> {
        if payload.len() != 8 + Self::SIZE {
            return None;
        }
        let block: &[u8; TX_TELEMETRY_SIZE] = payload.get(8..)?.try_into().ok()?;
        Some(Self::decode(block))
    }

    /// Encode as a telemetry block.
    #[must_use]
    pub fn encode(&self) -> [u8; TX_TELEMETRY_SIZE] {
        let mut data = [0u8; TX_TELEMETRY_SIZE];
        let mut buf = &mut data[..];
        buf.put_u32_le(self.rtp_timestamp);
        for iface in [&self.primary, &self.secondary] {
            buf.put_u32_le(iface.sent_packets);
            buf.put_u32_le(iface.sent_rtp_bytes);
        }
        data
    }

    /// Interface blocks that carry live data.
    pub fn active_interfaces(
        &self,
        primary_enabled: bool,
        secondary_enabled: bool,
    ) -> impl Iterator<Item = &TxInterfaceTelemetry> {
        primary_enabled
            .then_some(&self.primary)
            .into_iter()
            .chain(secondary_enabled.then_some(&self.secondary))
    }
}
