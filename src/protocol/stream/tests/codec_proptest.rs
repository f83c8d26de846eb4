use std::net::{Ipv4Addr, SocketAddrV4};

use proptest::prelude::*;

use crate::protocol::stream::command::{RX_DESCRIPTOR_SIZE, RX_TELEMETRY_SIZE, TX_DESCRIPTOR_SIZE};
use crate::protocol::stream::{
    Codec, MAX_TRACKS, MacAddress, RxStreamDescriptor, RxTelemetry, TrackMap, TxEndpoint,
    TxStreamDescriptor,
};

fn codec() -> impl Strategy<Value = Codec> {
    prop_oneof![
        Just(Codec::Am824),
        Just(Codec::L32),
        Just(Codec::L24),
        Just(Codec::L16),
    ]
}

fn tracks() -> impl Strategy<Value = TrackMap> {
    prop::collection::vec(-1i16..256, 0..=256)
        .prop_map(|t| TrackMap::from_tracks(&t, MAX_TRACKS).unwrap())
}

fn socket() -> impl Strategy<Value = SocketAddrV4> {
    (any::<u32>(), 1u16..).prop_map(|(ip, port)| SocketAddrV4::new(Ipv4Addr::from(ip), port))
}

fn tx_endpoint() -> impl Strategy<Value = TxEndpoint> {
    (socket(), socket(), any::<u16>(), any::<[u8; 6]>()).prop_map(|(dst, src, vlan, mac)| {
        TxEndpoint {
            destination: dst,
            source: src,
            vlan_tag: vlan,
            destination_mac: MacAddress(mac),
        }
    })
}

prop_compose! {
    fn rx_descriptor()(
        primary in prop::option::of(socket()),
        secondary in prop::option::of(socket()),
        flags in any::<[bool; 5]>(),
        codec in codec(),
        rtp_payload_type in any::<u8>(),
        jitter_buffer_margin in any::<u16>(),
        rtp_offset in any::<u32>(),
        rtp_ssrc in any::<u32>(),
        num_channels in 0u16..=256,
        tracks in tracks(),
    ) -> RxStreamDescriptor {
        RxStreamDescriptor {
            primary,
            secondary,
            sync_source: flags[0],
            hitless_protection: flags[1],
            synchronous: flags[2],
            rtp_filter: flags[3],
            active: flags[4],
            codec,
            rtp_payload_type,
            jitter_buffer_margin,
            rtp_offset,
            rtp_ssrc,
            num_channels,
            tracks,
        }
    }
}

prop_compose! {
    fn tx_descriptor()(
        primary in prop::option::of(tx_endpoint()),
        secondary in prop::option::of(tx_endpoint()),
        flags in any::<[bool; 3]>(),
        codec in codec(),
        bytes in any::<[u8; 5]>(),
        next_rtp_sequence_num in any::<u16>(),
        rtp_offset in any::<u32>(),
        rtp_ssrc in any::<u32>(),
        num_channels in 0u16..=256,
        tracks in tracks(),
    ) -> TxStreamDescriptor {
        TxStreamDescriptor {
            primary,
            secondary,
            vlan_tagged: flags[0],
            multicast: flags[1],
            active: flags[2],
            codec,
            num_samples: bytes[0],
            rtp_payload_type: bytes[1],
            next_rtp_tx_time: bytes[2],
            next_rtp_sequence_num,
            ttl: bytes[3],
            dscp_tos: bytes[4],
            rtp_offset,
            rtp_ssrc,
            num_channels,
            tracks,
        }
    }
}

proptest! {
    #[test]
    fn test_rx_descriptor_roundtrip(desc in rx_descriptor()) {
        let bytes = desc.encode().unwrap();
        prop_assert_eq!(bytes.len(), RX_DESCRIPTOR_SIZE);
        let data: &[u8; RX_DESCRIPTOR_SIZE] = bytes[..].try_into().unwrap();
        prop_assert_eq!(RxStreamDescriptor::decode(data).unwrap(), desc);
    }

    #[test]
    fn test_tx_descriptor_roundtrip(desc in tx_descriptor()) {
        let bytes = desc.encode().unwrap();
        prop_assert_eq!(bytes.len(), TX_DESCRIPTOR_SIZE);
        let data: &[u8; TX_DESCRIPTOR_SIZE] = bytes[..].try_into().unwrap();
        prop_assert_eq!(TxStreamDescriptor::decode(data).unwrap(), desc);
    }

    #[test]
    fn test_descriptor_decode_any_bytes(bytes in prop::collection::vec(any::<u8>(), RX_DESCRIPTOR_SIZE)) {
        // Should not panic, return either Ok or Err
        let data: &[u8; RX_DESCRIPTOR_SIZE] = bytes[..].try_into().unwrap();
        let _ = RxStreamDescriptor::decode(data);
    }

    #[test]
    fn test_rx_telemetry_any_bytes(bytes in prop::collection::vec(any::<u8>(), RX_TELEMETRY_SIZE)) {
        let data: &[u8; RX_TELEMETRY_SIZE] = bytes[..].try_into().unwrap();
        let tel = RxTelemetry::decode(data);
        // bool fields normalize to 0/1, everything else survives verbatim
        let mut expected = *data;
        for i in [46, 47, 82, 83] {
            expected[i] = u8::from(expected[i] != 0);
        }
        prop_assert_eq!(tel.encode(), expected);
    }
}
