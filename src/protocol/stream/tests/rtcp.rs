use crate::protocol::stream::{DeviceState, RxInterfaceTelemetry, RxTelemetry, TxTelemetry};

fn rx_block() -> [u8; 84] {
    let mut data = [0u8; 84];
    let general = [
        0x04, 0x03, 0x02, 0x01, // rtp_timestamp
        2,    // dev_state
        98,   // rtp_payload_id
        0x02, 0x01, // offset_estimation
        0xfb, 0xff, 0xff, 0xff, // path_differential
    ];
    let primary = [
        1, 0, // misordered
        100, 0, // base sequence
        0x64, 0, 1, 0, // extended max sequence
        0xe8, 0x03, 0, 0, // received
        5, 0, // peak jitter
        3, 0, // estimated jitter
        7, 0, // last transit
        9, 0, // current offset estimation
        0xdd, 0xcc, 0xbb, 0xaa, // last ssrc
        10, 0, // buffer margin min
        20, 0, // buffer margin max
        0, 0, // late
        0, 0, // early
        1, 0, // timeout counter
        0, // error
        1, // playing
    ];
    data[..12].copy_from_slice(&general);
    data[12..48].copy_from_slice(&primary);
    data
}

// ===== RX =====

#[test]
fn test_rx_decode() {
    let tel = RxTelemetry::decode(&rx_block());

    assert_eq!(tel.rtp_timestamp, 0x0102_0304);
    assert_eq!(tel.dev_state, 2);
    assert_eq!(tel.device_state(), Some(DeviceState::LockedFirst));
    assert!(tel.device_state().unwrap().is_locked());
    assert_eq!(tel.rtp_payload_id, 98);
    assert_eq!(tel.offset_estimation, 0x0102);
    assert_eq!(tel.path_differential, -5);

    let p = &tel.primary;
    assert_eq!(p.misordered_packets, 1);
    assert_eq!(p.base_sequence_nr, 100);
    assert_eq!(p.extended_max_sequence_nr, 0x0001_0064);
    assert_eq!(p.received_packets, 1000);
    assert_eq!(p.peak_jitter, 5);
    assert_eq!(p.estimated_jitter, 3);
    assert_eq!(p.last_transit_time, 7);
    assert_eq!(p.current_offset_estimation, 9);
    assert_eq!(p.last_ssrc, 0xaabb_ccdd);
    assert_eq!(p.buffer_margin_min, 10);
    assert_eq!(p.buffer_margin_max, 20);
    assert_eq!(p.timeout_counter, 1);
    assert!(!p.error);
    assert!(p.playing);

    assert_eq!(tel.secondary, RxInterfaceTelemetry::default());
}

#[test]
fn test_rx_encode_matches_block() {
    let block = rx_block();
    assert_eq!(RxTelemetry::decode(&block).encode(), block);
}

#[test]
fn test_rx_secondary_block_offset() {
    let mut block = [0u8; 84];
    // received_packets of the secondary block
    block[48 + 8..48 + 12].copy_from_slice(&42u32.to_le_bytes());
    block[83] = 1;
    let tel = RxTelemetry::decode(&block);
    assert_eq!(tel.secondary.received_packets, 42);
    assert!(tel.secondary.playing);
    assert_eq!(tel.primary.received_packets, 0);
}

#[test]
fn test_rx_unknown_state() {
    let mut block = rx_block();
    block[4] = 9;
    assert_eq!(RxTelemetry::decode(&block).device_state(), None);
}

#[test]
fn test_rx_from_reply() {
    let mut reply = vec![1, 0, 0, 0, 0xe8, 0x03, 0, 0];
    reply.extend_from_slice(&rx_block());
    let tel = RxTelemetry::from_reply(&reply).unwrap();
    assert_eq!(tel.rtp_timestamp, 0x0102_0304);

    assert!(RxTelemetry::from_reply(&reply[..91]).is_none());
    assert!(RxTelemetry::from_reply(&rx_block()).is_none());
}

#[test]
fn test_rx_active_interfaces() {
    let tel = RxTelemetry::decode(&rx_block());
    assert_eq!(tel.active_interfaces(false).count(), 1);
    assert_eq!(tel.active_interfaces(true).count(), 2);
}

// ===== TX =====

#[test]
fn test_tx_decode() {
    let mut block = [0u8; 20];
    block[0..4].copy_from_slice(&480u32.to_le_bytes());
    block[4..8].copy_from_slice(&10u32.to_le_bytes());
    block[8..12].copy_from_slice(&1000u32.to_le_bytes());
    block[12..16].copy_from_slice(&11u32.to_le_bytes());
    block[16..20].copy_from_slice(&1100u32.to_le_bytes());

    let tel = TxTelemetry::decode(&block);
    assert_eq!(tel.rtp_timestamp, 480);
    assert_eq!(tel.primary.sent_packets, 10);
    assert_eq!(tel.primary.sent_rtp_bytes, 1000);
    assert_eq!(tel.secondary.sent_packets, 11);
    assert_eq!(tel.secondary.sent_rtp_bytes, 1100);
    assert_eq!(tel.encode(), block);

    let live: Vec<_> = tel.active_interfaces(false, true).collect();
    assert_eq!(live, vec![&tel.secondary]);
}

#[test]
fn test_tx_from_reply() {
    let mut reply = vec![0u8; 28];
    reply[8] = 7;
    assert_eq!(TxTelemetry::from_reply(&reply).unwrap().rtp_timestamp, 7);
    assert!(TxTelemetry::from_reply(&reply[..20]).is_none());
}
