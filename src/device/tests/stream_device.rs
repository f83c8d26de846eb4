use std::io;
use std::net::SocketAddrV4;
use std::time::Duration;

use crate::device::{StreamDevice, TxStream};
use crate::error::RavennaError;
use crate::protocol::stream::{
    Codec, Command, DeviceInfo, RxStreamDescriptor, RxTelemetry, TxEndpoint, TxStreamDescriptor,
    TxTelemetry,
};
use crate::testing::MockControlChannel;
use crate::types::StreamDeviceConfig;

const TIMEOUT: Duration = Duration::from_millis(250);

fn addr(s: &str) -> SocketAddrV4 {
    s.parse().unwrap()
}

fn info() -> DeviceInfo {
    DeviceInfo {
        max_tracks: 16,
        max_rx_streams: 2,
        max_tx_streams: 2,
    }
}

fn open() -> (StreamDevice<MockControlChannel>, MockControlChannel) {
    let channel = MockControlChannel::new(info());
    let inspect = channel.clone();
    let device = StreamDevice::with_channel(channel, TIMEOUT).unwrap();
    (device, inspect)
}

fn rx_descriptor() -> RxStreamDescriptor {
    RxStreamDescriptor::builder()
        .primary(addr("239.1.2.3:5004"))
        .track_list("0,1")
        .build()
        .unwrap()
}

fn tx_descriptor() -> TxStreamDescriptor {
    TxStreamDescriptor::builder()
        .primary(TxEndpoint::new(
            addr("239.10.0.1:5004"),
            addr("192.168.1.10:5004"),
        ))
        .multicast(true)
        .track_list("2,3")
        .build()
        .unwrap()
}

// ===== Opening =====

#[test]
fn test_with_channel_reads_device_info() {
    let (device, inspect) = open();
    assert_eq!(device.info(), info());
    assert_eq!(device.telemetry_timeout(), TIMEOUT);

    let commands = inspect.commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].command, Command::DeviceInfo);
    assert_eq!(commands[0].payload, vec![0u8; 16]);
}

#[test]
fn test_with_channel_info_failure_is_transient() {
    let channel = MockControlChannel::new(info());
    channel.fail_next(Command::DeviceInfo, io::ErrorKind::BrokenPipe);
    let err = StreamDevice::with_channel(channel, TIMEOUT).unwrap_err();
    assert!(err.is_transient());
}

#[cfg(unix)]
#[test]
fn test_open_missing_node_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = StreamDeviceConfig::builder()
        .path(dir.path().join("ravenna"))
        .build();
    assert!(matches!(
        StreamDevice::open(&config),
        Err(RavennaError::InvalidConfig { .. })
    ));
}

#[test]
fn test_set_telemetry_timeout() {
    let (mut device, _) = open();
    device.set_telemetry_timeout(Duration::from_secs(3));
    assert_eq!(device.telemetry_timeout(), Duration::from_secs(3));
}

// ===== RX =====

#[test]
fn test_rx_lifecycle() {
    let (mut device, inspect) = open();

    let mut stream = device.add_rx_stream(rx_descriptor()).unwrap();
    assert_eq!(stream.index(), 0);
    assert_eq!(inspect.rx_stream(0).as_ref(), Some(stream.descriptor()));

    let second = device.add_rx_stream(rx_descriptor()).unwrap();
    assert_eq!(second.index(), 1);

    let updated = RxStreamDescriptor::builder()
        .primary(addr("239.1.2.4:5006"))
        .codec(Codec::L16)
        .channels(1)
        .build()
        .unwrap();
    device.update_rx_stream(&mut stream, updated.clone()).unwrap();
    assert_eq!(stream.descriptor(), &updated);
    assert_eq!(inspect.rx_stream(0), Some(updated));

    device.delete_rx_stream(stream).unwrap();
    assert_eq!(inspect.rx_stream(0), None);
    assert!(inspect.rx_stream(1).is_some());
}

#[test]
fn test_add_rx_payload_carries_version_prefix() {
    let (mut device, inspect) = open();
    device.add_rx_stream(rx_descriptor()).unwrap();

    let add = &inspect.commands()[1];
    assert_eq!(add.command, Command::AddRxStream);
    assert_eq!(add.payload.len(), 4 + RxStreamDescriptor::SIZE);
    assert_eq!(&add.payload[4..8], &[239, 1, 2, 3]);
}

#[test]
fn test_add_rx_rejects_tracks_beyond_device() {
    let (mut device, inspect) = open();
    let descriptor = RxStreamDescriptor::builder()
        .primary(addr("239.1.2.3:5004"))
        .track_list("0,20")
        .build()
        .unwrap();

    let err = device.add_rx_stream(descriptor).unwrap_err();
    assert!(err.is_protocol_range());
    // nothing reached the device
    assert_eq!(inspect.commands().len(), 1);
}

#[test]
fn test_add_rx_device_full() {
    let (mut device, _) = open();
    device.add_rx_stream(rx_descriptor()).unwrap();
    device.add_rx_stream(rx_descriptor()).unwrap();

    let err = device.add_rx_stream(rx_descriptor()).unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(
        err,
        RavennaError::HardwareWrite { ref what, .. } if what == "add-rx-stream"
    ));
}

#[test]
fn test_update_rx_failure_keeps_descriptor() {
    let (mut device, inspect) = open();
    let mut stream = device.add_rx_stream(rx_descriptor()).unwrap();
    inspect.fail_next(Command::UpdateRxStream, io::ErrorKind::InvalidInput);

    let updated = RxStreamDescriptor::builder()
        .primary(addr("239.9.9.9:5004"))
        .build()
        .unwrap();
    assert!(device.update_rx_stream(&mut stream, updated).is_err());
    assert_eq!(stream.descriptor(), &rx_descriptor());
}

#[test]
fn test_read_rx_telemetry() {
    let (mut device, inspect) = open();
    let stream = device.add_rx_stream(rx_descriptor()).unwrap();

    let mut report = RxTelemetry {
        rtp_timestamp: 0xabcd,
        dev_state: 2,
        rtp_payload_id: 98,
        ..RxTelemetry::default()
    };
    report.primary.received_packets = 1000;
    report.primary.playing = true;
    inspect.set_rx_telemetry(stream.index(), report);

    let telemetry = device.read_rx_telemetry(&stream).unwrap();
    assert_eq!(telemetry, report);

    let request = inspect.commands().last().unwrap().clone();
    assert_eq!(request.command, Command::ReadRxTelemetry);
    // index, then the timeout in milliseconds
    assert_eq!(&request.payload[0..4], &0u32.to_le_bytes());
    assert_eq!(&request.payload[4..8], &250u32.to_le_bytes());
}

#[test]
fn test_read_rx_telemetry_timeout() {
    let (mut device, inspect) = open();
    let stream = device.add_rx_stream(rx_descriptor()).unwrap();
    inspect.fail_next(Command::ReadRxTelemetry, io::ErrorKind::TimedOut);

    let err = device
        .read_rx_telemetry_with_timeout(&stream, Duration::from_millis(10))
        .unwrap_err();
    assert!(matches!(
        err,
        RavennaError::TelemetryTimeout { timeout } if timeout == Duration::from_millis(10)
    ));
}

#[test]
fn test_read_rx_telemetry_other_error_is_transient() {
    let (mut device, inspect) = open();
    let stream = device.add_rx_stream(rx_descriptor()).unwrap();
    inspect.fail_next(Command::ReadRxTelemetry, io::ErrorKind::Interrupted);

    let err = device.read_rx_telemetry(&stream).unwrap_err();
    assert!(matches!(err, RavennaError::TransientRead { .. }));
}

// ===== TX =====

#[test]
fn test_tx_lifecycle() {
    let (mut device, inspect) = open();

    let mut stream = device.add_tx_stream(tx_descriptor()).unwrap();
    assert_eq!(stream.index(), 0);
    assert_eq!(inspect.tx_stream(0).as_ref(), Some(stream.descriptor()));

    let updated = TxStreamDescriptor::builder()
        .primary(TxEndpoint::new(
            addr("239.10.0.2:5004"),
            addr("192.168.1.10:5004"),
        ))
        .multicast(true)
        .ttl(8)
        .build()
        .unwrap();
    device.update_tx_stream(&mut stream, updated.clone()).unwrap();
    assert_eq!(inspect.tx_stream(0), Some(updated));

    device.delete_tx_stream(stream).unwrap();
    assert_eq!(inspect.tx_stream(0), None);
}

#[test]
fn test_read_tx_telemetry() {
    let (mut device, inspect) = open();
    let stream = device.add_tx_stream(tx_descriptor()).unwrap();

    let mut report = TxTelemetry {
        rtp_timestamp: 480,
        ..TxTelemetry::default()
    };
    report.primary.sent_packets = 60;
    report.primary.sent_rtp_bytes = 60 * 48;
    inspect.set_tx_telemetry(stream.index(), report);

    assert_eq!(device.read_tx_telemetry(&stream).unwrap(), report);
}

#[test]
fn test_delete_tx_rejected() {
    let (mut device, inspect) = open();
    let stream = device.add_tx_stream(tx_descriptor()).unwrap();
    inspect.fail_next(Command::DeleteTxStream, io::ErrorKind::PermissionDenied);

    let err = device.delete_tx_stream(stream).unwrap_err();
    assert!(matches!(
        err.source,
        RavennaError::HardwareWrite { ref what, .. } if what == "delete-tx-stream"
    ));

    // The stream is still live and the handle came back with the error.
    let stream = err.stream;
    assert_eq!(stream.index(), 0);
    assert!(inspect.tx_stream(0).is_some());

    device.delete_tx_stream(stream).unwrap();
    assert_eq!(inspect.tx_stream(0), None);
}

#[test]
fn test_delete_rx_rejected_then_retried() {
    let (mut device, inspect) = open();
    let stream = device.add_rx_stream(rx_descriptor()).unwrap();
    inspect.fail_next(Command::DeleteRxStream, io::ErrorKind::Interrupted);

    let (stream, source) = device.delete_rx_stream(stream).unwrap_err().into_parts();
    assert!(source.is_fatal());
    assert_eq!(inspect.rx_stream(stream.index()).as_ref(), Some(stream.descriptor()));

    // Telemetry still works on the returned handle.
    inspect.set_rx_telemetry(stream.index(), RxTelemetry::default());
    assert!(device.read_rx_telemetry(&stream).is_ok());

    device.delete_rx_stream(stream).unwrap();
    assert_eq!(inspect.rx_stream(0), None);
}

#[test]
fn test_delete_error_converts_to_device_error() {
    fn delete(
        device: &mut StreamDevice<MockControlChannel>,
        stream: TxStream,
    ) -> crate::error::Result<()> {
        device.delete_tx_stream(stream)?;
        Ok(())
    }

    let (mut device, inspect) = open();
    let stream = device.add_tx_stream(tx_descriptor()).unwrap();
    inspect.fail_next(Command::DeleteTxStream, io::ErrorKind::PermissionDenied);

    let err = delete(&mut device, stream).unwrap_err();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("delete-tx-stream"));
}
