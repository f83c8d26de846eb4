use std::path::PathBuf;
use std::time::Duration;

use super::*;
use crate::error::RavennaError;

// ===== SyncConfig =====

#[test]
fn test_sync_config_defaults() {
    let config = SyncConfig::default();

    assert_eq!(config.net_device_index, 0);
    assert_eq!(config.ptp_clock_index, 0);
    assert_eq!(config.sample_rate, 48_000);
    assert_eq!(config.poll_interval, Duration::from_secs(1));
    assert_eq!(config.drift_threshold, 2);
    assert_eq!(config.sysfs_root, PathBuf::from("/sys"));
    assert!(config.validate().is_ok());
}

#[test]
fn test_sync_config_builder() {
    let config = SyncConfig::builder()
        .net_device_index(1)
        .ptp_clock_index(2)
        .sample_rate(96_000)
        .poll_interval(Duration::from_millis(250))
        .drift_threshold(4)
        .sysfs_root("/tmp/sys")
        .build();

    assert_eq!(config.net_device_index, 1);
    assert_eq!(config.ptp_clock_index, 2);
    assert_eq!(config.sample_rate, 96_000);
    assert_eq!(config.poll_interval, Duration::from_millis(250));
    assert_eq!(config.drift_threshold, 4);
    assert_eq!(config.sysfs_root, PathBuf::from("/tmp/sys"));
}

#[test]
fn test_sync_config_validate() {
    let zero_rate = SyncConfig::builder().sample_rate(0).build();
    assert!(matches!(
        zero_rate.validate(),
        Err(RavennaError::InvalidConfig { .. })
    ));

    let zero_interval = SyncConfig::builder().poll_interval(Duration::ZERO).build();
    assert!(zero_interval.validate().is_err());

    let zero_threshold = SyncConfig::builder().drift_threshold(0).build();
    assert!(zero_threshold.validate().is_err());
}

#[test]
fn test_sync_config_json() {
    let config = SyncConfig::from_json_str(
        r#"{ "net_device_index": 1, "sample_rate": 44100, "poll_interval_ms": 500 }"#,
    )
    .unwrap();

    assert_eq!(config.net_device_index, 1);
    assert_eq!(config.sample_rate, 44_100);
    assert_eq!(config.poll_interval, Duration::from_millis(500));
    // missing fields keep defaults
    assert_eq!(config.drift_threshold, 2);
    assert_eq!(config.sysfs_root, PathBuf::from("/sys"));
}

#[test]
fn test_sync_config_json_roundtrip() {
    let config = SyncConfig::builder()
        .poll_interval(Duration::from_millis(1500))
        .build();
    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("\"poll_interval_ms\":1500"));
    assert_eq!(SyncConfig::from_json_str(&json).unwrap(), config);
}

#[test]
fn test_sync_config_json_errors() {
    let err = SyncConfig::from_json_str("{ not json").unwrap_err();
    assert!(matches!(
        err,
        RavennaError::InvalidConfig {
            source: Some(_),
            ..
        }
    ));

    let err = SyncConfig::from_json_str(r#"{ "sample_rate": 0 }"#).unwrap_err();
    assert!(matches!(
        err,
        RavennaError::InvalidConfig { source: None, .. }
    ));
}

#[cfg(feature = "tokio-runtime")]
#[tokio::test]
async fn test_sync_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sync.json");
    tokio::fs::write(&path, r#"{ "ptp_clock_index": 3 }"#)
        .await
        .unwrap();

    let config = SyncConfig::from_json_file(&path).await.unwrap();
    assert_eq!(config.ptp_clock_index, 3);

    let missing = SyncConfig::from_json_file(dir.path().join("missing.json")).await;
    assert!(matches!(missing, Err(RavennaError::InvalidConfig { .. })));
}

// ===== StreamDeviceConfig =====

#[test]
fn test_stream_device_config_defaults() {
    let config = StreamDeviceConfig::default();
    assert_eq!(config.path, PathBuf::from("/dev/ravenna-stream-device"));
    assert_eq!(config.telemetry_timeout, Duration::from_secs(1));
    assert!(config.validate().is_ok());
}

#[test]
fn test_stream_device_config_builder_and_json() {
    let config = StreamDeviceConfig::builder()
        .path("/dev/null")
        .telemetry_timeout(Duration::from_millis(200))
        .build();
    assert_eq!(config.path, PathBuf::from("/dev/null"));

    let parsed = StreamDeviceConfig::from_json_str(
        r#"{ "path": "/dev/null", "telemetry_timeout_ms": 200 }"#,
    )
    .unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_stream_device_config_validate() {
    let empty = StreamDeviceConfig::builder().path("").build();
    assert!(empty.validate().is_err());

    let huge = StreamDeviceConfig::builder()
        .telemetry_timeout(Duration::from_secs(u64::from(u32::MAX)))
        .build();
    assert!(huge.validate().is_err());
}
