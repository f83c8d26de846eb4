//! Create an RX stream and print its telemetry every second
//!
//! ```text
//! cargo run --example rx_stream -- --pri-ip 239.1.2.3 --channels 8
//! ```

use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use ravenna::device::StreamDevice;
use ravenna::protocol::stream::{RxInterfaceTelemetry, RxStreamDescriptor};
use ravenna::types::StreamDeviceConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rx-stream", about = "Receive an AES67 stream")]
struct Cli {
    /// Stream device node
    #[arg(long, default_value = "/dev/ravenna-stream-device")]
    dev: PathBuf,

    /// Number of channels to receive
    #[arg(long, default_value_t = 2)]
    channels: u16,

    /// Primary destination address
    #[arg(long)]
    pri_ip: Option<Ipv4Addr>,

    /// Secondary destination address
    #[arg(long)]
    sec_ip: Option<Ipv4Addr>,

    /// Primary UDP port
    #[arg(long, default_value_t = 5004)]
    pri_port: u16,

    /// Secondary UDP port
    #[arg(long, default_value_t = 5004)]
    sec_port: u16,

    /// Jitter buffer margin in samples
    #[arg(long, default_value_t = 500)]
    jitter_buffer_margin: u16,

    /// RTP offset in samples
    #[arg(long, default_value_t = 500)]
    rtp_offset: u32,

    /// Expected RTP SSRC, 0 to accept any
    #[arg(long, default_value_t = 0)]
    rtp_ssrc: u32,

    /// RTP payload type
    #[arg(long, default_value_t = 98)]
    rtp_payload_type: u8,

    /// Synchronous instead of syntonous reception
    #[arg(long)]
    synchronous: bool,

    /// Use the stream as sync source
    #[arg(long)]
    sync_source: bool,

    /// Drop packets with unexpected SSRC or payload type
    #[arg(long)]
    rtp_filter: bool,

    /// Hitless protection across both paths
    #[arg(long)]
    hitless: bool,

    /// Comma separated tracks per channel; defaults to 1:1
    #[arg(long)]
    track_map: Option<String>,
}

fn log_interface(name: &str, i: &RxInterfaceTelemetry) {
    tracing::info!(
        interface = name,
        misordered_packets = i.misordered_packets,
        base_sequence_nr = i.base_sequence_nr,
        extended_max_sequence_nr = i.extended_max_sequence_nr,
        received_packets = i.received_packets,
        peak_jitter = i.peak_jitter,
        estimated_jitter = i.estimated_jitter,
        last_transit_time = i.last_transit_time,
        current_offset_estimation = i.current_offset_estimation,
        last_ssrc = i.last_ssrc,
        buffer_margin_min = i.buffer_margin_min,
        buffer_margin_max = i.buffer_margin_max,
        late_packets = i.late_packets,
        early_packets = i.early_packets,
        timeout_counter = i.timeout_counter,
        playing = i.playing,
        error = i.error,
        "RTCP interface"
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if cli.pri_ip.is_none() && cli.sec_ip.is_none() {
        return Err("--pri-ip or --sec-ip must be passed".into());
    }

    let config = StreamDeviceConfig::builder().path(&cli.dev).build();
    let mut device = StreamDevice::open(&config)?;
    let info = device.info();
    tracing::info!(
        max_tracks = info.max_tracks,
        max_rx_streams = info.max_rx_streams,
        max_tx_streams = info.max_tx_streams,
        path = %cli.dev.display(),
        "Device file opened"
    );

    let mut builder = RxStreamDescriptor::builder()
        .sync_source(cli.sync_source)
        .hitless_protection(cli.hitless)
        .synchronous(cli.synchronous)
        .rtp_filter(cli.rtp_filter)
        .rtp_payload_type(cli.rtp_payload_type)
        .jitter_buffer_margin(cli.jitter_buffer_margin)
        .rtp_offset(cli.rtp_offset)
        .rtp_ssrc(cli.rtp_ssrc)
        .channels(cli.channels)
        .max_tracks(info.max_tracks);
    if let Some(ip) = cli.pri_ip {
        builder = builder.primary(SocketAddrV4::new(ip, cli.pri_port));
    }
    if let Some(ip) = cli.sec_ip {
        builder = builder.secondary(SocketAddrV4::new(ip, cli.sec_port));
    }
    if let Some(list) = &cli.track_map {
        builder = builder.track_list(list.as_str());
    }

    let stream = device.add_rx_stream(builder.build()?)?;
    let descriptor = stream.descriptor();
    tracing::info!(
        index = stream.index(),
        channels = descriptor.num_channels,
        primary = ?descriptor.primary,
        secondary = ?descriptor.secondary,
        tracks = ?descriptor.tracks.channels(descriptor.num_channels),
        "RX stream added"
    );
    tracing::info!("Hit ^C to exit.");

    let mut timer = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = timer.tick() => {
                match tokio::task::block_in_place(|| device.read_rx_telemetry(&stream)) {
                    Ok(report) => {
                        tracing::info!(
                            rtp_timestamp = report.rtp_timestamp,
                            dev_state = ?report.device_state(),
                            rtp_payload_id = report.rtp_payload_id,
                            offset_estimation = report.offset_estimation,
                            path_differential = report.path_differential,
                            "RTCP general"
                        );
                        log_interface("primary", &report.primary);
                        if stream.descriptor().uses_secondary() {
                            log_interface("secondary", &report.secondary);
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "Error reading RTCP"),
                }
            }
        }
    }

    device.delete_rx_stream(stream)?;
    Ok(())
}
