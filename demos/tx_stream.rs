//! Create a TX stream and print its telemetry every second
//!
//! ```text
//! cargo run --example tx_stream -- --pri-dst-ip 239.10.0.1 --pri-src-ip 192.168.1.10
//! ```

use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use ravenna::device::StreamDevice;
use ravenna::protocol::stream::{TxEndpoint, TxInterfaceTelemetry, TxStreamDescriptor};
use ravenna::types::StreamDeviceConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tx-stream", about = "Send an AES67 stream")]
struct Cli {
    /// Stream device node
    #[arg(long, default_value = "/dev/ravenna-stream-device")]
    dev: PathBuf,

    /// Number of channels to send
    #[arg(long, default_value_t = 2)]
    channels: u16,

    /// Samples per packet
    #[arg(long, default_value_t = 8)]
    samples: u8,

    /// Primary destination address
    #[arg(long)]
    pri_dst_ip: Option<Ipv4Addr>,

    /// Primary source address
    #[arg(long)]
    pri_src_ip: Option<Ipv4Addr>,

    /// Secondary destination address
    #[arg(long)]
    sec_dst_ip: Option<Ipv4Addr>,

    /// Secondary source address
    #[arg(long)]
    sec_src_ip: Option<Ipv4Addr>,

    /// Primary destination UDP port
    #[arg(long, default_value_t = 5004)]
    pri_dst_port: u16,

    /// Primary source UDP port
    #[arg(long, default_value_t = 5004)]
    pri_src_port: u16,

    /// Secondary destination UDP port
    #[arg(long, default_value_t = 5004)]
    sec_dst_port: u16,

    /// Secondary source UDP port
    #[arg(long, default_value_t = 5004)]
    sec_src_port: u16,

    /// VLAN tag of the primary stream, 0 for untagged
    #[arg(long, default_value_t = 0)]
    pri_vlan: u16,

    /// VLAN tag of the secondary stream, 0 for untagged
    #[arg(long, default_value_t = 0)]
    sec_vlan: u16,

    /// TTL of outgoing packets
    #[arg(long, default_value_t = 1)]
    ttl: u8,

    /// Next RTP TX time slot
    #[arg(long, default_value_t = 0)]
    next_rtp_tx_time: u8,

    /// Next RTP sequence number
    #[arg(long, default_value_t = 0)]
    next_rtp_sequence_number: u16,

    /// RTP offset in samples
    #[arg(long, default_value_t = 0)]
    rtp_offset: u32,

    /// RTP SSRC
    #[arg(long, default_value_t = 1)]
    rtp_ssrc: u32,

    /// RTP payload type
    #[arg(long, default_value_t = 98)]
    rtp_payload_type: u8,

    /// Comma separated tracks per channel; defaults to 1:1
    #[arg(long)]
    track_map: Option<String>,
}

fn endpoint(dst: Ipv4Addr, dst_port: u16, src: Ipv4Addr, src_port: u16, vlan: u16) -> TxEndpoint {
    TxEndpoint::new(
        SocketAddrV4::new(dst, dst_port),
        SocketAddrV4::new(src, src_port),
    )
    .with_vlan(vlan)
}

fn log_interface(name: &str, i: &TxInterfaceTelemetry) {
    tracing::info!(
        interface = name,
        sent_packets = i.sent_packets,
        sent_rtp_bytes = i.sent_rtp_bytes,
        "RTCP interface"
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let primary = cli
        .pri_dst_ip
        .zip(cli.pri_src_ip)
        .map(|(dst, src)| endpoint(dst, cli.pri_dst_port, src, cli.pri_src_port, cli.pri_vlan));
    let secondary = cli
        .sec_dst_ip
        .zip(cli.sec_src_ip)
        .map(|(dst, src)| endpoint(dst, cli.sec_dst_port, src, cli.sec_src_port, cli.sec_vlan));
    if primary.is_none() && secondary.is_none() {
        return Err(
            "--pri-src-ip/--pri-dst-ip and/or --sec-src-ip/--sec-dst-ip must be passed".into(),
        );
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

    let multicast = [primary, secondary]
        .iter()
        .flatten()
        .any(|ep| ep.destination.ip().is_multicast());

    let mut builder = TxStreamDescriptor::builder()
        .multicast(multicast)
        .vlan_tagged(cli.pri_vlan > 0 || cli.sec_vlan > 0)
        .rtp_payload_type(cli.rtp_payload_type)
        .rtp_offset(cli.rtp_offset)
        .rtp_ssrc(cli.rtp_ssrc)
        .channels(cli.channels)
        .samples_per_packet(cli.samples)
        .ttl(cli.ttl)
        .next_rtp_tx_time(cli.next_rtp_tx_time)
        .next_rtp_sequence_num(cli.next_rtp_sequence_number)
        .max_tracks(info.max_tracks);
    if let Some(ep) = primary {
        builder = builder.primary(ep);
    }
    if let Some(ep) = secondary {
        builder = builder.secondary(ep);
    }
    if let Some(list) = &cli.track_map {
        builder = builder.track_list(list.as_str());
    }

    let stream = device.add_tx_stream(builder.build()?)?;
    let descriptor = stream.descriptor();
    tracing::info!(
        index = stream.index(),
        channels = descriptor.num_channels,
        samples = descriptor.num_samples,
        ttl = descriptor.ttl,
        multicast = descriptor.multicast,
        primary = ?descriptor.primary,
        secondary = ?descriptor.secondary,
        tracks = ?descriptor.tracks.channels(descriptor.num_channels),
        "TX stream added"
    );
    tracing::info!("Hit ^C to exit.");

    let mut timer = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = timer.tick() => {
                match tokio::task::block_in_place(|| device.read_tx_telemetry(&stream)) {
                    Ok(report) => {
                        tracing::info!(rtp_timestamp = report.rtp_timestamp, "RTCP general");
                        let d = stream.descriptor();
                        if d.uses_primary() {
                            log_interface("primary", &report.primary);
                        }
                        if d.uses_secondary() {
                            log_interface("secondary", &report.secondary);
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "Error reading RTCP"),
                }
            }
        }
    }

    device.delete_tx_stream(stream)?;
    Ok(())
}
