//! Keep the media clock of one device aligned with PTP time
//!
//! ```text
//! cargo run --example rtp_sync -- --net-index 0 --ptp-index 1
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use ravenna::device::{NetworkDevice, PtpDevice};
use ravenna::sync::SyncLoop;
use ravenna::types::SyncConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rtp-sync", about = "Align the FPGA media clock with PTP time")]
struct Cli {
    /// Network device index (`ra<N>`)
    #[arg(long, default_value_t = 0)]
    net_index: u32,

    /// PTP clock index (`ptp<N>`)
    #[arg(long, default_value_t = 0)]
    ptp_index: u32,

    /// Media clock sample rate in Hz
    #[arg(long, default_value_t = 48_000)]
    sample_rate: u32,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 1_000)]
    interval_ms: u64,

    /// JSON configuration file; overrides the flags above
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug log
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = match &cli.config {
        Some(path) => SyncConfig::from_json_file(path).await?,
        None => SyncConfig::builder()
            .net_device_index(cli.net_index)
            .ptp_clock_index(cli.ptp_index)
            .sample_rate(cli.sample_rate)
            .poll_interval(Duration::from_millis(cli.interval_ms))
            .build(),
    };
    config.validate()?;

    let register = NetworkDevice::from_config(&config);
    if let Ok(version) = register.rav_core_version().await {
        tracing::info!(%version, "RAVENNA core");
    }

    let handle = SyncLoop::from_register(PtpDevice::from_config(&config), register, &config)
        .await?
        .spawn(|correction| {
            tracing::info!(
                old_offset = correction.old_offset,
                new_offset = correction.new_offset,
                delta = correction.delta(),
                "RTP/PTP offset updated"
            );
        });

    tracing::info!("Hit ^C to exit.");
    tokio::signal::ctrl_c().await?;
    handle.shutdown().await?;
    Ok(())
}
