//! Binary entry point for the noise monitor.
//!
//! # Startup sequence
//!
//! 1. Initialise logging (`RUST_LOG`, default `info`).
//! 2. Load [`MonitorConfig`] — a missing file is fatal; on first run a
//!    default template is written next to the reported path.
//! 3. Validate the config (thresholds ordered, non-zero sizes, endpoints).
//! 4. Build the HTTP alert and metrics sinks.
//! 5. Start the [`NoiseMonitor`] (opens the capture device, spawns the
//!    consumer task).
//! 6. Block on ctrl-c, then stop the monitor and log the final counters.

use std::sync::Arc;

use anyhow::Context;

use noise_monitor::config::{ConfigError, MonitorConfig, MonitorPaths};
use noise_monitor::pipeline::NoiseMonitor;
use noise_monitor::sink::{HttpAlertSink, HttpMetricsSink};

#[tokio::main(worker_threads = 2)]
async fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("noise monitor starting up");

    // 2. Configuration — fatal before any pipeline state exists.
    let config = match MonitorConfig::load() {
        Ok(config) => config,
        Err(ConfigError::Missing(path)) => {
            // First run: leave a template so the operator only has to fill
            // in the device identity and sink endpoints.
            if let Err(e) = MonitorConfig::default().save_to(&path) {
                log::warn!("could not write default config template: {e}");
            }
            anyhow::bail!(
                "no config found — a template was written to {}; edit it and restart",
                path.display()
            );
        }
        Err(e) => {
            return Err(e).with_context(|| {
                format!(
                    "failed to load config from {}",
                    MonitorPaths::new().config_file.display()
                )
            });
        }
    };

    // 3. Validation
    config.validate().context("invalid configuration")?;
    log::info!(
        "configured as device '{}' at '{}' (thresholds {}/{}/{} dB)",
        config.device.id,
        config.device.location,
        config.thresholds.acceptable,
        config.thresholds.warning,
        config.thresholds.violation
    );

    // 4. Sinks
    let alert_sink = Arc::new(HttpAlertSink::from_config(&config.sinks));
    let metrics_sink = Arc::new(HttpMetricsSink::from_config(&config.sinks));

    // 5. Monitor — device errors here are fatal with a reported cause.
    let mut monitor = NoiseMonitor::new(config, alert_sink, metrics_sink);
    monitor.start().context("failed to start monitoring")?;

    // 6. Run until interrupted.
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    log::info!("shutdown signal received");

    monitor.stop().await;
    log::info!("final counters: {}", monitor.counters());

    Ok(())
}
