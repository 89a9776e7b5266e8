//! RGB Clock simulation viewer
//!
//! Polls a clock for its per-segment colors and keeps a live SVG schematic
//! of the display, served over HTTP.
//!
//! ## Architecture
//! - **Polling driver** (tokio task): fetches the segment vector every
//!   interval and restyles the in-memory SVG
//! - **HTTP server** (axum): serves the styled SVG and driver status
//!
//! Both run on a single-threaded tokio runtime.
//!
//! ## Usage
//! ```sh
//! ./target/release/rgb-clock-sim --clock-url http://rgb-clock.local --port 8080
//! ```

use clap::Parser;
use rgb_clock_sim::driver::{DriverConfig, PollingDriver, SvgSource};
use rgb_clock_sim::server::{self, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// RGB Clock simulation viewer
#[derive(Parser)]
#[command(name = "rgb-clock-sim")]
#[command(about = "Live SVG simulation of a seven-segment RGB LED clock")]
#[command(version)]
struct Args {
    /// Base URL of the clock
    #[arg(long, default_value = "http://rgb-clock.local")]
    clock_url: String,

    /// SVG artwork to load instead of the clock's /simulation.svg
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Seconds between segment fetches
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
    interval_secs: u64,

    /// Port to listen on
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Also write the styled SVG to this file after every pass
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_ansi(false) // Disable ANSI color codes for systemd/journald
        .compact()
        .init();

    let args = Args::parse();

    let mut config = DriverConfig::for_clock(args.clock_url);
    if let Some(path) = args.svg {
        config.svg = SvgSource::File(path);
    }
    config.interval = Duration::from_secs(args.interval_secs);
    config.output = args.output;

    tracing::info!("RGB Clock simulation v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Clock: {}", config.clock_url);
    match &config.svg {
        SvgSource::File(path) => tracing::info!("Artwork: {}", path.display()),
        SvgSource::Url(url) => tracing::info!("Artwork: {}", url),
    }
    if let Some(path) = &config.output {
        tracing::info!("Output: {}", path.display());
    }

    let driver = Arc::new(PollingDriver::new(config));
    tokio::spawn(driver.clone().run());

    let app = server::create_router(AppState { driver });

    let addr = format!("0.0.0.0:{}", args.port);
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("API Documentation: http://localhost:{}/docs", args.port);
    tracing::info!("Live view: http://localhost:{}/simulation.svg", args.port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
