//! wellspring-dash - headless dashboard aggregator
//!
//! Polls a content-aggregation backend's dashboard endpoints every 30
//! seconds (configurable), tolerates partial failure by keeping stale
//! slices, pauses itself after three consecutive failed cycles, and serves
//! the merged snapshot on a local HTTP port.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use wellspring_common::config::{CliOverrides, DashConfig};
use wellspring_dash::client::BackendClient;
use wellspring_dash::notice::NoticeBroadcaster;
use wellspring_dash::ops::dashboard_operations;
use wellspring_dash::poller::RefreshController;
use wellspring_dash::view::DashboardView;
use wellspring_dash::{build_router, AppState};

#[derive(Parser, Debug)]
#[command(name = "wellspring-dash", version, about = "Dashboard aggregator for the Wellspring backend")]
struct Args {
    /// Backend base URL (e.g. http://127.0.0.1:8000)
    #[arg(long)]
    base_url: Option<String>,

    /// Static API key sent as X-API-Key
    #[arg(long)]
    api_key: Option<String>,

    /// Seconds between refresh cycles
    #[arg(long)]
    poll_interval_secs: Option<u64>,

    /// Consecutive failed cycles tolerated before polling pauses
    #[arg(long)]
    failure_threshold: Option<u32>,

    /// Listen address for the snapshot server
    #[arg(long)]
    bind_addr: Option<String>,

    /// Explicit config file path (otherwise the platform location is used)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting Wellspring Dashboard (wellspring-dash) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let config = DashConfig::resolve(CliOverrides {
        base_url: args.base_url,
        api_key: args.api_key,
        poll_interval_secs: args.poll_interval_secs,
        failure_threshold: args.failure_threshold,
        bind_addr: args.bind_addr,
        config_file: args.config,
    })?;
    info!(
        base_url = %config.base_url,
        poll_interval_secs = config.poll_interval_secs,
        failure_threshold = config.failure_threshold,
        "configuration resolved"
    );

    let client = BackendClient::new(&config)?;
    let notices = NoticeBroadcaster::new(100);
    let controller = Arc::new(RefreshController::new(
        DashboardView::default(),
        notices.clone(),
        config.failure_threshold,
    ));
    controller.start(
        config.poll_interval(),
        dashboard_operations(client, config.trend_days, config.recent_limit),
    )?;

    let state = AppState::new(Arc::clone(&controller), notices);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("wellspring-dash listening on http://{}", config.bind_addr);
    info!("Snapshot: http://{}/status", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Teardown cancels the timer; in-flight fetches are discarded
    controller.stop();
    info!("shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install ctrl-c handler: {}", e);
    }
}
