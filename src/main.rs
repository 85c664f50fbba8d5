use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api_pulse::metrics::retention::spawn_retention_task;
use api_pulse::{server, AppState, MetricsCollector, MonitorConfig};

/// In-process API latency and health monitor
#[derive(Parser)]
#[command(name = "api-pulse")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides the config file
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // ── 1. Load configuration ────────────────────────────────────
    let mut config = match &cli.config {
        Some(path) => MonitorConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => MonitorConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    config.validate().context("invalid configuration")?;
    info!(?config, "configuration loaded");

    // ── 2. Build shared state ────────────────────────────────────
    let metrics = Arc::new(MetricsCollector::new(&config));
    let state = Arc::new(AppState::new(config.clone(), metrics.clone()));

    // ── 3. Retention sweep ───────────────────────────────────────
    let retention = spawn_retention_task(
        metrics,
        config.sweep_interval(),
        config.retention_horizon(),
    );

    // ── 4. Build Axum router ─────────────────────────────────────
    let app = server::create_router(state);

    // ── 5. Bind & serve ──────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    info!("listening on http://{}", config.bind);
    info!("health     → /api/monitoring/health");
    info!("statistics → /api/monitoring/statistics");
    info!("live SSE   → /api/monitoring/stream");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await;

    retention.abort();
    served.context("server exited with error")
}
