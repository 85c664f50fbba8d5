//! In-process API performance monitoring: bounded per-endpoint latency
//! streams, percentile statistics, hourly trends, health classification,
//! per-call alerts, time-range reports and retention sweeps.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub mod config;
pub mod error;
pub mod handlers;
pub mod load_generator;
pub mod metrics;
pub mod middleware;
pub mod server;

pub use config::MonitorConfig;
pub use metrics::MetricsCollector;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    pub config: MonitorConfig,

    /// Central monitoring engine — the interceptor pushes samples, endpoints read snapshots.
    pub metrics: Arc<MetricsCollector>,

    /// Flag checked by every simulator worker on each iteration.
    pub sim_running: Arc<AtomicBool>,

    /// Handle to the spawned simulator task so we can await clean shutdown.
    pub sim_handle: tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl AppState {
    pub fn new(config: MonitorConfig, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            config,
            metrics,
            sim_running: Arc::new(AtomicBool::new(false)),
            sim_handle: tokio::sync::Mutex::new(None),
        }
    }
}
