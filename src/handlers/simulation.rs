use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::error::AppError;
use crate::AppState;

// ─── Request / response types ────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Number of concurrent Tokio tasks generating calls
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// How long the simulation runs (seconds)
    #[serde(default = "default_duration")]
    pub duration_secs: u64,

    /// Percentage of calls that fail (0–100)
    #[serde(default = "default_error_pct")]
    pub error_pct: u8,

    /// Percentage of calls that take the slow path (0–100)
    #[serde(default = "default_slow_pct")]
    pub slow_pct: u8,
}

fn default_concurrency() -> u32 {
    4
}
fn default_duration() -> u64 {
    30
}
fn default_error_pct() -> u8 {
    3
}
fn default_slow_pct() -> u8 {
    5
}

#[derive(Debug, Serialize)]
pub struct SimulationStatus {
    pub running: bool,
    pub message: String,
}

// ─── POST /api/simulation/start ──────────────────────────────────

pub async fn start_simulation(
    State(state): State<Arc<AppState>>,
    Json(config): Json<SimulationConfig>,
) -> Result<Json<SimulationStatus>, AppError> {
    if config.concurrency == 0 || config.concurrency > 200 {
        return Err(AppError::BadRequest(
            "concurrency must be between 1 and 200".into(),
        ));
    }
    if config.duration_secs == 0 || config.duration_secs > 3_600 {
        return Err(AppError::BadRequest(
            "duration_secs must be between 1 and 3600".into(),
        ));
    }
    if config.error_pct > 100 || config.slow_pct > 100 {
        return Err(AppError::BadRequest(
            "error_pct and slow_pct must be between 0 and 100".into(),
        ));
    }

    // Only one simulation at a time; claim the flag before spawning so
    // workers see it immediately
    if state
        .sim_running
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err(AppError::AlreadyRunning);
    }

    let msg = format!(
        "Started: {} workers × {}s, {}% errors, {}% slow",
        config.concurrency, config.duration_secs, config.error_pct, config.slow_pct,
    );
    tracing::info!("{msg}");

    let running = state.sim_running.clone();
    let metrics = state.metrics.clone();
    let profile = crate::load_generator::TrafficProfile {
        concurrency: config.concurrency,
        duration_secs: config.duration_secs,
        error_pct: config.error_pct,
        slow_pct: config.slow_pct,
    };

    let handle = tokio::spawn(async move {
        crate::load_generator::run(running, metrics, profile).await;
    });

    // Stash the handle so `stop` can await clean shutdown
    let mut guard = state.sim_handle.lock().await;
    *guard = Some(handle);

    Ok(Json(SimulationStatus {
        running: true,
        message: msg,
    }))
}

// ─── POST /api/simulation/stop ───────────────────────────────────

pub async fn stop_simulation(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SimulationStatus>, AppError> {
    if !state.sim_running.load(Ordering::SeqCst) {
        return Ok(Json(SimulationStatus {
            running: false,
            message: "No simulation is running".into(),
        }));
    }

    // Signal all workers to stop
    state.sim_running.store(false, Ordering::SeqCst);

    let mut guard = state.sim_handle.lock().await;
    if let Some(handle) = guard.take() {
        // Ignore JoinError — the task may have already finished
        let _ = handle.await;
    }

    Ok(Json(SimulationStatus {
        running: false,
        message: "Simulation stopped".into(),
    }))
}

// ─── GET /api/simulation/status ──────────────────────────────────

pub async fn simulation_status(
    State(state): State<Arc<AppState>>,
) -> Json<SimulationStatus> {
    let running = state.sim_running.load(Ordering::SeqCst);
    Json(SimulationStatus {
        running,
        message: if running {
            "Simulation in progress".into()
        } else {
            "Idle".into()
        },
    })
}
