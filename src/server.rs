use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::metrics::stream;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Traffic simulation ──────────────────────────────────
        .route(
            "/api/simulation/start",
            post(handlers::simulation::start_simulation),
        )
        .route(
            "/api/simulation/stop",
            post(handlers::simulation::stop_simulation),
        )
        .route(
            "/api/simulation/status",
            get(handlers::simulation::simulation_status),
        )
        // ── Monitoring ──────────────────────────────────────────
        .route("/api/monitoring/statistics", get(stream::get_statistics))
        .route("/api/monitoring/stats", get(stream::get_api_stats))
        .route("/api/monitoring/health", get(stream::get_health))
        .route("/api/monitoring/trend", get(stream::get_trend))
        .route("/api/monitoring/report", get(stream::get_report))
        .route("/api/monitoring/realtime", get(stream::get_realtime))
        .route("/api/monitoring/cleanup", post(stream::cleanup))
        .route("/api/monitoring/stream", get(stream::realtime_stream))
        // ── Call interceptor (after routing, so MatchedPath is set) ──
        .route_layer(axum_mw::from_fn_with_state(
            state.clone(),
            timing::timing_middleware,
        ))
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
        .layer(CorsLayer::permissive())
}
