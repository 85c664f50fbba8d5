use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use super::health::{HealthReport, HealthStatus};
use super::overview::{MonitoringStatistics, RealTimeSnapshot};
use super::percentiles::EndpointStats;
use super::report::PerformanceReport;
use super::retention::SweepOutcome;
use super::trend::{HourlyTrend, TrendScope, DEFAULT_HORIZON_HOURS};
use crate::error::AppError;
use crate::AppState;

/// Longest trend the endpoint will compute.
const MAX_TREND_HOURS: u32 = 24 * 7;

// ─── Query types ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ApiQuery {
    /// Identity, e.g. `GET /api/devices/:id`
    pub api: String,
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub api: Option<String>,
    pub hours: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatsResponse {
    #[serde(flatten)]
    pub stats: EndpointStats,
    pub health_status: HealthStatus,
}

// ─── GET /api/monitoring/statistics ──────────────────────────────

pub async fn get_statistics(State(state): State<Arc<AppState>>) -> Json<MonitoringStatistics> {
    Json(state.metrics.monitoring_statistics())
}

// ─── GET /api/monitoring/stats?api= ──────────────────────────────

pub async fn get_api_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ApiQuery>,
) -> Result<Json<ApiStatsResponse>, AppError> {
    if query.api.trim().is_empty() {
        return Err(AppError::BadRequest("api must not be empty".into()));
    }
    Ok(Json(ApiStatsResponse {
        stats: state.metrics.stats_for(&query.api),
        health_status: state.metrics.health_of(&query.api),
    }))
}

// ─── GET /api/monitoring/health ──────────────────────────────────

pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    Json(state.metrics.check_health())
}

// ─── GET /api/monitoring/trend?api=&hours= ───────────────────────

pub async fn get_trend(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<HourlyTrend>, AppError> {
    let hours = query.hours.unwrap_or(DEFAULT_HORIZON_HOURS);
    if hours == 0 || hours > MAX_TREND_HOURS {
        return Err(AppError::BadRequest(format!(
            "hours must be between 1 and {MAX_TREND_HOURS}"
        )));
    }
    let scope = match query.api {
        Some(api) if !api.trim().is_empty() => TrendScope::Identity(api),
        _ => TrendScope::All,
    };
    Ok(Json(state.metrics.hourly_trend(&scope, hours)))
}

// ─── GET /api/monitoring/report?start=&end= ──────────────────────
/// Defaults to the last 24 hours when a bound is omitted.

pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<PerformanceReport>, AppError> {
    let end = query.end.unwrap_or_else(|| state.metrics.now());
    let start = query
        .start
        .unwrap_or_else(|| end - ChronoDuration::hours(24));
    if start > end {
        return Err(AppError::BadRequest("start must not be after end".into()));
    }
    Ok(Json(state.metrics.report(start, end)))
}

// ─── GET /api/monitoring/realtime ────────────────────────────────

pub async fn get_realtime(State(state): State<Arc<AppState>>) -> Json<RealTimeSnapshot> {
    Json(state.metrics.real_time())
}

// ─── POST /api/monitoring/cleanup ────────────────────────────────

pub async fn cleanup(State(state): State<Arc<AppState>>) -> Json<SweepOutcome> {
    Json(state.metrics.sweep(state.config.retention_horizon()))
}

// ─── GET /api/monitoring/stream ──────────────────────────────────
/// Server-Sent Events endpoint.
/// Pushes the real-time snapshot as JSON on every configured tick.

pub async fn realtime_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(state.config.stream_interval());

    let stream = IntervalStream::new(interval).map(move |_| {
        let snapshot = state.metrics.real_time();
        let json = serde_json::to_string(&snapshot).unwrap_or_default();
        Ok(Event::default().data(json))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
