use axum::{
    extract::{MatchedPath, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::identity_for;
use crate::AppState;

/// Requests under this prefix are the monitor's own surface and are not
/// recorded.
const MONITORING_PREFIX: &str = "/api/monitoring";

/// Call interceptor. Times the request, records it in the collector and
/// adds two response headers:
///
///   X-Response-Time-Ms  — total handler wall time in milliseconds
///   Server-Timing       — same value in the standard Server-Timing format
///
/// The identity uses the matched route template (`/api/devices/:id`) rather
/// than the raw path so parameterized routes share one stream.
pub async fn timing_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let raw_path = req.uri().path().to_owned();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| raw_path.clone());
    let caller_ip = caller_ip(req.headers());
    let caller_agent = header_str(req.headers(), "user-agent");

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();
    let ms = elapsed.as_millis() as u64;

    // ── Inject response headers ─────────────────────────────────
    if let Ok(val) = ms.to_string().parse() {
        response.headers_mut().insert("x-response-time-ms", val);
    }

    let server_timing =
        format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = server_timing.parse() {
        response.headers_mut().insert("server-timing", val);
    }

    // ── Record ──────────────────────────────────────────────────
    if !raw_path.starts_with(MONITORING_PREFIX) {
        let status = response.status().as_u16();
        let identity = identity_for(method.as_str(), &route);
        state
            .metrics
            .record(&identity, ms, status, caller_ip, caller_agent);
    }

    response
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

/// First hop of `X-Forwarded-For`, else `X-Real-IP`.
fn caller_ip(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|s| s.trim().to_owned()))
        .filter(|s| !s.is_empty())
        .or_else(|| header_str(headers, "x-real-ip"))
}
