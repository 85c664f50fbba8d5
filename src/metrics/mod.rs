pub mod alert;
pub mod clock;
pub mod collector;
pub mod health;
pub mod overview;
pub mod percentiles;
pub mod report;
pub mod retention;
pub mod store;
pub mod stream;
pub mod trend;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use alert::{Alert, AlertSeverity, LatencyTier};
pub use clock::{Clock, ManualClock, SystemClock};
pub use collector::MetricsCollector;
pub use health::{HealthReport, HealthStatus};
pub use percentiles::EndpointStats;
pub use report::PerformanceReport;
pub use retention::SweepOutcome;
pub use trend::{HourlyTrend, TrendScope};

/// A single completed call, as handed over by the interceptor.
/// This is the "write" side — `MetricsCollector::record` builds these.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSample {
    /// e.g. "GET /api/devices/:id"
    pub identity: Arc<str>,
    /// Wall-clock duration of the call in milliseconds
    pub latency_millis: u64,
    /// HTTP-style status code
    pub status_code: u16,
    /// Stamped by the collector's clock at ingestion
    pub observed_at: DateTime<Utc>,
    pub caller_ip: Option<String>,
    pub caller_agent: Option<String>,
}

impl MetricSample {
    pub fn is_error(&self) -> bool {
        self.status_code >= 400
    }
}

/// Canonical identity for one logical endpoint: `"<METHOD> <path>"`.
pub fn identity_for(method: &str, path: &str) -> String {
    format!("{} {}", method.to_ascii_uppercase(), path)
}

/// Arithmetic mean of the latencies, 0.0 for an empty slice.
pub(crate) fn mean_latency(samples: &[MetricSample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: u128 = samples.iter().map(|s| u128::from(s.latency_millis)).sum();
    sum as f64 / samples.len() as f64
}

/// Percentage of samples with an error status, always in `[0, 100]`.
pub(crate) fn error_rate(samples: &[MetricSample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let errors = samples.iter().filter(|s| s.is_error()).count();
    errors as f64 / samples.len() as f64 * 100.0
}

/// Round to two decimals, the precision used in health payloads.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
