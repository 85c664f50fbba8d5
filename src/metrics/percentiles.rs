use serde::Serialize;

use super::store::CounterSnapshot;
use super::{error_rate, mean_latency, MetricSample};

/// Latency/error breakdown for one identity.
/// Serialized straight into the monitoring endpoint responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStats {
    pub identity: String,
    /// Samples in the snapshot
    pub count: u64,
    /// Error samples in the snapshot
    pub error_count: u64,
    pub error_rate: f64,
    pub avg: f64,
    pub min: u64,
    pub max: u64,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    /// Cumulative calls since start, untouched by eviction
    pub call_count: u64,
    /// Cumulative errors since start
    pub total_errors: u64,
    /// false when the figures above are placeholders, not measurements
    pub has_data: bool,
}

impl EndpointStats {
    /// Compute the full set from a snapshot. Sorting is the only real cost.
    pub fn from_samples(identity: &str, samples: &[MetricSample], counters: CounterSnapshot) -> Self {
        if samples.is_empty() {
            return Self::empty(identity, counters);
        }

        let mut latencies: Vec<u64> = samples.iter().map(|s| s.latency_millis).collect();
        latencies.sort_unstable();

        Self {
            identity: identity.to_owned(),
            count: latencies.len() as u64,
            error_count: samples.iter().filter(|s| s.is_error()).count() as u64,
            error_rate: error_rate(samples),
            avg: mean_latency(samples),
            min: latencies[0],
            max: latencies[latencies.len() - 1],
            p50: percentile(&latencies, 50.0),
            p95: percentile(&latencies, 95.0),
            p99: percentile(&latencies, 99.0),
            call_count: counters.call_count,
            total_errors: counters.error_count,
            has_data: true,
        }
    }

    /// All-zero placeholder for an identity with nothing retained.
    pub fn empty(identity: &str, counters: CounterSnapshot) -> Self {
        Self {
            identity: identity.to_owned(),
            count: 0,
            error_count: 0,
            error_rate: 0.0,
            avg: 0.0,
            min: 0,
            max: 0,
            p50: 0,
            p95: 0,
            p99: 0,
            call_count: counters.call_count,
            total_errors: counters.error_count,
            has_data: false,
        }
    }

    pub fn has_data(&self) -> bool {
        self.has_data
    }
}

/// Nearest-rank percentile over an ascending slice:
/// index `ceil(n * p / 100) - 1`, clamped to `[0, n-1]`. Empty → 0.
pub fn percentile(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let n = sorted.len();
    let rank = (n as f64 * p / 100.0).ceil() as i64 - 1;
    let idx = rank.clamp(0, n as i64 - 1) as usize;
    sorted[idx]
}
