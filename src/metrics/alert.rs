use serde::Serialize;
use tracing::{error, info, warn};

use super::MetricSample;

// ─── Thresholds ──────────────────────────────────────────────────

pub const EXCELLENT_MS: u64 = 200;
pub const GOOD_MS: u64 = 500;
pub const ACCEPTABLE_MS: u64 = 1_000;
pub const POOR_MS: u64 = 2_000;

/// Calls above this count toward the cumulative slow-call counter.
pub const SLOW_CALL_MS: u64 = ACCEPTABLE_MS;
/// Calls above this are logged as approaching the slow-call threshold.
pub const SLOW_CALL_WARNING_MS: u64 = GOOD_MS;

pub fn is_slow_call(latency_millis: u64) -> bool {
    latency_millis > SLOW_CALL_MS
}

/// Where a single call's latency falls on the 200/500/1000/2000 ms scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyTier {
    Excellent,
    Good,
    Acceptable,
    Slow,
    Poor,
}

impl LatencyTier {
    pub fn of(latency_millis: u64) -> Self {
        match latency_millis {
            0..=EXCELLENT_MS => Self::Excellent,
            l if l <= GOOD_MS => Self::Good,
            l if l <= ACCEPTABLE_MS => Self::Acceptable,
            l if l <= POOR_MS => Self::Slow,
            _ => Self::Poor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    None,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub identity: String,
    pub severity: AlertSeverity,
    pub tier: LatencyTier,
    pub message: String,
}

// ─── Detection ───────────────────────────────────────────────────

/// Evaluate one freshly ingested sample. Stateless; no de-duplication.
pub fn evaluate(sample: &MetricSample) -> Alert {
    let mut severity = AlertSeverity::None;
    let mut signals: Vec<String> = Vec::new();

    let latency = sample.latency_millis;
    if latency > POOR_MS {
        severity = severity.max(AlertSeverity::Warning);
        signals.push(format!(
            "response time {latency}ms exceeded the {POOR_MS}ms threshold"
        ));
    } else if latency > ACCEPTABLE_MS {
        severity = severity.max(AlertSeverity::Info);
        signals.push(format!("slow response {latency}ms"));
    }

    let status = sample.status_code;
    if status >= 500 {
        severity = severity.max(AlertSeverity::Error);
        signals.push(format!("server error, status {status}"));
    } else if status >= 400 {
        severity = severity.max(AlertSeverity::Warning);
        signals.push(format!("client error, status {status}"));
    }

    let message = if signals.is_empty() {
        String::new()
    } else {
        format!("{}: {}", sample.identity, signals.join("; "))
    };

    Alert {
        identity: sample.identity.to_string(),
        severity,
        tier: LatencyTier::of(latency),
        message,
    }
}

/// Log the alert at its severity. Never fails, never blocks on I/O beyond
/// whatever the installed subscriber does.
pub fn emit(alert: &Alert) {
    match alert.severity {
        AlertSeverity::None => {}
        AlertSeverity::Info => info!(api = %alert.identity, "{}", alert.message),
        AlertSeverity::Warning => warn!(api = %alert.identity, "{}", alert.message),
        AlertSeverity::Error => error!(api = %alert.identity, "{}", alert.message),
    }
}

/// Execution-time log line, independent of the alert severity.
pub fn log_call_duration(identity: &str, latency_millis: u64) {
    if is_slow_call(latency_millis) {
        warn!(api = identity, latency_millis, "slow call over {SLOW_CALL_MS}ms");
    } else if latency_millis > SLOW_CALL_WARNING_MS {
        info!(api = identity, latency_millis, "call over {SLOW_CALL_WARNING_MS}ms");
    }
}
