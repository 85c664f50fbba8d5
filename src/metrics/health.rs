use chrono::{DateTime, Utc};
use serde::Serialize;

use super::alert::{ACCEPTABLE_MS, EXCELLENT_MS, GOOD_MS};
use super::{error_rate, mean_latency, round2, MetricSample};

/// Samples considered per identity unless configured otherwise.
pub const DEFAULT_HEALTH_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HealthStatus {
    Unknown,
    Healthy,
    Good,
    Warning,
    Critical,
}

impl HealthStatus {
    /// First matching row wins.
    pub fn classify(avg_latency_ms: f64, error_rate_pct: f64) -> Self {
        if avg_latency_ms <= EXCELLENT_MS as f64 && error_rate_pct < 1.0 {
            Self::Healthy
        } else if avg_latency_ms <= GOOD_MS as f64 && error_rate_pct < 5.0 {
            Self::Good
        } else if avg_latency_ms <= ACCEPTABLE_MS as f64 && error_rate_pct < 10.0 {
            Self::Warning
        } else {
            Self::Critical
        }
    }

    /// Classify a window of samples; an empty window is `Unknown`.
    pub fn of_window(window: &[MetricSample]) -> Self {
        if window.is_empty() {
            return Self::Unknown;
        }
        Self::classify(mean_latency(window), error_rate(window))
    }

    /// Sort key: worst first.
    fn priority(self) -> u8 {
        match self {
            Self::Critical => 1,
            Self::Warning => 2,
            Self::Good => 3,
            Self::Healthy => 4,
            Self::Unknown => 5,
        }
    }
}

/// Roll per-identity classifications up into one status.
/// `Unknown` entries don't vote; with no voters the result is `Unknown`.
pub fn overall<I>(statuses: I) -> HealthStatus
where
    I: IntoIterator<Item = HealthStatus>,
{
    let mut voters = 0usize;
    let mut critical = 0usize;
    let mut warning = 0usize;

    for status in statuses {
        match status {
            HealthStatus::Unknown => continue,
            HealthStatus::Critical => critical += 1,
            HealthStatus::Warning => warning += 1,
            HealthStatus::Good | HealthStatus::Healthy => {}
        }
        voters += 1;
    }

    if voters == 0 {
        HealthStatus::Unknown
    } else if critical > 0 {
        HealthStatus::Critical
    } else if warning * 2 > voters {
        HealthStatus::Warning
    } else if warning > 0 {
        HealthStatus::Good
    } else {
        HealthStatus::Healthy
    }
}

// ─── Report types ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    pub api: String,
    pub average_response_time: u64,
    pub error_rate: f64,
    pub health_status: HealthStatus,
    pub last_call_time: Option<DateTime<Utc>>,
    pub sample_count: usize,
}

impl ApiHealth {
    /// `window` is the identity's most recent samples, oldest first.
    pub fn from_window(api: &str, window: &[MetricSample]) -> Self {
        Self {
            api: api.to_owned(),
            average_response_time: mean_latency(window).round() as u64,
            error_rate: round2(error_rate(window)),
            health_status: HealthStatus::of_window(window),
            last_call_time: window.last().map(|s| s.observed_at),
            sample_count: window.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub api_health_list: Vec<ApiHealth>,
    pub overall_health: HealthStatus,
}

impl HealthReport {
    pub fn from_entries(mut entries: Vec<ApiHealth>) -> Self {
        entries.sort_by(|a, b| {
            a.health_status
                .priority()
                .cmp(&b.health_status.priority())
                .then_with(|| a.api.cmp(&b.api))
        });
        let overall_health = overall(entries.iter().map(|e| e.health_status));
        Self {
            api_health_list: entries,
            overall_health,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::test_support::sample;
    use HealthStatus::*;

    #[test]
    fn threshold_boundaries() {
        assert_eq!(HealthStatus::classify(200.0, 0.9), Healthy);
        assert_ne!(HealthStatus::classify(201.0, 0.9), Healthy);
        assert_eq!(HealthStatus::classify(201.0, 0.9), Good);
        assert_eq!(HealthStatus::classify(200.0, 1.0), Good);
        assert_eq!(HealthStatus::classify(500.0, 4.9), Good);
        assert_eq!(HealthStatus::classify(1_000.0, 9.9), Warning);
        assert_eq!(HealthStatus::classify(1_001.0, 0.0), Critical);
        assert_eq!(HealthStatus::classify(10.0, 10.1), Critical);
    }

    #[test]
    fn empty_window_is_unknown() {
        assert_eq!(HealthStatus::of_window(&[]), Unknown);
    }

    #[test]
    fn devices_window_is_critical() {
        let window: Vec<_> = [(50, 200), (150, 200), (2500, 500), (300, 200), (100, 404)]
            .iter()
            .enumerate()
            .map(|(i, &(l, s))| sample("GET /devices", l, s, i as i64))
            .collect();
        let health = ApiHealth::from_window("GET /devices", &window);
        assert_eq!(health.average_response_time, 620);
        assert_eq!(health.error_rate, 40.0);
        assert_eq!(health.health_status, Critical);
        assert_eq!(health.sample_count, 5);
    }

    #[test]
    fn overall_voting() {
        assert_eq!(overall(Vec::new()), Unknown);
        assert_eq!(overall([Unknown, Unknown]), Unknown);
        assert_eq!(overall([Healthy, Critical, Unknown]), Critical);
        assert_eq!(overall([Warning, Warning, Healthy]), Warning);
        assert_eq!(overall([Warning, Healthy]), Good);
        assert_eq!(overall([Warning, Healthy, Healthy]), Good);
        assert_eq!(overall([Healthy, Good]), Healthy);
        // Unknown entries don't dilute the majority
        assert_eq!(overall([Warning, Warning, Healthy, Unknown, Unknown]), Warning);
    }

    #[test]
    fn report_sorts_worst_first() {
        let fast = vec![sample("GET /a", 10, 200, 0)];
        let slow = vec![sample("GET /b", 5_000, 200, 0)];
        let report = HealthReport::from_entries(vec![
            ApiHealth::from_window("GET /a", &fast),
            ApiHealth::from_window("GET /b", &slow),
        ]);
        assert_eq!(report.api_health_list[0].api, "GET /b");
        assert_eq!(report.overall_health, Critical);

        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["apiHealthList"][0]["healthStatus"], "Critical");
    }
}
