//! Whole-process views: totals, latency grades, status-code mix and the
//! "last few minutes" real-time window.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::alert::{LatencyTier, SLOW_CALL_MS, SLOW_CALL_WARNING_MS};
use super::health::HealthStatus;
use super::percentiles::EndpointStats;
use super::store::CounterSnapshot;
use super::trend::HourlyTrend;
use super::{error_rate, mean_latency, MetricSample};

type Snapshots = [(String, Vec<MetricSample>)];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStatistics {
    pub total_api_calls: u64,
    pub total_errors: u64,
    pub error_rate: f64,
    pub success_rate: f64,
    pub average_response_time: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PerformanceGrades {
    pub excellent: u64,
    pub good: u64,
    pub acceptable: u64,
    pub poor: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowStats {
    pub total_calls: u64,
    pub average_response_time: u64,
    pub error_count: u64,
    pub error_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealTimeSnapshot {
    pub timestamp: DateTime<Utc>,
    pub window_minutes: i64,
    pub recent_window: WindowStats,
    pub active_apis: Vec<String>,
    pub performance_status: HealthStatus,
}

/// Everything the statistics endpoint returns in one document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringStatistics {
    pub overall_stats: OverallStatistics,
    pub api_detail_stats: Vec<EndpointStats>,
    pub performance_analysis: PerformanceGrades,
    pub error_analysis: BTreeMap<String, u64>,
    pub trend_analysis: HourlyTrend,
    pub performance_statistics: PerformanceStatistics,
}

/// Cumulative slow-call accounting with the thresholds it is measured
/// against. Built from counters only, so eviction and sweeps never lower it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceStatistics {
    pub slow_call_threshold_ms: u64,
    pub warning_threshold_ms: u64,
    pub max_records_per_api: usize,
    pub total_calls: u64,
    pub slow_call_count: u64,
    pub per_api: BTreeMap<String, CounterSnapshot>,
}

/// Call/error totals come from the cumulative counters; the average is
/// over whatever samples are still retained.
pub fn overall_statistics(snapshots: &Snapshots, counters: &[CounterSnapshot]) -> OverallStatistics {
    let total_api_calls: u64 = counters.iter().map(|c| c.call_count).sum();
    let total_errors: u64 = counters.iter().map(|c| c.error_count).sum();

    let (sum, n) = snapshots
        .iter()
        .flat_map(|(_, samples)| samples.iter())
        .fold((0u128, 0u64), |(sum, n), s| (sum + u128::from(s.latency_millis), n + 1));

    let (error_rate, success_rate) = if total_api_calls > 0 {
        let errors = total_errors as f64 / total_api_calls as f64 * 100.0;
        (errors, 100.0 - errors)
    } else {
        (0.0, 100.0)
    };

    OverallStatistics {
        total_api_calls,
        total_errors,
        error_rate,
        success_rate,
        average_response_time: if n == 0 {
            0
        } else {
            (sum as f64 / n as f64).round() as u64
        },
    }
}

pub fn performance_statistics(
    counters: &[(String, CounterSnapshot)],
    max_records_per_api: usize,
) -> PerformanceStatistics {
    PerformanceStatistics {
        slow_call_threshold_ms: SLOW_CALL_MS,
        warning_threshold_ms: SLOW_CALL_WARNING_MS,
        max_records_per_api,
        total_calls: counters.iter().map(|(_, c)| c.call_count).sum(),
        slow_call_count: counters.iter().map(|(_, c)| c.slow_count).sum(),
        per_api: counters.iter().cloned().collect(),
    }
}

pub fn performance_grades(snapshots: &Snapshots) -> PerformanceGrades {
    let mut grades = PerformanceGrades::default();
    for sample in snapshots.iter().flat_map(|(_, samples)| samples.iter()) {
        match LatencyTier::of(sample.latency_millis) {
            LatencyTier::Excellent => grades.excellent += 1,
            LatencyTier::Good => grades.good += 1,
            LatencyTier::Acceptable => grades.acceptable += 1,
            LatencyTier::Slow | LatencyTier::Poor => grades.poor += 1,
        }
    }
    grades
}

fn status_class(status: u16) -> &'static str {
    match status {
        0..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

pub fn status_code_distribution(snapshots: &Snapshots) -> BTreeMap<String, u64> {
    let mut dist = BTreeMap::new();
    for sample in snapshots.iter().flat_map(|(_, samples)| samples.iter()) {
        *dist.entry(status_class(sample.status_code).to_owned()).or_insert(0) += 1;
    }
    dist
}

/// Calls observed strictly after `now - window`.
pub fn real_time(snapshots: &Snapshots, now: DateTime<Utc>, window: Duration) -> RealTimeSnapshot {
    let cutoff = now - window;

    let mut recent: Vec<MetricSample> = Vec::new();
    let mut active_apis: Vec<String> = Vec::new();
    for (identity, samples) in snapshots {
        let before = recent.len();
        recent.extend(samples.iter().filter(|s| s.observed_at > cutoff).cloned());
        if recent.len() > before {
            active_apis.push(identity.clone());
        }
    }
    active_apis.sort();

    let error_count = recent.iter().filter(|s| s.is_error()).count() as u64;
    let performance_status = if recent.is_empty() {
        HealthStatus::Unknown
    } else {
        HealthStatus::classify(mean_latency(&recent).round(), error_rate(&recent))
    };

    RealTimeSnapshot {
        timestamp: now,
        window_minutes: window.num_minutes(),
        recent_window: WindowStats {
            total_calls: recent.len() as u64,
            average_response_time: mean_latency(&recent).round() as u64,
            error_count,
            error_rate: error_rate(&recent),
        },
        active_apis,
        performance_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::test_support::{at, sample};

    fn snaps() -> Vec<(String, Vec<MetricSample>)> {
        vec![
            (
                "GET /a".to_owned(),
                vec![
                    sample("GET /a", 100, 200, 0),
                    sample("GET /a", 300, 301, 100),
                    sample("GET /a", 900, 404, 200),
                ],
            ),
            ("GET /b".to_owned(), vec![sample("GET /b", 2_500, 503, 290)]),
        ]
    }

    #[test]
    fn totals_come_from_counters() {
        let counters = [
            CounterSnapshot { call_count: 30, error_count: 3, slow_count: 0 },
            CounterSnapshot { call_count: 10, error_count: 1, slow_count: 0 },
        ];
        let stats = overall_statistics(&snaps(), &counters);
        assert_eq!(stats.total_api_calls, 40);
        assert_eq!(stats.total_errors, 4);
        assert_eq!(stats.error_rate, 10.0);
        assert_eq!(stats.success_rate, 90.0);
        assert_eq!(stats.average_response_time, 950);
    }

    #[test]
    fn no_calls_means_full_success() {
        let stats = overall_statistics(&[], &[]);
        assert_eq!(stats.success_rate, 100.0);
        assert_eq!(stats.error_rate, 0.0);
    }

    #[test]
    fn performance_statistics_sum_slow_counters() {
        let counters = vec![
            ("GET /a".to_owned(), CounterSnapshot { call_count: 8, error_count: 0, slow_count: 3 }),
            ("GET /b".to_owned(), CounterSnapshot { call_count: 2, error_count: 1, slow_count: 1 }),
        ];
        let perf = performance_statistics(&counters, 1_000);
        assert_eq!(perf.slow_call_threshold_ms, 1_000);
        assert_eq!(perf.warning_threshold_ms, 500);
        assert_eq!(perf.max_records_per_api, 1_000);
        assert_eq!(perf.total_calls, 10);
        assert_eq!(perf.slow_call_count, 4);
        assert_eq!(perf.per_api["GET /b"].slow_count, 1);

        let json = serde_json::to_value(&perf).expect("serialize");
        assert_eq!(json["slowCallThresholdMs"], 1_000);
        assert_eq!(json["perApi"]["GET /a"]["slowCount"], 3);
    }

    #[test]
    fn grades_and_status_classes() {
        let grades = performance_grades(&snaps());
        assert_eq!(
            grades,
            PerformanceGrades { excellent: 1, good: 1, acceptable: 1, poor: 1 }
        );
        let dist = status_code_distribution(&snaps());
        assert_eq!(dist["2xx"], 1);
        assert_eq!(dist["3xx"], 1);
        assert_eq!(dist["4xx"], 1);
        assert_eq!(dist["5xx"], 1);
    }

    #[test]
    fn real_time_window_only_sees_recent_calls() {
        let rt = real_time(&snaps(), at(300), Duration::minutes(1));
        // cutoff is t=240: only GET /b's sample at t=290 qualifies
        assert_eq!(rt.recent_window.total_calls, 1);
        assert_eq!(rt.active_apis, vec!["GET /b".to_owned()]);
        assert_eq!(rt.performance_status, HealthStatus::Critical);

        let quiet = real_time(&snaps(), at(10_000), Duration::minutes(5));
        assert_eq!(quiet.recent_window.total_calls, 0);
        assert!(quiet.active_apis.is_empty());
        assert_eq!(quiet.performance_status, HealthStatus::Unknown);
    }
}
