use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::alert::ACCEPTABLE_MS;
use super::percentiles::percentile;
use super::{error_rate, mean_latency, MetricSample};

/// Error rate (%) above which a report suggests reviewing error handling.
const ERROR_RATE_ADVISORY_PCT: f64 = 5.0;

const ALL_CLEAR: &str = "API performance looks good; keep monitoring";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPeriod {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_calls: u64,
    pub average_response_time: u64,
    pub error_count: u64,
    pub error_rate: f64,
    pub has_data: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPerformance {
    pub call_count: u64,
    pub average_response_time: f64,
    pub p95_response_time: u64,
    pub error_count: u64,
    pub error_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub report_period: ReportPeriod,
    pub summary: ReportSummary,
    pub per_identity_breakdown: BTreeMap<String, ApiPerformance>,
    pub recommendations: Vec<String>,
}

impl PerformanceReport {
    /// Build from per-identity snapshots. Filtering is inclusive on both
    /// ends; identities left with nothing are dropped.
    pub fn build<I>(snapshots: I, start: DateTime<Utc>, end: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = (String, Vec<MetricSample>)>,
    {
        let filtered: BTreeMap<String, Vec<MetricSample>> = snapshots
            .into_iter()
            .map(|(identity, samples)| {
                let kept: Vec<_> = samples
                    .into_iter()
                    .filter(|s| s.observed_at >= start && s.observed_at <= end)
                    .collect();
                (identity, kept)
            })
            .filter(|(_, kept)| !kept.is_empty())
            .collect();

        let per_identity_breakdown: BTreeMap<String, ApiPerformance> = filtered
            .iter()
            .map(|(identity, samples)| (identity.clone(), ApiPerformance::from_samples(samples)))
            .collect();

        let recommendations = recommend(&per_identity_breakdown);

        Self {
            report_period: ReportPeriod {
                start_time: start,
                end_time: end,
            },
            summary: summarize(filtered.values()),
            per_identity_breakdown,
            recommendations,
        }
    }
}

impl ApiPerformance {
    fn from_samples(samples: &[MetricSample]) -> Self {
        let mut latencies: Vec<u64> = samples.iter().map(|s| s.latency_millis).collect();
        latencies.sort_unstable();
        Self {
            call_count: samples.len() as u64,
            average_response_time: mean_latency(samples),
            p95_response_time: percentile(&latencies, 95.0),
            error_count: samples.iter().filter(|s| s.is_error()).count() as u64,
            error_rate: error_rate(samples),
        }
    }
}

fn summarize<'a, I>(groups: I) -> ReportSummary
where
    I: IntoIterator<Item = &'a Vec<MetricSample>>,
{
    let mut total_calls = 0u64;
    let mut latency_sum = 0u128;
    let mut error_count = 0u64;
    for sample in groups.into_iter().flatten() {
        total_calls += 1;
        latency_sum += u128::from(sample.latency_millis);
        if sample.is_error() {
            error_count += 1;
        }
    }

    if total_calls == 0 {
        return ReportSummary {
            total_calls: 0,
            average_response_time: 0,
            error_count: 0,
            error_rate: 0.0,
            has_data: false,
        };
    }

    ReportSummary {
        total_calls,
        average_response_time: (latency_sum as f64 / total_calls as f64).round() as u64,
        error_count,
        error_rate: error_count as f64 / total_calls as f64 * 100.0,
        has_data: true,
    }
}

fn recommend(breakdown: &BTreeMap<String, ApiPerformance>) -> Vec<String> {
    let mut out = Vec::new();
    for (identity, perf) in breakdown {
        if perf.average_response_time > ACCEPTABLE_MS as f64 {
            out.push(format!(
                "{identity}: average response time {:.0}ms is too high; optimize the query path or add indexes",
                perf.average_response_time
            ));
        }
        if perf.error_rate > ERROR_RATE_ADVISORY_PCT {
            out.push(format!(
                "{identity}: error rate {:.1}% is elevated; review business logic and error handling",
                perf.error_rate
            ));
        }
    }
    if out.is_empty() {
        out.push(ALL_CLEAR.to_owned());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::test_support::{at, sample};

    #[test]
    fn inclusive_time_filter() {
        let samples: Vec<_> = (1..=10).map(|t| sample("GET /a", t as u64, 200, t)).collect();
        let report = PerformanceReport::build(vec![("GET /a".to_owned(), samples)], at(3), at(7));

        let perf = &report.per_identity_breakdown["GET /a"];
        assert_eq!(perf.call_count, 5);
        assert_eq!(perf.average_response_time, 5.0);
        assert_eq!(report.summary.total_calls, 5);
    }

    #[test]
    fn identities_without_matches_are_omitted() {
        let report = PerformanceReport::build(
            vec![
                ("GET /a".to_owned(), vec![sample("GET /a", 10, 200, 5)]),
                ("GET /b".to_owned(), vec![sample("GET /b", 10, 200, 50)]),
                ("GET /c".to_owned(), Vec::new()),
            ],
            at(0),
            at(10),
        );
        assert_eq!(report.per_identity_breakdown.len(), 1);
        assert!(report.per_identity_breakdown.contains_key("GET /a"));
    }

    #[test]
    fn empty_range_has_no_data() {
        let report = PerformanceReport::build(
            vec![("GET /a".to_owned(), vec![sample("GET /a", 10, 200, 5)])],
            at(10),
            at(1),
        );
        assert!(!report.summary.has_data);
        assert!(report.per_identity_breakdown.is_empty());
        assert_eq!(report.recommendations, vec![ALL_CLEAR.to_owned()]);
    }

    #[test]
    fn recommendations_follow_thresholds() {
        let slow: Vec<_> = (0..4).map(|t| sample("GET /slow", 1_500, 200, t)).collect();
        let flaky: Vec<_> = (0..10)
            .map(|t| sample("POST /flaky", 20, if t == 0 { 500 } else { 200 }, t))
            .collect();
        let fine: Vec<_> = (0..10).map(|t| sample("GET /fine", 20, 200, t)).collect();

        let report = PerformanceReport::build(
            vec![
                ("GET /slow".to_owned(), slow),
                ("POST /flaky".to_owned(), flaky),
                ("GET /fine".to_owned(), fine),
            ],
            at(0),
            at(100),
        );

        assert_eq!(report.recommendations.len(), 2);
        assert!(report.recommendations.iter().any(|r| r.starts_with("GET /slow") && r.contains("indexes")));
        assert!(report.recommendations.iter().any(|r| r.starts_with("POST /flaky") && r.contains("error handling")));
        assert_eq!(report.summary.total_calls, 24);
        assert_eq!(report.summary.error_count, 1);
    }

    #[test]
    fn serializes_contract_field_names() {
        let report = PerformanceReport::build(
            vec![("GET /a".to_owned(), vec![sample("GET /a", 10, 200, 5)])],
            at(0),
            at(10),
        );
        let json = serde_json::to_value(&report).expect("serialize");
        assert!(json.get("summary").is_some());
        assert!(json.get("perIdentityBreakdown").is_some());
        assert!(json.get("recommendations").is_some());
        assert_eq!(json["perIdentityBreakdown"]["GET /a"]["p95ResponseTime"], 10);
    }
}
