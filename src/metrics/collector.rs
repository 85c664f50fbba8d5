use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::alert::{self, Alert};
use super::clock::{Clock, SystemClock};
use super::health::{ApiHealth, HealthReport, HealthStatus};
use super::overview::{self, MonitoringStatistics, RealTimeSnapshot};
use super::percentiles::EndpointStats;
use super::report::PerformanceReport;
use super::retention::{self, SweepOutcome};
use super::store::{CounterSnapshot, Registry};
use super::trend::{HourlyTrend, TrendScope, DEFAULT_HORIZON_HOURS};
use super::{identity_for, MetricSample};
use crate::config::MonitorConfig;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe monitoring engine.
/// The interceptor calls `record()`; everything else reads snapshots.
pub struct MetricsCollector {
    registry: Registry,
    clock: Arc<dyn Clock>,
    health_window: usize,
    realtime_window: Duration,
}

// ─── MetricsCollector impl ───────────────────────────────────────

impl MetricsCollector {
    pub fn new(config: &MonitorConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &MonitorConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: Registry::new(config.capacity),
            clock,
            health_window: config.health_window.max(1),
            realtime_window: Duration::minutes(i64::from(config.realtime_window_minutes)),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Samples retained per identity before eviction.
    pub fn capacity(&self) -> usize {
        self.registry.capacity()
    }

    // ── Ingestion ───────────────────────────────────────────────

    /// Record one completed call. Never fails; holds only the identity's
    /// own lock, and only for the append.
    pub fn record(
        &self,
        identity: &str,
        latency_millis: u64,
        status_code: u16,
        caller_ip: Option<String>,
        caller_agent: Option<String>,
    ) -> Alert {
        let endpoint = self.registry.get_or_create(identity);
        let sample = MetricSample {
            identity: Arc::clone(endpoint.identity()),
            latency_millis,
            status_code,
            observed_at: self.clock.now(),
            caller_ip,
            caller_agent,
        };
        let is_error = sample.is_error();
        let alert = alert::evaluate(&sample);

        endpoint.push(sample);
        endpoint.count_call(is_error, alert::is_slow_call(latency_millis));
        alert::emit(&alert);
        alert::log_call_duration(identity, latency_millis);

        debug!(api = identity, latency_millis, status_code, "recorded call");
        alert
    }

    /// `record` with the identity built from its parts.
    pub fn record_call(
        &self,
        method: &str,
        path: &str,
        latency_millis: u64,
        status_code: u16,
        caller_ip: Option<String>,
        caller_agent: Option<String>,
    ) -> Alert {
        let identity = identity_for(method, path);
        self.record(&identity, latency_millis, status_code, caller_ip, caller_agent)
    }

    // ── Raw reads ───────────────────────────────────────────────

    pub fn identities(&self) -> Vec<String> {
        self.registry
            .all()
            .iter()
            .map(|ep| ep.identity().to_string())
            .collect()
    }

    /// Copy of one identity's retained samples, oldest first.
    pub fn samples(&self, identity: &str) -> Vec<MetricSample> {
        self.registry
            .get(identity)
            .map(|ep| ep.snapshot())
            .unwrap_or_default()
    }

    pub fn counters(&self, identity: &str) -> CounterSnapshot {
        self.registry
            .get(identity)
            .map(|ep| ep.counters())
            .unwrap_or_default()
    }

    /// `(identity, samples)` for every identity, sorted by identity.
    pub fn snapshot_all(&self) -> Vec<(String, Vec<MetricSample>)> {
        self.registry
            .all()
            .iter()
            .map(|ep| (ep.identity().to_string(), ep.snapshot()))
            .collect()
    }

    /// `(identity, counters)` for every identity ever seen, sorted.
    pub fn counters_all(&self) -> Vec<(String, CounterSnapshot)> {
        self.registry
            .all()
            .iter()
            .map(|ep| (ep.identity().to_string(), ep.counters()))
            .collect()
    }

    // ── Statistics ──────────────────────────────────────────────

    pub fn stats_for(&self, identity: &str) -> EndpointStats {
        match self.registry.get(identity) {
            Some(ep) => {
                let samples = ep.snapshot();
                EndpointStats::from_samples(identity, &samples, ep.counters())
            }
            None => EndpointStats::empty(identity, CounterSnapshot::default()),
        }
    }

    /// Stats for every identity that currently retains samples.
    pub fn all_stats(&self) -> Vec<EndpointStats> {
        self.registry
            .all()
            .iter()
            .map(|ep| {
                let samples = ep.snapshot();
                EndpointStats::from_samples(ep.identity(), &samples, ep.counters())
            })
            .filter(EndpointStats::has_data)
            .collect()
    }

    // ── Trend ───────────────────────────────────────────────────

    pub fn hourly_trend(&self, scope: &TrendScope, horizon_hours: u32) -> HourlyTrend {
        let now = self.clock.now();
        let samples: Vec<MetricSample> = match scope {
            TrendScope::Identity(identity) => self.samples(identity),
            TrendScope::All => self
                .registry
                .all()
                .iter()
                .flat_map(|ep| ep.snapshot())
                .collect(),
        };
        HourlyTrend::build(&samples, now, horizon_hours)
    }

    // ── Health ──────────────────────────────────────────────────

    pub fn health_of(&self, identity: &str) -> HealthStatus {
        self.registry
            .get(identity)
            .map(|ep| HealthStatus::of_window(&ep.recent(self.health_window)))
            .unwrap_or(HealthStatus::Unknown)
    }

    /// Per-identity health over each identity's recent window plus the
    /// overall vote. Drained identities are left out of the list.
    pub fn check_health(&self) -> HealthReport {
        let entries = self
            .registry
            .all()
            .iter()
            .filter_map(|ep| {
                let window = ep.recent(self.health_window);
                if window.is_empty() {
                    return None;
                }
                Some(ApiHealth::from_window(ep.identity(), &window))
            })
            .collect();
        HealthReport::from_entries(entries)
    }

    pub fn overall_health(&self) -> HealthStatus {
        self.check_health().overall_health
    }

    // ── Reports ─────────────────────────────────────────────────

    pub fn report(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> PerformanceReport {
        PerformanceReport::build(self.snapshot_all(), start, end)
    }

    pub fn real_time(&self) -> RealTimeSnapshot {
        let now = self.clock.now();
        overview::real_time(&self.snapshot_all(), now, self.realtime_window)
    }

    pub fn monitoring_statistics(&self) -> MonitoringStatistics {
        let snapshots = self.snapshot_all();
        let trend = HourlyTrend::build(
            snapshots.iter().flat_map(|(_, samples)| samples.iter()),
            self.clock.now(),
            DEFAULT_HORIZON_HOURS,
        );
        let counters = self.counters_all();
        let totals: Vec<CounterSnapshot> = counters.iter().map(|(_, c)| *c).collect();
        MonitoringStatistics {
            overall_stats: overview::overall_statistics(&snapshots, &totals),
            api_detail_stats: self.all_stats(),
            performance_analysis: overview::performance_grades(&snapshots),
            error_analysis: overview::status_code_distribution(&snapshots),
            trend_analysis: trend,
            performance_statistics: overview::performance_statistics(&counters, self.capacity()),
        }
    }

    // ── Retention ───────────────────────────────────────────────

    /// Drop samples older than `now - horizon` from every identity.
    pub fn sweep(&self, horizon: Duration) -> SweepOutcome {
        let cutoff = self.clock.now() - horizon;
        retention::sweep(&self.registry, cutoff)
    }
}
