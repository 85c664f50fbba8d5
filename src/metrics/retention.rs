use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::collector::MetricsCollector;
use super::store::Registry;

/// What one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepOutcome {
    pub removed: usize,
    /// Identities that lost at least one sample
    pub identities: usize,
}

/// Remove every sample observed before `cutoff`. Takes each identity's lock
/// in turn, never the whole registry's; counters are not touched.
pub fn sweep(registry: &Registry, cutoff: DateTime<Utc>) -> SweepOutcome {
    let mut outcome = SweepOutcome::default();
    for endpoint in registry.all() {
        let removed = endpoint.remove_older_than(cutoff);
        if removed > 0 {
            debug!(api = %endpoint.identity(), removed, "expired samples removed");
            outcome.removed += removed;
            outcome.identities += 1;
        }
    }
    info!(
        removed = outcome.removed,
        identities = outcome.identities,
        %cutoff,
        "retention sweep finished"
    );
    outcome
}

/// Run `collector.sweep(horizon)` every `every`. The first sweep happens
/// one full interval after start. Abort the handle to stop.
pub fn spawn_retention_task(
    collector: Arc<MetricsCollector>,
    every: StdDuration,
    horizon: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            collector.sweep(horizon);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;
    use crate::metrics::clock::ManualClock;
    use crate::metrics::test_support::{at, sample};

    #[test]
    fn sweep_removes_only_expired() {
        let registry = Registry::new(100);
        let ep = registry.get_or_create("GET /a");
        for t in 0..10 {
            ep.push(sample("GET /a", 1, 200, t));
        }
        let outcome = sweep(&registry, at(4));
        assert_eq!(outcome, SweepOutcome { removed: 4, identities: 1 });
        let left: Vec<_> = ep.snapshot().iter().map(|s| s.observed_at).collect();
        assert_eq!(left.first(), Some(&at(4)));
        assert_eq!(left.len(), 6);
    }

    #[test]
    fn sweep_is_idempotent() {
        let registry = Registry::new(100);
        let ep = registry.get_or_create("GET /a");
        for t in 0..10 {
            ep.push(sample("GET /a", t as u64, 200, t));
        }
        sweep(&registry, at(5));
        let first: Vec<u64> = ep.snapshot().iter().map(|s| s.latency_millis).collect();
        let again = sweep(&registry, at(5));
        let second: Vec<u64> = ep.snapshot().iter().map(|s| s.latency_millis).collect();
        assert_eq!(again, SweepOutcome::default());
        assert_eq!(first, second);
    }

    #[test]
    fn out_of_order_samples_are_still_swept() {
        let registry = Registry::new(100);
        let ep = registry.get_or_create("GET /a");
        ep.push(sample("GET /a", 1, 200, 50));
        ep.push(sample("GET /a", 2, 200, 1));
        ep.push(sample("GET /a", 3, 200, 60));
        sweep(&registry, at(10));
        let left: Vec<u64> = ep.snapshot().iter().map(|s| s.latency_millis).collect();
        assert_eq!(left, vec![1, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_task_sweeps_on_interval() {
        let clock = Arc::new(ManualClock::new(at(0)));
        let collector = Arc::new(MetricsCollector::with_clock(
            &MonitorConfig::default(),
            clock.clone(),
        ));
        collector.record("GET /a", 10, 200, None, None);
        clock.set(at(3 * 3600));

        let handle = spawn_retention_task(
            collector.clone(),
            StdDuration::from_secs(60),
            Duration::hours(1),
        );
        tokio::time::sleep(StdDuration::from_secs(61)).await;
        tokio::task::yield_now().await;

        assert!(collector.samples("GET /a").is_empty());
        assert_eq!(collector.counters("GET /a").call_count, 1);
        handle.abort();
    }
}
