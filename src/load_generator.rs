use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::metrics::MetricsCollector;

/// Device-management routes the simulator pretends to serve, with the
/// typical latency (ms) of each.
const ROUTES: &[(&str, &str, u64)] = &[
    ("GET", "/api/devices", 80),
    ("GET", "/api/devices/:id", 35),
    ("POST", "/api/devices", 140),
    ("PUT", "/api/devices/:id", 120),
    ("DELETE", "/api/devices/:id", 60),
    ("GET", "/api/devices/stats", 260),
    ("GET", "/api/devices/:id/logs", 420),
];

const AGENTS: &[&str] = &["device-console/2.3", "curl/8.4.0", "Mozilla/5.0"];

#[derive(Debug, Clone, Copy)]
pub struct TrafficProfile {
    pub concurrency: u32,
    pub duration_secs: u64,
    pub error_pct: u8,
    pub slow_pct: u8,
}

// ─── Public entry point ──────────────────────────────────────────

/// Spawns `concurrency` Tokio tasks that feed synthetic calls into the
/// collector until the deadline or the `running` flag is set to false.
pub async fn run(
    running: Arc<AtomicBool>,
    metrics: Arc<MetricsCollector>,
    profile: TrafficProfile,
) {
    let deadline = Instant::now() + Duration::from_secs(profile.duration_secs);

    let mut handles = Vec::with_capacity(profile.concurrency as usize);

    for worker_id in 0..profile.concurrency {
        let running = running.clone();
        let metrics = metrics.clone();

        handles.push(tokio::spawn(async move {
            worker(worker_id, running, metrics, deadline, profile).await;
        }));
    }

    // Wait for all workers to finish
    for h in handles {
        let _ = h.await;
    }

    // Mark simulation as finished
    running.store(false, Ordering::SeqCst);
    tracing::info!("simulation finished");
}

// ─── Worker loop ─────────────────────────────────────────────────

async fn worker(
    id: u32,
    running: Arc<AtomicBool>,
    metrics: Arc<MetricsCollector>,
    deadline: Instant,
    profile: TrafficProfile,
) {
    // Each worker gets its own deterministic RNG seeded uniquely.
    let mut rng = StdRng::seed_from_u64(1000 + id as u64);
    let caller_ip = format!("10.0.{}.{}", id / 250, id % 250 + 1);

    while running.load(Ordering::Relaxed) && Instant::now() < deadline {
        let call = synthesize(&mut rng, profile);
        metrics.record_call(
            call.method,
            call.path,
            call.latency_millis,
            call.status_code,
            Some(caller_ip.clone()),
            Some(call.agent.to_owned()),
        );

        // Pace the worker so the simulated traffic has a plausible rate
        let pause = rng.gen_range(5..50);
        tokio::time::sleep(Duration::from_millis(pause)).await;
    }
}

// ─── Call synthesis ──────────────────────────────────────────────

struct SyntheticCall {
    method: &'static str,
    path: &'static str,
    latency_millis: u64,
    status_code: u16,
    agent: &'static str,
}

fn synthesize(rng: &mut StdRng, profile: TrafficProfile) -> SyntheticCall {
    let (method, path, base) = ROUTES[rng.gen_range(0..ROUTES.len())];

    // ±50% jitter, and an occasional slow path an order of magnitude out
    let mut latency_millis = base / 2 + rng.gen_range(0..=base);
    if rng.gen_range(0u8..100) < profile.slow_pct {
        latency_millis = latency_millis * 10 + rng.gen_range(0..1_000);
    }

    let status_code = if rng.gen_range(0u8..100) < profile.error_pct {
        if rng.gen_bool(0.5) {
            500
        } else {
            404
        }
    } else if method == "POST" {
        201
    } else {
        200
    };

    SyntheticCall {
        method,
        path,
        latency_millis,
        status_code,
        agent: AGENTS[rng.gen_range(0..AGENTS.len())],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_calls_respect_profile_extremes() {
        let mut rng = StdRng::seed_from_u64(7);
        let clean = TrafficProfile {
            concurrency: 1,
            duration_secs: 1,
            error_pct: 0,
            slow_pct: 0,
        };
        for _ in 0..200 {
            let call = synthesize(&mut rng, clean);
            assert!(call.status_code < 400);
            assert!(call.latency_millis <= 420 * 2);
        }

        let broken = TrafficProfile {
            error_pct: 100,
            ..clean
        };
        for _ in 0..200 {
            assert!(synthesize(&mut rng, broken).status_code >= 400);
        }
    }
}
