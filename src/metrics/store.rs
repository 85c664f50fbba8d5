use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use super::MetricSample;

// ─── Per-identity state ──────────────────────────────────────────

/// Everything tracked for one `"METHOD path"` identity.
///
/// The sample deque is bounded and evicts oldest-first; the counters are
/// cumulative and never move backwards, whatever happens to the deque.
pub struct EndpointMetrics {
    identity: Arc<str>,
    capacity: usize,
    samples: Mutex<VecDeque<MetricSample>>,
    calls: AtomicU64,
    errors: AtomicU64,
    slow_calls: AtomicU64,
}

/// Point-in-time read of the cumulative counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSnapshot {
    pub call_count: u64,
    pub error_count: u64,
    pub slow_count: u64,
}

impl EndpointMetrics {
    fn new(identity: Arc<str>, capacity: usize) -> Self {
        Self {
            identity,
            capacity,
            samples: Mutex::new(VecDeque::with_capacity(capacity.min(1024) + 1)),
            calls: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            slow_calls: AtomicU64::new(0),
        }
    }

    pub fn identity(&self) -> &Arc<str> {
        &self.identity
    }

    /// Append one sample, evicting from the front while over capacity.
    /// Returns how many samples were evicted.
    pub fn push(&self, sample: MetricSample) -> usize {
        let mut samples = self.samples.lock();
        samples.push_back(sample);
        let mut evicted = 0;
        while samples.len() > self.capacity {
            samples.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Calls are bumped before errors and slow calls so a reader that loads
    /// those first never sees either exceed `calls`.
    pub fn count_call(&self, is_error: bool, is_slow: bool) {
        self.calls.fetch_add(1, Ordering::AcqRel);
        if is_error {
            self.errors.fetch_add(1, Ordering::AcqRel);
        }
        if is_slow {
            self.slow_calls.fetch_add(1, Ordering::AcqRel);
        }
    }

    pub fn counters(&self) -> CounterSnapshot {
        let error_count = self.errors.load(Ordering::Acquire);
        let slow_count = self.slow_calls.load(Ordering::Acquire);
        let call_count = self.calls.load(Ordering::Acquire);
        CounterSnapshot {
            call_count,
            error_count,
            slow_count,
        }
    }

    /// Copy of the retained samples in arrival order.
    pub fn snapshot(&self) -> Vec<MetricSample> {
        self.samples.lock().iter().cloned().collect()
    }

    /// Copy of at most the `n` most recent samples, oldest first.
    pub fn recent(&self, n: usize) -> Vec<MetricSample> {
        let samples = self.samples.lock();
        let skip = samples.len().saturating_sub(n);
        samples.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    /// Drop every sample observed strictly before `cutoff`.
    /// Returns the number removed.
    pub fn remove_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut samples = self.samples.lock();
        let before = samples.len();
        samples.retain(|s| s.observed_at >= cutoff);
        before - samples.len()
    }
}

// ─── Registry ────────────────────────────────────────────────────

/// Growable map of identity → per-identity state.
///
/// Lookups take the read lock; only first touch of a new identity takes the
/// write lock. Per-identity mutation never holds the registry lock.
pub struct Registry {
    capacity: usize,
    endpoints: RwLock<HashMap<String, Arc<EndpointMetrics>>>,
}

impl Registry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            endpoints: RwLock::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get_or_create(&self, identity: &str) -> Arc<EndpointMetrics> {
        if let Some(endpoint) = self.endpoints.read().get(identity) {
            return Arc::clone(endpoint);
        }

        let mut endpoints = self.endpoints.write();
        let capacity = self.capacity;
        let endpoint = endpoints
            .entry(identity.to_owned())
            .or_insert_with(|| Arc::new(EndpointMetrics::new(Arc::from(identity), capacity)));
        Arc::clone(endpoint)
    }

    pub fn get(&self, identity: &str) -> Option<Arc<EndpointMetrics>> {
        self.endpoints.read().get(identity).cloned()
    }

    /// Every known identity's state, sorted by identity.
    pub fn all(&self) -> Vec<Arc<EndpointMetrics>> {
        let mut all: Vec<_> = self.endpoints.read().values().cloned().collect();
        all.sort_by(|a, b| a.identity.cmp(&b.identity));
        all
    }

    pub fn len(&self) -> usize {
        self.endpoints.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.read().is_empty()
    }
}
