//! Observability counters for the admission gate.
//!
//! Provides totals about gate behavior for monitoring and debugging.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters tracking admission statistics.
///
/// All counters use atomic operations for thread-safe updates and reads,
/// and can be queried at any time.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// Total number of requests admitted
    admitted: AtomicU64,
    /// Total number of requests denied
    denied: AtomicU64,
    /// Total number of checks that failed on the shared store
    store_failures: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_admitted(&self) {
        self.inner.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_denied(&self) {
        self.inner.denied.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_store_failure(&self) {
        self.inner.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Total number of requests admitted.
    pub fn admitted(&self) -> u64 {
        self.inner.admitted.load(Ordering::Relaxed)
    }

    /// Total number of requests denied.
    pub fn denied(&self) -> u64 {
        self.inner.denied.load(Ordering::Relaxed)
    }

    /// Total number of checks that failed on the shared store.
    pub fn store_failures(&self) -> u64 {
        self.inner.store_failures.load(Ordering::Relaxed)
    }

    /// Get a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            admitted: self.admitted(),
            denied: self.denied(),
            store_failures: self.store_failures(),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.inner.admitted.store(0, Ordering::Relaxed);
        self.inner.denied.store(0, Ordering::Relaxed);
        self.inner.store_failures.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of gate metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Total number of requests admitted
    pub admitted: u64,
    /// Total number of requests denied
    pub denied: u64,
    /// Total number of checks that failed on the shared store
    pub store_failures: u64,
}

impl MetricsSnapshot {
    /// Total number of decided checks (admitted + denied).
    pub fn total_decided(&self) -> u64 {
        self.admitted.saturating_add(self.denied)
    }

    /// Ratio of denied checks to decided checks (0.0 to 1.0).
    ///
    /// Returns 0.0 when nothing has been decided yet.
    pub fn denial_rate(&self) -> f64 {
        let total = self.total_decided();
        if total == 0 {
            0.0
        } else {
            self.denied as f64 / total as f64
        }
    }
}
