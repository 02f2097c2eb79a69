//! Verification metrics: verdict counts and timing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

/// Kind of call outcome being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Every verifier accepted the image
    Accepted,
    /// A verifier rejected the image
    Rejected,
    /// A verifier could not be run to a verdict
    Failed,
    /// The caller cancelled the call
    Cancelled,
}

/// Verification metrics collector.
///
/// Cheap to clone; clones share the same counters.
#[derive(Clone, Debug)]
pub struct VerifierMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Call counts by kind
    counts: [AtomicU64; 4],
    /// Total verification time (nanoseconds)
    total_time_ns: AtomicU64,
}

impl VerifierMetrics {
    /// Creates a new metrics collector.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                counts: [
                    AtomicU64::new(0), // Accepted
                    AtomicU64::new(0), // Rejected
                    AtomicU64::new(0), // Failed
                    AtomicU64::new(0), // Cancelled
                ],
                total_time_ns: AtomicU64::new(0),
            }),
        }
    }

    /// Records a call outcome.
    pub fn record(&self, kind: MetricKind) {
        self.inner.counts[kind as usize].fetch_add(1, Ordering::Relaxed);
    }

    /// Records a timed call.
    pub fn record_timing(&self, kind: MetricKind, duration: Duration) {
        self.record(kind);
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.inner.total_time_ns.fetch_add(nanos, Ordering::Relaxed);
    }

    /// Gets the count for a specific outcome.
    pub fn count(&self, kind: MetricKind) -> u64 {
        self.inner.counts[kind as usize].load(Ordering::Relaxed)
    }

    /// Gets the number of recorded calls.
    pub fn calls(&self) -> u64 {
        self.inner
            .counts
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .sum()
    }

    /// Gets the total verification time.
    pub fn total_time(&self) -> Duration {
        Duration::from_nanos(self.inner.total_time_ns.load(Ordering::Relaxed))
    }

    /// Gets the share of verdicts that accepted (0.0 to 1.0).
    ///
    /// Only calls that reached a verdict count.
    pub fn acceptance_rate(&self) -> f64 {
        let accepted = self.count(MetricKind::Accepted);
        let rejected = self.count(MetricKind::Rejected);
        let total = accepted + rejected;

        if total == 0 {
            return 0.0;
        }

        accepted as f64 / total as f64
    }

    /// Gets all metrics as a summary.
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            accepted: self.count(MetricKind::Accepted),
            rejected: self.count(MetricKind::Rejected),
            failed: self.count(MetricKind::Failed),
            cancelled: self.count(MetricKind::Cancelled),
            total_time: self.total_time(),
            acceptance_rate: self.acceptance_rate(),
        }
    }

    /// Resets all metrics to zero.
    pub fn reset(&self) {
        for count in &self.inner.counts {
            count.store(0, Ordering::Relaxed);
        }
        self.inner.total_time_ns.store(0, Ordering::Relaxed);
    }
}

impl Default for VerifierMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of verification metrics.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    /// Calls where every verifier accepted
    pub accepted: u64,
    /// Calls ended by a rejection
    pub rejected: u64,
    /// Calls ended by an infrastructure failure
    pub failed: u64,
    /// Calls cancelled by the caller
    pub cancelled: u64,
    /// Total time spent verifying
    pub total_time: Duration,
    /// Acceptance rate (0.0 to 1.0)
    pub acceptance_rate: f64,
}
