use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    cells_succeeded: AtomicU64,
    cells_failed: AtomicU64,
    cells_skipped: AtomicU64,
    retry_count: AtomicU64,
    checkpoints: AtomicU64,
    persist_failures: AtomicU64,
}

/// Counters shared between the coordinator and its workers.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub cells_succeeded: u64,
    pub cells_failed: u64,
    pub cells_skipped: u64,
    pub retry_count: u64,
    pub checkpoints: u64,
    pub persist_failures: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn increment_succeeded(&self, count: u64) {
        self.inner
            .cells_succeeded
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_failed(&self, count: u64) {
        self.inner.cells_failed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_skipped(&self, count: u64) {
        self.inner.cells_skipped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_retries(&self, count: u64) {
        self.inner.retry_count.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_checkpoints(&self, count: u64) {
        self.inner.checkpoints.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_persist_failures(&self, count: u64) {
        self.inner
            .persist_failures
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cells_succeeded: self.inner.cells_succeeded.load(Ordering::Relaxed),
            cells_failed: self.inner.cells_failed.load(Ordering::Relaxed),
            cells_skipped: self.inner.cells_skipped.load(Ordering::Relaxed),
            retry_count: self.inner.retry_count.load(Ordering::Relaxed),
            checkpoints: self.inner.checkpoints.load(Ordering::Relaxed),
            persist_failures: self.inner.persist_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
