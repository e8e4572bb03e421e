use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Shared daemon counters, handed to the sampler and the API at
/// construction. All counters are monotonic; readers get a point-in-time
/// view via the getters.
#[derive(Debug, Default)]
pub struct Metrics {
    ticks_total: AtomicU64,
    sample_failures: AtomicU64,
    flushes_total: AtomicU64,
    flush_failures: AtomicU64,
    shape_mismatches: AtomicU64,
    started_at_epoch: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        let metrics = Self::default();
        metrics
            .started_at_epoch
            .store(current_epoch_secs(), Ordering::Relaxed);
        metrics
    }

    pub fn incr_ticks(&self) {
        self.ticks_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_sample_failures(&self) {
        self.sample_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_flushes(&self) {
        self.flushes_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_flush_failures(&self) {
        self.flush_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_shape_mismatches(&self) {
        self.shape_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ticks_total(&self) -> u64 {
        self.ticks_total.load(Ordering::Relaxed)
    }

    pub fn sample_failures(&self) -> u64 {
        self.sample_failures.load(Ordering::Relaxed)
    }

    pub fn flushes_total(&self) -> u64 {
        self.flushes_total.load(Ordering::Relaxed)
    }

    pub fn flush_failures(&self) -> u64 {
        self.flush_failures.load(Ordering::Relaxed)
    }

    pub fn shape_mismatches(&self) -> u64 {
        self.shape_mismatches.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> u64 {
        current_epoch_secs().saturating_sub(self.started_at_epoch.load(Ordering::Relaxed))
    }
}

fn current_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
