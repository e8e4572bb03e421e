use chrono::{DateTime, Utc};
use log::warn;
use std::sync::Arc;

use crate::metrics::Metrics;
use crate::types::{PeakWindow, UsageSample};

/// Running element-wise maximum over a sequence of samples.
///
/// The accumulator owns its window exclusively; the sampler is the only
/// writer, and [`PeakAccumulator::snapshot`] hands out owned copies so the
/// sink never observes a window mid-mutation. Core count and GPU presence
/// are fixed at construction for the process lifetime.
pub struct PeakAccumulator {
    window: PeakWindow,
    metrics: Arc<Metrics>,
}

impl PeakAccumulator {
    pub fn new(cores: usize, has_gpu: bool, started_at: DateTime<Utc>, metrics: Arc<Metrics>) -> Self {
        Self {
            window: PeakWindow::empty(cores, has_gpu, started_at),
            metrics,
        }
    }

    /// Merge one sample: used/percent fields take the max, capacity fields
    /// take the latest value. A sample whose core count disagrees with the
    /// window is folded over the overlapping prefix only; the mismatch is
    /// logged and counted, never fatal.
    pub fn fold(&mut self, sample: &UsageSample) {
        if sample.cpu_percent.len() != self.window.cpu_percent.len() {
            warn!(
                "[peak] core count mismatch: window has {}, sample has {}",
                self.window.cpu_percent.len(),
                sample.cpu_percent.len()
            );
            self.metrics.incr_shape_mismatches();
        }
        for (peak, current) in self
            .window
            .cpu_percent
            .iter_mut()
            .zip(sample.cpu_percent.iter())
        {
            *peak = peak.max(*current);
        }

        self.window.mem_used_mb = self.window.mem_used_mb.max(sample.mem_used_mb);
        self.window.disk_used_mb = self.window.disk_used_mb.max(sample.disk_used_mb);
        self.window.mem_total_mb = sample.mem_total_mb;
        self.window.disk_total_mb = sample.disk_total_mb;

        if let (Some(peak_gpu), Some(sample_gpu)) = (self.window.gpu.as_mut(), sample.gpu.as_ref()) {
            peak_gpu.proc_percent = peak_gpu.proc_percent.max(sample_gpu.proc_percent);
            peak_gpu.mem_used_mb = peak_gpu.mem_used_mb.max(sample_gpu.mem_used_mb);
            peak_gpu.mem_total_mb = sample_gpu.mem_total_mb;
        }
    }

    /// Zero all maxima and start a new window. Last-known totals survive
    /// the reset so a window queried right after a flush still reports a
    /// sane capacity.
    pub fn reset(&mut self, started_at: DateTime<Utc>) {
        self.window.started_at = started_at;
        self.window.cpu_percent.fill(0.0);
        self.window.mem_used_mb = 0;
        self.window.disk_used_mb = 0;
        if let Some(gpu) = self.window.gpu.as_mut() {
            gpu.proc_percent = 0.0;
            gpu.mem_used_mb = 0;
        }
    }

    /// Owned copy for handoff to the sink.
    pub fn snapshot(&self) -> PeakWindow {
        self.window.clone()
    }
}
