use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval};

use crate::collectors::MetricsSource;
use crate::metrics::Metrics;
use crate::peak::PeakAccumulator;
use crate::sink::MetricsSink;

/// The sampling orchestrator: pulls one sample per tick from the source,
/// folds it into the peak accumulator, and flushes the accumulated window
/// to the sink once per report period.
///
/// The accumulator is reset only after the sink confirms a durable write.
/// A failed flush keeps the window and retries at the next boundary; the
/// boundary itself always advances by one report period so a struggling
/// sink never causes a retry storm.
pub struct Sampler {
    source: Box<dyn MetricsSource>,
    sink: Arc<dyn MetricsSink>,
    accumulator: PeakAccumulator,
    sample_period: Duration,
    report_period: Duration,
    metrics: Arc<Metrics>,
    folded_since_reset: u64,
}

impl Sampler {
    pub fn new(
        source: Box<dyn MetricsSource>,
        sink: Arc<dyn MetricsSink>,
        cores: usize,
        has_gpu: bool,
        sample_period: Duration,
        report_period: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        let accumulator = PeakAccumulator::new(cores, has_gpu, Utc::now(), Arc::clone(&metrics));
        Self {
            source,
            sink,
            accumulator,
            sample_period,
            report_period,
            metrics,
            folded_since_reset: 0,
        }
    }

    /// One sampling step. A source failure skips the fold, leaves the
    /// accumulator untouched, and never propagates out of the loop.
    pub async fn tick(&mut self) {
        self.metrics.incr_ticks();
        match self.source.sample().await {
            Ok(sample) => {
                self.accumulator.fold(&sample);
                self.folded_since_reset += 1;
            }
            Err(err) => {
                self.metrics.incr_sample_failures();
                warn!("[sampler] sample skipped: {err}");
            }
        }
    }

    /// Hand the accumulated window to the sink. The accumulator is reset
    /// only when the sink reports success; otherwise the window is kept
    /// for a retry at the next report boundary.
    pub async fn flush(&mut self) {
        let window = self.accumulator.snapshot();
        let now = Utc::now();
        match self.sink.record(&window, now).await {
            Ok(()) => {
                self.accumulator.reset(now);
                self.folded_since_reset = 0;
                self.metrics.incr_flushes();
                debug!("[sampler] flushed window started at {}", window.started_at);
            }
            Err(err) => {
                self.metrics.incr_flush_failures();
                warn!("[sampler] flush failed, window retained for retry: {err}");
            }
        }
    }

    /// Run until `shutdown` flips. Ticks are scheduled from a monotonic
    /// clock so a slow sample call delays the next tick instead of
    /// bunching ticks up; the report boundary is checked after every
    /// sample. A stall across several report periods flushes once and
    /// moves the deadline to now + report_period rather than replaying a
    /// flush per missed period.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "[sampler] started: sample every {:?}, report every {:?}",
            self.sample_period, self.report_period
        );

        let mut ticker = interval(self.sample_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut next_report = Instant::now() + self.report_period;

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    self.tick().await;

                    let now = Instant::now();
                    if now >= next_report {
                        self.flush().await;
                        next_report = Instant::now() + self.report_period;
                    }
                }
            }
        }

        // Partial windows survive a clean shutdown; an empty one is noise.
        if self.folded_since_reset > 0 {
            self.flush().await;
        }
        info!("[sampler] stopped");
    }
}
