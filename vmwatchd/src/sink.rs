use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::PeakWindow;

/// Why one flush attempt failed. Both variants are transient: the sampler
/// keeps the unflushed window and retries at the next report boundary.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink unavailable")]
    Unavailable,

    #[error("sink write failed: {0}")]
    WriteFailed(String),
}

/// Durably records one flushed peak window.
///
/// A retried record of the same unflushed window must be acceptable:
/// implementations are expected to treat a duplicate window start
/// defensively rather than produce a second row.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn record(&self, window: &PeakWindow, flushed_at: DateTime<Utc>) -> Result<(), SinkError>;
}
