//! Metric sources: the sampling seam between the daemon and the host.
//!
//! `SystemCollector` is the production implementation (sysinfo plus an
//! optional vendor GPU query); tests substitute their own `MetricsSource`.

pub mod gpu;
pub mod system;

pub use gpu::{GpuCapability, probe_gpu};
pub use system::SystemCollector;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::UsageSample;

/// Why one sampling attempt produced no usable sample. All variants are
/// transient: the tick is skipped and the loop continues.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("metric query timed out")]
    Timeout,

    #[error("metric query command unavailable")]
    CommandUnavailable,

    #[error("malformed metric output: {0}")]
    ParseError(String),
}

/// Yields one instantaneous host reading per call. A returned sample is
/// complete; a failed call leaves no partial state behind.
#[async_trait]
pub trait MetricsSource: Send {
    async fn sample(&mut self) -> Result<UsageSample, SourceError>;
}
