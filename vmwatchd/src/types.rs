use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One GPU reading: utilization plus the memory pair reported by the
/// vendor tool, already normalized to MB.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpuSample {
    pub proc_percent: f32,
    pub mem_used_mb: u64,
    pub mem_total_mb: u64,
}

/// One instantaneous host reading. `cpu_percent` carries one entry per
/// logical core; `gpu` is present iff a GPU capability was detected at
/// daemon startup and stays that way for the process lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSample {
    pub taken_at: DateTime<Utc>,
    pub cpu_percent: Vec<f32>,
    pub mem_used_mb: u64,
    pub mem_total_mb: u64,
    pub disk_used_mb: u64,
    pub disk_total_mb: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu: Option<GpuSample>,
}

/// Accumulated maxima since the last flush. Used/percent fields hold the
/// peak observed value; `*_total_mb` fields hold the most recent observed
/// capacity (a mounted volume can change size mid-window).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakWindow {
    pub started_at: DateTime<Utc>,
    pub cpu_percent: Vec<f32>,
    pub mem_used_mb: u64,
    pub mem_total_mb: u64,
    pub disk_used_mb: u64,
    pub disk_total_mb: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu: Option<GpuSample>,
}

impl PeakWindow {
    /// Identity window: all maxima zero, totals unknown until the first fold.
    pub fn empty(cores: usize, has_gpu: bool, started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            cpu_percent: vec![0.0; cores],
            mem_used_mb: 0,
            mem_total_mb: 0,
            disk_used_mb: 0,
            disk_total_mb: 0,
            gpu: has_gpu.then_some(GpuSample {
                proc_percent: 0.0,
                mem_used_mb: 0,
                mem_total_mb: 0,
            }),
        }
    }
}
