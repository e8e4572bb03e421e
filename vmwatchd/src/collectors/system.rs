use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use std::time::Duration;
use sysinfo::{Disks, System};

use super::gpu::{self, GpuCapability};
use super::{MetricsSource, SourceError};
use crate::types::UsageSample;

const MB: u64 = 1024 * 1024;

/// Production metric source: sysinfo for CPU/memory/disk plus one vendor
/// GPU query per sample when a GPU capability was detected.
pub struct SystemCollector {
    system: System,
    gpu: GpuCapability,
    gpu_query_timeout: Duration,
}

impl SystemCollector {
    pub fn new(gpu: GpuCapability, gpu_query_timeout: Duration) -> Self {
        Self {
            system: System::new_all(),
            gpu,
            gpu_query_timeout,
        }
    }

    /// Logical core count as seen at construction. The peak window's CPU
    /// vector is sized from this once, at startup.
    pub fn core_count(&self) -> usize {
        self.system.cpus().len()
    }

    fn root_disk_mb() -> (u64, u64) {
        let disks = Disks::new_with_refreshed_list();
        disks
            .iter()
            .find(|d| d.mount_point() == Path::new("/"))
            .map(|d| {
                (
                    (d.total_space() - d.available_space()) / MB,
                    d.total_space() / MB,
                )
            })
            .unwrap_or((0, 0))
    }
}

#[async_trait]
impl MetricsSource for SystemCollector {
    async fn sample(&mut self) -> Result<UsageSample, SourceError> {
        // Query the GPU first: if the vendor tool fails, the tick is
        // rejected whole and no partial sample escapes.
        let gpu_sample = match self.gpu {
            GpuCapability::None => None,
            capability => Some(gpu::query_gpu(capability, self.gpu_query_timeout).await?),
        };

        self.system.refresh_all();

        let cpu_percent: Vec<f32> = self.system.cpus().iter().map(|c| c.cpu_usage()).collect();
        let (disk_used_mb, disk_total_mb) = Self::root_disk_mb();

        Ok(UsageSample {
            taken_at: Utc::now(),
            cpu_percent,
            mem_used_mb: self.system.used_memory() / MB,
            mem_total_mb: self.system.total_memory() / MB,
            disk_used_mb,
            disk_total_mb,
            gpu: gpu_sample,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gpu_free_collector_produces_complete_samples() {
        let mut collector = SystemCollector::new(GpuCapability::None, Duration::from_secs(3));
        let sample = collector.sample().await.unwrap();

        assert_eq!(sample.cpu_percent.len(), collector.core_count());
        assert!(sample.mem_used_mb <= sample.mem_total_mb);
        assert!(sample.mem_total_mb > 0);
        assert!(sample.gpu.is_none());
    }
}
