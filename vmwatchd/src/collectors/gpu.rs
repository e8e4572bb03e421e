use log::{debug, info};
use serde::Serialize;
use std::time::Duration;
use tokio::process::Command;

use super::SourceError;
use crate::types::GpuSample;

const NVIDIA_SMI: &str = "nvidia-smi";
const ROCM_SMI: &str = "rocm-smi";

const NVIDIA_QUERY_ARGS: &[&str] = &[
    "--query-gpu=utilization.gpu,memory.used,memory.total",
    "--format=csv,noheader,nounits",
];

const ROCM_QUERY_ARGS: &[&str] = &["--showuse", "--showmeminfo", "vram", "--csv"];

/// Which vendor tool answers GPU queries. Detected once at daemon startup
/// and never re-probed; hot-plugged GPUs are invisible until restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GpuCapability {
    None,
    Nvidia,
    Amd,
}

impl GpuCapability {
    pub fn is_present(self) -> bool {
        self != GpuCapability::None
    }
}

/// Probe vendor tools in precedence order: NVIDIA, then AMD, then none.
pub async fn probe_gpu() -> GpuCapability {
    if command_succeeds(NVIDIA_SMI).await {
        info!("[gpu] detected NVIDIA GPU via {NVIDIA_SMI}");
        return GpuCapability::Nvidia;
    }
    if command_succeeds(ROCM_SMI).await {
        info!("[gpu] detected AMD GPU via {ROCM_SMI}");
        return GpuCapability::Amd;
    }
    info!("[gpu] no GPU detected, sampling CPU/memory/disk only");
    GpuCapability::None
}

async fn command_succeeds(program: &str) -> bool {
    match Command::new(program).output().await {
        Ok(output) => output.status.success(),
        Err(err) => {
            debug!("[gpu] probe of {program} failed: {err}");
            false
        }
    }
}

/// Run one vendor query under a bounded timeout and parse its output.
/// Must not be called with `GpuCapability::None`.
pub async fn query_gpu(
    capability: GpuCapability,
    timeout: Duration,
) -> Result<GpuSample, SourceError> {
    let (program, args) = match capability {
        GpuCapability::Nvidia => (NVIDIA_SMI, NVIDIA_QUERY_ARGS),
        GpuCapability::Amd => (ROCM_SMI, ROCM_QUERY_ARGS),
        GpuCapability::None => {
            return Err(SourceError::ParseError(
                "GPU query issued without a GPU capability".to_string(),
            ));
        }
    };

    let output = tokio::time::timeout(timeout, Command::new(program).args(args).output())
        .await
        .map_err(|_| SourceError::Timeout)?
        .map_err(|_| SourceError::CommandUnavailable)?;

    if !output.status.success() {
        return Err(SourceError::CommandUnavailable);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    match capability {
        GpuCapability::Nvidia => parse_nvidia_csv(&stdout),
        GpuCapability::Amd => parse_rocm_csv(&stdout),
        GpuCapability::None => unreachable!(),
    }
}

/// Parse `nvidia-smi --query-gpu=utilization.gpu,memory.used,memory.total
/// --format=csv,noheader,nounits`: one line per GPU of the form
/// `42, 1024, 8192` (percent, MiB, MiB). Only the first GPU is read.
fn parse_nvidia_csv(stdout: &str) -> Result<GpuSample, SourceError> {
    let line = stdout
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| SourceError::ParseError("empty nvidia-smi output".to_string()))?;

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 3 {
        return Err(SourceError::ParseError(format!(
            "expected 3 nvidia-smi fields, got {}: {line:?}",
            fields.len()
        )));
    }

    let proc_percent: f32 = fields[0]
        .parse()
        .map_err(|_| SourceError::ParseError(format!("bad utilization field: {:?}", fields[0])))?;
    let mem_used_mb: u64 = fields[1]
        .parse()
        .map_err(|_| SourceError::ParseError(format!("bad memory.used field: {:?}", fields[1])))?;
    let mem_total_mb: u64 = fields[2]
        .parse()
        .map_err(|_| SourceError::ParseError(format!("bad memory.total field: {:?}", fields[2])))?;

    Ok(GpuSample {
        proc_percent,
        mem_used_mb,
        mem_total_mb,
    })
}

const ROCM_USE_COLUMN: &str = "GPU use (%)";
const ROCM_VRAM_TOTAL_COLUMN: &str = "VRAM Total Memory (B)";
const ROCM_VRAM_USED_COLUMN: &str = "VRAM Total Used Memory (B)";

/// Parse `rocm-smi --showuse --showmeminfo vram --csv`: a header row naming
/// the columns followed by one row per device. VRAM figures come back in
/// bytes and are normalized to MB here.
fn parse_rocm_csv(stdout: &str) -> Result<GpuSample, SourceError> {
    let mut lines = stdout.lines().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| SourceError::ParseError("empty rocm-smi output".to_string()))?;
    let row = lines
        .next()
        .ok_or_else(|| SourceError::ParseError("rocm-smi output has no device row".to_string()))?;

    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    let values: Vec<&str> = row.split(',').map(str::trim).collect();

    let field = |name: &str| -> Result<&str, SourceError> {
        let idx = columns
            .iter()
            .position(|c| *c == name)
            .ok_or_else(|| SourceError::ParseError(format!("missing rocm-smi column {name:?}")))?;
        values
            .get(idx)
            .copied()
            .ok_or_else(|| SourceError::ParseError(format!("short rocm-smi row: {row:?}")))
    };

    let proc_percent: f32 = field(ROCM_USE_COLUMN)?
        .parse()
        .map_err(|_| SourceError::ParseError(format!("bad {ROCM_USE_COLUMN:?} value")))?;
    let vram_total: u64 = field(ROCM_VRAM_TOTAL_COLUMN)?
        .parse()
        .map_err(|_| SourceError::ParseError(format!("bad {ROCM_VRAM_TOTAL_COLUMN:?} value")))?;
    let vram_used: u64 = field(ROCM_VRAM_USED_COLUMN)?
        .parse()
        .map_err(|_| SourceError::ParseError(format!("bad {ROCM_VRAM_USED_COLUMN:?} value")))?;

    Ok(GpuSample {
        proc_percent,
        mem_used_mb: vram_used / (1024 * 1024),
        mem_total_mb: vram_total / (1024 * 1024),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nvidia_triple() {
        let sample = parse_nvidia_csv("42, 1024, 8192\n").unwrap();
        assert_eq!(sample.proc_percent, 42.0);
        assert_eq!(sample.mem_used_mb, 1024);
        assert_eq!(sample.mem_total_mb, 8192);
    }

    #[test]
    fn nvidia_first_gpu_wins_on_multi_gpu_hosts() {
        let sample = parse_nvidia_csv("10, 512, 8192\n95, 7000, 8192\n").unwrap();
        assert_eq!(sample.proc_percent, 10.0);
    }

    #[test]
    fn rejects_nvidia_output_with_wrong_arity() {
        let err = parse_nvidia_csv("42, 1024\n").unwrap_err();
        assert!(matches!(err, SourceError::ParseError(_)));
    }

    #[test]
    fn rejects_nvidia_output_with_garbage_field() {
        let err = parse_nvidia_csv("42, [N/A], 8192\n").unwrap_err();
        assert!(matches!(err, SourceError::ParseError(_)));
    }

    #[test]
    fn rejects_empty_nvidia_output() {
        assert!(matches!(
            parse_nvidia_csv("\n"),
            Err(SourceError::ParseError(_))
        ));
    }

    #[test]
    fn parses_rocm_csv_and_normalizes_bytes() {
        let out = "device,GPU use (%),VRAM Total Memory (B),VRAM Total Used Memory (B)\n\
                   card0,37,17163091968,4294967296\n";
        let sample = parse_rocm_csv(out).unwrap();
        assert_eq!(sample.proc_percent, 37.0);
        assert_eq!(sample.mem_used_mb, 4096);
        assert_eq!(sample.mem_total_mb, 16368);
    }

    #[test]
    fn rejects_rocm_output_missing_column() {
        let out = "device,GPU use (%)\ncard0,37\n";
        let err = parse_rocm_csv(out).unwrap_err();
        assert!(matches!(err, SourceError::ParseError(_)));
    }

    #[test]
    fn rejects_rocm_output_without_device_row() {
        let out = "device,GPU use (%),VRAM Total Memory (B),VRAM Total Used Memory (B)\n";
        assert!(parse_rocm_csv(out).is_err());
    }
}
