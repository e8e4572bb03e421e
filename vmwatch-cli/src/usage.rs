use chrono::DateTime;
use colored::*;
use reqwest::Client;
use serde::Deserialize;
use std::error::Error;

#[derive(Deserialize, Debug)]
struct UsageResponse {
    #[allow(dead_code)]
    status: String,
    count: usize,
    data: Vec<WindowRow>,
}

#[derive(Deserialize, Debug)]
struct WindowRow {
    #[allow(dead_code)]
    id: i64,
    window_start: i64,
    flushed_at: i64,
    cpu_percent: Vec<f32>,
    mem_used_mb: u64,
    mem_total_mb: u64,
    disk_used_mb: u64,
    disk_total_mb: u64,
    gpu: Option<GpuRow>,
}

#[derive(Deserialize, Debug)]
struct GpuRow {
    proc_percent: f32,
    mem_used_mb: u64,
    mem_total_mb: u64,
}

#[derive(Deserialize, Debug)]
struct PurgeResponse {
    #[allow(dead_code)]
    status: String,
    deleted_count: u64,
}

pub async fn run_usage(
    client: &Client,
    url: &str,
    start: &str,
    end: &str,
) -> Result<(), Box<dyn Error>> {
    let resp = client
        .get(format!("{url}/usage"))
        .query(&[("start", start), ("end", end)])
        .send()
        .await?;

    if !resp.status().is_success() {
        let body: serde_json::Value = resp.json().await?;
        eprintln!(
            "{} {}",
            "Query failed:".red(),
            body["error"].as_str().unwrap_or("unknown error")
        );
        return Ok(());
    }

    let usage: UsageResponse = resp.json().await?;
    println!(
        "{}",
        format!("{} peak window(s) from {start} to {end}", usage.count).bold()
    );
    for row in &usage.data {
        print_window(row);
    }
    Ok(())
}

fn print_window(row: &WindowRow) {
    let flushed = format_epoch(row.flushed_at);
    let started = format_epoch(row.window_start);
    let cpu = peak_cpu_summary(&row.cpu_percent);

    println!();
    println!("{} {} {} {}", "window".dimmed(), started, "→".dimmed(), flushed);
    println!("  cpu:  {cpu}");
    println!("  mem:  {}/{} MB", row.mem_used_mb, row.mem_total_mb);
    println!("  disk: {}/{} MB", row.disk_used_mb, row.disk_total_mb);
    if let Some(gpu) = &row.gpu {
        println!(
            "  gpu:  {:.1}%, {}/{} MB",
            gpu.proc_percent, gpu.mem_used_mb, gpu.mem_total_mb
        );
    }
}

/// Single core prints plainly; multi-core prints the average with the
/// per-core vector after it, the way the daemon logs peaks.
fn peak_cpu_summary(cpu: &[f32]) -> String {
    match cpu {
        [] => "n/a".to_string(),
        [only] => format!("{only:.1}%"),
        cores => {
            let avg = cores.iter().sum::<f32>() / cores.len() as f32;
            let per_core = cores
                .iter()
                .map(|c| format!("{c:.1}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{avg:.1}% ({per_core})")
        }
    }
}

fn format_epoch(epoch: i64) -> String {
    DateTime::from_timestamp(epoch, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| format!("@{epoch}"))
}

pub async fn run_purge(client: &Client, url: &str, days: u32) -> Result<(), Box<dyn Error>> {
    let resp = client
        .post(format!("{url}/purge"))
        .query(&[("days", days.to_string())])
        .send()
        .await?;

    if !resp.status().is_success() {
        let body: serde_json::Value = resp.json().await?;
        eprintln!(
            "{} {}",
            "Purge failed:".red(),
            body["error"].as_str().unwrap_or("unknown error")
        );
        return Ok(());
    }

    let purged: PurgeResponse = resp.json().await?;
    println!(
        "Deleted {} window(s) older than {days} day(s).",
        purged.deleted_count
    );
    Ok(())
}
