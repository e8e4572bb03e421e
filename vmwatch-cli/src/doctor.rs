use colored::*;
use reqwest::Client;
use serde::Deserialize;
use std::error::Error;

#[derive(Deserialize, Debug)]
struct HealthResponse {
    #[allow(dead_code)]
    status: String,
}

#[derive(Deserialize, Debug)]
struct StatusResponse {
    uptime_s: u64,
    gpu: String,
    ticks_total: u64,
    sample_failures: u64,
    flushes_total: u64,
    flush_failures: u64,
    shape_mismatches: u64,
    windows_stored: u64,
}

pub async fn run_status(client: &Client, url: &str) -> Result<(), Box<dyn Error>> {
    let status: StatusResponse = client
        .get(format!("{url}/status"))
        .send()
        .await?
        .json()
        .await?;

    println!("{}", "vmwatchd status".bold());
    println!("  uptime:           {}s", status.uptime_s);
    println!("  gpu:              {}", status.gpu);
    println!("  ticks:            {}", status.ticks_total);
    println!("  sample failures:  {}", status.sample_failures);
    println!("  flushes:          {}", status.flushes_total);
    println!("  flush failures:   {}", status.flush_failures);
    println!("  shape mismatches: {}", status.shape_mismatches);
    println!("  windows stored:   {}", status.windows_stored);
    Ok(())
}

pub async fn run_doctor(url: &str) -> Result<(), Box<dyn Error>> {
    println!("{}", "VMWatch Doctor".bold().cyan());
    println!("{}", "Checking daemon health...".dimmed());
    println!();

    let client = Client::new();

    // 1. Connectivity & liveness
    print!("• Daemon Connectivity: ");
    match client.get(format!("{url}/healthz")).send().await {
        Ok(resp) => {
            if resp.status().is_success() {
                if resp.json::<HealthResponse>().await.is_ok() {
                    println!("{}", "OK".green());
                } else {
                    println!("{}", "OK (Invalid JSON)".yellow());
                }
            } else {
                println!("{}", format!("FAIL (Status {})", resp.status()).red());
                return Ok(());
            }
        }
        Err(e) => {
            println!("{}", format!("FAIL ({e})").red());
            println!("  → Is vmwatchd running? Try 'systemctl status vmwatchd'");
            return Ok(());
        }
    }

    // 2. Status counters
    print!("• Daemon Status:       ");
    let status: StatusResponse = match client.get(format!("{url}/status")).send().await {
        Ok(resp) => match resp.json().await {
            Ok(status) => status,
            Err(e) => {
                println!("{}", format!("FAIL ({e})").red());
                return Ok(());
            }
        },
        Err(e) => {
            println!("{}", format!("FAIL ({e})").red());
            return Ok(());
        }
    };
    println!("{}", "OK".green());

    // 3. Sampling cadence
    print!("• Sampling:            ");
    if status.ticks_total == 0 {
        println!("{}", "WARN (no ticks yet)".yellow());
    } else if status.sample_failures > status.ticks_total / 2 {
        println!(
            "{}",
            format!(
                "WARN ({}/{} samples failed)",
                status.sample_failures, status.ticks_total
            )
            .yellow()
        );
    } else {
        println!("{}", format!("OK ({} ticks)", status.ticks_total).green());
    }

    // 4. Flush health
    print!("• Window Flushes:      ");
    if status.flush_failures > 0 {
        println!(
            "{}",
            format!("WARN ({} failed flushes)", status.flush_failures).yellow()
        );
    } else {
        println!("{}", format!("OK ({} flushed)", status.flushes_total).green());
    }

    println!();
    println!(
        "{}",
        format!(
            "gpu={} uptime={}s stored_windows={} shape_mismatches={}",
            status.gpu, status.uptime_s, status.windows_stored, status.shape_mismatches
        )
        .dimmed()
    );
    Ok(())
}
