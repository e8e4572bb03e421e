use clap::{Parser, Subcommand};
use reqwest::Client;
use std::error::Error;

mod doctor;
mod usage;

#[derive(clap::Parser, Debug)]
struct Args {
    /// Base URL of the vmwatchd service
    #[clap(long, default_value = "http://127.0.0.1:8000")]
    url: String,

    /// Disable colorized output
    #[clap(long)]
    no_color: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Query peak-usage windows in a date range
    Usage {
        /// Start date (YYYY-MM-DD)
        #[clap(long)]
        start: String,
        /// End date (YYYY-MM-DD)
        #[clap(long)]
        end: String,
    },
    /// Delete windows older than the given age
    Purge {
        /// Age threshold in days
        #[clap(long)]
        days: u32,
    },
    /// Show daemon status counters
    Status,
    /// Check daemon health and connectivity
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    if args.no_color {
        colored::control::set_override(false);
    }
    let client = Client::new();

    match args.command {
        Command::Usage { start, end } => usage::run_usage(&client, &args.url, &start, &end).await,
        Command::Purge { days } => usage::run_purge(&client, &args.url, days).await,
        Command::Status => doctor::run_status(&client, &args.url).await,
        Command::Doctor => doctor::run_doctor(&args.url).await,
    }
}
