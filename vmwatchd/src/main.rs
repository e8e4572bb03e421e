use anyhow::Context;
use clap::Parser;
use log::info;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

use vmwatchd::collectors::{self, SystemCollector};
use vmwatchd::config::Config;
use vmwatchd::metrics::Metrics;
use vmwatchd::sampler::Sampler;
use vmwatchd::server::{self, AppState};
use vmwatchd::sink::MetricsSink;
use vmwatchd::store::MetricsStore;

#[derive(clap::Parser, Debug)]
struct Args {
    /// Path to the TOML config file
    #[clap(long)]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    // Bad config refuses to start; nothing past this point is fatal.
    let config = Config::load(&args.config)?;

    let metrics = Arc::new(Metrics::new());
    let store = Arc::new(
        MetricsStore::new(&config.storage.db_path)
            .await
            .with_context(|| format!("opening metrics store at {}", config.storage.db_path))?,
    );

    // GPU classification is fixed for the process lifetime.
    let gpu = collectors::probe_gpu().await;
    let collector = SystemCollector::new(gpu, config.gpu_query_timeout());
    let cores = collector.core_count();
    info!("[main] sampling {cores} cores, gpu={gpu:?}");

    let sampler = Sampler::new(
        Box::new(collector),
        Arc::clone(&store) as Arc<dyn MetricsSink>,
        cores,
        gpu.is_present(),
        config.sample_period(),
        config.report_period(),
        Arc::clone(&metrics),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sampler_task = tokio::spawn(sampler.run(shutdown_rx));

    let state = AppState {
        store,
        metrics,
        gpu,
    };
    let listener = TcpListener::bind(&config.api.listen)
        .await
        .with_context(|| format!("binding API listener on {}", config.api.listen))?;
    info!("[api] listening on {}", config.api.listen);

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP API")?;

    // Let the sampler finish its tick and flush any partial window.
    let _ = shutdown_tx.send(true);
    let _ = sampler_task.await;
    info!("[main] shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("[main] shutdown signal received");
}
