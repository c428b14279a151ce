//! Wager Settlement Service — Entry Point
//!
//! Initializes configuration, logging, storage and the score feed, then
//! runs the settlement scheduler until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Read the score feed API key from the configured env var
//! 4. Open the wager store (snapshot + settlement log)
//! 5. Create HttpScoreProvider and RequestBudget
//! 6. Spawn metrics server and health server (/live + /ready)
//! 7. Spawn SettlementScheduler loop
//! 8. Wait for SIGINT → graceful shutdown (finish run → exit)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use wager_settlement::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use wager_settlement::adapters::persistence::WagerStore;
use wager_settlement::adapters::scores::{HttpScoreProvider, ScoreClientConfig};
use wager_settlement::config;
use wager_settlement::ports::WagerRepository;
use wager_settlement::usecases::{RequestBudget, SettlementScheduler};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from config.toml ──────────────
    let config = config::loader::load_config("config.toml")
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.service.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        interval_seconds = config.scheduler.interval_seconds,
        "Starting wager settlement service"
    );

    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    // ── 3. Score feed API key ───────────────────────────────
    let api_key = std::env::var(&config.score_provider.api_key_env).with_context(|| {
        format!(
            "Score feed API key not set in ${}",
            config.score_provider.api_key_env
        )
    })?;

    // ── 4. Wager store ──────────────────────────────────────
    let store = Arc::new(
        WagerStore::open(&config.persistence.data_dir)
            .await
            .context("Failed to open wager store")?,
    );

    // ── 5. Score provider + request budget ──────────────────
    let provider = Arc::new(
        HttpScoreProvider::new(ScoreClientConfig::from_config(&config.score_provider, api_key))
            .context("Failed to create score provider")?,
    );
    let budget = Arc::new(RequestBudget::new(&config.score_provider.budget));

    // ── 6. Metrics + health servers ─────────────────────────
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
    let health = Arc::new(HealthState::new());
    health.set_store_healthy(store.is_healthy().await);

    let metrics_handle = if config.metrics.enabled {
        let server = Arc::clone(&metrics);
        let bind = config.metrics.bind_address.clone();
        let shutdown = shutdown_tx.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = server.serve(bind, shutdown).await {
                error!(error = %e, "Metrics server failed");
            }
        }))
    } else {
        None
    };

    let health_server = HealthServer::new(Arc::clone(&health), config.metrics.health_port);
    let health_shutdown = shutdown_tx.subscribe();
    let health_handle = tokio::spawn(async move {
        if let Err(e) = health_server.run(health_shutdown).await {
            error!(error = %e, "Health server failed");
        }
    });

    // ── 7. Settlement scheduler ─────────────────────────────
    let scheduler = SettlementScheduler::new(
        provider,
        Arc::clone(&store),
        Arc::clone(&budget),
        Duration::from_secs(config.scheduler.interval_seconds),
        config.scheduler.fetch_parallelism,
    );
    let scheduler_shutdown = shutdown_tx.subscribe();
    let scheduler_health = Arc::clone(&health);
    let scheduler_metrics = Arc::clone(&metrics);
    let scheduler_store = Arc::clone(&store);
    let scheduler_handle = tokio::spawn(async move {
        scheduler_health.set_scheduler_running(true);
        scheduler
            .run(scheduler_shutdown, |report| {
                scheduler_metrics.record_run(report);
                if report.commit_failures > 0 {
                    warn!(
                        failures = report.commit_failures,
                        "Some settlements failed to commit"
                    );
                }
            })
            .await;
        scheduler_health.set_scheduler_running(false);
        scheduler_health.set_store_healthy(scheduler_store.is_healthy().await);
    });

    // Budget gauges and store health between runs
    let probe_shutdown = shutdown_tx.subscribe();
    let probe_handle = tokio::spawn(watch_health(
        Arc::clone(&store),
        budget,
        Arc::clone(&health),
        metrics,
        probe_shutdown,
    ));

    info!("All tasks spawned — service is running");

    // ── 8. Wait for SIGINT ──────────────────────────────────
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for SIGINT");
    }
    info!("SIGINT received, initiating graceful shutdown");

    health.set_scheduler_running(false);
    let _ = shutdown_tx.send(());

    // An in-flight run completes before the scheduler observes shutdown.
    info!("Waiting for scheduler shutdown...");
    if tokio::time::timeout(Duration::from_secs(120), scheduler_handle)
        .await
        .is_err()
    {
        warn!("Scheduler did not stop within 120s");
    }

    let _ = tokio::time::timeout(Duration::from_secs(5), probe_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), health_handle).await;
    if let Some(handle) = metrics_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}

/// Refresh store health and budget gauges every 30 seconds.
async fn watch_health(
    store: Arc<WagerStore>,
    budget: Arc<RequestBudget>,
    health: Arc<HealthState>,
    metrics: Arc<MetricsRegistry>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            () = tokio::time::sleep(Duration::from_secs(30)) => {
                let healthy = store.is_healthy().await;
                if !healthy {
                    warn!("Wager store health check failed");
                }
                health.set_store_healthy(healthy);
                metrics.record_budget(budget.usage().await);
            }
        }
    }
}
