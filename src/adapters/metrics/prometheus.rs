//! Prometheus Metrics Registry - Settlement Observability
//!
//! Registers and exposes settlement metrics for scraping. All metrics
//! are named `wager_settlement_*`.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument};

use crate::usecases::request_budget::BudgetUsage;
use crate::usecases::settlement::SettlementReport;

/// Centralized Prometheus metrics for the settlement service.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Completed settlement runs.
    pub runs: IntCounter,
    /// Wagers committed, by terminal status.
    pub wagers_settled: IntCounterVec,
    /// Wagers left pending after the last run.
    pub wagers_pending: IntGauge,
    /// Score fetches that failed.
    pub fetch_failures: IntCounter,
    /// Runs whose fetches were paused by quota.
    pub quota_pauses: IntCounter,
    /// Commits that another writer had already applied.
    pub already_settled: IntCounter,
    /// Commits that errored.
    pub commit_failures: IntCounter,
    /// Run duration.
    pub run_duration_seconds: Histogram,
    /// Score requests used today.
    pub budget_daily_used: IntGauge,
    /// Score requests used this month.
    pub budget_monthly_used: IntGauge,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let runs = IntCounter::new(
            "wager_settlement_runs_total",
            "Completed settlement runs",
        )?;

        let wagers_settled = IntCounterVec::new(
            Opts::new(
                "wager_settlement_wagers_settled_total",
                "Wagers moved out of pending",
            ),
            &["status"],
        )?;

        let wagers_pending = IntGauge::new(
            "wager_settlement_wagers_pending",
            "Wagers still pending after the last run",
        )?;

        let fetch_failures = IntCounter::new(
            "wager_settlement_fetch_failures_total",
            "Score fetches that failed",
        )?;

        let quota_pauses = IntCounter::new(
            "wager_settlement_quota_pauses_total",
            "Runs paused by score quota exhaustion",
        )?;

        let already_settled = IntCounter::new(
            "wager_settlement_already_settled_total",
            "Commits skipped because the wager had already left pending",
        )?;

        let commit_failures = IntCounter::new(
            "wager_settlement_commit_failures_total",
            "Commits that failed",
        )?;

        let run_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "wager_settlement_run_duration_seconds",
                "Settlement run duration in seconds",
            )
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0]),
        )?;

        let budget_daily_used = IntGauge::new(
            "wager_settlement_budget_daily_used",
            "Score requests used today (UTC)",
        )?;

        let budget_monthly_used = IntGauge::new(
            "wager_settlement_budget_monthly_used",
            "Score requests used this month (UTC)",
        )?;

        registry.register(Box::new(runs.clone()))?;
        registry.register(Box::new(wagers_settled.clone()))?;
        registry.register(Box::new(wagers_pending.clone()))?;
        registry.register(Box::new(fetch_failures.clone()))?;
        registry.register(Box::new(quota_pauses.clone()))?;
        registry.register(Box::new(already_settled.clone()))?;
        registry.register(Box::new(commit_failures.clone()))?;
        registry.register(Box::new(run_duration_seconds.clone()))?;
        registry.register(Box::new(budget_daily_used.clone()))?;
        registry.register(Box::new(budget_monthly_used.clone()))?;

        Ok(Self {
            registry,
            runs,
            wagers_settled,
            wagers_pending,
            fetch_failures,
            quota_pauses,
            already_settled,
            commit_failures,
            run_duration_seconds,
            budget_daily_used,
            budget_monthly_used,
        })
    }

    /// Fold one run report into the metrics.
    pub fn record_run(&self, report: &SettlementReport) {
        self.runs.inc();
        for committed in &report.committed {
            self.wagers_settled
                .with_label_values(&[committed.status.as_str()])
                .inc();
        }
        self.wagers_pending
            .set(i64::try_from(report.still_pending).unwrap_or(i64::MAX));
        self.fetch_failures.inc_by(report.fetch_failures.len() as u64);
        if report.quota_paused {
            self.quota_pauses.inc();
        }
        self.already_settled.inc_by(report.already_settled as u64);
        self.commit_failures.inc_by(report.commit_failures as u64);

        let millis = report.duration().num_milliseconds().max(0);
        self.run_duration_seconds.observe(millis as f64 / 1000.0);
    }

    /// Record current request budget usage.
    pub fn record_budget(&self, usage: BudgetUsage) {
        self.budget_daily_used.set(i64::from(usage.daily_used));
        self.budget_monthly_used.set(i64::from(usage.monthly_used));
    }

    /// Encode every registered metric in the text exposition format.
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics);
                async move {
                    match metrics.render() {
                        Ok(body) => (StatusCode::OK, body),
                        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}
