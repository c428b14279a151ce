//! Configuration Module - TOML-based Service Configuration
//!
//! Loads and validates configuration from `config.toml`. Everything is
//! fixed at startup; there is no hot reload. Secrets (the score feed
//! API key) come from the environment variable named here, never from
//! the file itself.

pub mod loader;

use serde::Deserialize;

/// Top-level service configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the scheduler begins operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Service identity and logging.
  pub service: ServiceConfig,
  /// Settlement scheduler cadence and fan-out.
  #[serde(default)]
  pub scheduler: SchedulerConfig,
  /// Score feed endpoint and request budget.
  pub score_provider: ScoreProviderConfig,
  /// Persistence configuration.
  #[serde(default)]
  pub persistence: PersistenceConfig,
  /// Metrics and monitoring.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  /// Human-readable service name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

/// Settlement scheduler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
  /// Seconds between settlement runs.
  #[serde(default = "default_interval")]
  pub interval_seconds: u64,
  /// Maximum concurrent score fetches within one run.
  #[serde(default = "default_fetch_parallelism")]
  pub fetch_parallelism: usize,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    Self {
      interval_seconds: default_interval(),
      fetch_parallelism: default_fetch_parallelism(),
    }
  }
}

/// Score feed configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreProviderConfig {
  /// Feed REST API base URL.
  pub base_url: String,
  /// Name of the environment variable holding the API key.
  #[serde(default = "default_api_key_env")]
  pub api_key_env: String,
  /// Request timeout in seconds.
  #[serde(default = "default_timeout")]
  pub timeout_seconds: u64,
  /// Retries on transient (5xx / transport) failures.
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  /// How many days back the feed should look for completed events.
  #[serde(default = "default_days_from")]
  pub days_from: u32,
  /// Request budget toward the provider.
  #[serde(default)]
  pub budget: BudgetConfig,
}

/// Score feed request budget.
#[derive(Debug, Clone, Deserialize)]
pub struct BudgetConfig {
  /// Requests per second (0 disables the per-second limit).
  #[serde(default = "default_requests_per_second")]
  pub requests_per_second: u32,
  /// Requests per UTC day; resets at midnight UTC.
  #[serde(default = "default_daily_cap")]
  pub daily_cap: u32,
  /// Requests per UTC calendar month; resets on the 1st.
  #[serde(default = "default_monthly_cap")]
  pub monthly_cap: u32,
}

impl Default for BudgetConfig {
  fn default() -> Self {
    Self {
      requests_per_second: default_requests_per_second(),
      daily_cap: default_daily_cap(),
      monthly_cap: default_monthly_cap(),
    }
  }
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
  /// Directory for the wager snapshot and settlement logs.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
}

impl Default for PersistenceConfig {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_metrics_addr(),
      health_port: default_health_port(),
    }
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_interval() -> u64 {
  900 // 15 minutes
}

fn default_fetch_parallelism() -> usize {
  4
}

fn default_api_key_env() -> String {
  "SCORE_API_KEY".to_string()
}

fn default_timeout() -> u64 {
  10
}

fn default_max_retries() -> u32 {
  2
}

fn default_days_from() -> u32 {
  3
}

fn default_requests_per_second() -> u32 {
  2
}

fn default_daily_cap() -> u32 {
  500
}

fn default_monthly_cap() -> u32 {
  10_000
}

fn default_data_dir() -> String {
  "data".to_string()
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_health_port() -> u16 {
  8080
}
