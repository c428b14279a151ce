//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    interval_seconds = config.scheduler.interval_seconds,
    fetch_parallelism = config.scheduler.fetch_parallelism,
    daily_cap = config.score_provider.budget.daily_cap,
    monthly_cap = config.score_provider.budget.monthly_cap,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig =
    toml::from_str(content).with_context(|| "Failed to parse config.toml")?;
  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(
    !config.service.name.is_empty(),
    "service.name must not be empty"
  );

  // Scheduler validation
  anyhow::ensure!(
    config.scheduler.interval_seconds > 0,
    "scheduler.interval_seconds must be positive"
  );
  anyhow::ensure!(
    config.scheduler.fetch_parallelism > 0 && config.scheduler.fetch_parallelism <= 64,
    "scheduler.fetch_parallelism must be in [1, 64], got {}",
    config.scheduler.fetch_parallelism
  );

  // Provider validation
  let provider = &config.score_provider;
  anyhow::ensure!(
    !provider.base_url.is_empty(),
    "score_provider.base_url must not be empty"
  );
  anyhow::ensure!(
    !provider.api_key_env.is_empty(),
    "score_provider.api_key_env must name an environment variable"
  );
  anyhow::ensure!(
    provider.timeout_seconds > 0,
    "score_provider.timeout_seconds must be positive"
  );
  anyhow::ensure!(
    provider.max_retries <= 10,
    "score_provider.max_retries must be at most 10, got {}",
    provider.max_retries
  );

  // Budget validation
  let budget = &provider.budget;
  anyhow::ensure!(
    budget.daily_cap > 0,
    "score_provider.budget.daily_cap must be positive"
  );
  anyhow::ensure!(
    budget.monthly_cap >= budget.daily_cap,
    "score_provider.budget.monthly_cap ({}) must be at least daily_cap ({})",
    budget.monthly_cap,
    budget.daily_cap
  );

  Ok(())
}
