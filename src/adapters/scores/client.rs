//! Score Feed HTTP Client - REST Score Provider
//!
//! Implements `ScoreProvider` over a `/v4/sports/{sport}/scores` REST
//! endpoint with timeouts and exponential-backoff retries on transient
//! failures. Quota responses are never retried.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use super::types::ScoresEventDto;
use crate::config::ScoreProviderConfig;
use crate::domain::event::{Event, EventScore};
use crate::ports::score_provider::{ProviderError, ScoreProvider};

/// Longest error body carried into `ProviderError::Status`.
const MAX_ERROR_BODY: usize = 256;

/// Configuration for the score feed client.
#[derive(Debug, Clone)]
pub struct ScoreClientConfig {
  /// Base URL of the feed.
  pub base_url: String,
  /// API key sent as the `apiKey` query parameter.
  pub api_key: String,
  /// Request timeout.
  pub timeout: Duration,
  /// Maximum retries on transient errors.
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff).
  pub retry_base_delay: Duration,
  /// Look-back window for completed events, in days.
  pub days_from: u32,
}

impl ScoreClientConfig {
  /// Build from the service config and the resolved API key.
  pub fn from_config(config: &ScoreProviderConfig, api_key: String) -> Self {
    Self {
      base_url: config.base_url.trim_end_matches('/').to_string(),
      api_key,
      timeout: Duration::from_secs(config.timeout_seconds),
      max_retries: config.max_retries,
      retry_base_delay: Duration::from_millis(250),
      days_from: config.days_from,
    }
  }
}

/// HTTP score provider.
pub struct HttpScoreProvider {
  http: Client,
  config: ScoreClientConfig,
}

impl HttpScoreProvider {
  /// Create a new client.
  pub fn new(config: ScoreClientConfig) -> anyhow::Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(4)
      .build()
      .context("Failed to build HTTP client")?;
    Ok(Self { http, config })
  }

  fn scores_url(&self, sport: &str) -> String {
    format!("{}/v4/sports/{}/scores/", self.config.base_url, sport)
  }

  /// GET the scores for one event, retrying transient failures.
  async fn get_scores(&self, event: &Event) -> Result<Vec<ScoresEventDto>, ProviderError> {
    let days_from = self.config.days_from.to_string();
    let request = self.http.get(self.scores_url(&event.sport)).query(&[
      ("apiKey", self.config.api_key.as_str()),
      ("daysFrom", days_from.as_str()),
      ("eventIds", event.id.as_str()),
    ]);

    let mut last_error = ProviderError::Transport("no attempt made".to_string());

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let delay = backoff_delay(self.config.retry_base_delay, attempt);
        debug!(attempt, delay_ms = delay.as_millis(), "Retrying score request");
        sleep(delay).await;
      }

      let Some(req) = request.try_clone() else {
        return Err(ProviderError::Transport("request not cloneable".to_string()));
      };

      match req.send().await {
        Ok(response) => {
          if let Some(remaining) = response
            .headers()
            .get("x-requests-remaining")
            .and_then(|v| v.to_str().ok())
          {
            debug!(remaining, "Score feed quota remaining");
          }

          let status = response.status();
          if status.is_success() {
            return response
              .json::<Vec<ScoresEventDto>>()
              .await
              .map_err(|e| ProviderError::Decode(e.to_string()));
          }

          let body = response.text().await.unwrap_or_default();
          let error = status_error(status, &body);
          if status.is_server_error() {
            warn!(status = %status, attempt, "Score feed server error, retrying");
            last_error = error;
            continue;
          }
          return Err(error);
        }
        Err(e) => {
          warn!(error = %e, attempt, "Score request failed");
          last_error = ProviderError::Transport(e.to_string());
        }
      }
    }

    Err(last_error)
  }
}

/// Exponential backoff before retry `attempt` (1-based), saturating.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
  base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}

/// Map a non-success response to a provider error.
fn status_error(status: StatusCode, body: &str) -> ProviderError {
  let quota_body = body.contains("OUT_OF_USAGE_CREDITS") || body.to_lowercase().contains("quota");
  match status {
    StatusCode::TOO_MANY_REQUESTS => ProviderError::QuotaExhausted(format!("HTTP {status}")),
    StatusCode::UNAUTHORIZED if quota_body => ProviderError::QuotaExhausted(truncate(body)),
    _ => ProviderError::Status {
      status: status.as_u16(),
      body: truncate(body),
    },
  }
}

fn truncate(body: &str) -> String {
  body.chars().take(MAX_ERROR_BODY).collect()
}

#[async_trait]
impl ScoreProvider for HttpScoreProvider {
  #[instrument(skip(self, event), fields(event_id = %event.id, sport = %event.sport))]
  async fn fetch_scores(&self, event: &Event) -> Result<EventScore, ProviderError> {
    let events = self.get_scores(event).await?;
    match events.into_iter().find(|e| e.id == event.id) {
      Some(dto) => {
        if dto.names_differ(event) {
          debug!(
            feed_home = ?dto.home_team,
            feed_away = ?dto.away_team,
            stored_home = %event.home_team,
            stored_away = %event.away_team,
            "Feed team names differ from stored event"
          );
        }
        dto.into_event_score()
      }
      // Feeds omit events that have not started within the window.
      None => Ok(EventScore::not_started()),
    }
  }

  async fn is_healthy(&self) -> bool {
    let url = format!("{}/v4/sports/", self.config.base_url);
    self
      .http
      .get(url)
      .query(&[("apiKey", self.config.api_key.as_str())])
      .send()
      .await
      .is_ok_and(|r| r.status().is_success())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_too_many_requests_is_quota() {
    assert!(status_error(StatusCode::TOO_MANY_REQUESTS, "").is_quota());
  }

  #[test]
  fn test_unauthorized_quota_body_is_quota() {
    let body = r#"{"message":"Usage quota has been reached","error_code":"OUT_OF_USAGE_CREDITS"}"#;
    assert!(status_error(StatusCode::UNAUTHORIZED, body).is_quota());
  }

  #[test]
  fn test_unauthorized_bad_key_is_status() {
    let err = status_error(StatusCode::UNAUTHORIZED, "invalid api key");
    assert_eq!(
      err,
      ProviderError::Status {
        status: 401,
        body: "invalid api key".to_string()
      }
    );
  }

  #[test]
  fn test_error_body_truncated() {
    let body = "x".repeat(1000);
    match status_error(StatusCode::BAD_REQUEST, &body) {
      ProviderError::Status { body, .. } => assert_eq!(body.len(), MAX_ERROR_BODY),
      other => panic!("unexpected {other:?}"),
    }
  }

  #[test]
  fn test_backoff_doubles_and_saturates() {
    let base = Duration::from_millis(250);
    assert_eq!(backoff_delay(base, 1), base);
    assert_eq!(backoff_delay(base, 3), Duration::from_secs(1));
    assert_eq!(backoff_delay(base, 40), base.saturating_mul(u32::MAX));
  }

  #[test]
  fn test_config_trims_trailing_slash() {
    let config: ScoreProviderConfig = toml::from_str(r#"base_url = "https://feed.test/""#).unwrap();
    let client = ScoreClientConfig::from_config(&config, "key".to_string());
    assert_eq!(client.base_url, "https://feed.test");
    assert_eq!(client.timeout, Duration::from_secs(10));
  }
}
