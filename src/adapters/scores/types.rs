//! Score Feed Response Types
//!
//! Wire types for a `/v4/sports/{sport}/scores` style feed. Scores may
//! arrive as strings or numbers; `completed` and `scores` may be absent.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::event::{Event, EventScore, ScoreEntry};
use crate::ports::score_provider::ProviderError;

/// One event in a scores response.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoresEventDto {
  /// Feed event id.
  pub id: String,
  /// Home team as named by the feed.
  #[serde(default)]
  pub home_team: Option<String>,
  /// Away team as named by the feed.
  #[serde(default)]
  pub away_team: Option<String>,
  /// Final flag; absent means not final.
  #[serde(default)]
  pub completed: Option<bool>,
  /// Tagged scores; `null` before the event starts.
  #[serde(default)]
  pub scores: Option<Vec<ScoreDto>>,
}

/// One tagged score entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreDto {
  /// Team name tag.
  pub name: String,
  /// Score value.
  #[serde(default)]
  pub score: Option<ScoreValue>,
}

/// Score as sent on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScoreValue {
  Text(String),
  Number(serde_json::Number),
}

impl ScoreValue {
  fn to_decimal(&self) -> Result<Decimal, ProviderError> {
    let raw = match self {
      Self::Text(s) => s.trim().to_string(),
      Self::Number(n) => n.to_string(),
    };
    Decimal::from_str(&raw).map_err(|e| ProviderError::Decode(format!("score {raw:?}: {e}")))
  }
}

impl ScoresEventDto {
  /// Whether the feed names the teams differently from the stored event.
  /// Absent names never count as a difference.
  pub fn names_differ(&self, event: &Event) -> bool {
    let differs = |feed: &Option<String>, stored: &str| {
      feed.as_deref().is_some_and(|name| !name.eq_ignore_ascii_case(stored))
    };
    differs(&self.home_team, &event.home_team) || differs(&self.away_team, &event.away_team)
  }

  /// Convert to the domain payload. Entries without a value are dropped,
  /// which leaves attribution to decide whether enough remain.
  pub fn into_event_score(self) -> Result<EventScore, ProviderError> {
    let scores = match self.scores {
      Some(entries) => {
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
          if let Some(value) = entry.score {
            out.push(ScoreEntry::new(entry.name, value.to_decimal()?));
          }
        }
        Some(out)
      }
      None => None,
    };
    Ok(EventScore {
      completed: self.completed.unwrap_or(false),
      scores,
    })
  }
}
