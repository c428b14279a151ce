//! Sporting events and score attribution.
//!
//! An `Event` is what wagers point at: the two stored team names plus,
//! once the feed reports them, the raw tagged score entries. Scores are
//! only ever attributed to home/away by matching their team-name tag
//! against the stored names, never by their position in the feed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::outcome::PendingReason;
use super::selection::Side;

/// External event identifier, as issued by the score feed.
pub type EventId = String;

/// One score line from the feed, tagged with the team it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    /// Team-name tag as reported by the feed.
    pub team_name: String,
    /// Points scored.
    pub score: Decimal,
}

impl ScoreEntry {
    pub fn new(team_name: impl Into<String>, score: Decimal) -> Self {
        Self {
            team_name: team_name.into(),
            score,
        }
    }
}

/// Score payload returned by a score provider for one event.
///
/// `scores` is `None` until the provider has anything to report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventScore {
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub scores: Option<Vec<ScoreEntry>>,
}

impl EventScore {
    /// Payload for an event the provider knows nothing about yet.
    pub fn not_started() -> Self {
        Self::default()
    }

    /// Whether the payload carries enough to attempt settlement.
    pub fn is_resolvable(&self) -> bool {
        self.completed && self.scores.as_ref().is_some_and(|s| s.len() >= 2)
    }
}

/// Attributed final score of a completed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalScore {
    pub home: Decimal,
    pub away: Decimal,
}

impl FinalScore {
    pub fn new(home: Decimal, away: Decimal) -> Self {
        Self { home, away }
    }

    /// Score of the given side.
    pub fn of(&self, side: Side) -> Decimal {
        match side {
            Side::Home => self.home,
            Side::Away => self.away,
        }
    }

    /// Combined points of both sides.
    pub fn total(&self) -> Decimal {
        self.home + self.away
    }
}

/// A sporting contest that one or more wagers reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// External event id.
    pub id: EventId,
    /// Feed sport key (e.g. `americanfootball_nfl`).
    pub sport: String,
    /// Stored home-team name.
    pub home_team: String,
    /// Stored away-team name.
    pub away_team: String,
    /// Scheduled start, if known.
    #[serde(default)]
    pub commence_time: Option<DateTime<Utc>>,
    /// Whether the feed has marked the event final.
    #[serde(default)]
    pub completed: bool,
    /// Raw tagged score entries from the last feed update.
    #[serde(default)]
    pub scores: Option<Vec<ScoreEntry>>,
}

impl Event {
    pub fn new(
        id: impl Into<EventId>,
        sport: impl Into<String>,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            sport: sport.into(),
            home_team: home_team.into(),
            away_team: away_team.into(),
            commence_time: None,
            completed: false,
            scores: None,
        }
    }

    /// Copy of this event carrying the completion flag and scores of a
    /// fresh feed payload. Team names stay the stored ones.
    #[must_use]
    pub fn with_feed(&self, feed: &EventScore) -> Self {
        Self {
            completed: feed.completed,
            scores: feed.scores.clone(),
            ..self.clone()
        }
    }

    /// Stored team name for a side.
    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home_team,
            Side::Away => &self.away_team,
        }
    }

    /// Attribute the feed's score entries to home and away.
    ///
    /// Returns the pending reason when the event is not final, when
    /// fewer than two entries are present, or when any tag fails to
    /// match exactly one stored team name.
    pub fn final_score(&self) -> Result<FinalScore, PendingReason> {
        if !self.completed {
            return Err(PendingReason::EventNotComplete);
        }
        let entries = match &self.scores {
            Some(entries) if entries.len() >= 2 => entries,
            _ => return Err(PendingReason::ScoresUnavailable),
        };

        let mut home = None;
        let mut away = None;
        for entry in entries {
            let slot = match self.side_of(&entry.team_name) {
                Some(Side::Home) => &mut home,
                Some(Side::Away) => &mut away,
                None => {
                    return Err(PendingReason::Unattributable {
                        tag: entry.team_name.clone(),
                    });
                }
            };
            if slot.replace(entry.score).is_some() {
                return Err(PendingReason::DuplicateSide {
                    team: entry.team_name.clone(),
                });
            }
        }

        match (home, away) {
            (Some(home), Some(away)) => Ok(FinalScore::new(home, away)),
            (None, _) => Err(PendingReason::MissingSide {
                team: self.home_team.clone(),
            }),
            (_, None) => Err(PendingReason::MissingSide {
                team: self.away_team.clone(),
            }),
        }
    }

    /// Which side a feed tag names, if exactly one stored name matches.
    fn side_of(&self, tag: &str) -> Option<Side> {
        let home = same_name(tag, &self.home_team);
        let away = same_name(tag, &self.away_team);
        match (home, away) {
            (true, false) => Some(Side::Home),
            (false, true) => Some(Side::Away),
            _ => None,
        }
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn chiefs_bills() -> Event {
        Event::new(
            "evt-1",
            "americanfootball_nfl",
            "Kansas City Chiefs",
            "Buffalo Bills",
        )
    }

    fn feed(entries: &[(&str, Decimal)]) -> EventScore {
        EventScore {
            completed: true,
            scores: Some(
                entries
                    .iter()
                    .map(|(name, score)| ScoreEntry::new(*name, *score))
                    .collect(),
            ),
        }
    }

    #[test]
    fn test_attribution_ignores_feed_order() {
        let event = chiefs_bills().with_feed(&feed(&[
            ("Buffalo Bills", dec!(20)),
            ("Kansas City Chiefs", dec!(24)),
        ]));
        let score = event.final_score().unwrap();
        assert_eq!(score.home, dec!(24));
        assert_eq!(score.away, dec!(20));
    }

    #[test]
    fn test_attribution_is_case_insensitive() {
        let event = chiefs_bills().with_feed(&feed(&[
            ("kansas city chiefs ", dec!(10)),
            ("BUFFALO BILLS", dec!(3)),
        ]));
        assert_eq!(event.final_score().unwrap(), FinalScore::new(dec!(10), dec!(3)));
    }

    #[test]
    fn test_abbreviated_tags_are_unattributable() {
        let event =
            chiefs_bills().with_feed(&feed(&[("KC", dec!(24)), ("BUF", dec!(20))]));
        assert_eq!(
            event.final_score(),
            Err(PendingReason::Unattributable {
                tag: "KC".to_string()
            })
        );
    }

    #[test]
    fn test_duplicate_side_is_rejected() {
        let event = chiefs_bills().with_feed(&feed(&[
            ("Kansas City Chiefs", dec!(24)),
            ("Kansas City Chiefs", dec!(21)),
        ]));
        assert!(matches!(
            event.final_score(),
            Err(PendingReason::DuplicateSide { .. })
        ));
    }

    #[test]
    fn test_incomplete_or_sparse_feed_is_not_resolvable() {
        let mut payload = feed(&[("Kansas City Chiefs", dec!(24))]);
        assert!(!payload.is_resolvable());
        assert_eq!(
            chiefs_bills().with_feed(&payload).final_score(),
            Err(PendingReason::ScoresUnavailable)
        );

        payload = feed(&[("Kansas City Chiefs", dec!(24)), ("Buffalo Bills", dec!(20))]);
        payload.completed = false;
        assert_eq!(
            chiefs_bills().with_feed(&payload).final_score(),
            Err(PendingReason::EventNotComplete)
        );

        assert_eq!(
            chiefs_bills().final_score(),
            Err(PendingReason::EventNotComplete)
        );
    }

    #[test]
    fn test_missing_completed_flag_deserializes_false() {
        let payload: EventScore = serde_json::from_str(r#"{"scores": null}"#).unwrap();
        assert!(!payload.completed);
        assert!(payload.scores.is_none());
    }
}
