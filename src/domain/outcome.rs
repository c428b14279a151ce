//! Outcome resolution for a single selection against one event.
//!
//! Pure functions only. Anything short of a completed event with both
//! scores attributed by team name resolves to `Pending` together with a
//! reason; a wager is never won or lost on partial data.

use std::cmp::Ordering;
use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::combination::evaluate_legs;
use super::event::{Event, EventId, FinalScore};
use super::selection::{Direction, LegSelection, Selection};
use super::wager::WagerStatus;

/// Settlement outcome of a selection or leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Won,
    Lost,
    Push,
    Pending,
}

impl Outcome {
    /// Terminal status to commit, or `None` while still pending.
    pub const fn terminal_status(self) -> Option<WagerStatus> {
        match self {
            Self::Won => Some(WagerStatus::Won),
            Self::Lost => Some(WagerStatus::Lost),
            Self::Push => Some(WagerStatus::Push),
            Self::Pending => None,
        }
    }

    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Why a selection could not be decided yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum PendingReason {
    /// The feed has not marked the event final.
    EventNotComplete,
    /// No scores, or fewer than two entries.
    ScoresUnavailable,
    /// A score tag matched neither stored team name.
    Unattributable { tag: String },
    /// Two score entries were attributed to the same team.
    DuplicateSide { team: String },
    /// No score entry was attributed to this team.
    MissingSide { team: String },
    /// Player props are settled by hand.
    ManualSettlementRequired,
    /// The event was not fetched this run.
    EventUnavailable { event_id: EventId },
    /// A combination leg is still pending.
    Leg { index: usize, reason: Box<PendingReason> },
}

impl PendingReason {
    /// Feed data that cannot be attributed to the stored teams.
    pub fn is_data_quality(&self) -> bool {
        match self {
            Self::Unattributable { .. } | Self::DuplicateSide { .. } | Self::MissingSide { .. } => {
                true
            }
            Self::Leg { reason, .. } => reason.is_data_quality(),
            _ => false,
        }
    }

    pub fn requires_manual_settlement(&self) -> bool {
        match self {
            Self::ManualSettlementRequired => true,
            Self::Leg { reason, .. } => reason.requires_manual_settlement(),
            _ => false,
        }
    }
}

impl std::fmt::Display for PendingReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EventNotComplete => write!(f, "event not complete"),
            Self::ScoresUnavailable => write!(f, "scores unavailable"),
            Self::Unattributable { tag } => {
                write!(f, "score tag {tag:?} matches neither team")
            }
            Self::DuplicateSide { team } => write!(f, "duplicate score for {team:?}"),
            Self::MissingSide { team } => write!(f, "no score for {team:?}"),
            Self::ManualSettlementRequired => write!(f, "manual settlement required"),
            Self::EventUnavailable { event_id } => {
                write!(f, "event {event_id} unavailable this run")
            }
            Self::Leg { index, reason } => write!(f, "leg {index}: {reason}"),
        }
    }
}

/// Outcome plus, when pending, the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub outcome: Outcome,
    pub reason: Option<PendingReason>,
}

impl Resolution {
    pub const fn decided(outcome: Outcome) -> Self {
        Self {
            outcome,
            reason: None,
        }
    }

    pub const fn pending(reason: PendingReason) -> Self {
        Self {
            outcome: Outcome::Pending,
            reason: Some(reason),
        }
    }
}

/// Resolve one single-market selection against its event.
pub fn resolve(selection: &LegSelection, event: &Event) -> Resolution {
    if let LegSelection::PlayerProp { .. } = selection {
        return Resolution::pending(PendingReason::ManualSettlementRequired);
    }

    let score = match event.final_score() {
        Ok(score) => score,
        Err(reason) => return Resolution::pending(reason),
    };

    Resolution::decided(decide(selection, score))
}

fn decide(selection: &LegSelection, score: FinalScore) -> Outcome {
    match *selection {
        LegSelection::Moneyline { side } => compare(score.of(side), score.of(side.opponent())),
        LegSelection::PointSpread { side, spread } => {
            compare(score.of(side) + spread, score.of(side.opponent()))
        }
        LegSelection::Total { direction, line } => match (score.total().cmp(&line), direction) {
            (Ordering::Equal, _) => Outcome::Push,
            (Ordering::Greater, Direction::Over) | (Ordering::Less, Direction::Under) => {
                Outcome::Won
            }
            _ => Outcome::Lost,
        },
        LegSelection::PlayerProp { .. } => Outcome::Pending,
    }
}

/// Ours against theirs; a tie is a push.
fn compare(ours: Decimal, theirs: Decimal) -> Outcome {
    match ours.cmp(&theirs) {
        Ordering::Greater => Outcome::Won,
        Ordering::Less => Outcome::Lost,
        Ordering::Equal => Outcome::Push,
    }
}

/// Detailed result for a whole wager selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionResolution {
    pub outcome: Outcome,
    pub reason: Option<PendingReason>,
    /// Per-leg outcomes; empty for single selections.
    pub leg_outcomes: Vec<Outcome>,
}

/// Resolve a wager selection given every event fetched this run.
///
/// `primary` is the wager's own event id. Missing events resolve as
/// pending for that selection or leg.
pub fn resolve_selection(
    selection: &Selection,
    primary: &EventId,
    events: &HashMap<EventId, Event>,
) -> SelectionResolution {
    match selection {
        Selection::Single(leg) => {
            let resolution = match events.get(primary) {
                Some(event) => resolve(leg, event),
                None => Resolution::pending(PendingReason::EventUnavailable {
                    event_id: primary.clone(),
                }),
            };
            SelectionResolution {
                outcome: resolution.outcome,
                reason: resolution.reason,
                leg_outcomes: Vec::new(),
            }
        }
        Selection::Combination(legs) => {
            let combined = evaluate_legs(legs, events);
            SelectionResolution {
                outcome: combined.outcome,
                reason: combined.reason,
                leg_outcomes: combined.leg_outcomes,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::{EventScore, ScoreEntry};
    use crate::domain::selection::Side;
    use rust_decimal_macros::dec;

    fn final_event(home: Decimal, away: Decimal) -> Event {
        Event::new("evt-1", "americanfootball_nfl", "Home Team", "Away Team").with_feed(
            &EventScore {
                completed: true,
                scores: Some(vec![
                    ScoreEntry::new("Home Team", home),
                    ScoreEntry::new("Away Team", away),
                ]),
            },
        )
    }

    #[test]
    fn test_moneyline_home_win() {
        let sel = LegSelection::Moneyline { side: Side::Home };
        assert_eq!(resolve(&sel, &final_event(dec!(24), dec!(20))).outcome, Outcome::Won);
    }

    #[test]
    fn test_moneyline_tie_is_push() {
        let sel = LegSelection::Moneyline { side: Side::Away };
        assert_eq!(resolve(&sel, &final_event(dec!(17), dec!(17))).outcome, Outcome::Push);
    }

    #[test]
    fn test_spread_favorite_fails_to_cover() {
        let sel = LegSelection::PointSpread {
            side: Side::Away,
            spread: dec!(-7.5),
        };
        assert_eq!(resolve(&sel, &final_event(dec!(20), dec!(14))).outcome, Outcome::Lost);
    }

    #[test]
    fn test_spread_underdog_covers() {
        let sel = LegSelection::PointSpread {
            side: Side::Home,
            spread: dec!(3.5),
        };
        assert_eq!(resolve(&sel, &final_event(dec!(21), dec!(24))).outcome, Outcome::Won);
    }

    #[test]
    fn test_spread_exact_margin_is_push() {
        let sel = LegSelection::PointSpread {
            side: Side::Home,
            spread: dec!(-3),
        };
        assert_eq!(resolve(&sel, &final_event(dec!(27), dec!(24))).outcome, Outcome::Push);
    }

    #[test]
    fn test_totals() {
        let over = LegSelection::Total {
            direction: Direction::Over,
            line: dec!(45.5),
        };
        let under = LegSelection::Total {
            direction: Direction::Under,
            line: dec!(44),
        };
        let event = final_event(dec!(24), dec!(20));
        assert_eq!(resolve(&over, &event).outcome, Outcome::Lost);
        assert_eq!(resolve(&under, &event).outcome, Outcome::Push);

        let under_high = LegSelection::Total {
            direction: Direction::Under,
            line: dec!(50.5),
        };
        assert_eq!(resolve(&under_high, &event).outcome, Outcome::Won);
    }

    #[test]
    fn test_player_prop_needs_manual_settlement() {
        let sel = LegSelection::PlayerProp {
            player_id: "mahomes-15".to_string(),
            market: "passing yards".to_string(),
            line: dec!(275.5),
            direction: Direction::Over,
        };
        let resolution = resolve(&sel, &final_event(dec!(24), dec!(20)));
        assert_eq!(resolution.outcome, Outcome::Pending);
        assert_eq!(resolution.reason, Some(PendingReason::ManualSettlementRequired));
        assert!(resolution.reason.unwrap().requires_manual_settlement());
    }

    #[test]
    fn test_unfinished_event_stays_pending() {
        let sel = LegSelection::Moneyline { side: Side::Home };
        let event = Event::new("evt-1", "nfl", "Home Team", "Away Team");
        assert_eq!(
            resolve(&sel, &event),
            Resolution::pending(PendingReason::EventNotComplete)
        );
    }

    #[test]
    fn test_missing_event_is_pending() {
        let selection = Selection::Single(LegSelection::Moneyline { side: Side::Home });
        let resolution = resolve_selection(&selection, &"evt-9".to_string(), &HashMap::new());
        assert_eq!(resolution.outcome, Outcome::Pending);
        assert_eq!(
            resolution.reason,
            Some(PendingReason::EventUnavailable {
                event_id: "evt-9".to_string()
            })
        );
    }

    #[test]
    fn test_terminal_status_mapping() {
        assert_eq!(Outcome::Won.terminal_status(), Some(WagerStatus::Won));
        assert_eq!(Outcome::Push.terminal_status(), Some(WagerStatus::Push));
        assert_eq!(Outcome::Pending.terminal_status(), None);
    }

    #[test]
    fn test_leg_reason_json_round_trip() {
        let reason = PendingReason::Leg {
            index: 1,
            reason: Box::new(PendingReason::MissingSide {
                team: "Away Team".to_string(),
            }),
        };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["cause"], "leg");
        assert_eq!(json["reason"]["cause"], "missing_side");
        let back: PendingReason = serde_json::from_value(json).unwrap();
        assert_eq!(back, reason);
    }
}
