//! Combination (parlay) evaluation.
//!
//! Leg outcomes fold with a commutative, associative join, so leg order
//! never matters:
//!
//! ```text
//!   push < won < pending < lost
//! ```
//!
//! The combination takes the highest-ranked leg outcome: a single lost
//! leg loses the combination even while other legs are pending, any
//! pending leg keeps it pending, and otherwise one won leg is enough to
//! win (pushed legs drop out).

use std::collections::HashMap;

use super::event::{Event, EventId};
use super::outcome::{resolve, Outcome, PendingReason, Resolution};
use super::selection::Leg;

const fn rank(outcome: Outcome) -> u8 {
    match outcome {
        Outcome::Push => 0,
        Outcome::Won => 1,
        Outcome::Pending => 2,
        Outcome::Lost => 3,
    }
}

const fn join(a: Outcome, b: Outcome) -> Outcome {
    if rank(a) >= rank(b) { a } else { b }
}

/// Aggregate leg outcomes into the combination's outcome.
///
/// An empty leg list has nothing to settle and stays pending.
pub fn resolve_combination(outcomes: &[Outcome]) -> Outcome {
    match outcomes.split_first() {
        None => Outcome::Pending,
        Some((first, rest)) => rest.iter().fold(*first, |acc, o| join(acc, *o)),
    }
}

/// Indices of the legs that won; these alone price a won combination.
pub fn won_leg_indices(outcomes: &[Outcome]) -> Vec<usize> {
    outcomes
        .iter()
        .enumerate()
        .filter(|(_, o)| **o == Outcome::Won)
        .map(|(i, _)| i)
        .collect()
}

/// Result of evaluating every leg of a combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinationResolution {
    pub outcome: Outcome,
    /// First pending leg's reason, when the combination is pending.
    pub reason: Option<PendingReason>,
    pub leg_outcomes: Vec<Outcome>,
}

/// Resolve each leg against its own event, then aggregate.
pub fn evaluate_legs(legs: &[Leg], events: &HashMap<EventId, Event>) -> CombinationResolution {
    let mut leg_outcomes = Vec::with_capacity(legs.len());
    let mut first_pending = None;

    for (index, leg) in legs.iter().enumerate() {
        let resolution = match events.get(&leg.event_id) {
            Some(event) => resolve(&leg.selection, event),
            None => Resolution::pending(PendingReason::EventUnavailable {
                event_id: leg.event_id.clone(),
            }),
        };
        if first_pending.is_none() {
            if let Some(reason) = resolution.reason {
                first_pending = Some(PendingReason::Leg {
                    index,
                    reason: Box::new(reason),
                });
            }
        }
        leg_outcomes.push(resolution.outcome);
    }

    let outcome = resolve_combination(&leg_outcomes);
    CombinationResolution {
        outcome,
        reason: if outcome.is_pending() {
            first_pending.or(Some(PendingReason::ScoresUnavailable))
        } else {
            None
        },
        leg_outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::{EventScore, ScoreEntry};
    use crate::domain::payout::AmericanOdds;
    use crate::domain::selection::{Direction, LegSelection, Side};
    use rust_decimal_macros::dec;
    use Outcome::{Lost, Pending, Push, Won};

    #[test]
    fn test_any_lost_dominates() {
        assert_eq!(resolve_combination(&[Won, Pending, Lost]), Lost);
        assert_eq!(resolve_combination(&[Lost, Pending]), Lost);
    }

    #[test]
    fn test_pending_without_loss() {
        assert_eq!(resolve_combination(&[Won, Pending, Push]), Pending);
    }

    #[test]
    fn test_won_and_push() {
        assert_eq!(resolve_combination(&[Won, Push, Won]), Won);
        assert_eq!(resolve_combination(&[Push, Won, Won]), Won);
        assert_eq!(won_leg_indices(&[Won, Push, Won]), vec![0, 2]);
    }

    #[test]
    fn test_all_push() {
        assert_eq!(resolve_combination(&[Push, Push]), Push);
    }

    #[test]
    fn test_empty_is_pending() {
        assert_eq!(resolve_combination(&[]), Pending);
    }

    #[test]
    fn test_evaluate_legs_across_events() {
        let mut finished = Event::new("evt-1", "nfl", "Home Team", "Away Team");
        finished = finished.with_feed(&EventScore {
            completed: true,
            scores: Some(vec![
                ScoreEntry::new("Home Team", dec!(24)),
                ScoreEntry::new("Away Team", dec!(20)),
            ]),
        });
        let events = HashMap::from([(finished.id.clone(), finished)]);

        let legs = vec![
            Leg {
                event_id: "evt-1".to_string(),
                price: AmericanOdds::new(-110).unwrap(),
                selection: LegSelection::Moneyline { side: Side::Home },
            },
            Leg {
                event_id: "evt-2".to_string(),
                price: AmericanOdds::new(-110).unwrap(),
                selection: LegSelection::Total {
                    direction: Direction::Over,
                    line: dec!(40),
                },
            },
        ];

        let result = evaluate_legs(&legs, &events);
        assert_eq!(result.leg_outcomes, vec![Won, Pending]);
        assert_eq!(result.outcome, Pending);
        assert_eq!(
            result.reason,
            Some(PendingReason::Leg {
                index: 1,
                reason: Box::new(PendingReason::EventUnavailable {
                    event_id: "evt-2".to_string()
                }),
            })
        );
    }
}
