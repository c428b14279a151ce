//! Wagers and their status lifecycle.
//!
//! Status only ever moves `pending → {won, lost, push, voided}`. Once a
//! wager is terminal it stays that way; `Wager::settle` is the single
//! place that mutates status and it refuses everything else.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::EventId;
use super::payout::AmericanOdds;
use super::selection::Selection;

/// Wager identifier.
pub type WagerId = Uuid;

/// Category of bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WagerKind {
    Moneyline,
    PointSpread,
    Total,
    PlayerProp,
    Combination,
}

impl std::fmt::Display for WagerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Moneyline => write!(f, "moneyline"),
            Self::PointSpread => write!(f, "point_spread"),
            Self::Total => write!(f, "total"),
            Self::PlayerProp => write!(f, "player_prop"),
            Self::Combination => write!(f, "combination"),
        }
    }
}

/// Lifecycle status of a wager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WagerStatus {
    Pending,
    Won,
    Lost,
    Push,
    /// Administrative cancellation; stake returned.
    Voided,
}

impl WagerStatus {
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Only pending wagers move, and only into a terminal status.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(self, Self::Pending) && next.is_terminal()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Won => "won",
            Self::Lost => "lost",
            Self::Push => "push",
            Self::Voided => "voided",
        }
    }
}

impl std::fmt::Display for WagerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejections raised while assembling a wager.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WagerError {
    #[error("selection is a {selection} but the wager kind is {kind}")]
    KindMismatch { kind: WagerKind, selection: WagerKind },
    #[error("stake must be positive, got {0}")]
    NonPositiveAmount(Decimal),
}

/// A placed wager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wager {
    pub id: WagerId,
    pub kind: WagerKind,
    /// Stake.
    pub amount: Decimal,
    /// Price quoted at placement.
    pub price: AmericanOdds,
    /// Referenced event. For combinations, the first leg's event.
    pub event_id: EventId,
    pub created_at: DateTime<Utc>,
    selection: Selection,
    status: WagerStatus,
    settled_at: Option<DateTime<Utc>>,
}

impl Wager {
    /// Create a pending wager. The selection must match `kind`.
    pub fn new(
        kind: WagerKind,
        event_id: impl Into<EventId>,
        amount: Decimal,
        price: AmericanOdds,
        selection: Selection,
    ) -> Result<Self, WagerError> {
        if selection.kind() != kind {
            return Err(WagerError::KindMismatch {
                kind,
                selection: selection.kind(),
            });
        }
        if amount <= Decimal::ZERO {
            return Err(WagerError::NonPositiveAmount(amount));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            kind,
            amount,
            price,
            event_id: event_id.into(),
            created_at: Utc::now(),
            selection,
            status: WagerStatus::Pending,
            settled_at: None,
        })
    }

    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    pub const fn status(&self) -> WagerStatus {
        self.status
    }

    pub const fn settled_at(&self) -> Option<DateTime<Utc>> {
        self.settled_at
    }

    pub const fn is_pending(&self) -> bool {
        matches!(self.status, WagerStatus::Pending)
    }

    /// Every event whose score is needed to settle this wager, in leg
    /// order, without duplicates.
    pub fn event_ids(&self) -> Vec<&EventId> {
        let mut ids: Vec<&EventId> = vec![&self.event_id];
        for leg in self.selection.legs() {
            if !ids.contains(&&leg.event_id) {
                ids.push(&leg.event_id);
            }
        }
        ids
    }

    /// Move to a terminal status. Returns the current status unchanged
    /// as the error when the transition is not allowed.
    pub fn settle(&mut self, next: WagerStatus, at: DateTime<Utc>) -> Result<(), WagerStatus> {
        if !self.status.can_transition_to(next) {
            return Err(self.status);
        }
        self.status = next;
        self.settled_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::selection::{LegSelection, Side};
    use rust_decimal_macros::dec;

    fn moneyline() -> Wager {
        Wager::new(
            WagerKind::Moneyline,
            "evt-1",
            dec!(10),
            AmericanOdds::new(-110).unwrap(),
            Selection::Single(LegSelection::Moneyline { side: Side::Home }),
        )
        .unwrap()
    }

    #[test]
    fn test_new_wager_is_pending() {
        let wager = moneyline();
        assert!(wager.is_pending());
        assert!(wager.settled_at().is_none());
        assert_eq!(wager.event_ids(), vec!["evt-1"]);
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let err = Wager::new(
            WagerKind::Total,
            "evt-1",
            dec!(10),
            AmericanOdds::new(-110).unwrap(),
            Selection::Single(LegSelection::Moneyline { side: Side::Home }),
        )
        .unwrap_err();
        assert_eq!(
            err,
            WagerError::KindMismatch {
                kind: WagerKind::Total,
                selection: WagerKind::Moneyline
            }
        );
    }

    #[test]
    fn test_non_positive_stake_rejected() {
        let err = Wager::new(
            WagerKind::Moneyline,
            "evt-1",
            dec!(0),
            AmericanOdds::new(-110).unwrap(),
            Selection::Single(LegSelection::Moneyline { side: Side::Home }),
        )
        .unwrap_err();
        assert_eq!(err, WagerError::NonPositiveAmount(dec!(0)));
    }

    #[test]
    fn test_terminal_status_is_final() {
        let mut wager = moneyline();
        let now = Utc::now();
        assert!(wager.settle(WagerStatus::Won, now).is_ok());
        assert_eq!(wager.status(), WagerStatus::Won);
        assert_eq!(wager.settled_at(), Some(now));

        assert_eq!(wager.settle(WagerStatus::Lost, Utc::now()), Err(WagerStatus::Won));
        assert_eq!(wager.settle(WagerStatus::Pending, Utc::now()), Err(WagerStatus::Won));
        assert_eq!(wager.status(), WagerStatus::Won);
        assert_eq!(wager.settled_at(), Some(now));
    }

    #[test]
    fn test_pending_cannot_reenter_pending() {
        assert!(!WagerStatus::Pending.can_transition_to(WagerStatus::Pending));
        assert!(WagerStatus::Pending.can_transition_to(WagerStatus::Voided));
        assert!(!WagerStatus::Voided.can_transition_to(WagerStatus::Won));
    }
}
