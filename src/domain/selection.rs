//! Structured wager selections.
//!
//! A `Selection` is produced once by the parser when a wager is created
//! and never changes afterwards. Combination legs use `LegSelection`,
//! which has no combination variant, so legs cannot nest.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::event::EventId;
use super::payout::AmericanOdds;
use super::wager::WagerKind;

/// Which team a selection backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    /// The other team.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Home => Self::Away,
            Self::Away => Self::Home,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Home => write!(f, "home"),
            Self::Away => write!(f, "away"),
        }
    }
}

/// Over/under direction for totals and player props.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Over,
    Under,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Over => write!(f, "over"),
            Self::Under => write!(f, "under"),
        }
    }
}

/// A single-market selection. Also the shape of every combination leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LegSelection {
    Moneyline {
        side: Side,
    },
    /// `spread` is always stored signed; zero is pick'em.
    PointSpread {
        side: Side,
        spread: Decimal,
    },
    Total {
        direction: Direction,
        line: Decimal,
    },
    /// Settled manually; the resolver never decides these.
    PlayerProp {
        player_id: String,
        market: String,
        line: Decimal,
        direction: Direction,
    },
}

impl LegSelection {
    pub const fn kind(&self) -> WagerKind {
        match self {
            Self::Moneyline { .. } => WagerKind::Moneyline,
            Self::PointSpread { .. } => WagerKind::PointSpread,
            Self::Total { .. } => WagerKind::Total,
            Self::PlayerProp { .. } => WagerKind::PlayerProp,
        }
    }
}

/// One leg of a combination wager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    /// Event this leg is settled against.
    pub event_id: EventId,
    /// Quoted price of the leg on its own.
    pub price: AmericanOdds,
    pub selection: LegSelection,
}

/// Parsed selection attached to a wager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    Single(LegSelection),
    /// Ordered legs; never empty once parsed.
    Combination(Vec<Leg>),
}

impl Selection {
    /// Wager kind this selection belongs to.
    pub const fn kind(&self) -> WagerKind {
        match self {
            Self::Single(leg) => leg.kind(),
            Self::Combination(_) => WagerKind::Combination,
        }
    }

    /// Combination legs, or an empty slice for single selections.
    pub fn legs(&self) -> &[Leg] {
        match self {
            Self::Single(_) => &[],
            Self::Combination(legs) => legs,
        }
    }
}
