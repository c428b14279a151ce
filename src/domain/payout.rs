//! Settled-return arithmetic over quoted American odds.
//!
//! Prices are quoted at placement time and never computed here. This
//! module only converts them and applies them to a settled outcome:
//! a win returns stake × decimal price, a push returns the stake, a
//! loss returns nothing. Combination prices are rebuilt from the legs
//! that won, so pushed legs drop out of the product.
//!
//! Products use checked multiplication. An overflowing price or return
//! is `None` rather than a panic.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::combination::won_leg_indices;
use super::outcome::Outcome;
use super::selection::Leg;

/// American odds (`-110`, `+150`). Magnitude is always at least 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct AmericanOdds(i32);

impl AmericanOdds {
    /// Validate a quoted price. `None` for magnitudes under 100.
    pub const fn new(odds: i32) -> Option<Self> {
        if odds >= 100 || odds <= -100 {
            Some(Self(odds))
        } else {
            None
        }
    }

    pub const fn value(self) -> i32 {
        self.0
    }

    /// Decimal (European) odds: total return per unit staked.
    ///
    /// `+150` → 2.5, `-110` → 1.9090…
    pub fn to_decimal(self) -> Decimal {
        let odds = Decimal::from(self.0);
        if self.0 > 0 {
            Decimal::ONE + odds / dec!(100)
        } else {
            Decimal::ONE + dec!(100) / odds.abs()
        }
    }
}

impl TryFrom<i32> for AmericanOdds {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("invalid American odds {value}"))
    }
}

impl From<AmericanOdds> for i32 {
    fn from(odds: AmericanOdds) -> Self {
        odds.0
    }
}

impl std::fmt::Display for AmericanOdds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 > 0 {
            write!(f, "+{}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Decimal price of a settled combination: product of the decimal
/// prices of the legs that won. Pushed legs contribute nothing.
///
/// `outcomes` is indexed like `legs`. `None` if the product overflows.
pub fn combination_price(legs: &[Leg], outcomes: &[Outcome]) -> Option<Decimal> {
    won_leg_indices(outcomes)
        .into_iter()
        .filter_map(|i| legs.get(i))
        .try_fold(Decimal::ONE, |acc, leg| acc.checked_mul(leg.price.to_decimal()))
}

/// Amount returned to the bettor for a settled outcome, rounded to
/// cents. `None` while the outcome is still pending, or when a win
/// overflows.
pub fn settled_return(stake: Decimal, decimal_price: Decimal, outcome: Outcome) -> Option<Decimal> {
    let amount = match outcome {
        Outcome::Won => stake.checked_mul(decimal_price)?,
        Outcome::Push => stake,
        Outcome::Lost => Decimal::ZERO,
        Outcome::Pending => return None,
    };
    Some(amount.round_dp(2))
}
