//! Placement Use Case - Wager Creation
//!
//! Parses the submitted selection text against the stored event(s) and
//! persists a pending wager. A selection that does not parse blocks
//! creation; nothing is stored.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::domain::event::{Event, EventId};
use crate::domain::parser::{self, LegInput, ParseError};
use crate::domain::payout::AmericanOdds;
use crate::domain::wager::{Wager, WagerError, WagerKind};
use crate::ports::repository::WagerRepository;

/// A wager submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementRequest {
  /// Moneyline, point-spread, total or player-prop on one event.
  Single {
    event_id: EventId,
    kind: WagerKind,
    selection_text: String,
    amount: Decimal,
    /// Quoted American odds.
    price: i32,
  },
  /// Multi-leg combination; every leg names its own event.
  Combination {
    legs: Vec<LegInput>,
    amount: Decimal,
    /// Quoted American odds for the whole combination.
    price: i32,
  },
}

/// Why a wager was not created.
#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
  #[error("invalid selection: {0}")]
  Validation(#[from] ParseError),
  /// Single wagers only; combination legs fail with `ParseError::UnknownLegEvent`.
  #[error("unknown event {0}")]
  UnknownEvent(EventId),
  #[error("invalid price {0}")]
  InvalidPrice(i32),
  #[error(transparent)]
  Wager(#[from] WagerError),
  #[error(transparent)]
  Storage(#[from] anyhow::Error),
}

/// Wager creation path.
pub struct WagerPlacement<R: WagerRepository> {
  repo: Arc<R>,
}

impl<R: WagerRepository> WagerPlacement<R> {
  pub fn new(repo: Arc<R>) -> Self {
    Self { repo }
  }

  /// Validate and store a new pending wager.
  #[instrument(skip(self, request))]
  pub async fn place(&self, request: PlacementRequest) -> Result<Wager, PlacementError> {
    let wager = match request {
      PlacementRequest::Single {
        event_id,
        kind,
        selection_text,
        amount,
        price,
      } => {
        let price = AmericanOdds::new(price).ok_or(PlacementError::InvalidPrice(price))?;
        let event = self.load_event(&event_id).await?;
        let selection = parser::parse(&selection_text, kind, &event.home_team, &event.away_team)
          .inspect_err(|e| {
            warn!(event_id = %event_id, kind = %kind, text = %selection_text, error = %e, "Rejected selection");
          })?;
        Wager::new(kind, event_id, amount, price, selection)?
      }
      PlacementRequest::Combination { legs, amount, price } => {
        let price = AmericanOdds::new(price).ok_or(PlacementError::InvalidPrice(price))?;
        let first = legs
          .first()
          .map(|leg| leg.event_id.clone())
          .ok_or(ParseError::EmptyCombination)?;

        // Unknown leg events are left out; the parser names the leg.
        let mut events = HashMap::new();
        for leg in &legs {
          if !events.contains_key(&leg.event_id) {
            if let Some(event) = self.repo.event(&leg.event_id).await? {
              events.insert(leg.event_id.clone(), event);
            }
          }
        }

        let selection = parser::parse_combination(&legs, &events).inspect_err(|e| {
          warn!(legs = legs.len(), error = %e, "Rejected combination");
        })?;
        Wager::new(WagerKind::Combination, first, amount, price, selection)?
      }
    };

    self.repo.insert_wager(&wager).await?;

    info!(
      wager_id = %wager.id,
      event_id = %wager.event_id,
      kind = %wager.kind,
      amount = %wager.amount,
      price = %wager.price,
      "Wager placed"
    );
    Ok(wager)
  }

  async fn load_event(&self, id: &EventId) -> Result<Event, PlacementError> {
    self
      .repo
      .event(id)
      .await?
      .ok_or_else(|| PlacementError::UnknownEvent(id.clone()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::persistence::WagerStore;
  use crate::domain::selection::{LegSelection, Selection, Side};
  use rust_decimal_macros::dec;

  async fn placement() -> (WagerPlacement<WagerStore>, Arc<WagerStore>) {
    let store = Arc::new(WagerStore::in_memory());
    store
      .upsert_event(&Event::new("evt-1", "americanfootball_nfl", "Home Team", "Away Team"))
      .await
      .unwrap();
    (WagerPlacement::new(Arc::clone(&store)), store)
  }

  #[tokio::test]
  async fn test_place_spread_defaults_to_negative() {
    let (placement, store) = placement().await;
    let wager = placement
      .place(PlacementRequest::Single {
        event_id: "evt-1".to_string(),
        kind: WagerKind::PointSpread,
        selection_text: "Away Team 7.5".to_string(),
        amount: dec!(20),
        price: -110,
      })
      .await
      .unwrap();

    assert_eq!(
      wager.selection(),
      &Selection::Single(LegSelection::PointSpread {
        side: Side::Away,
        spread: dec!(-7.5),
      })
    );
    assert_eq!(store.pending_wagers().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_unparseable_selection_blocks_creation() {
    let (placement, store) = placement().await;
    let result = placement
      .place(PlacementRequest::Single {
        event_id: "evt-1".to_string(),
        kind: WagerKind::Moneyline,
        selection_text: "Somebody Else".to_string(),
        amount: dec!(20),
        price: -110,
      })
      .await;

    assert!(matches!(result, Err(PlacementError::Validation(ParseError::NoTeamMatch { .. }))));
    assert!(store.pending_wagers().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_unknown_event_rejected() {
    let (placement, _) = placement().await;
    let result = placement
      .place(PlacementRequest::Single {
        event_id: "nope".to_string(),
        kind: WagerKind::Moneyline,
        selection_text: "Home Team".to_string(),
        amount: dec!(20),
        price: -110,
      })
      .await;
    assert!(matches!(result, Err(PlacementError::UnknownEvent(id)) if id == "nope"));
  }

  #[tokio::test]
  async fn test_unknown_leg_event_names_the_leg() {
    let (placement, store) = placement().await;
    let result = placement
      .place(PlacementRequest::Combination {
        legs: vec![
          LegInput {
            event_id: "evt-1".to_string(),
            kind: WagerKind::Moneyline,
            text: "Home Team".to_string(),
            price: -110,
          },
          LegInput {
            event_id: "nope".to_string(),
            kind: WagerKind::Total,
            text: "over 40".to_string(),
            price: -110,
          },
        ],
        amount: dec!(5),
        price: 260,
      })
      .await;

    assert!(matches!(
      result,
      Err(PlacementError::Validation(ParseError::UnknownLegEvent { index: 1, event_id }))
        if event_id == "nope"
    ));
    assert!(store.pending_wagers().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_invalid_price_rejected() {
    let (placement, _) = placement().await;
    let result = placement
      .place(PlacementRequest::Single {
        event_id: "evt-1".to_string(),
        kind: WagerKind::Moneyline,
        selection_text: "Home Team".to_string(),
        amount: dec!(20),
        price: 50,
      })
      .await;
    assert!(matches!(result, Err(PlacementError::InvalidPrice(50))));
  }

  #[tokio::test]
  async fn test_empty_combination_rejected() {
    let (placement, _) = placement().await;
    let result = placement
      .place(PlacementRequest::Combination {
        legs: Vec::new(),
        amount: dec!(5),
        price: 260,
      })
      .await;
    assert!(matches!(result, Err(PlacementError::Validation(ParseError::EmptyCombination))));
  }

  #[tokio::test]
  async fn test_combination_uses_first_leg_event() {
    let (placement, store) = placement().await;
    store
      .upsert_event(&Event::new("evt-2", "basketball_nba", "Lakers", "Celtics"))
      .await
      .unwrap();

    let wager = placement
      .place(PlacementRequest::Combination {
        legs: vec![
          LegInput {
            event_id: "evt-2".to_string(),
            kind: WagerKind::Total,
            text: "over 210.5".to_string(),
            price: -110,
          },
          LegInput {
            event_id: "evt-1".to_string(),
            kind: WagerKind::Moneyline,
            text: "Home Team".to_string(),
            price: 120,
          },
        ],
        amount: dec!(5),
        price: 264,
      })
      .await
      .unwrap();

    assert_eq!(wager.kind, WagerKind::Combination);
    assert_eq!(wager.event_id, "evt-2");
    assert_eq!(wager.event_ids(), vec!["evt-2", "evt-1"]);
  }
}
