//! Request Budget - Score Provider Quota Enforcement
//!
//! Enforces the provider request budget:
//! - Per-second rate limit (governor token bucket)
//! - Daily cap, reset at the UTC day boundary
//! - Monthly cap, reset on the first UTC day of the month
//!
//! Exhausting a cap is not an error for any wager; the scheduler just
//! stops fetching for the rest of the run.

use std::num::NonZeroU32;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::BudgetConfig;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BudgetExhausted {
  #[error("daily cap of {cap} requests reached")]
  Daily { cap: u32 },
  #[error("monthly cap of {cap} requests reached")]
  Monthly { cap: u32 },
}

/// Requests consumed in the current windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetUsage {
  /// Requests issued today (UTC).
  pub daily_used: u32,
  /// Requests issued this month (UTC).
  pub monthly_used: u32,
}

#[derive(Debug)]
struct Windows {
  day: NaiveDate,
  month: (i32, u32),
  daily_used: u32,
  monthly_used: u32,
}

impl Windows {
  fn starting(now: DateTime<Utc>) -> Self {
    let day = now.date_naive();
    Self {
      day,
      month: (day.year(), day.month()),
      daily_used: 0,
      monthly_used: 0,
    }
  }

  /// Reset counters whose window has rolled over.
  fn roll(&mut self, now: DateTime<Utc>) {
    let day = now.date_naive();
    let month = (day.year(), day.month());
    if month != self.month {
      info!(
        used = self.monthly_used,
        "Monthly score request budget reset"
      );
      self.month = month;
      self.monthly_used = 0;
    }
    if day != self.day {
      info!(used = self.daily_used, "Daily score request budget reset");
      self.day = day;
      self.daily_used = 0;
    }
  }
}

/// Shared request budget toward the score provider.
pub struct RequestBudget {
  /// Per-second limiter; `None` when disabled.
  limiter: Option<DirectLimiter>,
  /// Daily cap.
  daily_cap: u32,
  /// Monthly cap.
  monthly_cap: u32,
  /// Current window counters.
  windows: Mutex<Windows>,
}

impl RequestBudget {
  /// Create a budget from config.
  pub fn new(config: &BudgetConfig) -> Self {
    let limiter = NonZeroU32::new(config.requests_per_second)
      .map(|rps| RateLimiter::direct(Quota::per_second(rps)));
    Self {
      limiter,
      daily_cap: config.daily_cap,
      monthly_cap: config.monthly_cap,
      windows: Mutex::new(Windows::starting(Utc::now())),
    }
  }

  /// Reserve one request now, waiting for the per-second limiter.
  pub async fn acquire(&self) -> Result<(), BudgetExhausted> {
    self.acquire_at(Utc::now()).await
  }

  /// Reserve one request as of `now`.
  pub async fn acquire_at(&self, now: DateTime<Utc>) -> Result<(), BudgetExhausted> {
    {
      let mut windows = self.windows.lock().await;
      windows.roll(now);

      if windows.monthly_used >= self.monthly_cap {
        warn!(cap = self.monthly_cap, "Monthly score request cap reached");
        return Err(BudgetExhausted::Monthly {
          cap: self.monthly_cap,
        });
      }
      if windows.daily_used >= self.daily_cap {
        warn!(cap = self.daily_cap, "Daily score request cap reached");
        return Err(BudgetExhausted::Daily {
          cap: self.daily_cap,
        });
      }

      windows.daily_used += 1;
      windows.monthly_used += 1;
    }

    if let Some(limiter) = &self.limiter {
      limiter.until_ready().await;
    }
    Ok(())
  }

  /// Current usage, after rolling windows forward to `now`.
  pub async fn usage_at(&self, now: DateTime<Utc>) -> BudgetUsage {
    let mut windows = self.windows.lock().await;
    windows.roll(now);
    BudgetUsage {
      daily_used: windows.daily_used,
      monthly_used: windows.monthly_used,
    }
  }

  /// Current usage.
  pub async fn usage(&self) -> BudgetUsage {
    self.usage_at(Utc::now()).await
  }
}
