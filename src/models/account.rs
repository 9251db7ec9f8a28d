use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Equity reported when the brokerage cannot be reached
pub const FALLBACK_EQUITY: i64 = 100_000;

/// Account equity now and at the previous close
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub equity: Decimal,
    pub prior_equity: Decimal,
    pub as_of: DateTime<Utc>,
}

impl AccountSnapshot {
    pub fn pnl_today(&self) -> Decimal {
        self.equity - self.prior_equity
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    #[serde(with = "rust_decimal::serde::float")]
    pub equity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub pnl_today: Decimal,
    /// Why defaults were served instead of live figures
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub note: Option<String>,
}

impl PerformanceReport {
    pub fn from_snapshot(snapshot: &AccountSnapshot) -> Self {
        Self {
            equity: snapshot.equity,
            pnl_today: snapshot.pnl_today(),
            note: None,
        }
    }

    pub fn degraded(note: impl Into<String>) -> Self {
        Self {
            equity: Decimal::from(FALLBACK_EQUITY),
            pnl_today: Decimal::ZERO,
            note: Some(note.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.note.is_some()
    }
}

/// Outcome of an emergency stop request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopOutcome {
    pub success: bool,
    pub message: String,
}
