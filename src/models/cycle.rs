use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::signal::Signal;

pub const ACTION_SUSPENDED: &str = "suspended (emergency stop active)";
pub const ACTION_BLOCKED: &str = "blocked by risk gate";
pub const ACTION_SKIPPED: &str = "skipped";
pub const ACTION_NONE: &str = "none";
pub const BUSY_MESSAGE: &str = "cycle already in progress";

/// Outcome of one decision cycle, built once and never modified afterwards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleResult {
    pub success: bool,
    pub signal: Option<Signal>,
    #[serde(with = "rust_decimal::serde::float_option", default)]
    pub price: Option<Decimal>,
    pub rationale: String,
    pub action_taken: String,
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl CycleResult {
    /// A cycle that ran the whole pipeline
    pub fn completed(
        signal: Signal,
        price: Decimal,
        rationale: impl Into<String>,
        action_taken: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            signal: Some(signal),
            price: Some(price),
            rationale: rationale.into(),
            action_taken: action_taken.into(),
            error: None,
            completed_at: Utc::now(),
        }
    }

    /// A cycle that could not obtain a usable quote
    pub fn failed(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            signal: None,
            price: None,
            rationale: format!("Error: {}", error),
            action_taken: ACTION_NONE.to_string(),
            error: Some(error),
            completed_at: Utc::now(),
        }
    }

    /// Returned to a caller that arrived while another cycle held the lock
    pub fn busy() -> Self {
        Self {
            success: false,
            signal: None,
            price: None,
            rationale: "Another cycle is running, request rejected".to_string(),
            action_taken: ACTION_SKIPPED.to_string(),
            error: Some(BUSY_MESSAGE.to_string()),
            completed_at: Utc::now(),
        }
    }

    /// Short-circuit while the emergency stop is active
    pub fn suspended() -> Self {
        Self {
            success: true,
            signal: None,
            price: None,
            rationale: "Emergency stop active, cycle skipped".to_string(),
            action_taken: ACTION_SUSPENDED.to_string(),
            error: None,
            completed_at: Utc::now(),
        }
    }

    pub fn is_busy(&self) -> bool {
        !self.success && self.error.as_deref() == Some(BUSY_MESSAGE)
    }

    pub fn is_suspended(&self) -> bool {
        self.action_taken == ACTION_SUSPENDED
    }

    /// Outcome label used for metrics and logs
    pub fn outcome(&self) -> &'static str {
        if self.is_busy() {
            "busy"
        } else if self.is_suspended() {
            "suspended"
        } else if !self.success {
            "failed"
        } else if self.action_taken == ACTION_BLOCKED {
            "blocked"
        } else {
            "ok"
        }
    }
}

/// Point-in-time copy of the engine state for status reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub running: bool,
    pub stopped: bool,
    pub last_result: Option<CycleResult>,
}
