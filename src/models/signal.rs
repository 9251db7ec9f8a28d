use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete outcome of classifying a price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Hold => "HOLD",
        }
    }

    /// BUY and SELL would move a position; HOLD never does
    pub fn is_actionable(&self) -> bool {
        !matches!(self, Signal::Hold)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signal plus the human-readable reasoning that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub signal: Signal,
    pub rationale: String,
}

impl Classification {
    pub fn new(signal: Signal, rationale: impl Into<String>) -> Self {
        Self {
            signal,
            rationale: rationale.into(),
        }
    }
}
