//! Price classification strategies.

use crate::models::signal::{Classification, Signal};
use rust_decimal::Decimal;

/// Maps a price to a trading signal.
///
/// Implementations must be deterministic and free of side effects; the cycle
/// engine calls them with the lock held.
pub trait SignalEngine: Send + Sync {
    fn classify(&self, price: Decimal) -> Classification;

    fn name(&self) -> &str {
        "custom"
    }
}

/// Fixed-band classifier: above the upper bound buys, below the lower bound sells.
///
/// Prices exactly on a bound are held.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSignalEngine {
    lower: Decimal,
    upper: Decimal,
}

impl ThresholdSignalEngine {
    pub fn new(lower: Decimal, upper: Decimal) -> Self {
        debug_assert!(lower <= upper, "lower threshold above upper threshold");
        Self { lower, upper }
    }

    pub fn lower(&self) -> Decimal {
        self.lower
    }

    pub fn upper(&self) -> Decimal {
        self.upper
    }
}

impl Default for ThresholdSignalEngine {
    fn default() -> Self {
        Self::new(Decimal::from(500), Decimal::from(510))
    }
}

impl SignalEngine for ThresholdSignalEngine {
    fn classify(&self, price: Decimal) -> Classification {
        let (signal, reason) = if price > self.upper {
            (Signal::Buy, format!("above {}", self.upper))
        } else if price < self.lower {
            (Signal::Sell, format!("below {}", self.lower))
        } else {
            (Signal::Hold, format!("within {}..={}", self.lower, self.upper))
        };

        Classification::new(
            signal,
            format!("price ${:.2} {} -> Signal: {}", price, reason, signal),
        )
    }

    fn name(&self) -> &str {
        "threshold"
    }
}
