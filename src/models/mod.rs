//! Shared data models spanning the engine layers.

pub mod account;
pub mod cycle;
pub mod market;
pub mod signal;

pub use account::{AccountSnapshot, PerformanceReport, StopOutcome};
pub use cycle::{CycleResult, EngineSnapshot};
pub use market::{MarketSnapshot, Quote};
pub use signal::{Classification, Signal};
