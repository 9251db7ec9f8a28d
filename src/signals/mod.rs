//! Signal classification interfaces.

pub mod engine;

pub use engine::{SignalEngine, ThresholdSignalEngine};
