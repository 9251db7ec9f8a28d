//! Pre-execution risk policies.

use crate::models::signal::Signal;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Approves or blocks a signal before execution is attempted.
///
/// Policies may read account state but must not mutate it.
#[async_trait]
pub trait RiskGate: Send + Sync {
    async fn approve(&self, signal: Signal, price: Decimal) -> bool;
}

/// Placeholder policy that lets every signal through
#[derive(Debug, Default, Clone, Copy)]
pub struct ApproveAll;

#[async_trait]
impl RiskGate for ApproveAll {
    async fn approve(&self, _signal: Signal, _price: Decimal) -> bool {
        true
    }
}
