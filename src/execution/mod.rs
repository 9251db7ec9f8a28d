//! Execution policies for approved signals.

use crate::models::signal::Signal;
use async_trait::async_trait;
use tracing::debug;

pub const PAPER_ACTION: &str = "paper mode - no trade executed";

/// Acts on an approved signal and reports what was done.
///
/// Must accept every signal, HOLD included.
#[async_trait]
pub trait ExecutionDispatcher: Send + Sync {
    async fn execute(&self, signal: Signal) -> String;
}

/// Observation-only execution: nothing is ever sent to the brokerage
#[derive(Debug, Default, Clone, Copy)]
pub struct PaperExecution;

#[async_trait]
impl ExecutionDispatcher for PaperExecution {
    async fn execute(&self, signal: Signal) -> String {
        debug!(signal = %signal, "PaperExecution: skipping order submission");
        PAPER_ACTION.to_string()
    }
}
