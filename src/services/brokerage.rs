//! Brokerage provider interfaces.

use crate::error::ProviderResult;
use crate::models::account::AccountSnapshot;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait AccountSource: Send + Sync {
    /// Current equity alongside the equity at the previous close
    async fn account_snapshot(&self) -> ProviderResult<AccountSnapshot>;
}

#[async_trait]
pub trait OrderSink: Send + Sync {
    /// Close every open position and cancel every open order in one request
    async fn flatten_all(&self) -> ProviderResult<FlattenSummary>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenSummary {
    pub positions_closed: usize,
    /// Symbols the brokerage refused to close
    pub failed: Vec<String>,
}
