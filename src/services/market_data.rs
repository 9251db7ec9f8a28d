//! Market data provider interface.

use crate::error::ProviderResult;
use crate::models::market::Quote;
use async_trait::async_trait;
use rust_decimal::Decimal;

#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Get the latest traded price for a symbol
    async fn latest_quote(&self, symbol: &str) -> ProviderResult<Quote>;

    /// Get up to `limit` recent one-minute closes, oldest first
    async fn recent_closes(&self, symbol: &str, limit: usize) -> ProviderResult<Vec<Decimal>>;
}
