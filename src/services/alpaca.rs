//! Alpaca REST brokerage client (account snapshot and position flattening)

use crate::config::AlpacaCredentials;
use crate::error::{ProviderError, ProviderResult};
use crate::models::account::AccountSnapshot;
use crate::services::brokerage::{AccountSource, FlattenSummary, OrderSink};
use crate::services::rest::{build_client, default_backoff, parse_base_url, send_json};
use async_trait::async_trait;
use backon::ExponentialBuilder;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use tracing::{info, warn};
use url::Url;

pub const PAPER_BASE_URL: &str = "https://paper-api.alpaca.markets";
pub const LIVE_BASE_URL: &str = "https://api.alpaca.markets";

const KEY_HEADER: &str = "APCA-API-KEY-ID";
const SECRET_HEADER: &str = "APCA-API-SECRET-KEY";

pub struct AlpacaClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: AlpacaCredentials,
    backoff: ExponentialBuilder,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    equity: String,
    last_equity: String,
}

/// One entry of the multi-status body returned when closing all positions
#[derive(Debug, Deserialize)]
struct ClosePositionStatus {
    symbol: String,
    status: u16,
}

impl AlpacaClient {
    /// Connect to the paper or live trading endpoint
    pub fn new(credentials: AlpacaCredentials, paper: bool) -> ProviderResult<Self> {
        let base_url = if paper { PAPER_BASE_URL } else { LIVE_BASE_URL };
        Self::with_client(base_url, credentials, build_client()?)
    }

    pub fn with_client(
        base_url: &str,
        credentials: AlpacaCredentials,
        http: reqwest::Client,
    ) -> ProviderResult<Self> {
        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
            credentials,
            backoff: default_backoff(),
        })
    }

    pub fn with_backoff(mut self, backoff: ExponentialBuilder) -> Self {
        self.backoff = backoff;
        self
    }

    fn request(&self, method: reqwest::Method, url: &Url) -> reqwest::RequestBuilder {
        self.http
            .request(method, url.clone())
            .header(KEY_HEADER, &self.credentials.key)
            .header(SECRET_HEADER, &self.credentials.secret)
    }
}

fn parse_amount(field: &str, raw: &str) -> ProviderResult<Decimal> {
    Decimal::from_str(raw.trim())
        .map_err(|e| ProviderError::Malformed(format!("account {} '{}': {}", field, raw, e)))
}

#[async_trait]
impl AccountSource for AlpacaClient {
    async fn account_snapshot(&self) -> ProviderResult<AccountSnapshot> {
        let url = self.base_url.join("v2/account")?;
        let account: AccountResponse = send_json("alpaca account", &self.backoff, || {
            self.request(reqwest::Method::GET, &url)
        })
        .await?;

        Ok(AccountSnapshot {
            equity: parse_amount("equity", &account.equity)?,
            prior_equity: parse_amount("last_equity", &account.last_equity)?,
            as_of: Utc::now(),
        })
    }
}

#[async_trait]
impl OrderSink for AlpacaClient {
    async fn flatten_all(&self) -> ProviderResult<FlattenSummary> {
        let url = self.base_url.join("v2/positions")?;
        let statuses: Vec<ClosePositionStatus> =
            send_json("alpaca close all positions", &self.backoff, || {
                self.request(reqwest::Method::DELETE, &url)
                    .query(&[("cancel_orders", "true")])
            })
            .await?;

        let (closed, failed): (Vec<_>, Vec<_>) = statuses
            .into_iter()
            .partition(|s| (200..300).contains(&s.status));
        let summary = FlattenSummary {
            positions_closed: closed.len(),
            failed: failed.into_iter().map(|s| s.symbol).collect(),
        };

        if summary.failed.is_empty() {
            info!(
                positions_closed = summary.positions_closed,
                "AlpacaClient: flattened {} positions",
                summary.positions_closed
            );
        } else {
            warn!(
                positions_closed = summary.positions_closed,
                failed = ?summary.failed,
                "AlpacaClient: some positions could not be closed"
            );
        }
        Ok(summary)
    }
}
