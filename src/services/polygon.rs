//! Polygon (Massive) REST market data client

use crate::error::{ProviderError, ProviderResult};
use crate::models::market::Quote;
use crate::services::market_data::QuoteSource;
use crate::services::rest::{build_client, default_backoff, parse_base_url, send_json};
use async_trait::async_trait;
use backon::ExponentialBuilder;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.polygon.io";

/// Calendar days searched for minute bars so weekends and holidays still return data
const AGGREGATE_LOOKBACK_DAYS: i64 = 5;

pub struct PolygonClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    backoff: ExponentialBuilder,
}

#[derive(Debug, Deserialize)]
struct LastTradeResponse {
    results: Option<LastTrade>,
}

#[derive(Debug, Deserialize)]
struct LastTrade {
    #[serde(rename = "p")]
    price: Option<f64>,
    /// SIP timestamp in nanoseconds
    #[serde(rename = "t")]
    timestamp_ns: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AggregatesResponse {
    #[serde(default)]
    results: Vec<Aggregate>,
}

#[derive(Debug, Deserialize)]
struct Aggregate {
    #[serde(rename = "c")]
    close: f64,
}

impl PolygonClient {
    pub fn new(api_key: impl Into<String>) -> ProviderResult<Self> {
        Self::with_client(DEFAULT_BASE_URL, api_key, build_client()?)
    }

    /// Build against a custom endpoint (tests, proxies)
    pub fn with_client(
        base_url: &str,
        api_key: impl Into<String>,
        http: reqwest::Client,
    ) -> ProviderResult<Self> {
        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
            api_key: api_key.into(),
            backoff: default_backoff(),
        })
    }

    pub fn with_backoff(mut self, backoff: ExponentialBuilder) -> Self {
        self.backoff = backoff;
        self
    }

    fn endpoint(&self, path: &str) -> ProviderResult<Url> {
        Ok(self.base_url.join(path)?)
    }
}

#[async_trait]
impl QuoteSource for PolygonClient {
    async fn latest_quote(&self, symbol: &str) -> ProviderResult<Quote> {
        let url = self.endpoint(&format!("v2/last/trade/{}", symbol))?;
        let response: LastTradeResponse = send_json("polygon last trade", &self.backoff, || {
            self.http
                .get(url.clone())
                .query(&[("apiKey", self.api_key.as_str())])
        })
        .await?;

        let trade = response
            .results
            .ok_or_else(|| ProviderError::Malformed(format!("no last trade for {}", symbol)))?;
        let raw_price = trade
            .price
            .ok_or_else(|| ProviderError::Malformed(format!("last trade for {} has no price", symbol)))?;
        let price = Decimal::from_f64(raw_price)
            .filter(|p| p.is_sign_positive() && !p.is_zero())
            .ok_or_else(|| {
                ProviderError::Malformed(format!("invalid price {} for {}", raw_price, symbol))
            })?;
        let observed_at = trade
            .timestamp_ns
            .map(DateTime::<Utc>::from_timestamp_nanos)
            .unwrap_or_else(Utc::now);

        debug!(symbol = %symbol, price = %price, "PolygonClient: fetched last trade for {}", symbol);
        Ok(Quote::new(symbol, price, observed_at))
    }

    async fn recent_closes(&self, symbol: &str, limit: usize) -> ProviderResult<Vec<Decimal>> {
        let today = Utc::now().date_naive();
        let from = today - ChronoDuration::days(AGGREGATE_LOOKBACK_DAYS);
        let url = self.endpoint(&format!(
            "v2/aggs/ticker/{}/range/1/minute/{}/{}",
            symbol,
            from.format("%Y-%m-%d"),
            today.format("%Y-%m-%d")
        ))?;
        let limit = limit.to_string();

        let response: AggregatesResponse = send_json("polygon aggregates", &self.backoff, || {
            self.http.get(url.clone()).query(&[
                ("adjusted", "true"),
                ("sort", "desc"),
                ("limit", limit.as_str()),
                ("apiKey", self.api_key.as_str()),
            ])
        })
        .await?;

        // Newest first on the wire, oldest first for callers
        let mut closes = response
            .results
            .iter()
            .map(|bar| {
                Decimal::from_f64(bar.close).ok_or_else(|| {
                    ProviderError::Malformed(format!("invalid close {} for {}", bar.close, symbol))
                })
            })
            .collect::<ProviderResult<Vec<_>>>()?;
        closes.reverse();

        debug!(symbol = %symbol, count = closes.len(), "PolygonClient: fetched {} closes", closes.len());
        Ok(closes)
    }
}
