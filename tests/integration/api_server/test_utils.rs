//! Test utilities for API server integration tests

use aetherquant::config::AlpacaCredentials;
use aetherquant::core::engine::{CycleEngine, EngineConfig};
use aetherquant::core::http::{create_router, AppState};
use aetherquant::metrics::Metrics;
use aetherquant::services::{AlpacaClient, PolygonClient};
use axum_test::TestServer;
use backon::ExponentialBuilder;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Test helper for API server integration tests
#[allow(dead_code)]
pub struct TestApiServer {
    pub server: TestServer,
    pub engine: Arc<CycleEngine>,
    pub metrics: Arc<Metrics>,
    pub polygon: MockServer,
    pub alpaca: MockServer,
}

pub fn no_retry() -> ExponentialBuilder {
    ExponentialBuilder::default().with_max_times(0)
}

pub fn credentials() -> AlpacaCredentials {
    AlpacaCredentials {
        key: "test-key".to_string(),
        secret: "test-secret".to_string(),
    }
}

impl TestApiServer {
    /// Engine wired to real REST adapters pointing at mock servers
    pub async fn new() -> Self {
        let polygon = MockServer::start().await;
        let alpaca = MockServer::start().await;

        let quotes = PolygonClient::with_client(&polygon.uri(), "test-poly", reqwest::Client::new())
            .expect("polygon client")
            .with_backoff(no_retry());
        let broker = Arc::new(
            AlpacaClient::with_client(&alpaca.uri(), credentials(), reqwest::Client::new())
                .expect("alpaca client")
                .with_backoff(no_retry()),
        );

        let metrics = Arc::new(Metrics::new().expect("metrics initialization"));
        let engine = CycleEngine::builder(EngineConfig {
            symbol: "SPY".to_string(),
            call_timeout: Duration::from_secs(2),
        })
        .quote_source(Arc::new(quotes))
        .account_source(broker.clone())
        .order_sink(broker)
        .metrics(metrics.clone())
        .build();

        Self::serve(Arc::new(engine), metrics, polygon, alpaca)
    }

    /// Engine with no credentials configured
    pub async fn unconfigured() -> Self {
        let metrics = Arc::new(Metrics::new().expect("metrics initialization"));
        let engine = CycleEngine::builder(EngineConfig::default())
            .metrics(metrics.clone())
            .build();
        Self::serve(
            Arc::new(engine),
            metrics,
            MockServer::start().await,
            MockServer::start().await,
        )
    }

    fn serve(
        engine: Arc<CycleEngine>,
        metrics: Arc<Metrics>,
        polygon: MockServer,
        alpaca: MockServer,
    ) -> Self {
        let state = AppState::new(engine.clone(), metrics.clone());
        let server = TestServer::new(create_router(state)).expect("start test server");
        Self {
            server,
            engine,
            metrics,
            polygon,
            alpaca,
        }
    }
}

pub async fn mock_last_trade(server: &MockServer, price: f64) {
    let response = serde_json::json!({
        "status": "OK",
        "request_id": "test",
        "results": { "T": "SPY", "p": price, "s": 100, "t": 1_700_000_000_000_000_000i64 }
    });

    Mock::given(method("GET"))
        .and(path("/v2/last/trade/SPY"))
        .and(query_param("apiKey", "test-poly"))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .mount(server)
        .await;
}

pub async fn mock_aggregates(server: &MockServer, closes_newest_first: &[f64]) {
    let results: Vec<_> = closes_newest_first
        .iter()
        .map(|c| serde_json::json!({ "c": c, "o": c, "h": c, "l": c, "v": 100, "t": 0 }))
        .collect();

    Mock::given(method("GET"))
        .and(path_regex(r"^/v2/aggs/ticker/SPY/range/1/minute/.+/.+$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "status": "OK", "results": results })),
        )
        .mount(server)
        .await;
}

pub async fn mock_account(server: &MockServer, equity: &str, last_equity: &str) {
    Mock::given(method("GET"))
        .and(path("/v2/account"))
        .and(header("APCA-API-KEY-ID", "test-key"))
        .and(header("APCA-API-SECRET-KEY", "test-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "acct",
            "equity": equity,
            "last_equity": last_equity,
            "status": "ACTIVE"
        })))
        .mount(server)
        .await;
}

pub async fn mock_close_all(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("DELETE"))
        .and(path("/v2/positions"))
        .and(query_param("cancel_orders", "true"))
        .respond_with(template)
        .mount(server)
        .await;
}
