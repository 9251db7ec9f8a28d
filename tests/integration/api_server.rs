//! Integration tests for the API Server
//!
//! Tests HTTP endpoints against a real engine whose collaborators talk to
//! mock provider servers.

#[path = "api_server/test_utils.rs"]
mod test_utils;

use serde_json::{json, Value};
use wiremock::ResponseTemplate;

use test_utils::{
    mock_account, mock_aggregates, mock_close_all, mock_last_trade, TestApiServer,
};

#[tokio::test]
async fn health_endpoint_reports_healthy_status() {
    let app = TestApiServer::new().await;
    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert!(body["uptime_seconds"].as_u64().is_some());
    assert_eq!(body["service"], "aetherquant-cycle-engine");
}

#[tokio::test]
async fn health_reports_degraded_while_stopped() {
    let app = TestApiServer::unconfigured().await;
    app.server.post("/api/emergency_stop").await;

    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["stopped"], true);

    app.server.post("/api/resume").await;
    let body: Value = app.server.get("/health").await.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn status_reports_initial_engine_state() {
    let app = TestApiServer::new().await;
    let response = app.server.get("/api/status").await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["status"], "online");
    assert!(body["time"].is_string());
    assert_eq!(body["message"], "Ready - cycles active");
    assert_eq!(body["running"], true);
    assert_eq!(body["stopped"], false);
    assert!(body["last_result"].is_null());
    assert_eq!(body["quotes_connected"], true);
    assert_eq!(body["broker_connected"], true);
}

#[tokio::test]
async fn agent_cycle_returns_flattened_result() {
    let app = TestApiServer::new().await;
    mock_last_trade(&app.polygon, 505.0).await;

    let response = app.server.post("/api/agent_cycle").await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["signal"], "HOLD");
    assert_eq!(body["price"], 505.0);
    assert_eq!(body["action_taken"], "paper mode - no trade executed");
    assert!(body["error"].is_null());
    assert!(body["thought_stream"]
        .as_str()
        .is_some_and(|t| t.contains("505.00")));

    let status: Value = app.server.get("/api/status").await.json();
    assert_eq!(status["last_result"]["signal"], "HOLD");
}

#[tokio::test]
async fn agent_cycle_reports_provider_failure() {
    let app = TestApiServer::new().await;
    // No mock mounted: the mock server answers 404

    let body: Value = app.server.post("/api/agent_cycle").await.json();
    assert_eq!(body["success"], false);
    assert!(body["signal"].is_null());
    assert!(body["thought_stream"]
        .as_str()
        .is_some_and(|t| t.starts_with("Error:")));
    assert!(body["error"].as_str().is_some_and(|e| e.contains("404")));
}

#[tokio::test]
async fn agent_cycle_without_credentials_reports_not_connected() {
    let app = TestApiServer::unconfigured().await;
    let body: Value = app.server.post("/api/agent_cycle").await.json();
    assert_eq!(body["success"], false);
    assert!(body["thought_stream"]
        .as_str()
        .is_some_and(|t| t.contains("not connected")));
}

#[tokio::test]
async fn emergency_stop_flattens_and_suspends_cycles() {
    let app = TestApiServer::new().await;
    mock_last_trade(&app.polygon, 520.0).await;
    mock_close_all(&app.alpaca, ResponseTemplate::new(207).set_body_json(json!([
        { "symbol": "SPY", "status": 200, "body": {} }
    ])))
    .await;

    let stop: Value = app.server.post("/api/emergency_stop").await.json();
    assert_eq!(stop["success"], true);
    assert!(stop["message"]
        .as_str()
        .is_some_and(|m| m.contains("FLATTENED")));

    let status: Value = app.server.get("/api/status").await.json();
    assert_eq!(status["stopped"], true);
    assert_eq!(status["message"], "Emergency stop active - cycles suspended");

    let cycle: Value = app.server.post("/api/agent_cycle").await.json();
    assert_eq!(cycle["success"], true);
    assert_eq!(cycle["action_taken"], "suspended (emergency stop active)");
    assert!(cycle["signal"].is_null());
}

#[tokio::test]
async fn emergency_stop_with_no_positions_succeeds() {
    let app = TestApiServer::new().await;
    mock_close_all(&app.alpaca, ResponseTemplate::new(207).set_body_json(json!([]))).await;

    let stop: Value = app.server.post("/api/emergency_stop").await.json();
    assert_eq!(stop["success"], true);
}

#[tokio::test]
async fn emergency_stop_failure_keeps_engine_stopped() {
    let app = TestApiServer::new().await;
    mock_close_all(&app.alpaca, ResponseTemplate::new(403).set_body_string("forbidden")).await;

    let response = app.server.post("/api/emergency_stop").await;
    assert_eq!(response.status_code(), 200);
    let stop: Value = response.json();
    assert_eq!(stop["success"], false);
    assert!(stop["error"].as_str().is_some_and(|e| e.contains("forbidden")));
    assert!(app.engine.snapshot().await.stopped);
}

#[tokio::test]
async fn resume_reenables_cycles() {
    let app = TestApiServer::unconfigured().await;
    app.server.post("/api/emergency_stop").await;

    let resumed: Value = app.server.post("/api/resume").await.json();
    assert_eq!(resumed["success"], true);
    assert_eq!(resumed["was_stopped"], true);

    let status: Value = app.server.get("/api/status").await.json();
    assert_eq!(status["stopped"], false);
}

#[tokio::test]
async fn performance_reports_pnl() {
    let app = TestApiServer::new().await;
    mock_account(&app.alpaca, "105000.00", "100000.00").await;

    let body: Value = app.server.get("/api/performance").await.json();
    assert_eq!(body["equity"], 105000.0);
    assert_eq!(body["pnl_today"], 5000.0);
    assert!(body.get("note").is_none());
}

#[tokio::test]
async fn performance_degrades_without_broker() {
    let app = TestApiServer::unconfigured().await;
    let response = app.server.get("/api/performance").await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["equity"], 100000.0);
    assert_eq!(body["pnl_today"], 0.0);
    assert!(body["note"].as_str().is_some_and(|n| n.contains("not connected")));
}

#[tokio::test]
async fn performance_degrades_on_malformed_account() {
    let app = TestApiServer::new().await;
    mock_account(&app.alpaca, "not-a-number", "100000").await;

    let body: Value = app.server.get("/api/performance").await.json();
    assert_eq!(body["equity"], 100000.0);
    assert_eq!(body["pnl_today"], 0.0);
}

#[tokio::test]
async fn market_data_returns_recent_closes() {
    let app = TestApiServer::new().await;
    mock_aggregates(&app.polygon, &[503.0, 502.0, 501.0]).await;

    let body: Value = app.server.get("/api/market_data").await.json();
    assert_eq!(body["symbol"], "SPY");
    assert_eq!(body["prices"], json!([501.0, 502.0, 503.0]));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn market_data_without_credentials_returns_error() {
    let app = TestApiServer::unconfigured().await;
    let response = app.server.get("/api/market_data").await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert!(body["error"].as_str().is_some_and(|e| e.contains("not connected")));
}

#[tokio::test]
async fn metrics_endpoint_exposes_prometheus_metrics() {
    let app = TestApiServer::unconfigured().await;
    app.server.post("/api/agent_cycle").await;

    let response = app.server.get("/metrics").await;
    assert_eq!(response.status_code(), 200);

    let body = response.text();
    assert!(body.contains("http_requests_total"));
    assert!(body.contains("http_request_duration_seconds"));
    assert!(body.contains("agent_cycles_total"));
}
