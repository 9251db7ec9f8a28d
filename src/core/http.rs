//! HTTP endpoint server using Axum

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

use crate::core::engine::CycleEngine;
use crate::metrics::Metrics;
use crate::models::cycle::CycleResult;

pub const BACKEND_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CycleEngine>,
    pub metrics: Arc<Metrics>,
    pub start_time: Arc<Instant>,
}

impl AppState {
    pub fn new(engine: Arc<CycleEngine>, metrics: Arc<Metrics>) -> Self {
        Self {
            engine,
            metrics,
            start_time: Arc::new(Instant::now()),
        }
    }
}

/// Manual cycle response: the cycle result flattened, plus the legacy
/// `thought_stream` narrative (rationale on success, error otherwise)
#[derive(Debug, Serialize)]
pub struct AgentCycleResponse {
    #[serde(flatten)]
    pub result: CycleResult,
    pub thought_stream: String,
}

impl From<CycleResult> for AgentCycleResponse {
    fn from(result: CycleResult) -> Self {
        let thought_stream = match (&result.error, result.success) {
            (Some(error), false) => format!("Error: {}", error),
            _ => result.rationale.clone(),
        };
        Self {
            result,
            thought_stream,
        }
    }
}

/// Liveness. Reports `degraded` while the emergency stop holds cycles.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let snapshot = state.engine.snapshot().await;
    let status = if snapshot.stopped { "degraded" } else { "healthy" };
    let uptime_seconds = state.start_time.elapsed().as_secs();
    Ok(Json(json!({
        "status": status,
        "running": snapshot.running,
        "stopped": snapshot.stopped,
        "uptime_seconds": uptime_seconds,
        "service": "aetherquant-cycle-engine"
    })))
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .export()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Middleware to track HTTP request metrics
async fn metrics_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    state.metrics.http_requests_in_flight.inc();
    let response = next.run(request).await;
    let status = response.status();
    let duration = start.elapsed();
    state.metrics.http_requests_in_flight.dec();

    state.metrics.http_requests_total.inc();
    state
        .metrics
        .http_request_duration_seconds
        .observe(duration.as_secs_f64());

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = duration.as_millis(),
            "HTTP request error"
        );
    }

    response
}

/// Liveness plus a read-only view of the engine state
async fn status(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.engine.snapshot().await;
    let message = if snapshot.stopped {
        "Emergency stop active - cycles suspended"
    } else {
        "Ready - cycles active"
    };

    Json(json!({
        "status": "online",
        "time": Utc::now().to_rfc3339(),
        "backend_version": BACKEND_VERSION,
        "message": message,
        "symbol": state.engine.config().symbol,
        "running": snapshot.running,
        "stopped": snapshot.stopped,
        "quotes_connected": state.engine.quotes_connected(),
        "broker_connected": state.engine.broker_connected(),
        "last_result": snapshot.last_result,
    }))
}

async fn market_data(State(state): State<AppState>) -> Json<Value> {
    match state.engine.market_snapshot().await {
        Ok(snapshot) => Json(json!(snapshot)),
        Err(e) => {
            warn!(error = %e, "Market snapshot unavailable");
            Json(json!({ "error": e.to_string() }))
        }
    }
}

async fn agent_cycle(State(state): State<AppState>) -> Json<AgentCycleResponse> {
    info!("Manual agent cycle requested");
    let result = state.engine.trigger().await;
    Json(result.into())
}

async fn emergency_stop(State(state): State<AppState>) -> Json<Value> {
    let outcome = state.engine.stop().await;
    if outcome.success {
        Json(json!({
            "success": true,
            "message": outcome.message,
        }))
    } else {
        Json(json!({
            "success": false,
            "message": format!("Emergency stop engaged but flatten failed: {}", outcome.message),
            "error": outcome.message,
        }))
    }
}

async fn resume(State(state): State<AppState>) -> Json<Value> {
    let was_stopped = state.engine.resume();
    let message = if was_stopped {
        "Cycles resumed"
    } else {
        "Engine was not stopped"
    };
    Json(json!({
        "success": true,
        "was_stopped": was_stopped,
        "message": message,
    }))
}

async fn performance(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.engine.report().await))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/api/status", get(status))
        .route("/api/market_data", get(market_data))
        .route("/api/agent_cycle", post(agent_cycle))
        .route("/api/emergency_stop", post(emergency_stop))
        .route("/api/resume", post(resume))
        .route("/api/performance", get(performance))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
                )
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    metrics_middleware,
                ))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn start_server(port: u16, state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!(port = port, "HTTP server listening on port {}", port);
    info!(
        "Metrics endpoint available at http://0.0.0.0:{}/metrics",
        port
    );
    axum::serve(listener, app).await?;

    Ok(())
}
