//! AetherQuant API Server
//!
//! Runs the autonomous decision loop and the HTTP surface (status, manual
//! cycle trigger, emergency stop, performance) in one process.

use aetherquant::config::Config;
use aetherquant::core::engine::{CycleEngine, EngineConfig};
use aetherquant::core::http::{start_server, AppState};
use aetherquant::core::scheduler::CycleScheduler;
use aetherquant::logging;
use aetherquant::metrics::Metrics;
use aetherquant::services::{AlpacaClient, PolygonClient};
use aetherquant::signals::ThresholdSignalEngine;
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env if present
    dotenv().ok();

    logging::init_logging();

    let config = Config::from_env();
    info!("Starting AetherQuant API Server");
    info!(
        environment = %config.environment,
        production = config.is_production(),
        "Environment"
    );
    info!(
        symbol = %config.symbol,
        interval_secs = config.cycle_interval.as_secs(),
        lower = %config.lower_threshold,
        upper = %config.upper_threshold,
        paper = config.alpaca_paper,
        "Cycle configuration"
    );

    let metrics = Arc::new(Metrics::new()?);

    let mut builder = CycleEngine::builder(EngineConfig {
        symbol: config.symbol.clone(),
        call_timeout: config.collaborator_timeout,
    })
    .signal_engine(Arc::new(ThresholdSignalEngine::new(
        config.lower_threshold,
        config.upper_threshold,
    )))
    .metrics(metrics.clone());

    match &config.polygon_key {
        Some(key) => {
            let client = match &config.polygon_base_url {
                Some(url) => PolygonClient::with_client(url, key.clone(), reqwest::Client::new()),
                None => PolygonClient::new(key.clone()),
            };
            match client {
                Ok(client) => {
                    info!("Polygon/Massive market data connected");
                    builder = builder.quote_source(Arc::new(client));
                }
                Err(e) => error!(error = %e, "Failed to create Polygon/Massive client"),
            }
        }
        None => warn!("POLYGON_KEY not set - cycles will report quote source not connected"),
    }

    match &config.alpaca {
        Some(credentials) => {
            let client = match &config.alpaca_base_url {
                Some(url) => {
                    AlpacaClient::with_client(url, credentials.clone(), reqwest::Client::new())
                }
                None => AlpacaClient::new(credentials.clone(), config.alpaca_paper),
            };
            match client {
                Ok(client) => {
                    info!(paper = config.alpaca_paper, "Alpaca brokerage connected");
                    let client = Arc::new(client);
                    builder = builder.account_source(client.clone()).order_sink(client);
                }
                Err(e) => error!(error = %e, "Failed to create Alpaca client"),
            }
        }
        None => warn!("ALPACA_KEY/ALPACA_SECRET not set - emergency stop and performance degraded"),
    }

    let engine = Arc::new(builder.build());

    let scheduler = CycleScheduler::new(engine.clone(), config.cycle_interval)
        .map_err(|e| format!("Failed to create scheduler: {}", e))?;
    scheduler
        .start()
        .await
        .map_err(|e| format!("Failed to start scheduler: {}", e))?;
    info!(
        interval_secs = config.cycle_interval.as_secs(),
        "Autonomous loop active - every {}s",
        config.cycle_interval.as_secs()
    );

    let state = AppState::new(engine, metrics);
    let port = config.port;
    info!(port = port, "HTTP Server: http://0.0.0.0:{}", port);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(port, state).await {
            error!(error = %e, "HTTP server error");
        }
    });

    info!("API server started, waiting for shutdown signal...");
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutting down API server...");
        }
        _ = server_handle => {
            error!("HTTP server stopped");
        }
    }

    scheduler.stop().await;
    info!("API server stopped");
    Ok(())
}
