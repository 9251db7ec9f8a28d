//! Decision cycle engine: quote -> signal -> risk -> execution -> result
//!
//! Two independent primitives guard the engine:
//! - `cycle_lock` admits at most one cycle at a time. Latecomers get a busy
//!   result instead of waiting.
//! - `EngineState::stopped` is an atomic flag. Emergency stop flips it without
//!   touching the lock, so it takes effect while a cycle is in flight.

use crate::error::{ProviderError, ProviderResult};
use crate::execution::ExecutionDispatcher;
use crate::metrics::Metrics;
use crate::models::account::{PerformanceReport, StopOutcome};
use crate::models::cycle::{CycleResult, EngineSnapshot, ACTION_BLOCKED};
use crate::models::market::MarketSnapshot;
use crate::risk::RiskGate;
use crate::services::brokerage::{AccountSource, OrderSink};
use crate::services::market_data::QuoteSource;
use crate::signals::SignalEngine;
use chrono::Utc;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Number of one-minute closes served by the market snapshot
pub const MARKET_SNAPSHOT_BARS: usize = 20;

const QUOTE_PROVIDER: &str = "Polygon/Massive";
const BROKER_PROVIDER: &str = "Alpaca";

/// Process-wide engine state. Lives in memory only.
#[derive(Debug)]
pub struct EngineState {
    running: AtomicBool,
    stopped: AtomicBool,
    last_result: RwLock<Option<CycleResult>>,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            running: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
            last_result: RwLock::new(None),
        }
    }
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// Returns the previous value
    fn set_stopped(&self, stopped: bool) -> bool {
        self.stopped.swap(stopped, Ordering::SeqCst)
    }

    pub async fn last_result(&self) -> Option<CycleResult> {
        self.last_result.read().await.clone()
    }

    async fn record(&self, result: &CycleResult) {
        *self.last_result.write().await = Some(result.clone());
    }

    pub async fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            running: self.is_running(),
            stopped: self.is_stopped(),
            last_result: self.last_result().await,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Instrument every cycle trades
    pub symbol: String,
    /// Upper bound for any single collaborator call
    pub call_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbol: crate::config::DEFAULT_SYMBOL.to_string(),
            call_timeout: Duration::from_secs(crate::config::DEFAULT_COLLABORATOR_TIMEOUT_SECONDS),
        }
    }
}

/// Runs decision cycles against injected collaborators and policies.
///
/// Collaborators are optional: a missing one means its credentials were not
/// configured, and every operation depending on it answers "not connected".
pub struct CycleEngine {
    config: EngineConfig,
    state: Arc<EngineState>,
    cycle_lock: Mutex<()>,
    quotes: Option<Arc<dyn QuoteSource>>,
    accounts: Option<Arc<dyn AccountSource>>,
    orders: Option<Arc<dyn OrderSink>>,
    signal_engine: Arc<dyn SignalEngine>,
    risk_gate: Arc<dyn RiskGate>,
    executor: Arc<dyn ExecutionDispatcher>,
    metrics: Option<Arc<Metrics>>,
}

pub struct CycleEngineBuilder {
    config: EngineConfig,
    state: Option<Arc<EngineState>>,
    quotes: Option<Arc<dyn QuoteSource>>,
    accounts: Option<Arc<dyn AccountSource>>,
    orders: Option<Arc<dyn OrderSink>>,
    signal_engine: Arc<dyn SignalEngine>,
    risk_gate: Arc<dyn RiskGate>,
    executor: Arc<dyn ExecutionDispatcher>,
    metrics: Option<Arc<Metrics>>,
}

impl CycleEngineBuilder {
    pub fn state(mut self, state: Arc<EngineState>) -> Self {
        self.state = Some(state);
        self
    }

    pub fn quote_source(mut self, quotes: Arc<dyn QuoteSource>) -> Self {
        self.quotes = Some(quotes);
        self
    }

    pub fn account_source(mut self, accounts: Arc<dyn AccountSource>) -> Self {
        self.accounts = Some(accounts);
        self
    }

    pub fn order_sink(mut self, orders: Arc<dyn OrderSink>) -> Self {
        self.orders = Some(orders);
        self
    }

    pub fn signal_engine(mut self, signal_engine: Arc<dyn SignalEngine>) -> Self {
        self.signal_engine = signal_engine;
        self
    }

    pub fn risk_gate(mut self, risk_gate: Arc<dyn RiskGate>) -> Self {
        self.risk_gate = risk_gate;
        self
    }

    pub fn executor(mut self, executor: Arc<dyn ExecutionDispatcher>) -> Self {
        self.executor = executor;
        self
    }

    pub fn metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> CycleEngine {
        CycleEngine {
            config: self.config,
            state: self.state.unwrap_or_default(),
            cycle_lock: Mutex::new(()),
            quotes: self.quotes,
            accounts: self.accounts,
            orders: self.orders,
            signal_engine: self.signal_engine,
            risk_gate: self.risk_gate,
            executor: self.executor,
            metrics: self.metrics,
        }
    }
}

impl CycleEngine {
    /// Start building an engine with the threshold classifier, approve-all
    /// risk gate and paper execution. No collaborators are attached.
    pub fn builder(config: EngineConfig) -> CycleEngineBuilder {
        CycleEngineBuilder {
            config,
            state: None,
            quotes: None,
            accounts: None,
            orders: None,
            signal_engine: Arc::new(crate::signals::ThresholdSignalEngine::default()),
            risk_gate: Arc::new(crate::risk::ApproveAll),
            executor: Arc::new(crate::execution::PaperExecution),
            metrics: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &Arc<EngineState> {
        &self.state
    }

    pub async fn snapshot(&self) -> EngineSnapshot {
        self.state.snapshot().await
    }

    pub fn quotes_connected(&self) -> bool {
        self.quotes.is_some()
    }

    pub fn broker_connected(&self) -> bool {
        self.accounts.is_some() && self.orders.is_some()
    }

    /// Run one decision cycle. Shared by the timer and the manual trigger.
    pub async fn run_cycle(&self) -> CycleResult {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            warn!(symbol = %self.config.symbol, "CycleEngine: cycle already in progress, rejecting trigger");
            let result = CycleResult::busy();
            self.observe(&result, None);
            return result;
        };

        let start = Instant::now();
        let result = self.run_pipeline().await;
        self.state.record(&result).await;
        self.observe(&result, Some(start.elapsed()));
        result
    }

    /// Run a cycle on its own task and wait for it.
    ///
    /// The cycle runs to completion and is recorded even if the caller is
    /// dropped before it finishes (for example an HTTP client disconnecting).
    pub async fn trigger(self: &Arc<Self>) -> CycleResult {
        let engine = Arc::clone(self);
        match tokio::spawn(async move { engine.run_cycle().await }).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "CycleEngine: cycle task did not complete");
                CycleResult::failed(format!("cycle task failed: {}", e))
            }
        }
    }

    async fn run_pipeline(&self) -> CycleResult {
        let symbol = self.config.symbol.as_str();

        if self.state.is_stopped() {
            debug!(symbol = %symbol, "CycleEngine: emergency stop active, skipping cycle");
            return CycleResult::suspended();
        }

        let quotes = match self.quotes.as_ref() {
            Some(q) => q,
            None => {
                let err = ProviderError::NotConfigured(QUOTE_PROVIDER.to_string());
                warn!(symbol = %symbol, "CycleEngine: {}", err);
                return CycleResult::failed(err.to_string());
            }
        };

        let quote = match self
            .bounded("quote fetch", quotes.latest_quote(symbol))
            .await
        {
            Ok(quote) => quote,
            Err(e) => {
                error!(symbol = %symbol, error = %e, "CycleEngine: quote fetch failed for {}", symbol);
                return CycleResult::failed(e.to_string());
            }
        };
        let price = quote.price;

        let classification = self.signal_engine.classify(price);
        let signal = classification.signal;
        let rationale = format!("{} {}", quote.instrument, classification.rationale);

        if !self.risk_gate.approve(signal, price).await {
            info!(symbol = %symbol, signal = %signal, price = %price, "CycleEngine: signal blocked by risk gate");
            return CycleResult::completed(
                signal,
                price,
                format!("{} (Risk BLOCKED)", rationale),
                ACTION_BLOCKED,
            );
        }

        // A stop that landed while the quote was in flight pre-empts execution
        if self.state.is_stopped() {
            warn!(symbol = %symbol, signal = %signal, "CycleEngine: emergency stop raised mid-cycle, execution skipped");
            return CycleResult {
                signal: Some(signal),
                price: Some(price),
                ..CycleResult::suspended()
            };
        }

        let action = self.executor.execute(signal).await;
        info!(
            symbol = %symbol,
            signal = %signal,
            price = %price,
            action = %action,
            "CycleEngine: {} -> {} ({})",
            symbol,
            signal,
            action
        );

        CycleResult::completed(signal, price, format!("{} (Risk OK)", rationale), action)
    }

    /// Raise the emergency stop and flatten every position.
    ///
    /// The flag is set before the brokerage is contacted and stays set even
    /// when flattening fails.
    pub async fn stop(&self) -> StopOutcome {
        let was_stopped = self.state.set_stopped(true);
        if let Some(metrics) = &self.metrics {
            metrics.emergency_stops_total.inc();
            metrics.engine_stopped.set(1.0);
        }
        warn!(was_stopped = was_stopped, "CycleEngine: EMERGENCY STOP raised");

        let Some(orders) = self.orders.as_ref() else {
            let message = ProviderError::NotConfigured(BROKER_PROVIDER.to_string()).to_string();
            error!("CycleEngine: cannot flatten positions, {}", message);
            return StopOutcome {
                success: false,
                message,
            };
        };

        match self.bounded("flatten all positions", orders.flatten_all()).await {
            Ok(summary) if summary.failed.is_empty() => {
                info!(
                    positions_closed = summary.positions_closed,
                    "CycleEngine: all positions flattened"
                );
                StopOutcome {
                    success: true,
                    message: format!(
                        "ALL POSITIONS FLATTENED ({} closed)",
                        summary.positions_closed
                    ),
                }
            }
            Ok(summary) => {
                error!(failed = ?summary.failed, "CycleEngine: flatten left positions open");
                StopOutcome {
                    success: false,
                    message: format!(
                        "Failed to close positions: {}",
                        summary.failed.join(", ")
                    ),
                }
            }
            Err(e) => {
                error!(error = %e, "CycleEngine: flatten failed");
                StopOutcome {
                    success: false,
                    message: e.to_string(),
                }
            }
        }
    }

    /// Clear the emergency stop. Returns whether it was active.
    pub fn resume(&self) -> bool {
        let was_stopped = self.state.set_stopped(false);
        if let Some(metrics) = &self.metrics {
            metrics.engine_stopped.set(0.0);
        }
        if was_stopped {
            info!("CycleEngine: emergency stop cleared, cycles resume");
        } else {
            debug!("CycleEngine: resume requested but engine was not stopped");
        }
        was_stopped
    }

    /// Today's P&L from a fresh account snapshot. Never fails: any problem
    /// yields the degraded default.
    pub async fn report(&self) -> PerformanceReport {
        let Some(accounts) = self.accounts.as_ref() else {
            return PerformanceReport::degraded(
                ProviderError::NotConfigured(BROKER_PROVIDER.to_string()).to_string(),
            );
        };

        match self.bounded("account snapshot", accounts.account_snapshot()).await {
            Ok(snapshot) => PerformanceReport::from_snapshot(&snapshot),
            Err(e) => {
                warn!(error = %e, "CycleEngine: account snapshot unavailable, serving defaults");
                PerformanceReport::degraded(e.to_string())
            }
        }
    }

    /// Recent closes for the tracked instrument
    pub async fn market_snapshot(&self) -> ProviderResult<MarketSnapshot> {
        let quotes = self
            .quotes
            .as_ref()
            .ok_or_else(|| ProviderError::NotConfigured(QUOTE_PROVIDER.to_string()))?;
        let prices = self
            .bounded(
                "recent closes",
                quotes.recent_closes(&self.config.symbol, MARKET_SNAPSHOT_BARS),
            )
            .await?;

        Ok(MarketSnapshot {
            symbol: self.config.symbol.clone(),
            prices,
            timestamp: Utc::now(),
        })
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> ProviderResult<T>
    where
        F: Future<Output = ProviderResult<T>>,
    {
        tokio::time::timeout(self.config.call_timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(ProviderError::Timeout {
                    operation,
                    after: self.config.call_timeout,
                })
            })
    }

    fn observe(&self, result: &CycleResult, elapsed: Option<Duration>) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        metrics
            .cycles_total
            .with_label_values(&[result.outcome()])
            .inc();
        if let Some(elapsed) = elapsed {
            metrics
                .cycle_duration_seconds
                .observe(elapsed.as_secs_f64());
        }
    }
}
