//! Fixed-period scheduler driving the autonomous decision loop

use crate::core::engine::CycleEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Runs `CycleEngine::run_cycle` once immediately and then every `interval`.
pub struct CycleScheduler {
    engine: Arc<CycleEngine>,
    interval: Duration,
    handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,
    started: AtomicBool,
}

impl CycleScheduler {
    /// Create a new scheduler
    ///
    /// # Arguments
    /// * `engine` - Engine whose cycle runs on every tick
    /// * `interval` - Period between cycle starts (must be > 0)
    pub fn new(
        engine: Arc<CycleEngine>,
        interval: Duration,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        if interval.is_zero() {
            return Err("Scheduler disabled: interval is 0".into());
        }

        info!(
            interval_secs = interval.as_secs_f64(),
            symbol = %engine.config().symbol,
            "CycleScheduler: created with interval {:?}",
            interval
        );

        Ok(Self {
            engine,
            interval,
            handle: Arc::new(RwLock::new(None)),
            started: AtomicBool::new(false),
        })
    }

    /// Start the scheduler. It can only be started once, even after `stop`.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err("Scheduler already started".into());
        }
        let mut slot = self.handle.write().await;

        let engine = self.engine.clone();
        let period = self.interval;
        engine.state().set_running(true);

        let handle = tokio::spawn(async move {
            info!("CycleScheduler: started, running first cycle now");

            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let result = engine.run_cycle().await;
                if result.is_busy() {
                    warn!("CycleScheduler: tick skipped, a manual cycle is still running");
                } else {
                    info!(
                        outcome = result.outcome(),
                        signal = ?result.signal,
                        action = %result.action_taken,
                        "CycleScheduler: cycle finished ({})",
                        result.outcome()
                    );
                }
            }
        });

        *slot = Some(handle);
        info!("CycleScheduler: started successfully");
        Ok(())
    }

    /// Abort the loop (process shutdown)
    pub async fn stop(&self) {
        let mut handle = self.handle.write().await;
        if let Some(h) = handle.take() {
            h.abort();
            self.engine.state().set_running(false);
            info!("CycleScheduler: stopped");
        }
    }

    /// Check if the scheduler is running
    pub async fn is_running(&self) -> bool {
        let handle = self.handle.read().await;
        handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}
