//! AetherQuant autonomous cycle engine
//!
//! Periodically pulls a quote, classifies it into a trading signal, runs it
//! through a risk gate and an execution policy, and keeps the latest outcome
//! for the HTTP status surface.

pub mod config;
pub mod core;
pub mod error;
pub mod execution;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod risk;
pub mod services;
pub mod signals;
