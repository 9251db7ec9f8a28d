//! Unit tests for cycle and performance models

use aetherquant::models::account::{AccountSnapshot, PerformanceReport};
use aetherquant::models::cycle::{CycleResult, ACTION_SUSPENDED};
use aetherquant::models::signal::Signal;
use chrono::Utc;
use rust_decimal_macros::dec;

#[test]
fn test_completed_result_serializes_numbers() {
    let result = CycleResult::completed(Signal::Buy, dec!(512.5), "SPY up", "paper");
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["success"], true);
    assert_eq!(value["signal"], "BUY");
    assert_eq!(value["price"], 512.5);
    assert!(value["error"].is_null());
    assert_eq!(result.outcome(), "ok");
}

#[test]
fn test_failed_result_has_no_signal() {
    let result = CycleResult::failed("network down");
    assert!(!result.success);
    assert!(result.signal.is_none());
    assert!(result.price.is_none());
    assert_eq!(result.error.as_deref(), Some("network down"));
    assert_eq!(result.outcome(), "failed");

    let value = serde_json::to_value(&result).unwrap();
    assert!(value["signal"].is_null());
    assert!(value["price"].is_null());
}

#[test]
fn test_busy_and_suspended_outcomes() {
    let busy = CycleResult::busy();
    assert!(busy.is_busy());
    assert!(!busy.success);
    assert_eq!(busy.outcome(), "busy");

    let suspended = CycleResult::suspended();
    assert!(suspended.success);
    assert!(suspended.signal.is_none());
    assert_eq!(suspended.action_taken, ACTION_SUSPENDED);
    assert_eq!(suspended.outcome(), "suspended");
}

#[test]
fn test_pnl_is_equity_minus_prior_equity() {
    let snapshot = AccountSnapshot {
        equity: dec!(105000),
        prior_equity: dec!(100000),
        as_of: Utc::now(),
    };
    let report = PerformanceReport::from_snapshot(&snapshot);
    assert_eq!(report.pnl_today, dec!(5000));
    assert!(!report.is_degraded());

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["equity"], 105000.0);
    assert_eq!(value["pnl_today"], 5000.0);
    assert!(value.get("note").is_none());
}

#[test]
fn test_degraded_report_defaults() {
    let report = PerformanceReport::degraded("Alpaca not connected");
    assert_eq!(report.equity, dec!(100000));
    assert_eq!(report.pnl_today, dec!(0));
    assert_eq!(report.note.as_deref(), Some("Alpaca not connected"));
}
