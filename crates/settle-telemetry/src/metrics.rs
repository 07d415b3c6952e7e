//! Prometheus metrics for the settlement protocol.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a startup bug; it only happens during
//! lazy static initialization.

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_histogram, CounterVec, Histogram};

/// Protocol invocations started.
/// Labels: kind (trade/short_sell)
pub static PROTOCOL_STARTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "settle_protocol_started_total",
        "Commit-reveal protocol invocations started",
        &["kind"]
    )
    .unwrap()
});

/// Phase failures.
/// Labels: phase (commit/reveal), error (admission/commitment/execution/receipt)
pub static PHASE_FAILED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "settle_phase_failed_total",
        "Protocol failures by phase and error kind",
        &["phase", "error"]
    )
    .unwrap()
});

/// Settlements delivered to callers.
/// Labels: kind, confidence (provisional/confirmed)
pub static SETTLEMENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "settle_settlements_total",
        "Settlement results delivered",
        &["kind", "confidence"]
    )
    .unwrap()
});

/// Gas cost of admitted trade batches.
pub static TRADE_GAS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "settle_trade_gas",
        "Estimated gas of admitted trade batches",
        vec![250_000.0, 500_000.0, 1_000_000.0, 2_000_000.0, 3_000_000.0, 5_000_000.0]
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    /// Record a protocol invocation.
    pub fn protocol_started(kind: &str) {
        PROTOCOL_STARTED_TOTAL.with_label_values(&[kind]).inc();
    }

    /// Record a terminal failure.
    pub fn phase_failed(phase: &str, error: &str) {
        PHASE_FAILED_TOTAL.with_label_values(&[phase, error]).inc();
    }

    /// Record a delivered settlement.
    pub fn settlement_delivered(kind: &str, confidence: &str) {
        SETTLEMENTS_TOTAL
            .with_label_values(&[kind, confidence])
            .inc();
    }

    /// Record the gas estimate of an admitted batch.
    pub fn trade_gas(gas: u64) {
        TRADE_GAS.observe(gas as f64);
    }
}
