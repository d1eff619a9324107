// src/registry.rs
// ============================================================================
// Module: Metrics Registry (C12)
// Description: Named counters, histograms, and gauges recorded through the
// `metrics` facade.
// Purpose: Give every orchestrator component a single, typed place to
// record the metrics named in §4.12, independent of whatever exporter the
// host wires up.
// Dependencies: metrics
// ============================================================================

//! ## Overview
//! This module only records through the `metrics` crate's global recorder;
//! it does not install one. The host process is responsible for installing
//! an exporter (or none, in which case these calls are no-ops).

use metrics::counter;
use metrics::gauge;
use metrics::histogram;

/// Increments `decisions_processed_total`.
pub fn decision_processed() {
    counter!("decisions_processed_total").increment(1);
}

/// Increments `deduplicated_decisions_total`.
pub fn decision_deduplicated() {
    counter!("deduplicated_decisions_total").increment(1);
}

/// Increments `dlq_retries_total`.
pub fn dlq_retry() {
    counter!("dlq_retries_total").increment(1);
}

/// Increments `dlq_dropped_total`.
pub fn dlq_dropped() {
    counter!("dlq_dropped_total").increment(1);
}

/// Increments `notification_errors_total`.
pub fn notification_error() {
    counter!("notification_errors_total").increment(1);
}

/// Increments `reasoning_timeouts_total`.
pub fn reasoning_timeout() {
    counter!("reasoning_timeouts_total").increment(1);
}

/// Increments `policy_backend_failures_total{backend}`.
pub fn policy_backend_failure(backend: &'static str) {
    counter!("policy_backend_failures_total", "backend" => backend).increment(1);
}

/// Records one sample of `decision_processing_time_ms`.
#[allow(clippy::cast_precision_loss, reason = "millisecond durations fit comfortably in f64")]
pub fn decision_processing_time_ms(duration_ms: i64) {
    histogram!("decision_processing_time_ms").record(duration_ms as f64);
}

/// Records one sample of `reasoning_time_ms`.
#[allow(clippy::cast_precision_loss, reason = "millisecond durations fit comfortably in f64")]
pub fn reasoning_time_ms(duration_ms: i64) {
    histogram!("reasoning_time_ms").record(duration_ms as f64);
}

/// Records one sample of `notification_delivery_ms`.
#[allow(clippy::cast_precision_loss, reason = "millisecond durations fit comfortably in f64")]
pub fn notification_delivery_ms(duration_ms: i64) {
    histogram!("notification_delivery_ms").record(duration_ms as f64);
}

/// Sets the `dlq_size` gauge.
#[allow(clippy::cast_precision_loss, reason = "dlq sizes are far below f64's exact-integer range")]
pub fn dlq_size(size: usize) {
    gauge!("dlq_size").set(size as f64);
}

/// Sets the `circuit_breaker_open{backend}` gauge (1.0 open, 0.0 closed).
pub fn circuit_breaker_open(backend: &'static str, open: bool) {
    gauge!("circuit_breaker_open", "backend" => backend).set(if open {
        1.0
    } else {
        0.0
    });
}
