// src/fanout.rs
// ============================================================================
// Module: Notifier Fanout (C10)
// Description: Concurrency-bounded, best-effort dispatch of a decision
// summary to every configured channel.
// Purpose: Deliver notifications without ever affecting the EventResult's
// status, per §4.10 / §7.
// Dependencies: orc-core::interfaces, orc-metrics, tokio
// ============================================================================

//! ## Overview
//! Dispatch order across channels within one event is not observable: every
//! channel is raced concurrently under a semaphore, and per-channel retries
//! happen independently. A channel's final failure is logged and counted,
//! never surfaced to the caller.

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use orc_core::interfaces::NotificationChannel;
use serde_json::Value;
use tokio::sync::Semaphore;

/// Default bound on concurrent outbound notification requests.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;
/// Default per-channel retry count.
pub const DEFAULT_RETRIES: u32 = 3;
/// Default retry backoff base, in milliseconds.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;
/// Default retry backoff multiplier.
pub const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;

/// Configuration for one [`fan_out`] call.
#[derive(Debug, Clone, Copy)]
pub struct FanoutConfig {
    /// Bound on concurrent outbound requests.
    pub max_concurrency: usize,
    /// Per-channel retry count, beyond the first attempt.
    pub retries: u32,
    /// Retry backoff base, in milliseconds.
    pub backoff_base_ms: u64,
    /// Retry backoff multiplier.
    pub backoff_multiplier: u32,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            retries: DEFAULT_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

async fn deliver_with_retries(channel: &dyn NotificationChannel, body: &Value, config: &FanoutConfig) {
    let started_at = Instant::now();
    let mut attempt = 0;
    loop {
        match channel.deliver(body).await {
            Ok(()) => {
                #[allow(clippy::cast_possible_wrap, reason = "delivery durations never approach i64::MAX ms")]
                orc_metrics::registry::notification_delivery_ms(started_at.elapsed().as_millis() as i64);
                return;
            }
            Err(_failure) => {
                orc_metrics::registry::notification_error();
                if attempt >= config.retries {
                    #[allow(clippy::cast_possible_wrap, reason = "delivery durations never approach i64::MAX ms")]
                    orc_metrics::registry::notification_delivery_ms(started_at.elapsed().as_millis() as i64);
                    return;
                }
                let backoff = config.backoff_base_ms.saturating_mul(u64::from(config.backoff_multiplier.saturating_pow(attempt)));
                tokio::time::sleep(Duration::from_millis(backoff)).await;
                attempt += 1;
            }
        }
    }
}

/// Delivers `body` to every channel in `channels`, bounded by `semaphore`.
/// Never returns an error: failures are counted through `orc_metrics` and
/// otherwise swallowed.
///
/// `semaphore` must be shared across every call so the concurrency bound is
/// process-global, not per-event; callers own one long-lived
/// `Arc<Semaphore>` sized from `FanoutConfig::max_concurrency` at setup.
pub async fn fan_out(channels: &[Arc<dyn NotificationChannel>], body: Value, config: &FanoutConfig, semaphore: Arc<Semaphore>) {
    let body = Arc::new(body);

    let mut tasks = Vec::with_capacity(channels.len());
    for channel in channels {
        let channel = Arc::clone(channel);
        let body = Arc::clone(&body);
        let semaphore = Arc::clone(&semaphore);
        let config = *config;
        tasks.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await;
            deliver_with_retries(channel.as_ref(), &body, &config).await;
        }));
    }

    for task in tasks {
        let _ = task.await;
    }
}
