// src/invoker.rs
// ============================================================================
// Module: Reasoning Invoker (C6)
// Description: Bounded-time, non-throwing dispatch to a user function.
// Purpose: Call a host-supplied reasoning function under a deadline and
// never let it fail the event (§4.6).
// Dependencies: orc-core, tokio, serde_json
// ============================================================================

//! ## Overview
//! The invoker is stateless: it carries nothing between calls. A reasoning
//! function is registered per `mode` and is given a read-only event
//! snapshot plus a memory accessor; it may be async. `invoke` guarantees a
//! true wall-clock deadline by racing the function's own task against a
//! [`tokio::time::timeout`] on a *different* task — so a function that
//! never yields still cannot delay the result past `timeout_ms`.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use orc_core::decision::AdvisorySignal;
use orc_core::decision::SignalType;
use orc_core::event::Event;
use orc_core::interfaces::MemoryAccessor;
use serde_json::Value;

/// Default reasoning timeout, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: i64 = 500;
/// Maximum reasoning timeout a caller may request.
pub const MAX_TIMEOUT_MS: i64 = 5_000;

/// Read-only snapshot of the event handed to a reasoning function.
#[derive(Debug, Clone)]
pub struct EventSnapshot {
    /// Correlation id of the event.
    pub correlation_id: String,
    /// Event type tag.
    pub event_type: String,
    /// Instrument symbol.
    pub symbol: String,
    /// Instrument timeframe.
    pub timeframe: String,
    /// The event's structured payload.
    pub signal: Value,
    /// Event wall-clock milliseconds.
    pub ts_ms: i64,
}

impl From<&Event> for EventSnapshot {
    fn from(event: &Event) -> Self {
        Self {
            correlation_id: event.correlation_id.as_str().to_string(),
            event_type: event.event_type.clone(),
            symbol: event.symbol.clone(),
            timeframe: event.timeframe.clone(),
            signal: event.signal.clone(),
            ts_ms: event.ts_ms,
        }
    }
}

/// A boxed future, used because reasoning functions may be async.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A host-supplied reasoning function. Returns raw signal objects shaped
/// `{signal_type, payload, confidence?}`; the invoker is responsible for
/// parsing and clamping them.
pub type ReasoningFn =
    dyn Fn(EventSnapshot, Arc<dyn MemoryAccessor>) -> BoxFuture<Vec<Value>> + Send + Sync;

/// Registry of reasoning functions keyed by mode, plus the default mode
/// used when an event carries none.
pub struct ReasoningInvoker {
    modes: HashMap<String, Arc<ReasoningFn>>,
    default_mode: String,
    memory: Arc<dyn MemoryAccessor>,
}

impl ReasoningInvoker {
    /// Creates an invoker with no registered modes.
    #[must_use]
    pub fn new(default_mode: impl Into<String>, memory: Arc<dyn MemoryAccessor>) -> Self {
        Self {
            modes: HashMap::new(),
            default_mode: default_mode.into(),
            memory,
        }
    }

    /// Registers a reasoning function under `mode`.
    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>, function: Arc<ReasoningFn>) -> Self {
        self.modes.insert(mode.into(), function);
        self
    }

    /// Invokes the reasoning function for `mode` (or the default, if
    /// `mode` is `None`) against `event`, bounded by `timeout_ms`.
    ///
    /// Never returns an `Err`: unknown modes, timeouts, panics, and
    /// malformed signal shapes all become `AdvisorySignal`s of
    /// `signal_type` `error` or `timeout`.
    pub async fn invoke(
        &self,
        event: &Event,
        mode: Option<&str>,
        timeout_ms: i64,
        now_ms: i64,
    ) -> (Vec<AdvisorySignal>, i64) {
        let mode_name = mode.unwrap_or(&self.default_mode).to_string();
        let Some(function) = self.modes.get(&mode_name).cloned() else {
            return (
                vec![error_signal(&mode_name, now_ms, format!("unknown_reasoning_mode:{mode_name}"))],
                0,
            );
        };

        let snapshot = EventSnapshot::from(event);
        let memory = Arc::clone(&self.memory);
        let bound_ms = timeout_ms.clamp(1, MAX_TIMEOUT_MS);
        let started = std::time::Instant::now();

        let handle = tokio::spawn(async move { function(snapshot, memory).await });
        let outcome = tokio::time::timeout(Duration::from_millis(bound_ms.unsigned_abs() as u64), handle).await;
        let elapsed_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

        let raw_signals = match outcome {
            Ok(Ok(signals)) => signals,
            Ok(Err(_join_error)) => {
                return (vec![error_signal(&mode_name, now_ms, "reasoning_function_panicked".to_string())], elapsed_ms);
            }
            Err(_elapsed) => {
                return (vec![timeout_signal(&mode_name, now_ms)], elapsed_ms);
            }
        };

        let signals = raw_signals
            .into_iter()
            .map(|raw| parse_signal(raw, &mode_name, now_ms))
            .collect();
        (signals, elapsed_ms)
    }
}

fn parse_signal(raw: Value, mode: &str, now_ms: i64) -> AdvisorySignal {
    #[derive(serde::Deserialize)]
    struct RawShape {
        signal_type: SignalType,
        payload: Value,
        #[serde(default)]
        confidence: Option<f64>,
    }

    match serde_json::from_value::<RawShape>(raw) {
        Ok(shape) => {
            let mut signal = AdvisorySignal {
                signal_type: shape.signal_type,
                payload: shape.payload,
                confidence: shape.confidence,
                reasoning_mode: mode.to_string(),
                decision_id: None,
                plan_id: None,
                error: None,
                ts_ms: now_ms,
            };
            signal.clamp_confidence();
            signal
        }
        Err(_) => error_signal(mode, now_ms, "signal_construction_failed".to_string()),
    }
}

fn error_signal(mode: &str, ts_ms: i64, message: String) -> AdvisorySignal {
    AdvisorySignal {
        signal_type: SignalType::Error,
        payload: Value::Null,
        confidence: None,
        reasoning_mode: mode.to_string(),
        decision_id: None,
        plan_id: None,
        error: Some(message),
        ts_ms,
    }
}

fn timeout_signal(mode: &str, ts_ms: i64) -> AdvisorySignal {
    AdvisorySignal {
        signal_type: SignalType::Timeout,
        payload: Value::Null,
        confidence: None,
        reasoning_mode: mode.to_string(),
        decision_id: None,
        plan_id: None,
        error: Some("reasoning_timeout_exceeded".to_string()),
        ts_ms,
    }
}
