// src/event.rs
// ============================================================================
// Module: Event Model & Validator
// Description: Shape-checks inbound events and assigns correlation ids.
// Purpose: Give every downstream component a single validated event shape.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! An inbound event arrives as a loosely-typed [`RawEvent`]. [`validate`]
//! turns it into an [`Event`], which is read-only for the remainder of
//! processing: all derived state lives in other entities.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::identifiers::CorrelationId;

/// Inbound event as received from the caller, before validation.
///
/// Field presence and typing are checked by [`validate`]; this type exists so
/// that deserialization itself never fails on a malformed event, only
/// validation does (so the orchestrator can produce a proper `discarded`
/// result with a reason instead of propagating a deserialization error).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEvent {
    /// Caller-supplied correlation id, assigned by the core if absent.
    #[serde(default)]
    pub correlation_id: Option<String>,
    /// Short tag driving cooldown/session policy.
    #[serde(default)]
    pub event_type: Option<String>,
    /// Instrument symbol.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Instrument timeframe.
    #[serde(default)]
    pub timeframe: Option<String>,
    /// Opaque structured payload.
    #[serde(default)]
    pub signal: Option<Value>,
    /// Wall-clock milliseconds, monotonically non-decreasing per source.
    #[serde(default)]
    pub ts_ms: Option<Value>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

/// A validated, read-only event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Correlation id, assigned if the caller omitted one.
    pub correlation_id: CorrelationId,
    /// Short tag driving cooldown/session policy.
    pub event_type: String,
    /// Instrument symbol.
    pub symbol: String,
    /// Instrument timeframe, empty string if the caller omitted it.
    pub timeframe: String,
    /// Opaque structured payload.
    pub signal: Value,
    /// Wall-clock milliseconds, monotonically non-decreasing per source.
    pub ts_ms: i64,
    /// Free-form metadata.
    pub metadata: BTreeMap<String, Value>,
}

/// A single-line reason an inbound event was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(String);

impl ValidationError {
    /// Returns the single-line reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.0
    }
}

/// Validates a raw event, assigning a correlation id if one is absent.
///
/// # Errors
///
/// Returns [`ValidationError`] when a required field (`event_type`,
/// `symbol`, `signal`, `ts_ms`) is missing or ill-typed.
pub fn validate(raw: RawEvent) -> Result<Event, ValidationError> {
    let event_type = non_empty_string(raw.event_type, "event_type")?;
    let symbol = non_empty_string(raw.symbol, "symbol")?;
    let signal = raw.signal.ok_or_else(|| missing("signal"))?;
    let ts_ms = match raw.ts_ms {
        Some(Value::Number(n)) => n
            .as_i64()
            .filter(|v| *v >= 0)
            .ok_or_else(|| ValidationError("ts_ms must be a non-negative integer".to_string()))?,
        Some(_) | None => return Err(missing("ts_ms")),
    };
    let correlation_id = match raw.correlation_id {
        Some(value) if !value.trim().is_empty() => CorrelationId::from(value),
        _ => CorrelationId::generate(),
    };
    Ok(Event {
        correlation_id,
        event_type,
        symbol,
        timeframe: raw.timeframe.unwrap_or_default(),
        signal,
        ts_ms,
        metadata: raw.metadata,
    })
}

fn non_empty_string(value: Option<String>, field: &str) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(missing(field)),
    }
}

fn missing(field: &str) -> ValidationError {
    ValidationError(format!("missing or invalid required field: {field}"))
}

#[cfg(test)]
mod tests {
    use super::RawEvent;
    use super::validate;
    use serde_json::json;

    fn valid_raw() -> RawEvent {
        RawEvent {
            correlation_id: Some("c1".to_string()),
            event_type: Some("ict_signal".to_string()),
            symbol: Some("EURUSD".to_string()),
            timeframe: Some("15m".to_string()),
            signal: Some(json!({"type": "CHoCH", "strength": 0.8})),
            ts_ms: Some(json!(1_700_000_000_000_i64)),
            metadata: Default::default(),
        }
    }

    #[test]
    fn accepts_a_well_formed_event() {
        let event = validate(valid_raw()).expect("valid event");
        assert_eq!(event.correlation_id.as_str(), "c1");
        assert_eq!(event.ts_ms, 1_700_000_000_000);
    }

    #[test]
    fn assigns_a_correlation_id_when_absent() {
        let mut raw = valid_raw();
        raw.correlation_id = None;
        let event = validate(raw).expect("valid event");
        assert_eq!(event.correlation_id.as_str().len(), 32);
    }

    #[test]
    fn rejects_missing_event_type() {
        let mut raw = valid_raw();
        raw.event_type = None;
        let err = validate(raw).expect_err("should fail");
        assert!(err.reason().contains("event_type"));
    }

    #[test]
    fn rejects_negative_ts_ms() {
        let mut raw = valid_raw();
        raw.ts_ms = Some(json!(-1));
        let err = validate(raw).expect_err("should fail");
        assert!(err.reason().contains("ts_ms"));
    }

    #[test]
    fn rejects_non_numeric_ts_ms() {
        let mut raw = valid_raw();
        raw.ts_ms = Some(json!("not a number"));
        let err = validate(raw).expect_err("should fail");
        assert!(err.reason().contains("ts_ms"));
    }
}
