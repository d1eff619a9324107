// src/filter.rs
// ============================================================================
// Module: Signal Filter (C7)
// Description: Applies the `signal_filter` policy to a batch of advisory
// signals.
// Purpose: Drop signals below a per-signal-type confidence threshold or on
// a blocklist, without mutating the survivors.
// Dependencies: orc-core, crate::store
// ============================================================================

//! ## Overview
//! `signal_filter` resolves to `{"min_confidence": {<signal_type>: f64}, "blocklist":
//! [<signal_type>, ...]}`. A signal with no confidence value is always kept
//! unless its type is blocked; absence of a per-type threshold defaults to
//! `0.0`.

use orc_core::decision::AdvisorySignal;
use orc_core::decision::PolicyDecision;
use orc_core::decision::SignalType;
use serde_json::Value;

use crate::store::PolicyStore;

fn signal_type_key(signal_type: SignalType) -> &'static str {
    match signal_type {
        SignalType::ActionSuggestion => "action_suggestion",
        SignalType::RiskFlag => "risk_flag",
        SignalType::OptimizationHint => "optimization_hint",
        SignalType::Error => "error",
        SignalType::Timeout => "timeout",
    }
}

fn is_blocked(policy: &Value, key: &str) -> bool {
    policy["blocklist"].as_array().is_some_and(|blocklist| blocklist.iter().any(|entry| entry.as_str() == Some(key)))
}

fn min_confidence(policy: &Value, key: &str) -> f64 {
    policy["min_confidence"][key].as_f64().unwrap_or(0.0)
}

/// Applies the signal filter, returning the surviving signals (in input
/// order, unmutated) and an audit row per input signal.
pub async fn filter_signals(
    store: &PolicyStore,
    signals: Vec<AdvisorySignal>,
    event_type: &str,
    context: &Value,
    now_ms: i64,
) -> (Vec<AdvisorySignal>, Vec<PolicyDecision>) {
    let ctx = serde_json::json!({"event_type": event_type, "context": context});
    let policy = store.get_policy("signal_filter", &ctx).await;

    let mut kept = Vec::with_capacity(signals.len());
    let mut audit = Vec::with_capacity(signals.len());

    for signal in signals {
        let key = signal_type_key(signal.signal_type);
        let blocked = is_blocked(&policy, key);
        let threshold = min_confidence(&policy, key);
        let passes_confidence = signal.confidence.is_none_or(|confidence| confidence >= threshold);
        let keep = !blocked && passes_confidence;

        let reason = if blocked {
            format!("signal type '{key}' is blocklisted")
        } else if !passes_confidence {
            format!(
                "confidence {:.3} below threshold {threshold:.3} for '{key}'",
                signal.confidence.unwrap_or(0.0)
            )
        } else {
            "kept: not blocked and confidence at or above threshold".to_string()
        };

        audit.push(PolicyDecision {
            policy_name: "signal_filter".to_string(),
            applied: keep,
            reason,
            ts_ms: now_ms,
        });

        if keep {
            kept.push(signal);
        }
    }

    (kept, audit)
}
