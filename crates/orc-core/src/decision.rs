// src/decision.rs
// ============================================================================
// Module: Decision Data Model
// Description: Persisted Decision/DecisionOutcome rows and the advisory
// signals, policy audit rows, and EventResult returned to callers.
// Purpose: Single shared representation of §3 DATA MODEL entities.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! These types cross every component boundary in the orchestrator. They are
//! plain data: no component mutates another's copy, and `Decision` /
//! `DecisionOutcome` rows are append-only once persisted.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::hashing::HashDigest;
use crate::identifiers::CorrelationId;
use crate::identifiers::DecisionId;
use crate::identifiers::PlanId;

/// Kind of an [`AdvisorySignal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    /// A suggested, non-binding action.
    ActionSuggestion,
    /// A risk warning.
    RiskFlag,
    /// A suggested tuning/optimization.
    OptimizationHint,
    /// The reasoning function raised an error.
    Error,
    /// The reasoning function did not complete within its deadline.
    Timeout,
}

/// A non-binding, informational output of one reasoning call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorySignal {
    /// Kind of signal.
    pub signal_type: SignalType,
    /// Opaque payload, shape defined by the reasoning mode.
    pub payload: Value,
    /// Confidence in `[0.0, 1.0]`, clamped; `None` when not numeric.
    pub confidence: Option<f64>,
    /// Reasoning mode that produced this signal.
    pub reasoning_mode: String,
    /// Owning decision, once one exists.
    pub decision_id: Option<DecisionId>,
    /// Associated plan, if the signal carries an executable plan reference.
    pub plan_id: Option<PlanId>,
    /// Present only when `signal_type` is `error` or `timeout`.
    pub error: Option<String>,
    /// Wall-clock milliseconds when the signal was produced.
    pub ts_ms: i64,
}

impl AdvisorySignal {
    /// Clamps `confidence` into `[0.0, 1.0]`, or drops it to `None` if it is
    /// not a finite number.
    pub fn clamp_confidence(&mut self) {
        self.confidence = self.confidence.and_then(|c| {
            if c.is_finite() {
                Some(c.clamp(0.0, 1.0))
            } else {
                None
            }
        });
    }
}

/// Outcome of applying policy to one signal, or of a cooldown/session/dedup
/// admission check. Recorded as an audit row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// Name of the policy that was evaluated.
    pub policy_name: String,
    /// Whether the policy's effect was applied (e.g. the signal was kept).
    pub applied: bool,
    /// Human-readable reason for the decision.
    pub reason: String,
    /// Wall-clock milliseconds when the decision was recorded.
    pub ts_ms: i64,
}

/// A persisted, append-only decision row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Unique id of this decision.
    pub decision_id: DecisionId,
    /// Correlation id of the event that produced this decision.
    pub correlation_id: CorrelationId,
    /// Instrument symbol.
    pub symbol: String,
    /// Instrument timeframe.
    pub timeframe: String,
    /// Snapshot of the triggering signal.
    pub signal: Value,
    /// Reasoning mode used.
    pub reasoning_mode: String,
    /// Confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Wall-clock duration of the reasoning call.
    pub reasoning_time_ms: i64,
    /// Ordered advisory signals produced for this decision.
    pub advisory_signals: Vec<AdvisorySignal>,
    /// Ordered policy audit rows recorded while producing this decision.
    pub policy_decisions: Vec<PolicyDecision>,
    /// Deterministic digest over the fields above, excluding timestamps.
    pub decision_hash: HashDigest,
    /// Wall-clock milliseconds when the decision was produced.
    pub ts_ms: i64,
}

/// Fields of a [`Decision`] that participate in `decision_hash`, serialized in
/// a fixed shape (timestamps excluded) so the hash is reproducible.
#[derive(Serialize)]
struct DecisionHashShape<'a> {
    decision_id: &'a str,
    correlation_id: &'a str,
    symbol: &'a str,
    timeframe: &'a str,
    signal: &'a Value,
    reasoning_mode: &'a str,
    confidence: f64,
    advisory_signals: &'a [AdvisorySignal],
    policy_decisions: &'a [PolicyDecision],
}

impl Decision {
    /// Computes the deterministic `decision_hash` for this decision's
    /// content, excluding all timestamps.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be canonicalized to JSON.
    pub fn compute_hash(
        &self,
        algorithm: crate::hashing::HashAlgorithm,
    ) -> Result<HashDigest, crate::hashing::HashError> {
        let shape = DecisionHashShape {
            decision_id: self.decision_id.as_str(),
            correlation_id: self.correlation_id.as_str(),
            symbol: &self.symbol,
            timeframe: &self.timeframe,
            signal: &self.signal,
            reasoning_mode: &self.reasoning_mode,
            confidence: self.confidence,
            advisory_signals: &self.advisory_signals,
            policy_decisions: &self.policy_decisions,
        };
        crate::hashing::hash_canonical_json(algorithm, &shape)
    }
}

/// Outcome classification derived from `pnl`'s sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// `pnl > 0`.
    Win,
    /// `pnl < 0`.
    Loss,
    /// `pnl == 0`.
    Breakeven,
}

impl Outcome {
    /// Derives an outcome from a profit-and-loss value.
    #[must_use]
    pub fn from_pnl(pnl: f64) -> Self {
        if pnl > 0.0 {
            Self::Win
        } else if pnl < 0.0 {
            Self::Loss
        } else {
            Self::Breakeven
        }
    }
}

/// Reason a position attached to a decision was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Take-profit hit.
    Tp,
    /// Stop-loss hit.
    Sl,
    /// Manually closed.
    Manual,
    /// Closed after a timeout.
    Timeout,
}

/// A persisted, append-only outcome row linked to a prior decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionOutcome {
    /// Decision this outcome is linked to.
    pub decision_id: DecisionId,
    /// Instrument symbol.
    pub symbol: String,
    /// Instrument timeframe.
    pub timeframe: String,
    /// Signal type this outcome applies to.
    pub signal_type: SignalType,
    /// Entry price.
    pub entry_price: f64,
    /// Exit price.
    pub exit_price: f64,
    /// Realized profit and loss.
    pub pnl: f64,
    /// Derived from `pnl`'s sign.
    pub outcome: Outcome,
    /// Reason the position was closed.
    pub exit_reason: ExitReason,
    /// Wall-clock milliseconds the position was closed.
    pub closed_at: i64,
    /// Wall-clock milliseconds this outcome row was created.
    pub created_at: i64,
}

/// Terminal and non-terminal states of one event's processing lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventState {
    /// Admitted, processing not yet complete.
    Pending,
    /// Reasoning completed and the decision was persisted.
    Processed,
    /// Admission deferred by cooldown or session window.
    Deferred,
    /// Reasoning completed but persistence fell through to the DLQ.
    Escalated,
    /// Rejected by validation or deduplication.
    Discarded,
}

/// One state transition recorded in an event's audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    /// Prior state.
    pub from: EventState,
    /// New state.
    pub to: EventState,
    /// Wall-clock milliseconds the transition occurred.
    pub ts_ms: i64,
    /// Reason for the transition.
    pub reason: String,
}

/// Result returned to the caller of `handle_event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResult {
    /// Correlation id of the processed event.
    pub correlation_id: CorrelationId,
    /// Final (or current) event state.
    pub event_state: EventState,
    /// Decision id, if one was produced.
    pub decision_id: Option<DecisionId>,
    /// Wall-clock duration of the whole `handle_event` call.
    pub processing_time_ms: i64,
    /// Ordered policy audit rows recorded while processing this event.
    pub policy_decisions: Vec<PolicyDecision>,
    /// Ordered state transitions recorded while processing this event.
    pub state_transitions: Vec<StateTransition>,
    /// Free-form metadata, including `advisory_signals` and
    /// `advisory_errors` lists.
    pub metadata: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::AdvisorySignal;
    use super::Outcome;
    use super::SignalType;
    use serde_json::json;

    #[test]
    fn clamp_confidence_clamps_into_unit_range() {
        let mut signal = AdvisorySignal {
            signal_type: SignalType::ActionSuggestion,
            payload: json!({}),
            confidence: Some(1.5),
            reasoning_mode: "default".to_string(),
            decision_id: None,
            plan_id: None,
            error: None,
            ts_ms: 0,
        };
        signal.clamp_confidence();
        assert_eq!(signal.confidence, Some(1.0));
    }

    #[test]
    fn clamp_confidence_drops_non_finite_to_none() {
        let mut signal = AdvisorySignal {
            signal_type: SignalType::ActionSuggestion,
            payload: json!({}),
            confidence: Some(f64::NAN),
            reasoning_mode: "default".to_string(),
            decision_id: None,
            plan_id: None,
            error: None,
            ts_ms: 0,
        };
        signal.clamp_confidence();
        assert_eq!(signal.confidence, None);
    }

    #[test]
    fn outcome_derives_from_pnl_sign() {
        assert_eq!(Outcome::from_pnl(10.0), Outcome::Win);
        assert_eq!(Outcome::from_pnl(-10.0), Outcome::Loss);
        assert_eq!(Outcome::from_pnl(0.0), Outcome::Breakeven);
    }
}
