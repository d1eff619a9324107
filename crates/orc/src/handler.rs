// src/handler.rs
// ============================================================================
// Module: Orchestrator Handler (C13)
// Description: The single end-to-end path per event, composing C1-C12.
// Purpose: Drive one inbound event through validation, dedup, admission,
// reasoning, filtering, persistence, and notification, returning a single
// EventResult (§4.13).
// Dependencies: orc-admission, orc-config, orc-core, orc-metrics, orc-notify,
// orc-persistence, orc-policy, orc-reasoning
// ============================================================================

//! ## Overview
//! Steps 1-6 are evaluated in sequence; the first one that reaches a
//! terminal or deferred outcome short-circuits the rest. Step 7 (notify) is
//! fire-and-forget: its own task's completion is never awaited by the
//! caller, so a slow or failing channel cannot delay `handle_event`'s
//! return. Every exit path goes through [`Orchestrator::terminal`], which is
//! the single place `EventResult` gets assembled.

use std::sync::Arc;

use orc_admission::CooldownDecision;
use orc_admission::CooldownManager;
use orc_admission::DedupCache;
use orc_admission::HourRange;
use orc_admission::fingerprint;
use orc_admission::is_admitted;
use orc_config::OrchestratorConfig;
use orc_core::clock::Clock;
use orc_core::decision::AdvisorySignal;
use orc_core::decision::Decision;
use orc_core::decision::DecisionId;
use orc_core::decision::EventResult;
use orc_core::decision::EventState;
use orc_core::decision::PolicyDecision;
use orc_core::decision::SignalType;
use orc_core::event::Event;
use orc_core::event::RawEvent;
use orc_core::event::validate;
use orc_core::hashing::DEFAULT_HASH_ALGORITHM;
use orc_core::hashing::HashDigest;
use orc_core::identifiers::CorrelationId;
use orc_core::state_machine::EventAudit;
use orc_metrics::audit::PolicyAuditLog;
use orc_notify::FanoutConfig;
use orc_notify::HttpChannel;
use orc_notify::SeverityFilter;
use orc_notify::fan_out;
use orc_persistence::DecisionPersister;
use orc_policy::PolicyStore;
use orc_reasoning::ReasoningInvoker;
use serde_json::Value;
use serde_json::json;
use tokio::sync::Semaphore;

/// Composes every orchestrator component into the single `handle_event`
/// entry point.
pub struct Orchestrator {
    dedup: Arc<DedupCache>,
    cooldown: Arc<CooldownManager>,
    policy: Arc<PolicyStore>,
    reasoning: Arc<ReasoningInvoker>,
    persister: Arc<DecisionPersister>,
    channels: Vec<Arc<HttpChannel>>,
    fanout_config: FanoutConfig,
    notify_semaphore: Arc<Semaphore>,
    clock: Arc<dyn Clock>,
    audit_log: Arc<PolicyAuditLog>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Builds an orchestrator from its already-constructed components.
    #[must_use]
    pub fn new(
        dedup: Arc<DedupCache>,
        cooldown: Arc<CooldownManager>,
        policy: Arc<PolicyStore>,
        reasoning: Arc<ReasoningInvoker>,
        persister: Arc<DecisionPersister>,
        channels: Vec<Arc<HttpChannel>>,
        fanout_config: FanoutConfig,
        clock: Arc<dyn Clock>,
        audit_log: Arc<PolicyAuditLog>,
        config: OrchestratorConfig,
    ) -> Self {
        let notify_semaphore = Arc::new(Semaphore::new(fanout_config.max_concurrency.max(1)));
        Self {
            dedup,
            cooldown,
            policy,
            reasoning,
            persister,
            channels,
            fanout_config,
            notify_semaphore,
            clock,
            audit_log,
            config,
        }
    }

    /// Runs one event through the full pipeline.
    pub async fn handle_event(&self, raw: RawEvent) -> EventResult {
        let started_at_ms = self.clock.now_ms();

        let event = match validate(raw) {
            Ok(event) => event,
            Err(error) => {
                let correlation_id = CorrelationId::generate();
                return self.terminal(correlation_id, started_at_ms, EventState::Discarded, error.reason(), vec![]);
            }
        };

        if self.is_duplicate(&event) {
            orc_metrics::registry::decision_deduplicated();
            return self.terminal(event.correlation_id.clone(), started_at_ms, EventState::Discarded, "duplicate", vec![]);
        }

        let mut policy_decisions = Vec::new();
        if let Some(result) = self.admit(&event, started_at_ms, &mut policy_decisions).await {
            return result;
        }

        let (signals, reasoning_time_ms) = self.reason(&event, started_at_ms).await;
        orc_metrics::registry::reasoning_time_ms(reasoning_time_ms);
        let advisory_errors: Vec<String> = signals.iter().filter_map(|signal| signal.error.clone()).collect();
        if signals.iter().any(|signal| signal.signal_type == SignalType::Timeout) {
            orc_metrics::registry::reasoning_timeout();
        }

        let ctx = json!({"event_type": event.event_type, "symbol": event.symbol});
        let (kept_signals, filter_audit) = orc_policy::filter_signals(&self.policy, signals, &event.event_type, &ctx, started_at_ms).await;
        for decision in &filter_audit {
            self.audit_log.record(decision.clone());
        }
        policy_decisions.extend(filter_audit);

        let decision_id = DecisionId::from(CorrelationId::generate().as_str());
        let confidence = kept_signals.iter().filter_map(|signal| signal.confidence).fold(0.0_f64, f64::max);
        let signals_with_decision: Vec<AdvisorySignal> = kept_signals
            .into_iter()
            .map(|mut signal| {
                signal.decision_id = Some(decision_id.clone());
                signal
            })
            .collect();

        let decision = Decision {
            decision_id,
            correlation_id: event.correlation_id.clone(),
            symbol: event.symbol.clone(),
            timeframe: event.timeframe.clone(),
            signal: event.signal.clone(),
            reasoning_mode: signals_with_decision.first().map_or_else(|| "default".to_string(), |signal| signal.reasoning_mode.clone()),
            confidence,
            reasoning_time_ms,
            advisory_signals: signals_with_decision.clone(),
            policy_decisions: policy_decisions.clone(),
            decision_hash: HashDigest {
                algorithm: DEFAULT_HASH_ALGORITHM,
                value: String::new(),
            },
            ts_ms: started_at_ms,
        };

        let (decision, outcome) = match self.persister.persist(decision).await {
            Ok(result) => result,
            Err(_hash_error) => {
                return self.terminal(
                    event.correlation_id.clone(),
                    started_at_ms,
                    EventState::Discarded,
                    "internal_error:hash_computation_failed",
                    policy_decisions,
                );
            }
        };

        let event_state = match outcome {
            orc_persistence::PersistOutcome::Written => EventState::Processed,
            orc_persistence::PersistOutcome::Escalated => EventState::Escalated,
        };

        self.notify(&decision);

        let mut result = self.terminal(
            event.correlation_id.clone(),
            started_at_ms,
            event_state,
            match event_state {
                EventState::Processed => "persisted",
                _ => "escalated_to_dlq",
            },
            policy_decisions,
        );
        result.decision_id = Some(decision.decision_id);
        result.metadata.insert("advisory_signals".to_string(), json!(signals_with_decision));
        result.metadata.insert("advisory_errors".to_string(), json!(advisory_errors));
        result
    }

    fn is_duplicate(&self, event: &Event) -> bool {
        let fp = fingerprint(event.correlation_id.as_str(), &event.symbol, &event.signal);
        self.dedup.check_and_insert(&fp, event.ts_ms)
    }

    /// Runs the cooldown then session-window gates. Returns `Some` with the
    /// terminal result when admission is deferred.
    ///
    /// Per §4.7, admission gates never produce `PolicyDecision` audit rows —
    /// only the signal filter does. The cooldown/session checks are still
    /// logged to `audit_log` for diagnostics, and `policy_decisions` is
    /// threaded through untouched so a deferred result still carries
    /// whatever rows were already recorded for this event.
    async fn admit(&self, event: &Event, now_ms: i64, policy_decisions: &mut Vec<PolicyDecision>) -> Option<EventResult> {
        let ctx = json!({"event_type": event.event_type, "symbol": event.symbol});

        let cooldown_policy = self.policy.get_policy("cooldown_ms", &ctx).await;
        let cooldown_ms = cooldown_policy.get(event.event_type.as_str()).and_then(Value::as_i64).unwrap_or(self.config.cooldown.default_ms);
        let cooldown_decision = self.cooldown.check(&event.event_type, now_ms, cooldown_ms);
        let cooldown_admitted = matches!(cooldown_decision, CooldownDecision::Admit);
        let cooldown_audit = PolicyDecision {
            policy_name: "cooldown_ms".to_string(),
            applied: cooldown_admitted,
            reason: if cooldown_admitted {
                "cooldown window elapsed".to_string()
            } else {
                "within cooldown window".to_string()
            },
            ts_ms: now_ms,
        };
        self.audit_log.record(cooldown_audit);

        if let CooldownDecision::Defer {
            retry_after_ms,
        } = cooldown_decision
        {
            let mut result =
                self.terminal(event.correlation_id.clone(), now_ms, EventState::Deferred, "cooldown", policy_decisions.clone());
            result.metadata.insert("retry_after_ms".to_string(), json!(retry_after_ms));
            return Some(result);
        }

        let session_policy = self.policy.get_policy("session_window", &ctx).await;
        let ranges = parse_hour_ranges(session_policy.get(event.event_type.as_str()));
        let session_admitted = is_admitted(now_ms, &ranges);
        let session_audit = PolicyDecision {
            policy_name: "session_window".to_string(),
            applied: session_admitted,
            reason: if session_admitted {
                "within an admitted session window".to_string()
            } else {
                "outside every admitted session window".to_string()
            },
            ts_ms: now_ms,
        };
        self.audit_log.record(session_audit);

        if !session_admitted {
            return Some(self.terminal(
                event.correlation_id.clone(),
                now_ms,
                EventState::Deferred,
                "session_window",
                policy_decisions.clone(),
            ));
        }

        None
    }

    /// Resolves the reasoning mode (event hint, then policy, then the
    /// invoker's own default) and invokes C6.
    async fn reason(&self, event: &Event, now_ms: i64) -> (Vec<AdvisorySignal>, i64) {
        let event_hint = event.metadata.get("reasoning_mode").and_then(Value::as_str).map(str::to_string);
        let mode = match event_hint {
            Some(mode) => Some(mode),
            None => {
                let ctx = json!({"event_type": event.event_type});
                let policy_mode = self.policy.get_policy("reasoning_mode", &ctx).await;
                policy_mode.get(event.event_type.as_str()).and_then(Value::as_str).map(str::to_string)
            }
        };
        self.reasoning.invoke(event, mode.as_deref(), self.config.reasoning.timeout_ms, now_ms).await
    }

    /// Hands `decision` to the notifier fanout without waiting for delivery
    /// to complete.
    fn notify(&self, decision: &Decision) {
        let body = json!({
            "correlation_id": decision.correlation_id.as_str(),
            "symbol": decision.symbol,
            "timeframe": decision.timeframe,
            "signal": decision.signal,
            "confidence": decision.confidence,
            "advisory_signals": decision.advisory_signals,
            "ts_ms": decision.ts_ms,
        });
        let channels: Vec<Arc<dyn orc_core::interfaces::NotificationChannel>> = self
            .channels
            .iter()
            .filter(|channel| admits_channel(channel, decision.confidence, self.config.min_warn_confidence))
            .map(|channel| Arc::clone(channel) as Arc<dyn orc_core::interfaces::NotificationChannel>)
            .collect();
        let config = self.fanout_config;
        let semaphore = Arc::clone(&self.notify_semaphore);
        tokio::spawn(async move {
            fan_out(&channels, body, &config, semaphore).await;
        });
    }

    /// Assembles an `EventResult`, recording one state transition.
    fn terminal(
        &self,
        correlation_id: CorrelationId,
        started_at_ms: i64,
        state: EventState,
        reason: &str,
        policy_decisions: Vec<PolicyDecision>,
    ) -> EventResult {
        let now = self.clock.now_ms();
        let mut audit = EventAudit::new();
        let _ = audit.transition(state, now, reason);

        orc_metrics::registry::decision_processing_time_ms(now - started_at_ms);

        EventResult {
            correlation_id,
            event_state: state,
            decision_id: None,
            processing_time_ms: now - started_at_ms,
            policy_decisions,
            state_transitions: audit.transitions().to_vec(),
            metadata: std::collections::BTreeMap::new(),
        }
    }
}

/// Parses a `session_window` policy value for one event type into
/// [`HourRange`]s. Malformed or absent entries admit unconditionally (an
/// empty range set).
fn parse_hour_ranges(value: Option<&Value>) -> Vec<HourRange> {
    let Some(Value::Array(entries)) = value else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let start_hour = entry.get("start_hour")?.as_u64()?;
            let end_hour = entry.get("end_hour")?.as_u64()?;
            Some(HourRange {
                start_hour: u8::try_from(start_hour).ok()?,
                end_hour: u8::try_from(end_hour).ok()?,
            })
        })
        .collect()
}

/// Decides whether `channel` accepts a decision of the given `confidence`,
/// combining its own `min_confidence` floor with its coarse severity tier.
/// A decision is "promoted" to `warn` once its confidence reaches
/// `min_warn_confidence`; an `all`-filtered channel ignores promotion
/// entirely, `warn` requires it, `info` requires the opposite.
fn admits_channel(channel: &HttpChannel, confidence: f64, min_warn_confidence: f64) -> bool {
    if confidence < channel.min_confidence {
        return false;
    }
    let promoted = confidence >= min_warn_confidence;
    match channel.severity_filter {
        SeverityFilter::All => true,
        SeverityFilter::Warn => promoted,
        SeverityFilter::Info => !promoted,
    }
}

#[cfg(test)]
mod tests {
    use super::Orchestrator;
    use orc_admission::CooldownManager;
    use orc_admission::DedupCache;
    use orc_config::OrchestratorConfig;
    use orc_core::clock::FixedClock;
    use orc_core::decision::Decision;
    use orc_core::decision::EventState;
    use orc_core::decision::SignalType;
    use orc_core::event::RawEvent;
    use orc_core::interfaces::MemoryAccessor;
    use orc_core::interfaces::PersistError;
    use orc_metrics::audit::PolicyAuditLog;
    use orc_notify::FanoutConfig;
    use orc_persistence::BackpressurePolicy;
    use orc_persistence::DeadLetterQueue;
    use orc_persistence::DecisionPersister;
    use orc_persistence::MemoryDecisionStore;
    use orc_policy::ConfigMapBackend;
    use orc_policy::DefaultBackend;
    use orc_policy::PolicyStore;
    use orc_policy::PolicyStoreConfig;
    use orc_reasoning::BoxFuture;
    use orc_reasoning::EventSnapshot;
    use orc_reasoning::ReasoningFn;
    use orc_reasoning::ReasoningInvoker;
    use serde_json::json;
    use std::sync::Arc;

    struct NullMemory;

    #[async_trait::async_trait]
    impl MemoryAccessor for NullMemory {
        async fn by_correlation_id(&self, _id: &str) -> Result<Option<Decision>, PersistError> {
            Ok(None)
        }

        async fn by_symbol_since(&self, _symbol: &str, _since_ms: i64) -> Result<Vec<Decision>, PersistError> {
            Ok(Vec::new())
        }

        async fn last_n(&self, _n: usize) -> Result<Vec<Decision>, PersistError> {
            Ok(Vec::new())
        }
    }

    fn build_orchestrator(clock: Arc<FixedClock>) -> Orchestrator {
        let policy = Arc::new(PolicyStore::new(
            PolicyStoreConfig::default(),
            Arc::clone(&clock) as Arc<dyn orc_core::clock::Clock>,
            Arc::new(ConfigMapBackend::default()),
            None,
            None,
            Arc::new(DefaultBackend),
        ));
        let function: Arc<ReasoningFn> = Arc::new(|_snap: EventSnapshot, _mem| -> BoxFuture<Vec<serde_json::Value>> {
            Box::pin(async move { vec![json!({"signal_type": "action_suggestion", "payload": {"action": "review"}, "confidence": 0.9})] })
        });
        let reasoning = Arc::new(ReasoningInvoker::new("default", Arc::new(NullMemory)).with_mode("default", function));
        let persister = Arc::new(DecisionPersister::new(
            Arc::new(MemoryDecisionStore::new()),
            None,
            Arc::new(DeadLetterQueue::new(10, BackpressurePolicy::DropOldest)),
            Arc::clone(&clock) as Arc<dyn orc_core::clock::Clock>,
            orc_core::hashing::DEFAULT_HASH_ALGORITHM,
        ));
        Orchestrator::new(
            Arc::new(DedupCache::with_defaults()),
            Arc::new(CooldownManager::new()),
            policy,
            reasoning,
            persister,
            vec![],
            FanoutConfig::default(),
            clock as Arc<dyn orc_core::clock::Clock>,
            Arc::new(PolicyAuditLog::default()),
            OrchestratorConfig::default(),
        )
    }

    fn sample_raw() -> RawEvent {
        RawEvent {
            correlation_id: Some("c1".to_string()),
            event_type: Some("ict_signal".to_string()),
            symbol: Some("EURUSD".to_string()),
            timeframe: Some("15m".to_string()),
            signal: Some(json!({"type": "CHoCH"})),
            ts_ms: Some(json!(1_700_000_000_000_i64)),
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn a_well_formed_event_is_processed_and_persisted() {
        let orchestrator = build_orchestrator(Arc::new(FixedClock::new(1_700_000_000_000)));
        let result = orchestrator.handle_event(sample_raw()).await;
        assert_eq!(result.event_state, EventState::Processed);
        assert!(result.decision_id.is_some());
    }

    #[tokio::test]
    async fn a_malformed_event_is_discarded() {
        let orchestrator = build_orchestrator(Arc::new(FixedClock::new(0)));
        let mut raw = sample_raw();
        raw.symbol = None;
        let result = orchestrator.handle_event(raw).await;
        assert_eq!(result.event_state, EventState::Discarded);
    }

    #[tokio::test]
    async fn a_repeated_event_is_discarded_as_a_duplicate() {
        let orchestrator = build_orchestrator(Arc::new(FixedClock::new(1_700_000_000_000)));
        let first = orchestrator.handle_event(sample_raw()).await;
        let second = orchestrator.handle_event(sample_raw()).await;
        assert_eq!(first.event_state, EventState::Processed);
        assert_eq!(second.event_state, EventState::Discarded);
    }
}
