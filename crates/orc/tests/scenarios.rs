// tests/scenarios.rs
// ============================================================================
// The end-to-end scenarios named in the Decision Orchestration Core's
// testable-properties section, driven against the real `Orchestrator`
// rather than any single component in isolation.
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use orc_admission::CooldownManager;
use orc_admission::DedupCache;
use orc_config::OrchestratorConfig;
use orc_core::clock::Clock;
use orc_core::clock::FixedClock;
use orc_core::decision::Decision;
use orc_core::decision::EventState;
use orc_core::decision::SignalType;
use orc_core::event::RawEvent;
use orc_core::interfaces::DecisionStore;
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
use orc_scheduler::execute;
use serde_json::Value;
use serde_json::json;

struct NullMemory;

#[async_trait]
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

fn ict_signal_raw(correlation_id: &str, ts_ms: i64) -> RawEvent {
    RawEvent {
        correlation_id: Some(correlation_id.to_string()),
        event_type: Some("ict_signal".to_string()),
        symbol: Some("EURUSD".to_string()),
        timeframe: Some("15m".to_string()),
        signal: Some(json!({"type": "CHoCH"})),
        ts_ms: Some(json!(ts_ms)),
        metadata: Default::default(),
    }
}

fn single_signal_fn(signal_type: &'static str, confidence: f64) -> Arc<ReasoningFn> {
    Arc::new(move |_snap: EventSnapshot, _mem| -> BoxFuture<Vec<Value>> {
        Box::pin(async move { vec![json!({"signal_type": signal_type, "payload": {"action": "review"}, "confidence": confidence})] })
    })
}

/// Builds an orchestrator over the given store, config map, and reasoning
/// function, with no notification channels. Returns the orchestrator plus
/// the DLQ handle, so a test can assert on queue depth directly.
fn build(
    clock: Arc<FixedClock>,
    config_map: ConfigMapBackend,
    config: OrchestratorConfig,
    store: Arc<dyn DecisionStore>,
    reasoning_fn: Arc<ReasoningFn>,
) -> (orc::Orchestrator, Arc<DeadLetterQueue>) {
    let policy = Arc::new(PolicyStore::new(
        PolicyStoreConfig::default(),
        Arc::clone(&clock) as Arc<dyn Clock>,
        Arc::new(config_map),
        None,
        None,
        Arc::new(DefaultBackend),
    ));
    let reasoning = Arc::new(ReasoningInvoker::new("default", Arc::new(NullMemory)).with_mode("default", reasoning_fn));
    let dlq = Arc::new(DeadLetterQueue::new(10, BackpressurePolicy::DropOldest));
    let persister = Arc::new(DecisionPersister::new(
        store,
        None,
        Arc::clone(&dlq),
        Arc::clone(&clock) as Arc<dyn Clock>,
        orc_core::hashing::DEFAULT_HASH_ALGORITHM,
    ));
    let orchestrator = orc::Orchestrator::new(
        Arc::new(DedupCache::with_defaults()),
        Arc::new(CooldownManager::new()),
        policy,
        reasoning,
        persister,
        vec![],
        FanoutConfig::default(),
        clock as Arc<dyn Clock>,
        Arc::new(PolicyAuditLog::default()),
        config,
    );
    (orchestrator, dlq)
}

// S1 — happy path: one well-formed event, admitted, reasoned, kept by the
// filter, persisted, with no DLQ growth.
#[tokio::test]
async fn s1_happy_path_is_processed_and_persisted() {
    const T0: i64 = 1_700_000_000_000;
    let clock = Arc::new(FixedClock::new(T0));
    let mut config_map = ConfigMapBackend::default();
    config_map.set("cooldown_ms", json!({"ict_signal": 0}));
    config_map.set("signal_filter", json!({"min_confidence": {"action_suggestion": 0.5}, "blocklist": []}));

    let store = Arc::new(MemoryDecisionStore::new());
    let (orchestrator, dlq) = build(
        Arc::clone(&clock),
        config_map,
        OrchestratorConfig::default(),
        Arc::clone(&store) as Arc<dyn DecisionStore>,
        single_signal_fn("action_suggestion", 0.9),
    );

    let result = orchestrator.handle_event(ict_signal_raw("c1", T0)).await;

    assert_eq!(result.event_state, EventState::Processed);
    assert!(result.decision_id.is_some());
    let advisory_signals = result.metadata.get("advisory_signals").expect("advisory_signals present");
    assert_eq!(advisory_signals.as_array().expect("array").len(), 1);

    let persisted = store.by_correlation_id("c1").await.expect("query").expect("row exists");
    assert_eq!(persisted.correlation_id.as_str(), "c1");
    assert_eq!(result.policy_decisions.len(), 1, "only the signal filter emits a PolicyDecision row");
    assert_eq!(dlq.len(), 0);
}

// S2 — the same event replayed shortly after is discarded as a duplicate,
// and no second row lands in the store.
#[tokio::test]
async fn s2_duplicate_event_is_discarded() {
    const T0: i64 = 1_700_000_000_000;
    let clock = Arc::new(FixedClock::new(T0));
    let store = Arc::new(MemoryDecisionStore::new());
    let (orchestrator, _dlq) = build(
        Arc::clone(&clock),
        ConfigMapBackend::default(),
        OrchestratorConfig::default(),
        Arc::clone(&store) as Arc<dyn DecisionStore>,
        single_signal_fn("action_suggestion", 0.9),
    );

    let first = orchestrator.handle_event(ict_signal_raw("c1", T0)).await;
    assert_eq!(first.event_state, EventState::Processed);

    clock.advance(100);
    let second = orchestrator.handle_event(ict_signal_raw("c1", T0 + 100)).await;
    assert_eq!(second.event_state, EventState::Discarded);
    assert!(
        second.state_transitions.last().is_some_and(|transition| transition.reason.contains("duplicate")),
        "expected a duplicate reason, got {:?}",
        second.state_transitions
    );

    let rows = store.by_symbol_since("EURUSD", 0).await.expect("query");
    assert_eq!(rows.len(), 1);
}

// S3 — a second, distinct event of the same type arriving inside the
// configured cooldown window is deferred with the correct retry hint; the
// first event through the window is still processed.
#[tokio::test]
async fn s3_second_event_within_cooldown_is_deferred() {
    const T0: i64 = 1_700_000_000_000;
    let clock = Arc::new(FixedClock::new(T0));
    let mut config_map = ConfigMapBackend::default();
    config_map.set("cooldown_ms", json!({"ict_signal": 60_000}));

    let store = Arc::new(MemoryDecisionStore::new());
    let (orchestrator, _dlq) = build(
        Arc::clone(&clock),
        config_map,
        OrchestratorConfig::default(),
        Arc::clone(&store) as Arc<dyn DecisionStore>,
        single_signal_fn("action_suggestion", 0.9),
    );

    let mut event_a = ict_signal_raw("c1", T0);
    event_a.signal = Some(json!({"type": "CHoCH"}));
    let result_a = orchestrator.handle_event(event_a).await;
    assert_eq!(result_a.event_state, EventState::Processed);

    clock.advance(10_000);
    let mut event_b = ict_signal_raw("c2", T0 + 10_000);
    event_b.signal = Some(json!({"type": "BOS"}));
    let result_b = orchestrator.handle_event(event_b).await;
    assert_eq!(result_b.event_state, EventState::Deferred);
    assert_eq!(result_b.metadata.get("retry_after_ms"), Some(&json!(50_000)));
}

// S4 — a reasoning function that overruns its timeout yields exactly one
// `Timeout` advisory signal, and the event is still processed and persisted.
#[tokio::test]
async fn s4_reasoning_timeout_yields_a_timeout_signal() {
    const T0: i64 = 1_700_000_000_000;
    let clock = Arc::new(FixedClock::new(T0));
    let mut config = OrchestratorConfig::default();
    config.reasoning.timeout_ms = 500;

    let slow_fn: Arc<ReasoningFn> = Arc::new(|_snap: EventSnapshot, _mem| -> BoxFuture<Vec<Value>> {
        Box::pin(async move {
            tokio::time::sleep(std::time::Duration::from_millis(2_000)).await;
            vec![]
        })
    });

    let store = Arc::new(MemoryDecisionStore::new());
    let (orchestrator, _dlq) =
        build(Arc::clone(&clock), ConfigMapBackend::default(), config, Arc::clone(&store) as Arc<dyn DecisionStore>, slow_fn);

    let result = orchestrator.handle_event(ict_signal_raw("c1", T0)).await;

    assert_eq!(result.event_state, EventState::Processed);
    let advisory_signals = result.metadata.get("advisory_signals").expect("advisory_signals present");
    let signals = advisory_signals.as_array().expect("array");
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0]["signal_type"], json!("timeout"));
    assert_eq!(signals[0]["error"], json!("reasoning_timeout_exceeded"));

    let advisory_errors = result.metadata.get("advisory_errors").expect("advisory_errors present");
    assert_eq!(advisory_errors.as_array().expect("array").len(), 1);

    let persisted = store.by_correlation_id("c1").await.expect("query").expect("row still persisted");
    assert_eq!(persisted.advisory_signals.len(), 1);
    assert_eq!(persisted.advisory_signals[0].signal_type, SignalType::Timeout);
}

struct AlwaysFailsStore;

#[async_trait]
impl DecisionStore for AlwaysFailsStore {
    async fn insert(&self, _decision: &Decision) -> Result<(), PersistError> {
        Err(PersistError::BackendFailure("primary store unreachable".to_string()))
    }

    async fn by_correlation_id(&self, _correlation_id: &str) -> Result<Option<Decision>, PersistError> {
        Ok(None)
    }

    async fn by_symbol_since(&self, _symbol: &str, _since_ms: i64) -> Result<Vec<Decision>, PersistError> {
        Ok(Vec::new())
    }

    async fn last_n(&self, _n: usize) -> Result<Vec<Decision>, PersistError> {
        Ok(Vec::new())
    }
}

// S5 — a primary-store failure escalates the decision to the DLQ instead of
// failing the caller; a later retry against a healthy store lands it.
#[tokio::test]
async fn s5_persistence_failure_escalates_then_background_retry_lands_it() {
    const T0: i64 = 1_700_000_000_000;
    let clock = Arc::new(FixedClock::new(T0));
    let (orchestrator, dlq) = build(
        Arc::clone(&clock),
        ConfigMapBackend::default(),
        OrchestratorConfig::default(),
        Arc::new(AlwaysFailsStore) as Arc<dyn DecisionStore>,
        single_signal_fn("action_suggestion", 0.9),
    );

    let result = orchestrator.handle_event(ict_signal_raw("c1", T0)).await;
    assert_eq!(result.event_state, EventState::Escalated);
    assert_eq!(dlq.len(), 1);

    let recovered_store = Arc::new(MemoryDecisionStore::new());
    let ready = dlq.drain_ready(T0);
    assert_eq!(ready.len(), 1);
    for entry in ready {
        recovered_store.insert(&entry.decision).await.expect("retry against a healthy store succeeds");
    }
    assert_eq!(dlq.len(), 0);
    let landed = recovered_store.by_correlation_id("c1").await.expect("query");
    assert!(landed.is_some());
}

struct PartialPlanDispatcher;

#[async_trait]
impl orc_core::interfaces::PlanDispatcher for PartialPlanDispatcher {
    async fn dispatch(&self, action: &str, _payload: &Value) -> Result<Value, orc_core::interfaces::DispatchError> {
        if action == "risky_step" {
            Err(orc_core::interfaces::DispatchError::Failed("downstream rejected the order".to_string()))
        } else {
            Ok(json!({}))
        }
    }
}

// S6 — a three-step plan whose middle step fails but is configured to be
// skipped reports `partial`, having still executed every step.
#[tokio::test]
async fn s6_plan_with_a_skippable_failure_reports_partial() {
    use orc_core::identifiers::ExecutionId;
    use orc_core::identifiers::PlanId;
    use orc_core::identifiers::StepId;
    use orc_core::plan::ErrorSeverity;
    use orc_core::plan::ExecutionContext;
    use orc_core::plan::OnFailure;
    use orc_core::plan::Plan;
    use orc_core::plan::PlanStatus;
    use orc_core::plan::PlanStep;
    use std::collections::BTreeMap;

    fn step(id: &str, action: &str, on_failure: OnFailure) -> PlanStep {
        PlanStep {
            id: StepId::from(id),
            action: action.to_string(),
            payload: json!({}),
            depends_on: vec![],
            on_failure,
            timeout_ms: None,
        }
    }

    let mut environment = BTreeMap::new();
    environment.insert("account_id".to_string(), json!("acc-1"));
    let ctx = ExecutionContext {
        plan: Plan {
            id: PlanId::from("p1"),
            version: 1,
            created_at_ms: 0,
            name: "three step plan".to_string(),
            steps: vec![
                step("step1", "open_position", OnFailure::Halt),
                step("step2", "risky_step", OnFailure::Skip),
                step("step3", "close_position", OnFailure::Halt),
            ],
            context_requirements: vec!["account_id".to_string()],
            priority: None,
            timeout_ms: 10_000,
            retry_policy: None,
            metadata: BTreeMap::new(),
            tags: vec![],
            estimated_duration_ms: None,
        },
        execution_id: ExecutionId::from("e1"),
        started_at_ms: 0,
        deadline_ms: 60_000,
        environment,
        parent_execution_id: None,
        user_id: None,
        request_id: None,
        correlation_context: None,
    };

    let result = execute(ctx, Arc::new(PartialPlanDispatcher), None, Arc::new(FixedClock::new(0))).await;

    assert_eq!(result.status, PlanStatus::Partial);
    assert_eq!(result.steps_executed, 3);
    assert_eq!(result.steps_total, 3);
    assert!(result.duration_ms >= 0);
    let error = result.error.expect("partial result carries the skip error");
    assert_eq!(error.severity, ErrorSeverity::Error);
}
