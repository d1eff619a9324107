// src/execute.rs
// ============================================================================
// Module: Plan Execution Loop (C14)
// Description: Sequential, single-threaded execution of one plan's steps,
// honoring `on_failure` and the deterministic status-inference rules.
// Dependencies: orc-core::{plan, interfaces}, tokio
// ============================================================================

//! ## Overview
//! One call to [`execute`] drives exactly one [`ExecutionContext`] to
//! completion. Steps run strictly in list order; `depends_on` only ever
//! references earlier steps (validated beforehand), so there is no
//! scheduling freedom to exploit — this loop is not a general DAG
//! scheduler.

use std::collections::HashSet;
use std::sync::Arc;

use orc_core::clock::Clock;
use orc_core::identifiers::StepId;
use orc_core::interfaces::DispatchError;
use orc_core::interfaces::PlanDispatcher;
use orc_core::interfaces::PlanObserver;
use orc_core::plan::ErrorCode;
use orc_core::plan::ErrorSeverity;
use orc_core::plan::ExecutionContext;
use orc_core::plan::ExecutionError;
use orc_core::plan::OnFailure;
use orc_core::plan::PlanResult;
use orc_core::plan::PlanStatus;

use crate::validate::validate_execution_context;
use crate::validate::validate_plan;

/// Builds a `failure`/`partial` result, status inferred from `error.severity`.
fn errored_result(ctx: &ExecutionContext, steps_executed: usize, started_at_ms: i64, now_ms: i64, error: ExecutionError) -> PlanResult {
    let status = if error.severity == ErrorSeverity::Fatal || steps_executed == 0 {
        PlanStatus::Failure
    } else {
        PlanStatus::Partial
    };
    PlanResult {
        plan_id: ctx.plan.id.clone(),
        execution_id: ctx.execution_id.clone(),
        status,
        completed_at_ms: now_ms,
        duration_ms: now_ms - started_at_ms,
        steps_executed,
        steps_total: ctx.plan.steps.len(),
        result_payload: None,
        error: Some(error),
    }
}

/// Builds a `success` result.
fn success_result(ctx: &ExecutionContext, steps_executed: usize, started_at_ms: i64, now_ms: i64) -> PlanResult {
    PlanResult {
        plan_id: ctx.plan.id.clone(),
        execution_id: ctx.execution_id.clone(),
        status: PlanStatus::Success,
        completed_at_ms: now_ms,
        duration_ms: now_ms - started_at_ms,
        steps_executed,
        steps_total: ctx.plan.steps.len(),
        result_payload: None,
        error: None,
    }
}

/// Maps a dispatcher failure onto the reserved error code/severity pair.
fn dispatch_error_to_execution_error(error: &DispatchError, step_id: StepId) -> ExecutionError {
    let (code, severity) = match error {
        DispatchError::ActionNotFound(_) => (ErrorCode::ActionNotFound, ErrorSeverity::Fatal),
        DispatchError::InvalidPayload(_) => (ErrorCode::InvalidPayload, ErrorSeverity::Fatal),
        DispatchError::Failed(_) => (ErrorCode::ExecutionHalted, ErrorSeverity::Error),
    };
    ExecutionError::new(code, severity, error.to_string()).with_step(step_id)
}

/// Executes `ctx.plan` under `ctx`, delegating step semantics to
/// `dispatcher`. Validation failures and runtime errors both surface as a
/// [`PlanResult`]; this function itself never returns an `Err`.
pub async fn execute(
    ctx: ExecutionContext,
    dispatcher: Arc<dyn PlanDispatcher>,
    observer: Option<Arc<dyn PlanObserver>>,
    clock: Arc<dyn Clock>,
) -> PlanResult {
    let started_at_ms = clock.now_ms();

    if let Err(error) = validate_plan(&ctx.plan) {
        let result = errored_result(&ctx, 0, started_at_ms, clock.now_ms(), error);
        notify(observer.as_deref(), &result);
        return result;
    }
    if let Err(error) = validate_execution_context(&ctx) {
        let result = errored_result(&ctx, 0, started_at_ms, clock.now_ms(), error);
        notify(observer.as_deref(), &result);
        return result;
    }

    let mut completed_ids: HashSet<String> = HashSet::with_capacity(ctx.plan.steps.len());
    let mut steps_executed = 0usize;
    let mut last_skip: Option<ExecutionError> = None;

    for step in &ctx.plan.steps {
        let now_ms = clock.now_ms();
        if now_ms > ctx.deadline_ms {
            let error = ExecutionError::new(ErrorCode::DeadlineExceeded, ErrorSeverity::Fatal, "execution passed its deadline")
                .with_step(step.id.clone());
            let result = errored_result(&ctx, steps_executed, started_at_ms, now_ms, error);
            notify(observer.as_deref(), &result);
            return result;
        }

        let unresolved = step.depends_on.iter().find(|dependency| !completed_ids.contains(dependency.as_str()));
        if let Some(dependency) = unresolved {
            let error = ExecutionError::new(
                ErrorCode::DependencyUnresolved,
                ErrorSeverity::Fatal,
                format!("dependency '{dependency}' is not yet completed"),
            )
            .with_step(step.id.clone());
            let result = errored_result(&ctx, steps_executed, started_at_ms, now_ms, error);
            notify(observer.as_deref(), &result);
            return result;
        }

        match dispatcher.dispatch(&step.action, &step.payload).await {
            Ok(_payload) => {
                completed_ids.insert(step.id.as_str().to_string());
                steps_executed += 1;
            }
            Err(failure) => match step.on_failure {
                OnFailure::Halt | OnFailure::Retry => {
                    let error = dispatch_error_to_execution_error(&failure, step.id.clone());
                    let result = errored_result(&ctx, steps_executed, started_at_ms, clock.now_ms(), error);
                    notify(observer.as_deref(), &result);
                    return result;
                }
                OnFailure::Skip => {
                    completed_ids.insert(step.id.as_str().to_string());
                    steps_executed += 1;
                    last_skip = Some(
                        ExecutionError::new(ErrorCode::StepSkipped, ErrorSeverity::Error, failure.to_string())
                            .with_step(step.id.clone()),
                    );
                }
            },
        }
    }

    let result = match last_skip {
        Some(error) => errored_result(&ctx, steps_executed, started_at_ms, clock.now_ms(), error),
        None => success_result(&ctx, steps_executed, started_at_ms, clock.now_ms()),
    };
    notify(observer.as_deref(), &result);
    result
}

/// Best-effort, non-blocking observer notification.
fn notify(observer: Option<&dyn PlanObserver>, result: &PlanResult) {
    if let Some(observer) = observer {
        observer.on_plan_completed(result);
    }
}

#[cfg(test)]
mod tests {
    use super::execute;
    use async_trait::async_trait;
    use orc_core::clock::FixedClock;
    use orc_core::identifiers::ExecutionId;
    use orc_core::identifiers::PlanId;
    use orc_core::identifiers::StepId;
    use orc_core::interfaces::DispatchError;
    use orc_core::interfaces::PlanDispatcher;
    use orc_core::plan::ExecutionContext;
    use orc_core::plan::OnFailure;
    use orc_core::plan::Plan;
    use orc_core::plan::PlanStatus;
    use orc_core::plan::PlanStep;
    use serde_json::Value;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    struct AlwaysOk;

    #[async_trait]
    impl PlanDispatcher for AlwaysOk {
        async fn dispatch(&self, _action: &str, _payload: &Value) -> Result<Value, DispatchError> {
            Ok(json!({}))
        }
    }

    struct FailsOn(&'static str);

    #[async_trait]
    impl PlanDispatcher for FailsOn {
        async fn dispatch(&self, action: &str, _payload: &Value) -> Result<Value, DispatchError> {
            if action == self.0 {
                Err(DispatchError::Failed("boom".to_string()))
            } else {
                Ok(json!({}))
            }
        }
    }

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

    fn ctx(steps: Vec<PlanStep>) -> ExecutionContext {
        let mut environment = BTreeMap::new();
        environment.insert("account_id".to_string(), json!("acc-1"));
        ExecutionContext {
            plan: Plan {
                id: PlanId::from("p1"),
                version: 1,
                created_at_ms: 0,
                name: "plan".to_string(),
                steps,
                context_requirements: vec!["account_id".to_string()],
                priority: None,
                timeout_ms: 1_000,
                retry_policy: None,
                metadata: BTreeMap::new(),
                tags: vec![],
                estimated_duration_ms: None,
            },
            execution_id: ExecutionId::from("e1"),
            started_at_ms: 0,
            deadline_ms: 10_000,
            environment,
            parent_execution_id: None,
            user_id: None,
            request_id: None,
            correlation_context: None,
        }
    }

    #[tokio::test]
    async fn all_steps_succeeding_yields_success() {
        let result = execute(ctx(vec![step("a", "noop", OnFailure::Halt), step("b", "noop", OnFailure::Halt)]), Arc::new(AlwaysOk), None, Arc::new(FixedClock::new(0)))
            .await;
        assert_eq!(result.status, PlanStatus::Success);
        assert_eq!(result.steps_executed, 2);
    }

    #[tokio::test]
    async fn halt_on_failure_stops_immediately() {
        let result = execute(
            ctx(vec![step("a", "noop", OnFailure::Halt), step("b", "boom", OnFailure::Halt), step("c", "noop", OnFailure::Halt)]),
            Arc::new(FailsOn("boom")),
            None,
            Arc::new(FixedClock::new(0)),
        )
        .await;
        assert_eq!(result.status, PlanStatus::Failure);
        assert_eq!(result.steps_executed, 1);
    }

    #[tokio::test]
    async fn skip_on_failure_continues_and_reports_partial() {
        let result = execute(
            ctx(vec![step("a", "noop", OnFailure::Halt), step("b", "boom", OnFailure::Skip), step("c", "noop", OnFailure::Halt)]),
            Arc::new(FailsOn("boom")),
            None,
            Arc::new(FixedClock::new(0)),
        )
        .await;
        assert_eq!(result.status, PlanStatus::Partial);
        assert_eq!(result.steps_executed, 3);
    }
}
