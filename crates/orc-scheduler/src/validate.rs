// src/validate.rs
// ============================================================================
// Module: Plan & Execution Context Validation
// Description: Pre-execution checks described in §4.14; failure here is
// always fatal and always precedes any dispatcher call.
// Dependencies: orc-core::plan
// ============================================================================

use std::collections::HashSet;

use orc_core::plan::ErrorCode;
use orc_core::plan::ErrorSeverity;
use orc_core::plan::ExecutionContext;
use orc_core::plan::ExecutionError;
use orc_core::plan::MAX_PLAN_NAME_LEN;
use orc_core::plan::MAX_PLAN_STEPS;
use orc_core::plan::Plan;

/// Shorthand for a fatal [`ExecutionError`].
fn fatal(code: ErrorCode, message: impl Into<String>) -> ExecutionError {
    ExecutionError::new(code, ErrorSeverity::Fatal, message)
}

/// Validates `plan` in isolation: id/name shape, step bounds, step id
/// uniqueness, and `depends_on` forward-reference rejection.
///
/// # Errors
///
/// Returns the first [`ExecutionError`] found, with the reserved code
/// appropriate to the violation.
pub fn validate_plan(plan: &Plan) -> Result<(), ExecutionError> {
    if plan.id.as_str().is_empty() {
        return Err(fatal(ErrorCode::InvalidPayload, "plan id must be non-empty"));
    }
    if plan.version < 1 {
        return Err(fatal(ErrorCode::InvalidPayload, "plan version must be >= 1"));
    }
    if plan.steps.is_empty() || plan.steps.len() > MAX_PLAN_STEPS {
        return Err(fatal(ErrorCode::InvalidPayload, format!("plan must have between 1 and {MAX_PLAN_STEPS} steps")));
    }
    if plan.name.chars().count() > MAX_PLAN_NAME_LEN {
        return Err(fatal(ErrorCode::InvalidPayload, format!("plan name must be <= {MAX_PLAN_NAME_LEN} chars")));
    }
    if plan.context_requirements.is_empty() {
        return Err(fatal(ErrorCode::ContextMissing, "plan context_requirements must be non-empty"));
    }

    let mut seen_ids = HashSet::with_capacity(plan.steps.len());
    for (index, step) in plan.steps.iter().enumerate() {
        if !seen_ids.insert(step.id.as_str()) {
            return Err(fatal(ErrorCode::InvalidPayload, format!("duplicate step id '{}'", step.id)).with_step(step.id.clone()));
        }
        for dependency in &step.depends_on {
            let earlier = plan.steps[..index].iter().any(|earlier_step| &earlier_step.id == dependency);
            if !earlier {
                return Err(fatal(
                    ErrorCode::DependencyUnresolved,
                    format!("step '{}' depends_on '{dependency}', which is not an earlier step", step.id),
                )
                .with_step(step.id.clone()));
            }
        }
    }

    Ok(())
}

/// Validates `ctx` against its own shape and against `ctx.plan`'s
/// `context_requirements`.
///
/// # Errors
///
/// Returns the first [`ExecutionError`] found.
pub fn validate_execution_context(ctx: &ExecutionContext) -> Result<(), ExecutionError> {
    if ctx.execution_id.as_str().is_empty() {
        return Err(fatal(ErrorCode::InvalidPayload, "execution_id must be non-empty"));
    }
    if ctx.started_at_ms <= 0 || ctx.deadline_ms <= 0 {
        return Err(fatal(ErrorCode::InvalidPayload, "timestamps must be positive"));
    }
    if ctx.deadline_ms <= ctx.started_at_ms {
        return Err(fatal(ErrorCode::DeadlineExceeded, "deadline_ms must be greater than started_at_ms"));
    }
    if ctx.deadline_ms - ctx.started_at_ms < ctx.plan.timeout_ms {
        return Err(fatal(
            ErrorCode::PlanTimeout,
            "deadline window is narrower than the plan's own timeout_ms",
        ));
    }
    for key in &ctx.plan.context_requirements {
        if !ctx.environment.contains_key(key) {
            return Err(fatal(ErrorCode::ContextMissing, format!("required context key '{key}' is absent")));
        }
    }
    Ok(())
}
