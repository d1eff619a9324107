// src/plan.rs
// ============================================================================
// Module: Plan Data Model
// Description: Immutable DAG of steps with ordering constraints and
// per-step failure policies (§3 Plan / PlanStep / ExecutionContext /
// PlanResult / ExecutionError).
// Purpose: Shared types between the plan scheduler and its callers.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Plan`] is a one-shot, immutable DAG: no resume, no checkpoint, no
//! mid-flight modification. Step semantics are opaque to this crate; only
//! ordering, timeouts, and failure policy are modeled here.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::identifiers::ExecutionId;
use crate::identifiers::PlanId;
use crate::identifiers::StepId;

/// Default plan-level timeout, in milliseconds.
pub const DEFAULT_PLAN_TIMEOUT_MS: i64 = 300_000;
/// Maximum number of steps a plan may contain.
pub const MAX_PLAN_STEPS: usize = 1024;
/// Maximum length of a plan's `name` field.
pub const MAX_PLAN_NAME_LEN: usize = 255;

/// What to do when a step's dispatcher invocation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnFailure {
    /// Stop execution immediately; the plan fails.
    Halt,
    /// Mark the step complete as skipped; the plan becomes partial.
    Skip,
    /// Reserved: treated as `halt` in this implementation (see
    /// [`ErrorCode::ExecutionHalted`] docs).
    Retry,
}

/// Retry shape for a future step-level retry policy.
///
/// `on_failure = retry` is reserved: this implementation treats it as fatal,
/// matching the upstream skeleton this plan model was distilled from. A
/// future scheduler revision may apply this policy instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base backoff before the first retry.
    #[serde(default)]
    pub backoff_ms: i64,
    /// Multiplier applied to the backoff after each attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Upper bound on backoff, regardless of multiplier growth.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: i64,
    /// Error codes eligible for retry.
    #[serde(default)]
    pub retryable_error_codes: Vec<ErrorCode>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: 0,
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
            retryable_error_codes: Vec::new(),
        }
    }
}

const fn default_max_attempts() -> u32 {
    1
}

const fn default_backoff_multiplier() -> f64 {
    1.0
}

const fn default_max_backoff_ms() -> i64 {
    60_000
}

/// One node in a plan's DAG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    /// Unique id within the owning plan.
    pub id: StepId,
    /// Short tag, opaque to the scheduler; interpreted by the dispatcher.
    pub action: String,
    /// Opaque payload passed to the dispatcher.
    pub payload: Value,
    /// Ids of steps that must complete before this one runs. Every id must
    /// reference a strictly earlier step in the plan's step list.
    #[serde(default)]
    pub depends_on: Vec<StepId>,
    /// Policy applied when this step's dispatch fails.
    pub on_failure: OnFailure,
    /// Optional step-level timeout, overriding none (the plan timeout still
    /// bounds total execution).
    #[serde(default)]
    pub timeout_ms: Option<i64>,
}

/// An immutable DAG of steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Unique plan id.
    pub id: PlanId,
    /// Plan version, `>= 1`.
    pub version: u32,
    /// Wall-clock milliseconds the plan was created.
    pub created_at_ms: i64,
    /// Human-readable name, `<= 255` chars.
    pub name: String,
    /// Ordered, non-empty list of steps, `<= 1024` entries.
    pub steps: Vec<PlanStep>,
    /// Keys that must be present in the execution context's environment.
    pub context_requirements: Vec<String>,
    /// Optional scheduling priority, opaque to the scheduler.
    #[serde(default)]
    pub priority: Option<i32>,
    /// Plan-level timeout.
    #[serde(default = "default_plan_timeout_ms")]
    pub timeout_ms: i64,
    /// Optional step-level retry policy (reserved, see [`OnFailure::Retry`]).
    #[serde(default)]
    pub retry_policy: Option<RetryPolicy>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Optional estimated duration, opaque to the scheduler.
    #[serde(default)]
    pub estimated_duration_ms: Option<i64>,
}

const fn default_plan_timeout_ms() -> i64 {
    DEFAULT_PLAN_TIMEOUT_MS
}

/// Immutable context under which one plan execution runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// The plan being executed.
    pub plan: Plan,
    /// Unique id of this execution attempt.
    pub execution_id: ExecutionId,
    /// Wall-clock milliseconds execution started.
    pub started_at_ms: i64,
    /// Wall-clock milliseconds by which execution must complete.
    pub deadline_ms: i64,
    /// Opaque key-value environment. The scheduler must not introspect its
    /// contents beyond checking `context_requirements` key presence.
    pub environment: BTreeMap<String, Value>,
    /// Parent execution, if this plan was spawned by another.
    #[serde(default)]
    pub parent_execution_id: Option<ExecutionId>,
    /// Caller-supplied user id, opaque to the scheduler.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Caller-supplied request id, opaque to the scheduler.
    #[serde(default)]
    pub request_id: Option<String>,
    /// Caller-supplied correlation context, opaque to the scheduler.
    #[serde(default)]
    pub correlation_context: Option<Value>,
}

/// Deterministic status of a completed plan execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// `error == None && steps_executed == steps_total`.
    Success,
    /// `error` present with severity `!= fatal` and `steps_executed >= 1`.
    Partial,
    /// Anything else.
    Failure,
}

/// Severity of an [`ExecutionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    /// Informational; does not affect `recoverable`.
    Warn,
    /// Recoverable failure.
    Error,
    /// Unrecoverable failure; `recoverable` is always `false`.
    Fatal,
}

/// Reserved error codes a plan execution may surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// A required context key was absent from the environment.
    ContextMissing,
    /// A step's payload was invalid for its action.
    InvalidPayload,
    /// A step exceeded its own timeout.
    StepTimeout,
    /// The plan exceeded its own `timeout_ms` budget.
    PlanTimeout,
    /// Execution passed the execution context's `deadline_ms`.
    DeadlineExceeded,
    /// A step's `depends_on` referenced an id not yet completed.
    DependencyUnresolved,
    /// The dispatcher does not recognize a step's `action`.
    ActionNotFound,
    /// A resource limit (e.g. concurrency) was exhausted.
    ResourceExhausted,
    /// Execution stopped because a step's `on_failure` was `halt`.
    ExecutionHalted,
    /// A step was skipped because its `on_failure` was `skip`.
    StepSkipped,
    /// An error that does not fit any other reserved code.
    UnknownError,
}

impl ErrorCode {
    /// Returns the severity this code always carries.
    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::ContextMissing
            | Self::InvalidPayload
            | Self::PlanTimeout
            | Self::DeadlineExceeded
            | Self::DependencyUnresolved
            | Self::ActionNotFound
            | Self::ResourceExhausted
            | Self::UnknownError => ErrorSeverity::Fatal,
            Self::StepTimeout | Self::ExecutionHalted => ErrorSeverity::Error,
            Self::StepSkipped => ErrorSeverity::Error,
        }
    }
}

/// An error surfaced by plan validation or execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionError {
    /// Reserved error code.
    pub error_code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Step the error occurred on, if any.
    #[serde(default)]
    pub step_id: Option<StepId>,
    /// Severity of this error.
    pub severity: ErrorSeverity,
    /// Derived from severity: `fatal` implies `false`.
    pub recoverable: bool,
    /// Underlying cause, if any.
    #[serde(default)]
    pub cause: Option<String>,
    /// Additional structured context.
    #[serde(default)]
    pub context: Option<Value>,
}

impl ExecutionError {
    /// Builds an execution error, deriving `recoverable` from `severity`.
    #[must_use]
    pub fn new(code: ErrorCode, severity: ErrorSeverity, message: impl Into<String>) -> Self {
        Self {
            error_code: code,
            message: message.into(),
            step_id: None,
            severity,
            recoverable: !matches!(severity, ErrorSeverity::Fatal),
            cause: None,
            context: None,
        }
    }

    /// Attaches the step id this error occurred on.
    #[must_use]
    pub fn with_step(mut self, step_id: StepId) -> Self {
        self.step_id = Some(step_id);
        self
    }
}

/// Result of one plan execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResult {
    /// Plan that was executed.
    pub plan_id: PlanId,
    /// Execution attempt id.
    pub execution_id: ExecutionId,
    /// Deterministic status.
    pub status: PlanStatus,
    /// Wall-clock milliseconds execution completed.
    pub completed_at_ms: i64,
    /// Wall-clock duration of the execution.
    pub duration_ms: i64,
    /// Number of steps that reached a terminal (completed or skipped) state.
    pub steps_executed: usize,
    /// Total number of steps in the plan.
    pub steps_total: usize,
    /// Caller-defined aggregate payload, opaque to the scheduler.
    #[serde(default)]
    pub result_payload: Option<Value>,
    /// Error, if execution did not reach full success.
    #[serde(default)]
    pub error: Option<ExecutionError>,
}

#[cfg(test)]
mod tests {
    use super::ErrorCode;
    use super::ErrorSeverity;
    use super::ExecutionError;

    #[test]
    fn fatal_errors_are_never_recoverable() {
        let err = ExecutionError::new(ErrorCode::DeadlineExceeded, ErrorSeverity::Fatal, "late");
        assert!(!err.recoverable);
    }

    #[test]
    fn non_fatal_errors_are_recoverable() {
        let err = ExecutionError::new(ErrorCode::StepSkipped, ErrorSeverity::Warn, "skipped");
        assert!(err.recoverable);
    }

    #[test]
    fn default_severity_matches_reserved_table() {
        assert_eq!(ErrorCode::StepSkipped.default_severity(), ErrorSeverity::Error);
        assert_eq!(ErrorCode::ExecutionHalted.default_severity(), ErrorSeverity::Error);
        assert_eq!(ErrorCode::DependencyUnresolved.default_severity(), ErrorSeverity::Fatal);
    }
}
