// src/interfaces.rs
// ============================================================================
// Module: Shared Interfaces
// Description: Trait seams implemented by the backend crates and composed
// by the orchestrator handler.
// Purpose: Let each component depend on a capability, not a concrete
// backend; backends are supplied by orc-policy, orc-persistence, orc-notify,
// orc-scheduler.
// Dependencies: async-trait, serde_json
// ============================================================================

//! ## Overview
//! Every external collaborator the orchestrator talks to (policy backend,
//! cache, persistence store, notification channel, plan dispatcher) is
//! named here as a trait. Concrete implementations live in their own crates
//! so `orc-core` never pulls in `reqwest` or `rusqlite`.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::decision::Decision;
use crate::plan::ExecutionContext;
use crate::plan::PlanResult;

/// Errors a policy backend may raise while resolving a named policy.
#[derive(Debug, Error, Clone)]
pub enum PolicyError {
    /// The backend could not be reached or timed out.
    #[error("policy backend unavailable: {0}")]
    Unavailable(String),
    /// The backend returned a value that could not be interpreted.
    #[error("policy backend returned malformed data: {0}")]
    Malformed(String),
}

/// A single source of policy values, tried in a fixed chain by
/// `orc-policy`'s `PolicyStore`.
#[async_trait]
pub trait PolicyBackend: Send + Sync {
    /// Resolves `name` under context `ctx`, canonicalized by the caller.
    ///
    /// An empty object is a valid "no opinion" result and causes the chain
    /// to fall through to the next backend; an `Err` is a backend failure
    /// and also falls through, after being counted.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the backend itself fails.
    async fn get_policy(&self, name: &str, ctx: &Value) -> Result<Value, PolicyError>;

    /// A short, stable name used in metrics labels and circuit-breaker
    /// bookkeeping (e.g. `"remote_http"`).
    fn backend_name(&self) -> &'static str;
}

/// Errors a cache backend may raise. Callers must treat all of these as
/// "cache miss"; cache failures never affect correctness.
#[derive(Debug, Error, Clone)]
pub enum CacheError {
    /// The backend could not be reached.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

/// A simple best-effort key-to-bytes cache (§6.5).
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Reads the value stored at `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the backend is unreachable.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Writes `value` at `key` with a time-to-live.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the backend is unreachable.
    async fn setex(&self, key: &str, ttl_ms: i64, value: Vec<u8>) -> Result<(), CacheError>;
}

/// Errors a decision store may raise on insert.
#[derive(Debug, Error, Clone)]
pub enum PersistError {
    /// The write timed out.
    #[error("persistence write timed out after {0}ms")]
    Timeout(i64),
    /// The backend rejected or failed the write.
    #[error("persistence write failed: {0}")]
    BackendFailure(String),
}

/// Append-only storage for [`Decision`] rows (§6.4).
#[async_trait]
pub trait DecisionStore: Send + Sync {
    /// Inserts one decision. Implementations must provide no update or
    /// delete path on the underlying table.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the insert fails or times out.
    async fn insert(&self, decision: &Decision) -> Result<(), PersistError>;

    /// Looks up a decision by its correlation id, for the read-only memory
    /// accessor exposed to reasoning and reporting (§6.3).
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the read fails.
    async fn by_correlation_id(&self, correlation_id: &str) -> Result<Option<Decision>, PersistError>;

    /// Returns decisions for `symbol` with `ts_ms >= since_ms`, newest last.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the read fails.
    async fn by_symbol_since(&self, symbol: &str, since_ms: i64) -> Result<Vec<Decision>, PersistError>;

    /// Returns the `n` most recently persisted decisions, newest last.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the read fails.
    async fn last_n(&self, n: usize) -> Result<Vec<Decision>, PersistError>;
}

/// Errors a notification channel may raise. Always logged and counted;
/// never surfaced to the caller of `handle_event`.
#[derive(Debug, Error, Clone)]
pub enum NotifyError {
    /// The HTTP request failed or returned a non-success status.
    #[error("notification delivery failed: {0}")]
    DeliveryFailed(String),
    /// The request exceeded its per-attempt timeout.
    #[error("notification delivery timed out after {0}ms")]
    Timeout(i64),
}

/// One outbound notification channel (§6.6).
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Delivers `body` (the JSON object described in §6.6) to this channel.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when delivery fails.
    async fn deliver(&self, body: &Value) -> Result<(), NotifyError>;

    /// A short, stable channel name used in metrics labels (e.g. `"slack"`).
    fn channel_name(&self) -> &'static str;
}

/// Errors a plan dispatcher may raise while executing one step.
#[derive(Debug, Error, Clone)]
pub enum DispatchError {
    /// The dispatcher does not recognize the step's `action`.
    #[error("action not found: {0}")]
    ActionNotFound(String),
    /// The step's payload was invalid for its action.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    /// The dispatcher failed for a reason outside the reserved codes.
    #[error("dispatch failed: {0}")]
    Failed(String),
}

/// Caller-supplied interpretation of a [`PlanStep`](crate::plan::PlanStep)'s
/// `action`. The scheduler is pure orchestration; this trait is where step
/// semantics live.
#[async_trait]
pub trait PlanDispatcher: Send + Sync {
    /// Executes one step, returning an opaque result payload on success.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the step cannot be completed.
    async fn dispatch(&self, action: &str, payload: &Value) -> Result<Value, DispatchError>;
}

/// Observer notified of a plan execution's terminal outcome. Event
/// emission is best-effort and non-blocking: failures here never alter the
/// returned [`PlanResult`].
pub trait PlanObserver: Send + Sync {
    /// Called once execution reaches a terminal status.
    fn on_plan_completed(&self, result: &PlanResult);
}

/// Read-only accessor over persisted decisions, handed to reasoning
/// functions and reporting services (§6.3). Never writes.
#[async_trait]
pub trait MemoryAccessor: Send + Sync {
    /// Looks up a decision by correlation id.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the read fails.
    async fn by_correlation_id(&self, correlation_id: &str) -> Result<Option<Decision>, PersistError>;

    /// Returns decisions for `symbol` with `ts_ms >= since_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the read fails.
    async fn by_symbol_since(&self, symbol: &str, since_ms: i64) -> Result<Vec<Decision>, PersistError>;

    /// Returns the `n` most recently persisted decisions.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the read fails.
    async fn last_n(&self, n: usize) -> Result<Vec<Decision>, PersistError>;
}
