// src/lib.rs
// ============================================================================
// Crate: orc-reasoning
// Description: Bounded reasoning invocation (C6).
// ============================================================================

//! Bounded-time, non-throwing dispatch to host-supplied reasoning functions.

pub mod invoker;

pub use invoker::BoxFuture;
pub use invoker::DEFAULT_TIMEOUT_MS;
pub use invoker::EventSnapshot;
pub use invoker::MAX_TIMEOUT_MS;
pub use invoker::ReasoningFn;
pub use invoker::ReasoningInvoker;
