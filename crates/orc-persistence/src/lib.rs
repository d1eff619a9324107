// src/lib.rs
// ============================================================================
// Crate: orc-persistence
// Description: Append-only decision persistence (C8) and dead-letter queue
// (C9).
// ============================================================================

//! Durable storage for the Decision Orchestration Core.

pub mod dlq;
pub mod memory_store;
pub mod persister;
pub mod sqlite_store;

pub use dlq::BackpressurePolicy;
pub use dlq::DeadLetterQueue;
pub use dlq::DlqEntry;
pub use dlq::run_retry_loop;
pub use memory_store::MemoryDecisionStore;
pub use persister::DecisionPersister;
pub use persister::PersistOutcome;
pub use sqlite_store::SqliteDecisionStore;
pub use sqlite_store::SqliteStoreError;
