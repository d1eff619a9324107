// src/lib.rs
// ============================================================================
// Crate: orc-core
// Description: Shared data model and trait seams for the Decision
// Orchestration Core.
// Purpose: Give every other orc-* crate one dependency-free vocabulary for
// events, decisions, plans, and the backends that support them.
// ============================================================================

//! Decision Orchestration Core — shared types.
//!
//! This crate holds no I/O. It defines:
//! - The event model and validator (C1): [`event`].
//! - The persisted decision model (C8/C9 data, §3): [`decision`].
//! - The event state machine (C11): [`state_machine`].
//! - The plan-execution data model (C14 data, §3): [`plan`].
//! - Deterministic hashing used for `decision_hash` and dedup fingerprints:
//!   [`hashing`].
//! - Newtype identifiers: [`identifiers`].
//! - An injectable wall-clock source: [`clock`].
//! - Trait seams implemented by backend crates: [`interfaces`].

pub mod clock;
pub mod decision;
pub mod event;
pub mod hashing;
pub mod identifiers;
pub mod interfaces;
pub mod plan;
pub mod state_machine;

pub use clock::Clock;
pub use clock::FixedClock;
pub use clock::SystemClock;
pub use decision::AdvisorySignal;
pub use decision::Decision;
pub use decision::DecisionOutcome;
pub use decision::EventResult;
pub use decision::EventState;
pub use decision::ExitReason;
pub use decision::Outcome;
pub use decision::PolicyDecision;
pub use decision::SignalType;
pub use decision::StateTransition;
pub use event::Event;
pub use event::RawEvent;
pub use event::ValidationError;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use identifiers::CorrelationId;
pub use identifiers::DecisionId;
pub use identifiers::ExecutionId;
pub use identifiers::PlanId;
pub use identifiers::StepId;
pub use interfaces::CacheBackend;
pub use interfaces::CacheError;
pub use interfaces::DecisionStore;
pub use interfaces::DispatchError;
pub use interfaces::MemoryAccessor;
pub use interfaces::NotificationChannel;
pub use interfaces::NotifyError;
pub use interfaces::PersistError;
pub use interfaces::PlanDispatcher;
pub use interfaces::PlanObserver;
pub use interfaces::PolicyBackend;
pub use interfaces::PolicyError;
pub use plan::ErrorCode;
pub use plan::ErrorSeverity;
pub use plan::ExecutionContext;
pub use plan::ExecutionError;
pub use plan::OnFailure;
pub use plan::Plan;
pub use plan::PlanResult;
pub use plan::PlanStatus;
pub use plan::PlanStep;
pub use plan::RetryPolicy;
pub use state_machine::EventAudit;
pub use state_machine::TerminalStateError;
