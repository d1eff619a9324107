// src/lib.rs
// ============================================================================
// Crate: orc-config
// Description: Typed configuration surface (§6.7).
// ============================================================================

//! Configuration model for the Decision Orchestration Core.

pub mod config;

pub use config::ConfigError;
pub use config::ConfigErrorOrParse;
pub use config::CooldownConfig;
pub use config::DedupConfig;
pub use config::DlqConfig;
pub use config::NotifierConfig;
pub use config::NotifyLevel;
pub use config::OrchestratorConfig;
pub use config::PolicyCircuitConfig;
pub use config::PolicyConfig;
pub use config::ReasoningConfig;
