// src/config.rs
// ============================================================================
// Module: Orchestrator Configuration
// Description: Typed configuration surface enumerated in §6.7.
// Purpose: Give every tunable of the orchestrator a documented, validated,
// serde-deserializable home. This crate does not read files or environment
// variables; a host-specific loader is responsible for producing a
// `serde_json::Value` and calling `OrchestratorConfig::from_value`.
// Dependencies: orc-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Every field has a default matching the value named in spec §6.7, so a
//! host may supply a partial document. `validate` enforces the bounds that
//! are meaningful independent of any specific deployment (e.g.
//! `reasoning.timeout_ms <= 5000`).

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Errors raised validating a deserialized [`OrchestratorConfig`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field's value was outside its documented bounds.
    #[error("invalid configuration at '{field}': {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Reasoning invocation tuning (§4.6 / §6.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Per-call upper bound, in milliseconds.
    pub timeout_ms: i64,
    /// Mode used when an event carries none.
    pub default_mode: String,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 500,
            default_mode: "default".to_string(),
        }
    }
}

impl ReasoningConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms <= 0 || self.timeout_ms > 5_000 {
            return Err(invalid("reasoning.timeout_ms", "must be in (0, 5000]"));
        }
        Ok(())
    }
}

/// Deduplication cache shape (§4.2 / §6.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Entry time-to-live, in milliseconds.
    pub ttl_ms: i64,
    /// Maximum resident entries before LRU eviction.
    pub max_entries: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 60_000,
            max_entries: 100_000,
        }
    }
}

impl DedupConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_ms <= 0 {
            return Err(invalid("dedup.ttl_ms", "must be positive"));
        }
        if self.max_entries == 0 {
            return Err(invalid("dedup.max_entries", "must be positive"));
        }
        Ok(())
    }
}

/// Cooldown fallback (§4.3 / §6.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    /// Fallback cooldown used when policy is silent, in milliseconds.
    pub default_ms: i64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            default_ms: 0,
        }
    }
}

/// Remote backend circuit breaker shape (§4.5 / §6.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyCircuitConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// Cool-off duration once open, in milliseconds.
    pub cool_off_ms: i64,
}

impl Default for PolicyCircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cool_off_ms: 60_000,
        }
    }
}

/// Policy backend tuning (§4.5 / §6.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Result-cache TTL, in milliseconds.
    pub cache_ttl_ms: i64,
    /// Remote HTTP backend per-call timeout, in milliseconds.
    pub remote_timeout_ms: i64,
    /// Circuit breaker shape for the remote backend.
    pub circuit: PolicyCircuitConfig,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 30_000,
            remote_timeout_ms: 2_000,
            circuit: PolicyCircuitConfig::default(),
        }
    }
}

impl PolicyConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl_ms < 0 {
            return Err(invalid("policy.cache_ttl_ms", "must not be negative"));
        }
        if self.remote_timeout_ms <= 0 {
            return Err(invalid("policy.remote_timeout_ms", "must be positive"));
        }
        if self.circuit.failure_threshold == 0 {
            return Err(invalid("policy.circuit.failure_threshold", "must be at least 1"));
        }
        Ok(())
    }
}

/// Dead-letter queue shape and retry tuning (§4.9 / §6.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DlqConfig {
    /// Maximum resident entries.
    pub max_size: usize,
    /// Bounded attempt count before terminal drop.
    pub max_attempts: u32,
    /// Backoff base, in milliseconds.
    pub backoff_base_ms: i64,
    /// Backoff multiplier.
    pub backoff_multiplier: u32,
    /// Backoff cap, in milliseconds.
    pub backoff_max_ms: i64,
}

impl Default for DlqConfig {
    fn default() -> Self {
        Self {
            max_size: 10_000,
            max_attempts: 10,
            backoff_base_ms: 1_000,
            backoff_multiplier: 2,
            backoff_max_ms: 60_000,
        }
    }
}

impl DlqConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(invalid("dlq.max_size", "must be positive"));
        }
        if self.max_attempts == 0 {
            return Err(invalid("dlq.max_attempts", "must be at least 1"));
        }
        Ok(())
    }
}

/// Notifier fanout shape (§4.10 / §6.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Bound on concurrent outbound requests.
    pub max_concurrency: usize,
    /// Per-attempt HTTP timeout, in milliseconds.
    pub timeout_ms: i64,
    /// Per-channel retry count.
    pub retries: u32,
    /// Retry backoff base, in milliseconds.
    pub backoff_base_ms: i64,
    /// Retry backoff multiplier.
    pub backoff_multiplier: u32,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            timeout_ms: 30_000,
            retries: 3,
            backoff_base_ms: 1_000,
            backoff_multiplier: 2,
        }
    }
}

impl NotifierConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(invalid("notifier.max_concurrency", "must be positive"));
        }
        if self.timeout_ms <= 0 {
            return Err(invalid("notifier.timeout_ms", "must be positive"));
        }
        Ok(())
    }
}

/// Coarse notification severity gate (§6.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotifyLevel {
    /// Deliver only informational decisions.
    Info,
    /// Deliver decisions promoted to at least `warn`.
    #[default]
    Warn,
    /// Deliver every decision.
    All,
}

/// Top-level orchestrator configuration, covering every key in §6.7.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Reasoning invocation tuning.
    pub reasoning: ReasoningConfig,
    /// Deduplication cache shape.
    pub dedup: DedupConfig,
    /// Cooldown fallback.
    pub cooldown: CooldownConfig,
    /// Policy backend tuning.
    pub policy: PolicyConfig,
    /// Dead-letter queue shape and retry tuning.
    pub dlq: DlqConfig,
    /// Notifier fanout shape.
    pub notifier: NotifierConfig,
    /// Coarse notification severity gate.
    pub notify_level: NotifyLevel,
    /// Confidence threshold for promoting a decision to a `warn`-filtered
    /// channel.
    pub min_warn_confidence: f64,
}

impl OrchestratorConfig {
    /// Deserializes and validates a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the document is malformed or any field
    /// violates its documented bounds.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigErrorOrParse> {
        let config: Self = serde_json::from_value(value).map_err(ConfigErrorOrParse::Parse)?;
        config.validate().map_err(ConfigErrorOrParse::Invalid)?;
        Ok(config)
    }

    /// Validates every section's bounds.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reasoning.validate()?;
        self.dedup.validate()?;
        self.policy.validate()?;
        self.dlq.validate()?;
        self.notifier.validate()?;
        if !(0.0..=1.0).contains(&self.min_warn_confidence) {
            return Err(invalid("min_warn_confidence", "must be in [0.0, 1.0]"));
        }
        Ok(())
    }
}

/// Either a JSON parse failure or a bounds violation.
#[derive(Debug, Error)]
pub enum ConfigErrorOrParse {
    /// The document could not be deserialized into [`OrchestratorConfig`].
    #[error("could not parse configuration: {0}")]
    Parse(#[source] serde_json::Error),
    /// A field violated its documented bounds.
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}
