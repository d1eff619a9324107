// src/store.rs
// ============================================================================
// Module: Policy Store (C5)
// Description: Chained backends with a circuit breaker around the remote
// one and a TTL result cache.
// Purpose: Single source for cooldown durations, session windows, signal
// filter rules, confidence thresholds, and notification gating.
// Dependencies: orc-core, serde_jcs
// ============================================================================

//! ## Overview
//! Backends are tried in the fixed order `config_map -> remote_http ->
//! distributed_cache -> default`; the first to return a non-empty object
//! wins. Backend 2 is skipped while its circuit breaker is open. Failures
//! inside any backend are counted and the chain falls through.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use orc_core::clock::Clock;
use orc_core::interfaces::PolicyBackend;
use serde_json::Value;

use crate::circuit_breaker::CircuitBreaker;
use crate::circuit_breaker::Permit;

/// Default result-cache TTL, in milliseconds.
pub const DEFAULT_CACHE_TTL_MS: i64 = 30_000;
/// Default consecutive-failure threshold before the remote backend's
/// circuit opens.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
/// Default circuit cool-off, in milliseconds.
pub const DEFAULT_COOL_OFF_MS: i64 = 60_000;

struct CacheEntry {
    value: Value,
    inserted_at_ms: i64,
}

/// Builds the cache key for `(name, canonicalized ctx)`.
#[must_use]
pub fn cache_key(name: &str, ctx: &Value) -> String {
    let canonical = serde_jcs::to_string(ctx).unwrap_or_else(|_| ctx.to_string());
    format!("{name}::{canonical}")
}

fn is_empty_result(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.is_empty()) || matches!(value, Value::Null)
}

/// Chained policy backend with circuit-breaker fallback and result caching.
pub struct PolicyStore {
    config_map: Arc<dyn PolicyBackend>,
    remote: Option<Arc<dyn PolicyBackend>>,
    remote_breaker: CircuitBreaker,
    distributed_cache: Option<Arc<dyn PolicyBackend>>,
    default_backend: Arc<dyn PolicyBackend>,
    cache: Mutex<HashMap<String, CacheEntry>>,
    cache_ttl_ms: i64,
    clock: Arc<dyn Clock>,
}

/// Configuration for constructing a [`PolicyStore`].
pub struct PolicyStoreConfig {
    /// Result cache TTL.
    pub cache_ttl_ms: i64,
    /// Consecutive failures before the remote backend's circuit opens.
    pub failure_threshold: u32,
    /// How long the remote backend's circuit stays open.
    pub cool_off_ms: i64,
}

impl Default for PolicyStoreConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            cool_off_ms: DEFAULT_COOL_OFF_MS,
        }
    }
}

impl PolicyStore {
    /// Builds a policy store over the given backend chain. `remote` and
    /// `distributed_cache` are optional; absent backends are skipped.
    #[must_use]
    pub fn new(
        config: PolicyStoreConfig,
        clock: Arc<dyn Clock>,
        config_map: Arc<dyn PolicyBackend>,
        remote: Option<Arc<dyn PolicyBackend>>,
        distributed_cache: Option<Arc<dyn PolicyBackend>>,
        default_backend: Arc<dyn PolicyBackend>,
    ) -> Self {
        Self {
            config_map,
            remote,
            remote_breaker: CircuitBreaker::new(config.failure_threshold, config.cool_off_ms),
            distributed_cache,
            default_backend,
            cache: Mutex::new(HashMap::new()),
            cache_ttl_ms: config.cache_ttl_ms,
            clock,
        }
    }

    /// Resolves `name` under `ctx`, trying each backend in order and
    /// caching the winning result.
    pub async fn get_policy(&self, name: &str, ctx: &Value) -> Value {
        let key = cache_key(name, ctx);
        if let Some(cached) = self.cached(&key) {
            return cached;
        }

        if let Ok(value) = self.config_map.get_policy(name, ctx).await
            && !is_empty_result(&value)
        {
            self.store(key, value.clone());
            return value;
        }

        if let Some(remote) = &self.remote
            && self.remote_breaker.before_call(self.clock.as_ref()) == Permit::Allowed
        {
            match remote.get_policy(name, ctx).await {
                Ok(value) => {
                    self.remote_breaker.on_result(self.clock.as_ref(), true);
                    if !is_empty_result(&value) {
                        self.store(key, value.clone());
                        return value;
                    }
                }
                Err(_failure) => {
                    self.remote_breaker.on_result(self.clock.as_ref(), false);
                    orc_metrics::registry::policy_backend_failure("remote_http");
                }
            }
        }

        if let Some(distributed_cache) = &self.distributed_cache
            && let Ok(value) = distributed_cache.get_policy(name, ctx).await
            && !is_empty_result(&value)
        {
            self.store(key, value.clone());
            return value;
        }

        let value = self
            .default_backend
            .get_policy(name, ctx)
            .await
            .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));
        self.store(key, value.clone());
        value
    }

    fn cached(&self, key: &str) -> Option<Value> {
        let cache = self.cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let entry = cache.get(key)?;
        if self.clock.now_ms() - entry.inserted_at_ms < self.cache_ttl_ms {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    fn store(&self, key: String, value: Value) {
        let mut cache = self.cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        cache.insert(
            key,
            CacheEntry {
                value,
                inserted_at_ms: self.clock.now_ms(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::PolicyStore;
    use super::PolicyStoreConfig;
    use crate::backend::ConfigMapBackend;
    use crate::backend::DefaultBackend;
    use orc_core::clock::FixedClock;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn config_map_wins_over_default() {
        let mut config_map = ConfigMapBackend::default();
        config_map.set("cooldown_ms", json!({"ict_signal": 60_000}));
        let store = PolicyStore::new(
            PolicyStoreConfig::default(),
            Arc::new(FixedClock::new(0)),
            Arc::new(config_map),
            None,
            None,
            Arc::new(DefaultBackend),
        );
        let value = store.get_policy("cooldown_ms", &json!({})).await;
        assert_eq!(value, json!({"ict_signal": 60_000}));
    }

    #[tokio::test]
    async fn falls_through_to_default_when_every_backend_is_silent() {
        let store = PolicyStore::new(
            PolicyStoreConfig::default(),
            Arc::new(FixedClock::new(0)),
            Arc::new(ConfigMapBackend::default()),
            None,
            None,
            Arc::new(DefaultBackend),
        );
        let value = store.get_policy("notify_level", &json!({})).await;
        assert_eq!(value, json!("all"));
    }

    #[tokio::test]
    async fn results_are_cached_within_the_ttl() {
        let clock = Arc::new(FixedClock::new(0));
        let mut config_map = ConfigMapBackend::default();
        config_map.set("cooldown_ms", json!({"a": 1}));
        let store = PolicyStore::new(
            PolicyStoreConfig::default(),
            Arc::clone(&clock) as Arc<dyn orc_core::clock::Clock>,
            Arc::new(config_map),
            None,
            None,
            Arc::new(DefaultBackend),
        );
        let first = store.get_policy("cooldown_ms", &json!({})).await;
        clock.advance(1_000);
        let second = store.get_policy("cooldown_ms", &json!({})).await;
        assert_eq!(first, second);
    }
}
