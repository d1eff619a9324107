// src/backend/distributed_cache.rs
// ============================================================================
// Module: Distributed Cache Policy Backend
// Description: Backend 3 of the policy chain (§4.5).
// Purpose: Resolve policy values from a shared cache backend (§6.5),
// keyed by `(name, canonicalized ctx)`.
// Dependencies: orc-core::interfaces, serde_jcs
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use orc_core::interfaces::CacheBackend;
use orc_core::interfaces::PolicyBackend;
use orc_core::interfaces::PolicyError;
use serde_json::Value;

/// Policy backend backed by a shared key-value cache.
pub struct DistributedCacheBackend {
    cache: Arc<dyn CacheBackend>,
}

impl DistributedCacheBackend {
    /// Creates a backend reading through `cache`.
    #[must_use]
    pub fn new(cache: Arc<dyn CacheBackend>) -> Self {
        Self {
            cache,
        }
    }
}

#[async_trait]
impl PolicyBackend for DistributedCacheBackend {
    async fn get_policy(&self, name: &str, ctx: &Value) -> Result<Value, PolicyError> {
        let key = crate::store::cache_key(name, ctx);
        let bytes = self.cache.get(&key).await.map_err(|err| PolicyError::Unavailable(err.to_string()))?;
        match bytes {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|err| PolicyError::Malformed(err.to_string())),
            None => Ok(Value::Object(serde_json::Map::new())),
        }
    }

    fn backend_name(&self) -> &'static str {
        "distributed_cache"
    }
}
