// src/backend/default_backend.rs
// ============================================================================
// Module: Default Policy Backend
// Description: Backend 4 of the policy chain (§4.5): compiled-in values.
// Purpose: Guarantee the chain always terminates in a usable result, even
// with every other backend unreachable.
// Dependencies: orc-core::interfaces
// ============================================================================

use async_trait::async_trait;
use orc_core::interfaces::PolicyBackend;
use orc_core::interfaces::PolicyError;
use serde_json::Value;
use serde_json::json;

/// Terminal backend in the chain. Never fails, never empty: for an
/// unrecognized policy name it still returns an explicit empty object so
/// the chain has something to cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultBackend;

#[async_trait]
impl PolicyBackend for DefaultBackend {
    async fn get_policy(&self, name: &str, _ctx: &Value) -> Result<Value, PolicyError> {
        let value = match name {
            "cooldown_ms" => json!({}),
            "session_window" => json!({}),
            "signal_filter" => json!({"min_confidence": {}, "blocklist": []}),
            "confidence_threshold" => json!(0.0),
            "max_exposure" => json!(null),
            "kill_zone" => json!({"active": false}),
            "notify_level" => json!("all"),
            "min_warn_confidence" => json!(0.0),
            _ => json!({}),
        };
        Ok(value)
    }

    fn backend_name(&self) -> &'static str {
        "default"
    }
}

#[cfg(test)]
mod tests {
    use super::DefaultBackend;
    use orc_core::interfaces::PolicyBackend;
    use serde_json::json;

    #[tokio::test]
    async fn signal_filter_default_has_no_blocked_types() {
        let backend = DefaultBackend;
        let value = backend.get_policy("signal_filter", &json!({})).await.expect("ok");
        assert_eq!(value["blocklist"], json!([]));
    }
}
