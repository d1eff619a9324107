// src/backend/config_map.rs
// ============================================================================
// Module: In-Process Configuration Backend
// Description: Backend 1 of the policy chain (§4.5).
// Purpose: Serve policy values from an in-memory map populated at startup.
// Dependencies: orc-core::interfaces
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use orc_core::interfaces::PolicyBackend;
use orc_core::interfaces::PolicyError;
use serde_json::Value;

/// Serves policy values from a static in-process map. Always the first
/// backend tried; never fails.
#[derive(Debug, Default, Clone)]
pub struct ConfigMapBackend {
    values: BTreeMap<String, Value>,
}

impl ConfigMapBackend {
    /// Creates a backend from a pre-built map.
    #[must_use]
    pub fn new(values: BTreeMap<String, Value>) -> Self {
        Self {
            values,
        }
    }

    /// Sets (or replaces) the value for `name`.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }
}

#[async_trait]
impl PolicyBackend for ConfigMapBackend {
    async fn get_policy(&self, name: &str, _ctx: &Value) -> Result<Value, PolicyError> {
        Ok(self.values.get(name).cloned().unwrap_or(Value::Object(serde_json::Map::new())))
    }

    fn backend_name(&self) -> &'static str {
        "config_map"
    }
}

#[cfg(test)]
mod tests {
    use super::ConfigMapBackend;
    use orc_core::interfaces::PolicyBackend;
    use serde_json::json;

    #[tokio::test]
    async fn returns_the_configured_value() {
        let mut backend = ConfigMapBackend::default();
        backend.set("cooldown_ms", json!({"ict_signal": 60_000}));
        let value = backend.get_policy("cooldown_ms", &json!({})).await.expect("ok");
        assert_eq!(value, json!({"ict_signal": 60_000}));
    }

    #[tokio::test]
    async fn unknown_name_returns_empty_object() {
        let backend = ConfigMapBackend::default();
        let value = backend.get_policy("nope", &json!({})).await.expect("ok");
        assert_eq!(value, json!({}));
    }
}
