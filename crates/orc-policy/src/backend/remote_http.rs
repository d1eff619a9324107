// src/backend/remote_http.rs
// ============================================================================
// Module: Remote HTTP Policy Backend
// Description: Backend 2 of the policy chain (§4.5), wrapped by a circuit
// breaker at the store level.
// Purpose: Resolve policy values from a remote policy service over HTTP,
// with a bounded per-call timeout.
// Dependencies: orc-core::interfaces, reqwest
// ============================================================================

//! ## Overview
//! Requests `GET {base_url}/policies/{name}?ctx=<canonical json>` and parses
//! the JSON response body as the policy value. Any transport failure,
//! non-success status, or malformed body surfaces as [`PolicyError`]; the
//! circuit breaker, not this backend, decides whether to retry.

use std::time::Duration;

use async_trait::async_trait;
use orc_core::interfaces::PolicyBackend;
use orc_core::interfaces::PolicyError;
use serde_json::Value;

/// Policy backend that resolves values from a remote HTTP service.
pub struct RemoteHttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteHttpBackend {
    /// Creates a backend targeting `base_url`, with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout_ms: i64) -> Result<Self, PolicyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms.unsigned_abs() as u64))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|err| PolicyError::Unavailable(err.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }
}

#[async_trait]
impl PolicyBackend for RemoteHttpBackend {
    async fn get_policy(&self, name: &str, ctx: &Value) -> Result<Value, PolicyError> {
        let ctx_json = serde_json::to_string(ctx).map_err(|err| PolicyError::Malformed(err.to_string()))?;
        let url = format!("{}/policies/{name}", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(url)
            .query(&[("ctx", ctx_json)])
            .send()
            .await
            .map_err(|err| PolicyError::Unavailable(err.to_string()))?;
        if !response.status().is_success() {
            return Err(PolicyError::Unavailable(format!("status {}", response.status())));
        }
        response.json::<Value>().await.map_err(|err| PolicyError::Malformed(err.to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "remote_http"
    }
}
