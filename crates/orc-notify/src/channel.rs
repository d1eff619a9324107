// src/channel.rs
// ============================================================================
// Module: HTTP Notification Channel
// Description: Delivers a decision summary to a webhook endpoint (§6.6).
// Purpose: One concrete `NotificationChannel` usable for slack/discord/
// telegram-style webhooks; they differ only in URL and policy, not in
// wire behavior.
// Dependencies: orc-core::interfaces, reqwest
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use orc_core::interfaces::NotificationChannel;
use orc_core::interfaces::NotifyError;
use serde_json::Value;

/// Coarse severity filter a channel is configured with (§6.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SeverityFilter {
    /// Deliver every decision.
    All,
    /// Deliver only decisions promoted to at least `warn`.
    Warn,
    /// Deliver only informational decisions (no filter applied beyond
    /// confidence).
    Info,
}

/// One outbound webhook channel (e.g. `slack`, `discord`, `telegram`).
pub struct HttpChannel {
    name: &'static str,
    webhook_url: String,
    client: reqwest::Client,
    timeout_ms: i64,
    /// Exposed for the fanout layer's per-channel admission check (§4.10).
    pub severity_filter: SeverityFilter,
    /// Minimum confidence this channel accepts.
    pub min_confidence: f64,
}

impl HttpChannel {
    /// Builds a channel posting to `webhook_url`, with a per-attempt
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        name: &'static str,
        webhook_url: impl Into<String>,
        severity_filter: SeverityFilter,
        min_confidence: f64,
        timeout_ms: i64,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms.unsigned_abs() as u64))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|err| NotifyError::DeliveryFailed(err.to_string()))?;
        Ok(Self {
            name,
            webhook_url: webhook_url.into(),
            client,
            timeout_ms,
            severity_filter,
            min_confidence,
        })
    }
}

#[async_trait]
impl NotificationChannel for HttpChannel {
    async fn deliver(&self, body: &Value) -> Result<(), NotifyError> {
        let response = self.client.post(&self.webhook_url).json(body).send().await.map_err(|err| {
            if err.is_timeout() {
                NotifyError::Timeout(self.timeout_ms)
            } else {
                NotifyError::DeliveryFailed(err.to_string())
            }
        })?;
        if !response.status().is_success() {
            return Err(NotifyError::DeliveryFailed(format!("status {}", response.status())));
        }
        Ok(())
    }

    fn channel_name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::SeverityFilter;

    #[test]
    fn severity_filters_order_from_most_to_least_permissive() {
        assert!(SeverityFilter::All < SeverityFilter::Warn);
        assert!(SeverityFilter::Warn < SeverityFilter::Info);
    }
}
