// src/lib.rs
// ============================================================================
// Crate: orc-notify
// Description: Webhook notification channel (§6.6) and concurrency-bounded
// fanout (C10).
// ============================================================================

//! Notification delivery for the Decision Orchestration Core.

pub mod channel;
pub mod fanout;

pub use channel::HttpChannel;
pub use channel::SeverityFilter;
pub use fanout::FanoutConfig;
pub use fanout::fan_out;
