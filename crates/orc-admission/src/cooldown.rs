// src/cooldown.rs
// ============================================================================
// Module: Cooldown Manager (C3)
// Description: Per-event-type minimum inter-arrival gating.
// Purpose: For every admitted event type, enforce a minimum gap since the
// last admission (§8 invariant 1).
// Dependencies: std::collections, std::sync
// ============================================================================

//! ## Overview
//! Records, per `event_type`, the wall-clock time of the last admitted
//! event. An admission attempt is deferred when it arrives sooner than
//! `cooldown_ms` after the last one.

use std::collections::HashMap;
use std::sync::Mutex;

/// Outcome of a cooldown admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    /// Admission proceeds; the event type's last-admitted time is updated.
    Admit,
    /// Admission is deferred; retry after the given number of milliseconds.
    Defer {
        /// Milliseconds until the cooldown window closes.
        retry_after_ms: i64,
    },
}

/// Tracks the last admission time per event type.
#[derive(Default)]
pub struct CooldownManager {
    last_admitted: Mutex<HashMap<String, i64>>,
}

impl CooldownManager {
    /// Creates an empty cooldown manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks whether `event_type` may be admitted at `now_ms` given
    /// `cooldown_ms`. On `Admit`, updates the last-admitted time.
    pub fn check(&self, event_type: &str, now_ms: i64, cooldown_ms: i64) -> CooldownDecision {
        let mut last_admitted = self.last_admitted.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match last_admitted.get(event_type).copied() {
            Some(prev) if cooldown_ms > 0 && now_ms - prev < cooldown_ms => CooldownDecision::Defer {
                retry_after_ms: cooldown_ms - (now_ms - prev),
            },
            _ => {
                last_admitted.insert(event_type.to_string(), now_ms);
                CooldownDecision::Admit
            }
        }
    }
}
