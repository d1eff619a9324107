// src/dlq.rs
// ============================================================================
// Module: Dead-Letter Queue (C9)
// Description: Bounded in-process FIFO for decisions that failed primary
// persistence, with a background exponential-backoff retry task.
// Purpose: Give a failed write a bounded number of chances to land before
// it is counted and dropped.
// Dependencies: orc-core, orc-metrics, tokio
// ============================================================================

//! ## Overview
//! [`DeadLetterQueue`] itself only holds entries and decides backoff timing;
//! it does not retry on its own. [`run_retry_loop`] drives the retry
//! behavior against a [`DecisionStore`], so the queue stays testable without
//! a real backend.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use orc_core::clock::Clock;
use orc_core::decision::Decision;
use orc_core::interfaces::DecisionStore;

/// Default maximum queue length.
pub const DEFAULT_MAX_LEN: usize = 10_000;
/// Default base backoff, in milliseconds.
pub const DEFAULT_BASE_BACKOFF_MS: i64 = 1_000;
/// Default backoff multiplier.
pub const DEFAULT_MULTIPLIER: u32 = 2;
/// Default backoff cap, in milliseconds.
pub const DEFAULT_MAX_BACKOFF_MS: i64 = 60_000;
/// Default bounded attempt count before an entry is dropped terminally.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// What happens when the queue is full and a new entry arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackpressurePolicy {
    /// Evict the oldest entry to make room (default).
    DropOldest,
    /// Reject the new entry, keeping the queue as-is.
    RejectNew,
}

/// One decision awaiting re-insertion.
#[derive(Debug, Clone)]
pub struct DlqEntry {
    /// The decision to retry persisting.
    pub decision: Decision,
    /// Number of retry attempts made so far.
    pub attempts: u32,
    /// Earliest wall-clock time, in milliseconds, this entry may be retried.
    pub next_attempt_at_ms: i64,
}

/// Computes `base * multiplier^attempts`, capped at `max_backoff_ms`.
#[must_use]
pub fn backoff_ms(attempts: u32, base_ms: i64, multiplier: u32, max_backoff_ms: i64) -> i64 {
    let factor = multiplier.saturating_pow(attempts);
    let backoff = base_ms.saturating_mul(i64::from(factor));
    backoff.min(max_backoff_ms)
}

struct Config {
    max_len: usize,
    policy: BackpressurePolicy,
    base_backoff_ms: i64,
    multiplier: u32,
    max_backoff_ms: i64,
    max_attempts: u32,
}

/// Bounded FIFO of decisions pending re-insertion.
pub struct DeadLetterQueue {
    entries: Mutex<VecDeque<DlqEntry>>,
    config: Config,
}

impl DeadLetterQueue {
    /// Creates a queue with the given bound and backpressure policy.
    #[must_use]
    pub fn new(max_len: usize, policy: BackpressurePolicy) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            config: Config {
                max_len,
                policy,
                base_backoff_ms: DEFAULT_BASE_BACKOFF_MS,
                multiplier: DEFAULT_MULTIPLIER,
                max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
                max_attempts: DEFAULT_MAX_ATTEMPTS,
            },
        }
    }

    /// Number of entries currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }

    /// Whether the queue currently holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enqueues `decision` for retry, applying backpressure if the queue is
    /// full. Returns `false` when the new entry was rejected
    /// (`RejectNew` at capacity).
    pub fn push(&self, decision: Decision, now_ms: i64) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if entries.len() >= self.config.max_len {
            match self.config.policy {
                BackpressurePolicy::DropOldest => {
                    entries.pop_front();
                    orc_metrics::registry::dlq_dropped();
                }
                BackpressurePolicy::RejectNew => {
                    orc_metrics::registry::dlq_dropped();
                    return false;
                }
            }
        }
        entries.push_back(DlqEntry {
            decision,
            attempts: 0,
            next_attempt_at_ms: now_ms,
        });
        orc_metrics::registry::dlq_size(entries.len());
        true
    }

    /// Removes and returns every entry currently eligible for a retry
    /// attempt (`next_attempt_at_ms <= now_ms`), leaving ineligible entries
    /// in place.
    pub fn drain_ready(&self, now_ms: i64) -> Vec<DlqEntry> {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let (ready, not_ready): (VecDeque<DlqEntry>, VecDeque<DlqEntry>) =
            entries.drain(..).partition(|entry| entry.next_attempt_at_ms <= now_ms);
        *entries = not_ready;
        orc_metrics::registry::dlq_size(entries.len());
        ready.into_iter().collect()
    }

    /// Re-enqueues `entry` after a failed retry, bumping its attempt count
    /// and scheduling the next attempt. Returns `false` (and records the
    /// terminal-drop counter) once `max_attempts` is exhausted.
    pub fn requeue_after_failure(&self, mut entry: DlqEntry, now_ms: i64) -> bool {
        entry.attempts += 1;
        if entry.attempts >= self.config.max_attempts {
            orc_metrics::registry::dlq_dropped();
            return false;
        }
        entry.next_attempt_at_ms =
            now_ms + backoff_ms(entry.attempts, self.config.base_backoff_ms, self.config.multiplier, self.config.max_backoff_ms);
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.push_back(entry);
        orc_metrics::registry::dlq_size(entries.len());
        true
    }
}

/// Drives the background retry loop: wakes every `poll_interval`, drains
/// ready entries, and attempts re-insertion against `store`.
///
/// Runs until the task is aborted by its caller; intended to be spawned
/// once per process via `tokio::spawn`.
pub async fn run_retry_loop(
    queue: Arc<DeadLetterQueue>,
    store: Arc<dyn DecisionStore>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
) {
    loop {
        tokio::time::sleep(poll_interval).await;
        let now_ms = clock.now_ms();
        for entry in queue.drain_ready(now_ms) {
            orc_metrics::registry::dlq_retry();
            match store.insert(&entry.decision).await {
                Ok(()) => {}
                Err(_failure) => {
                    queue.requeue_after_failure(entry, now_ms);
                }
            }
        }
    }
}
