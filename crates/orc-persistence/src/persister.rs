// src/persister.rs
// ============================================================================
// Module: Decision Persister (C8)
// Description: Computes `decision_hash`, writes one append-only row per
// admitted event, and escalates to the DLQ on primary failure.
// Purpose: Tie the SQLite store and dead-letter queue into the single
// write path the handler calls.
// Dependencies: orc-core, orc-metrics
// ============================================================================

use std::sync::Arc;

use orc_core::clock::Clock;
use orc_core::decision::Decision;
use orc_core::hashing::HashAlgorithm;
use orc_core::interfaces::CacheBackend;
use orc_core::interfaces::DecisionStore;

use crate::dlq::DeadLetterQueue;

/// Outcome of [`DecisionPersister::persist`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The primary store accepted the write.
    Written,
    /// The primary store failed; the decision was enqueued to the DLQ.
    Escalated,
}

/// Ties the primary [`DecisionStore`] and the [`DeadLetterQueue`] into the
/// single write path described in §4.8.
pub struct DecisionPersister {
    store: Arc<dyn DecisionStore>,
    cache: Option<Arc<dyn CacheBackend>>,
    dlq: Arc<DeadLetterQueue>,
    clock: Arc<dyn Clock>,
    cache_ttl_ms: i64,
    hash_algorithm: HashAlgorithm,
}

/// Short-TTL cache entry written alongside a successful primary insert.
const DEFAULT_SUMMARY_CACHE_TTL_MS: i64 = 300_000;

impl DecisionPersister {
    /// Builds a persister over `store`, with an optional best-effort cache
    /// and the DLQ used on primary failure.
    #[must_use]
    pub fn new(
        store: Arc<dyn DecisionStore>,
        cache: Option<Arc<dyn CacheBackend>>,
        dlq: Arc<DeadLetterQueue>,
        clock: Arc<dyn Clock>,
        hash_algorithm: HashAlgorithm,
    ) -> Self {
        Self {
            store,
            cache,
            dlq,
            clock,
            cache_ttl_ms: DEFAULT_SUMMARY_CACHE_TTL_MS,
            hash_algorithm,
        }
    }

    /// Computes `decision_hash`, attempts the primary insert, opportunistically
    /// refreshes the summary cache, and escalates to the DLQ on failure.
    ///
    /// Never fails: a primary-store failure still returns `Ok`, with
    /// [`PersistOutcome::Escalated`].
    ///
    /// # Errors
    ///
    /// Returns an error only if `decision_hash` cannot be computed, which
    /// indicates the decision's content cannot be serialized to JSON.
    pub async fn persist(&self, mut decision: Decision) -> Result<(Decision, PersistOutcome), orc_core::hashing::HashError> {
        decision.decision_hash = decision.compute_hash(self.hash_algorithm)?;

        match self.store.insert(&decision).await {
            Ok(()) => {
                orc_metrics::registry::decision_processed();
                self.refresh_summary_cache(&decision).await;
                Ok((decision, PersistOutcome::Written))
            }
            Err(_failure) => {
                self.dlq.push(decision.clone(), self.clock.now_ms());
                Ok((decision, PersistOutcome::Escalated))
            }
        }
    }

    async fn refresh_summary_cache(&self, decision: &Decision) {
        let Some(cache) = &self.cache else {
            return;
        };
        let key = format!("decision_summary:{}", decision.decision_id);
        let summary = serde_json::json!({
            "decision_id": decision.decision_id.as_str(),
            "symbol": decision.symbol,
            "confidence": decision.confidence,
            "ts_ms": decision.ts_ms,
        });
        let Ok(bytes) = serde_json::to_vec(&summary) else {
            return;
        };
        let _ = cache.setex(&key, self.cache_ttl_ms, bytes).await;
    }
}

#[cfg(test)]
mod tests {
    use super::DecisionPersister;
    use super::PersistOutcome;
    use crate::dlq::BackpressurePolicy;
    use crate::dlq::DeadLetterQueue;
    use crate::memory_store::MemoryDecisionStore;
    use orc_core::clock::FixedClock;
    use orc_core::decision::Decision;
    use orc_core::hashing::DEFAULT_HASH_ALGORITHM;
    use orc_core::hashing::HashDigest;
    use orc_core::identifiers::CorrelationId;
    use orc_core::identifiers::DecisionId;
    use serde_json::json;
    use std::sync::Arc;

    fn sample() -> Decision {
        Decision {
            decision_id: DecisionId::from("d1"),
            correlation_id: CorrelationId::from("corr-1"),
            symbol: "BTCUSD".to_string(),
            timeframe: "1h".to_string(),
            signal: json!({}),
            reasoning_mode: "default".to_string(),
            confidence: 0.5,
            reasoning_time_ms: 1,
            advisory_signals: vec![],
            policy_decisions: vec![],
            decision_hash: HashDigest {
                algorithm: DEFAULT_HASH_ALGORITHM,
                value: String::new(),
            },
            ts_ms: 1_000,
        }
    }

    #[tokio::test]
    async fn successful_insert_computes_a_hash_and_reports_written() {
        let persister = DecisionPersister::new(
            Arc::new(MemoryDecisionStore::new()),
            None,
            Arc::new(DeadLetterQueue::new(10, BackpressurePolicy::DropOldest)),
            Arc::new(FixedClock::new(0)),
            DEFAULT_HASH_ALGORITHM,
        );
        let (decision, outcome) = persister.persist(sample()).await.expect("persist");
        assert_eq!(outcome, PersistOutcome::Written);
        assert!(!decision.decision_hash.value.is_empty());
    }
}
