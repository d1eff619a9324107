// src/memory_store.rs
// ============================================================================
// Module: In-Memory Decision Store
// Description: Append-only `DecisionStore` backed by a `Vec`, for tests and
// for the DLQ's own reference implementation in doctests.
// Dependencies: orc-core
// ============================================================================

use std::sync::Mutex;

use async_trait::async_trait;
use orc_core::decision::Decision;
use orc_core::interfaces::DecisionStore;
use orc_core::interfaces::PersistError;

/// In-memory [`DecisionStore`]. Never fails; intended for tests.
#[derive(Default)]
pub struct MemoryDecisionStore {
    rows: Mutex<Vec<Decision>>,
}

impl MemoryDecisionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DecisionStore for MemoryDecisionStore {
    async fn insert(&self, decision: &Decision) -> Result<(), PersistError> {
        self.rows.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(decision.clone());
        Ok(())
    }

    async fn by_correlation_id(&self, correlation_id: &str) -> Result<Option<Decision>, PersistError> {
        let rows = self.rows.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(rows.iter().rev().find(|decision| decision.correlation_id.as_str() == correlation_id).cloned())
    }

    async fn by_symbol_since(&self, symbol: &str, since_ms: i64) -> Result<Vec<Decision>, PersistError> {
        let rows = self.rows.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(rows.iter().filter(|decision| decision.symbol == symbol && decision.ts_ms >= since_ms).cloned().collect())
    }

    async fn last_n(&self, n: usize) -> Result<Vec<Decision>, PersistError> {
        let rows = self.rows.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let start = rows.len().saturating_sub(n);
        Ok(rows[start..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryDecisionStore;
    use orc_core::decision::Decision;
    use orc_core::hashing::DEFAULT_HASH_ALGORITHM;
    use orc_core::hashing::HashDigest;
    use orc_core::identifiers::CorrelationId;
    use orc_core::identifiers::DecisionId;
    use orc_core::interfaces::DecisionStore;
    use serde_json::json;

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
                value: "abc".to_string(),
            },
            ts_ms: 1_000,
        }
    }

    #[tokio::test]
    async fn round_trips_a_decision() {
        let store = MemoryDecisionStore::new();
        store.insert(&sample()).await.expect("insert");
        let found = store.by_correlation_id("corr-1").await.expect("query");
        assert!(found.is_some());
    }
}
