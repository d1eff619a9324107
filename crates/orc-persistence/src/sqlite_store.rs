// src/sqlite_store.rs
// ============================================================================
// Module: SQLite Decision Store (C8)
// Description: Durable, append-only storage for Decision rows.
// Purpose: Persist decisions with no update or delete path, enforced at the
// schema level, not just by convention.
// Dependencies: orc-core, rusqlite, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Every decision is inserted once as a canonical JSON blob alongside its
//! indexed columns (`decision_id`, `correlation_id`, `symbol`, `ts_ms`).
//! `SQLite` triggers reject any `UPDATE` or `DELETE` against the table, so
//! the append-only invariant holds even against a caller bug, not just
//! against this store's own API surface.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use orc_core::decision::Decision;
use orc_core::interfaces::DecisionStore;
use orc_core::interfaces::PersistError;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use thiserror::Error;

const SCHEMA_VERSION: i64 = 1;
const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5_000;

/// Errors raised opening or querying the `SQLite` decision store.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// The database file could not be opened.
    #[error("could not open decision store at {path}: {source}")]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying `SQLite` error.
        #[source]
        source: rusqlite::Error,
    },
    /// A query or statement failed.
    #[error("decision store query failed: {0}")]
    Query(#[source] rusqlite::Error),
    /// A row could not be deserialized back into a [`Decision`].
    #[error("stored decision row is corrupt: {0}")]
    Corrupt(String),
}

impl From<SqliteStoreError> for PersistError {
    fn from(error: SqliteStoreError) -> Self {
        Self::BackendFailure(error.to_string())
    }
}

/// Durable [`DecisionStore`] backed by a single `SQLite` file in WAL mode.
pub struct SqliteDecisionStore {
    conn: Mutex<Connection>,
}

impl SqliteDecisionStore {
    /// Opens (creating if absent) the decision store at `path`, applying
    /// pragmas and the append-only schema.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Open`] if the database cannot be opened,
    /// or [`SqliteStoreError::Query`] if the schema cannot be applied.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SqliteStoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|source| SqliteStoreError::Open {
            path: path.clone(),
            source,
        })?;
        conn.busy_timeout(std::time::Duration::from_millis(u64::from(DEFAULT_BUSY_TIMEOUT_MS)))
            .map_err(SqliteStoreError::Query)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL; PRAGMA foreign_keys = ON;")
            .map_err(SqliteStoreError::Query)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.apply_schema()?;
        Ok(store)
    }

    /// Opens an in-memory database, for tests.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Query`] if the schema cannot be applied.
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        let conn = Connection::open_in_memory().map_err(|source| SqliteStoreError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.apply_schema()?;
        Ok(store)
    }

    fn apply_schema(&self) -> Result<(), SqliteStoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.execute_batch(&format!(
            "
            CREATE TABLE IF NOT EXISTS schema_meta (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL
            );
            INSERT OR IGNORE INTO schema_meta (id, version) VALUES (1, {SCHEMA_VERSION});

            CREATE TABLE IF NOT EXISTS decisions (
                rowid_seq INTEGER PRIMARY KEY AUTOINCREMENT,
                decision_id TEXT NOT NULL UNIQUE,
                correlation_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                ts_ms INTEGER NOT NULL,
                body TEXT NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_decisions_correlation_id ON decisions(correlation_id);
            CREATE INDEX IF NOT EXISTS idx_decisions_symbol_ts ON decisions(symbol, ts_ms);

            CREATE TRIGGER IF NOT EXISTS decisions_no_update
            BEFORE UPDATE ON decisions
            BEGIN
                SELECT RAISE(ABORT, 'decisions table is append-only');
            END;

            CREATE TRIGGER IF NOT EXISTS decisions_no_delete
            BEFORE DELETE ON decisions
            BEGIN
                SELECT RAISE(ABORT, 'decisions table is append-only');
            END;
            "
        ))
        .map_err(SqliteStoreError::Query)
    }

    fn insert_sync(&self, decision: &Decision) -> Result<(), SqliteStoreError> {
        let body = serde_json::to_string(decision).map_err(|err| SqliteStoreError::Corrupt(err.to_string()))?;
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.execute(
            "INSERT INTO decisions (decision_id, correlation_id, symbol, ts_ms, body) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![decision.decision_id.as_str(), decision.correlation_id.as_str(), decision.symbol, decision.ts_ms, body],
        )
        .map_err(SqliteStoreError::Query)?;
        Ok(())
    }

    fn by_correlation_id_sync(&self, correlation_id: &str) -> Result<Option<Decision>, SqliteStoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM decisions WHERE correlation_id = ?1 ORDER BY rowid_seq DESC LIMIT 1",
                params![correlation_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(SqliteStoreError::Query)?;
        body.map(|body| serde_json::from_str(&body).map_err(|err| SqliteStoreError::Corrupt(err.to_string())))
            .transpose()
    }

    fn by_symbol_since_sync(&self, symbol: &str, since_ms: i64) -> Result<Vec<Decision>, SqliteStoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut stmt = conn
            .prepare("SELECT body FROM decisions WHERE symbol = ?1 AND ts_ms >= ?2 ORDER BY rowid_seq ASC")
            .map_err(SqliteStoreError::Query)?;
        let rows = stmt
            .query_map(params![symbol, since_ms], |row| row.get::<_, String>(0))
            .map_err(SqliteStoreError::Query)?;
        let mut decisions = Vec::new();
        for row in rows {
            let body = row.map_err(SqliteStoreError::Query)?;
            decisions.push(serde_json::from_str(&body).map_err(|err| SqliteStoreError::Corrupt(err.to_string()))?);
        }
        Ok(decisions)
    }

    fn last_n_sync(&self, n: usize) -> Result<Vec<Decision>, SqliteStoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut stmt = conn
            .prepare("SELECT body FROM decisions ORDER BY rowid_seq DESC LIMIT ?1")
            .map_err(SqliteStoreError::Query)?;
        #[allow(clippy::cast_possible_wrap, reason = "n is bounded by caller-supplied page sizes")]
        let rows = stmt.query_map(params![n as i64], |row| row.get::<_, String>(0)).map_err(SqliteStoreError::Query)?;
        let mut decisions = Vec::new();
        for row in rows {
            let body = row.map_err(SqliteStoreError::Query)?;
            decisions.push(serde_json::from_str(&body).map_err(|err| SqliteStoreError::Corrupt(err.to_string()))?);
        }
        decisions.reverse();
        Ok(decisions)
    }
}

#[async_trait]
impl DecisionStore for SqliteDecisionStore {
    async fn insert(&self, decision: &Decision) -> Result<(), PersistError> {
        self.insert_sync(decision).map_err(Into::into)
    }

    async fn by_correlation_id(&self, correlation_id: &str) -> Result<Option<Decision>, PersistError> {
        self.by_correlation_id_sync(correlation_id).map_err(Into::into)
    }

    async fn by_symbol_since(&self, symbol: &str, since_ms: i64) -> Result<Vec<Decision>, PersistError> {
        self.by_symbol_since_sync(symbol, since_ms).map_err(Into::into)
    }

    async fn last_n(&self, n: usize) -> Result<Vec<Decision>, PersistError> {
        self.last_n_sync(n).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteDecisionStore;
    use orc_core::decision::Decision;
    use orc_core::hashing::DEFAULT_HASH_ALGORITHM;
    use orc_core::hashing::HashDigest;
    use orc_core::identifiers::CorrelationId;
    use orc_core::identifiers::DecisionId;
    use orc_core::interfaces::DecisionStore;
    use serde_json::json;

    fn sample(decision_id: &str, symbol: &str, ts_ms: i64) -> Decision {
        Decision {
            decision_id: DecisionId::from(decision_id),
            correlation_id: CorrelationId::from("corr-1"),
            symbol: symbol.to_string(),
            timeframe: "1h".to_string(),
            signal: json!({"type": "ict_signal"}),
            reasoning_mode: "default".to_string(),
            confidence: 0.8,
            reasoning_time_ms: 5,
            advisory_signals: vec![],
            policy_decisions: vec![],
            decision_hash: HashDigest {
                algorithm: DEFAULT_HASH_ALGORITHM,
                value: "deadbeef".to_string(),
            },
            ts_ms,
        }
    }

    #[tokio::test]
    async fn inserted_decisions_are_retrievable_by_correlation_id() {
        let store = SqliteDecisionStore::open_in_memory().expect("open");
        store.insert(&sample("d1", "BTCUSD", 1_000)).await.expect("insert");
        let found = store.by_correlation_id("corr-1").await.expect("query").expect("present");
        assert_eq!(found.decision_id.as_str(), "d1");
    }

    #[tokio::test]
    async fn by_symbol_since_filters_and_orders() {
        let store = SqliteDecisionStore::open_in_memory().expect("open");
        store.insert(&sample("d1", "BTCUSD", 1_000)).await.expect("insert");
        store.insert(&sample("d2", "BTCUSD", 2_000)).await.expect("insert");
        store.insert(&sample("d3", "ETHUSD", 3_000)).await.expect("insert");
        let found = store.by_symbol_since("BTCUSD", 1_500).await.expect("query");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].decision_id.as_str(), "d2");
    }

    #[tokio::test]
    async fn last_n_returns_newest_last() {
        let store = SqliteDecisionStore::open_in_memory().expect("open");
        for (id, ts) in [("d1", 1_000), ("d2", 2_000), ("d3", 3_000)] {
            store.insert(&sample(id, "BTCUSD", ts)).await.expect("insert");
        }
        let found = store.last_n(2).await.expect("query");
        assert_eq!(found.iter().map(|d| d.decision_id.as_str()).collect::<Vec<_>>(), vec!["d2", "d3"]);
    }
}
