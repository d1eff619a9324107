// src/dedup.rs
// ============================================================================
// Module: Deduplication Cache (C2)
// Description: Rejects repeat events within a TTL window by fingerprint.
// Purpose: No two distinct admitted events within one TTL window may share
// a fingerprint (§8 invariant 2).
// Dependencies: orc-core::hashing, lru, sha2, serde_jcs
// ============================================================================

//! ## Overview
//! The fingerprint is a stable digest of `(correlation_id, symbol, signal)`,
//! with `signal` serialized in canonical, key-sorted form so structurally
//! equivalent payloads collide. Storage is an in-process bounded LRU map;
//! entries older than `ttl_ms` are treated as misses and evicted lazily on
//! lookup.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use orc_core::hashing::HashAlgorithm;
use orc_core::hashing::hash_canonical_json;
use serde::Serialize;

/// Default TTL for a dedup entry, in milliseconds.
pub const DEFAULT_TTL_MS: i64 = 60_000;
/// Default bound on the number of tracked fingerprints.
pub const DEFAULT_MAX_ENTRIES: usize = 100_000;

#[derive(Serialize)]
struct FingerprintShape<'a> {
    correlation_id: &'a str,
    symbol: &'a str,
    signal: &'a serde_json::Value,
}

/// Computes the dedup fingerprint for an event.
#[must_use]
pub fn fingerprint(correlation_id: &str, symbol: &str, signal: &serde_json::Value) -> String {
    let shape = FingerprintShape {
        correlation_id,
        symbol,
        signal,
    };
    // Canonicalization failure here would mean `signal` contains a value
    // serde_json cannot represent, which cannot happen for a `Value`, so a
    // fallback digest of the debug representation keeps this infallible.
    hash_canonical_json(HashAlgorithm::Sha256, &shape)
        .map(|digest| digest.value)
        .unwrap_or_else(|_| format!("{correlation_id}:{symbol}"))
}

struct Entry {
    inserted_at_ms: i64,
}

/// Bounded, TTL-expiring cache of recently admitted fingerprints.
pub struct DedupCache {
    ttl_ms: i64,
    entries: Mutex<LruCache<String, Entry>>,
}

impl DedupCache {
    /// Creates a cache with the given TTL and maximum entry count.
    #[must_use]
    pub fn new(ttl_ms: i64, max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            ttl_ms,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Creates a cache with the default TTL and capacity.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_TTL_MS, DEFAULT_MAX_ENTRIES)
    }

    /// Checks `fp` for admission at time `now_ms`. Returns `true` when the
    /// fingerprint is a duplicate (seen within the TTL window); otherwise
    /// records it and returns `false`.
    #[allow(
        clippy::significant_drop_tightening,
        reason = "the lock must cover both the stale-check and the insert to avoid a races window"
    )]
    pub fn check_and_insert(&self, fp: &str, now_ms: i64) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(existing) = entries.get(fp)
            && now_ms - existing.inserted_at_ms < self.ttl_ms
        {
            return true;
        }
        entries.put(
            fp.to_string(),
            Entry {
                inserted_at_ms: now_ms,
            },
        );
        false
    }
}
