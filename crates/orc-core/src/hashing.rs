// src/hashing.rs
// ============================================================================
// Module: Decision Hashing
// Description: Deterministic digest over canonical JSON representations.
// Purpose: Give every persisted Decision a stable, recomputable fingerprint.
// Dependencies: serde_jcs, sha2
// ============================================================================

//! ## Overview
//! `decision_hash` must be identical across processes and across runs for the
//! same logical content, so hashing always goes through RFC 8785 JSON
//! Canonicalization (`serde_jcs`) before digesting.

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256.
    Sha256,
}

/// The algorithm used when none is specified.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

/// A hex-encoded digest tagged with the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct HashDigest {
    /// Algorithm used to produce `value`.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex-encoded digest bytes.
    pub value: String,
}

/// Errors raised while hashing.
#[derive(Debug, Error)]
pub enum HashError {
    /// The value could not be serialized to canonical JSON.
    #[error("canonicalization failed: {0}")]
    Canonicalization(String),
}

/// Serializes `value` to RFC 8785 canonical JSON bytes.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when `value` cannot be serialized.
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes the canonical JSON form of `value`.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when `value` cannot be serialized.
pub fn hash_canonical_json<T: Serialize>(
    algorithm: HashAlgorithm,
    value: &T,
) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(algorithm, &bytes))
}

/// Hashes raw bytes directly, with no canonicalization step.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            let digest = hasher.finalize();
            HashDigest {
                algorithm,
                value: hex_encode(&digest),
            }
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::DEFAULT_HASH_ALGORITHM;
    use super::hash_canonical_json;
    use serde_json::json;

    #[test]
    fn hash_is_deterministic_regardless_of_key_order() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        let ha = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &a).expect("hash a");
        let hb = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &b).expect("hash b");
        assert_eq!(ha.value, hb.value);
    }

    #[test]
    fn different_content_hashes_differently() {
        let a = json!({"a": 1});
        let b = json!({"a": 2});
        let ha = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &a).expect("hash a");
        let hb = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &b).expect("hash b");
        assert_ne!(ha.value, hb.value);
    }
}
