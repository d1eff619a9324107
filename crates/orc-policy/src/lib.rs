// src/lib.rs
// ============================================================================
// Crate: orc-policy
// Description: Chained policy store with circuit-breaker fallback (C5) and
// the signal filter (C7).
// ============================================================================

//! Policy resolution for the Decision Orchestration Core.

pub mod backend;
pub mod circuit_breaker;
pub mod filter;
pub mod store;

pub use backend::ConfigMapBackend;
pub use backend::DefaultBackend;
pub use backend::DistributedCacheBackend;
pub use backend::RemoteHttpBackend;
pub use circuit_breaker::CircuitBreaker;
pub use circuit_breaker::CircuitState;
pub use circuit_breaker::Permit;
pub use filter::filter_signals;
pub use store::PolicyStore;
pub use store::PolicyStoreConfig;
pub use store::cache_key;
