// src/backend/mod.rs
// ============================================================================
// Module: Policy Backends
// Description: The four backends tried, in order, by the policy chain.
// ============================================================================

pub mod config_map;
pub mod default_backend;
pub mod distributed_cache;
pub mod remote_http;

pub use config_map::ConfigMapBackend;
pub use default_backend::DefaultBackend;
pub use distributed_cache::DistributedCacheBackend;
pub use remote_http::RemoteHttpBackend;
