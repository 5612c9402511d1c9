//! Typed wrapper over the external key/value store.
//!
//! Exposes the narrow set of primitives the Session Registry needs (hash,
//! list, counter, TTL, keyspace scan) behind a trait, the same substitution
//! seam the reference codebase uses for its pluggable session store: a real
//! backend (`RedisStoreClient`) for production, an in-memory fake for tests.

mod fake;
mod redis_client;

pub use fake::FakeStoreClient;
pub use redis_client::RedisStoreClient;

use async_trait::async_trait;
use sessionctl_core::ControlPlaneError;
use std::collections::HashMap;

#[async_trait]
pub trait StoreClient: Send + Sync {
    async fn hash_set(&self, key: &str, map: HashMap<String, String>) -> Result<(), ControlPlaneError>;
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, ControlPlaneError>;
    async fn exists(&self, key: &str) -> Result<bool, ControlPlaneError>;
    async fn delete(&self, keys: &[String]) -> Result<(), ControlPlaneError>;
    async fn list_push_front(&self, key: &str, value: &str) -> Result<(), ControlPlaneError>;
    async fn list_trim(&self, key: &str, lo: isize, hi: isize) -> Result<(), ControlPlaneError>;
    async fn list_length(&self, key: &str) -> Result<i64, ControlPlaneError>;
    async fn list_range(&self, key: &str, lo: isize, hi: isize) -> Result<Vec<String>, ControlPlaneError>;
    async fn incr(&self, key: &str) -> Result<i64, ControlPlaneError>;
    async fn expire(&self, key: &str, seconds: u64) -> Result<(), ControlPlaneError>;
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, ControlPlaneError>;
    async fn ping(&self) -> Result<(), ControlPlaneError>;
}
