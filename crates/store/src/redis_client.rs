//! Redis-backed store client.
//!
//! Mirrors the shape of a typed connection wrapper: a config-derived URL,
//! a pooled/managed connection handle, narrow async methods, no leaking of
//! the underlying client type past this module.

use crate::StoreClient;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use sessionctl_config::RedisConfig;
use sessionctl_core::ControlPlaneError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Redis-backed implementation of [`StoreClient`].
#[derive(Clone)]
pub struct RedisStoreClient {
    manager: ConnectionManager,
    healthy: Arc<AtomicBool>,
}

impl RedisStoreClient {
    /// Connects with a bounded timeout, matching §4.2's connect-timeout
    /// requirement, and spawns the periodic health-check task.
    pub async fn connect(config: &RedisConfig) -> Result<Self, ControlPlaneError> {
        let client = redis::Client::open(config.connection_url())
            .map_err(|e| ControlPlaneError::StoreUnavailable(e.to_string()))?;

        let manager = tokio::time::timeout(CONNECT_TIMEOUT, client.get_connection_manager())
            .await
            .map_err(|_| ControlPlaneError::StoreUnavailable("connect timed out".to_string()))?
            .map_err(|e| ControlPlaneError::StoreUnavailable(e.to_string()))?;

        let store = Self { manager, healthy: Arc::new(AtomicBool::new(true)) };
        store.spawn_health_check();
        Ok(store)
    }

    fn spawn_health_check(&self) {
        let mut manager = self.manager.clone();
        let healthy = self.healthy.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(HEALTH_CHECK_INTERVAL);
            loop {
                interval.tick().await;
                let ok: Result<String, _> = redis::cmd("PING").query_async(&mut manager).await;
                let is_healthy = ok.is_ok();
                healthy.store(is_healthy, Ordering::Relaxed);
                if !is_healthy {
                    tracing::warn!("store health check failed");
                }
            }
        });
    }

    /// Last observed health-check result, surfaced by `/health`.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    fn map_err(e: redis::RedisError) -> ControlPlaneError {
        ControlPlaneError::StoreUnavailable(e.to_string())
    }
}

#[async_trait]
impl StoreClient for RedisStoreClient {
    async fn hash_set(&self, key: &str, map: HashMap<String, String>) -> Result<(), ControlPlaneError> {
        let mut conn = self.manager.clone();
        let pairs: Vec<(String, String)> = map.into_iter().collect();
        conn.hset_multiple(key, &pairs).await.map_err(Self::map_err)
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, ControlPlaneError> {
        let mut conn = self.manager.clone();
        conn.hgetall(key).await.map_err(Self::map_err)
    }

    async fn exists(&self, key: &str) -> Result<bool, ControlPlaneError> {
        let mut conn = self.manager.clone();
        conn.exists(key).await.map_err(Self::map_err)
    }

    async fn delete(&self, keys: &[String]) -> Result<(), ControlPlaneError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.manager.clone();
        conn.del(keys).await.map_err(Self::map_err)
    }

    async fn list_push_front(&self, key: &str, value: &str) -> Result<(), ControlPlaneError> {
        let mut conn = self.manager.clone();
        conn.lpush(key, value).await.map_err(Self::map_err)
    }

    async fn list_trim(&self, key: &str, lo: isize, hi: isize) -> Result<(), ControlPlaneError> {
        let mut conn = self.manager.clone();
        conn.ltrim(key, lo, hi).await.map_err(Self::map_err)
    }

    async fn list_length(&self, key: &str) -> Result<i64, ControlPlaneError> {
        let mut conn = self.manager.clone();
        conn.llen(key).await.map_err(Self::map_err)
    }

    async fn list_range(&self, key: &str, lo: isize, hi: isize) -> Result<Vec<String>, ControlPlaneError> {
        let mut conn = self.manager.clone();
        conn.lrange(key, lo, hi).await.map_err(Self::map_err)
    }

    async fn incr(&self, key: &str) -> Result<i64, ControlPlaneError> {
        let mut conn = self.manager.clone();
        conn.incr(key, 1).await.map_err(Self::map_err)
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), ControlPlaneError> {
        let mut conn = self.manager.clone();
        conn.expire(key, seconds as i64).await.map_err(Self::map_err)
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, ControlPlaneError> {
        let mut conn = self.manager.clone();
        let mut keys = Vec::new();
        let mut iter: redis::AsyncIter<'_, String> =
            conn.scan_match(pattern).await.map_err(Self::map_err)?;
        use futures::StreamExt;
        while let Some(key) = iter.next().await {
            keys.push(key);
        }
        Ok(keys)
    }

    async fn ping(&self) -> Result<(), ControlPlaneError> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await.map_err(Self::map_err)?;
        Ok(())
    }
}
