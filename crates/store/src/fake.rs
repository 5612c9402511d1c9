//! In-memory fake store client, the test substitution seam for [`StoreClient`].

use crate::StoreClient;
use async_trait::async_trait;
use parking_lot::RwLock;
use sessionctl_core::ControlPlaneError;
use std::collections::{HashMap, VecDeque};

#[derive(Default)]
struct Inner {
    hashes: HashMap<String, HashMap<String, String>>,
    lists: HashMap<String, VecDeque<String>>,
    counters: HashMap<String, i64>,
    ttls: HashMap<String, u64>,
}

/// Deterministic in-memory stand-in for Redis, used by engine/gateway tests.
#[derive(Default)]
pub struct FakeStoreClient {
    inner: RwLock<Inner>,
}

impl FakeStoreClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: current TTL recorded for `key`, if any `expire` call set one.
    pub fn ttl_of(&self, key: &str) -> Option<u64> {
        self.inner.read().ttls.get(key).copied()
    }
}

#[async_trait]
impl StoreClient for FakeStoreClient {
    async fn hash_set(&self, key: &str, map: HashMap<String, String>) -> Result<(), ControlPlaneError> {
        self.inner.write().hashes.entry(key.to_string()).or_default().extend(map);
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, ControlPlaneError> {
        Ok(self.inner.read().hashes.get(key).cloned().unwrap_or_default())
    }

    async fn exists(&self, key: &str) -> Result<bool, ControlPlaneError> {
        let inner = self.inner.read();
        Ok(inner.hashes.contains_key(key) || inner.lists.contains_key(key))
    }

    async fn delete(&self, keys: &[String]) -> Result<(), ControlPlaneError> {
        let mut inner = self.inner.write();
        for key in keys {
            inner.hashes.remove(key);
            inner.lists.remove(key);
            inner.counters.remove(key);
            inner.ttls.remove(key);
        }
        Ok(())
    }

    async fn list_push_front(&self, key: &str, value: &str) -> Result<(), ControlPlaneError> {
        self.inner.write().lists.entry(key.to_string()).or_default().push_front(value.to_string());
        Ok(())
    }

    async fn list_trim(&self, key: &str, lo: isize, hi: isize) -> Result<(), ControlPlaneError> {
        let mut inner = self.inner.write();
        if let Some(list) = inner.lists.get_mut(key) {
            let len = list.len() as isize;
            let lo = lo.max(0).min(len) as usize;
            let hi = if hi < 0 { (len + hi + 1).max(0) as usize } else { (hi + 1).min(len) as usize };
            if lo >= hi {
                list.clear();
            } else {
                let trimmed: VecDeque<String> = list.iter().skip(lo).take(hi - lo).cloned().collect();
                *list = trimmed;
            }
        }
        Ok(())
    }

    async fn list_length(&self, key: &str) -> Result<i64, ControlPlaneError> {
        Ok(self.inner.read().lists.get(key).map(|l| l.len() as i64).unwrap_or(0))
    }

    async fn list_range(&self, key: &str, lo: isize, hi: isize) -> Result<Vec<String>, ControlPlaneError> {
        let inner = self.inner.read();
        let Some(list) = inner.lists.get(key) else { return Ok(Vec::new()) };
        let len = list.len() as isize;
        let lo = lo.max(0).min(len) as usize;
        let hi = if hi < 0 { (len + hi + 1).max(0) as usize } else { (hi + 1).min(len) as usize };
        if lo >= hi {
            return Ok(Vec::new());
        }
        Ok(list.iter().skip(lo).take(hi - lo).cloned().collect())
    }

    async fn incr(&self, key: &str) -> Result<i64, ControlPlaneError> {
        let mut inner = self.inner.write();
        let counter = inner.counters.entry(key.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), ControlPlaneError> {
        self.inner.write().ttls.insert(key.to_string(), seconds);
        Ok(())
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, ControlPlaneError> {
        let prefix = pattern.trim_end_matches('*');
        let inner = self.inner.read();
        Ok(inner.hashes.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }

    async fn ping(&self) -> Result<(), ControlPlaneError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_trim_keeps_most_recent_head() {
        let store = FakeStoreClient::new();
        for i in 0..5 {
            store.list_push_front("k", &i.to_string()).await.unwrap();
        }
        store.list_trim("k", 0, 2).await.unwrap();
        assert_eq!(store.list_length("k").await.unwrap(), 3);
        let range = store.list_range("k", 0, -1).await.unwrap();
        assert_eq!(range, vec!["4", "3", "2"]);
    }

    #[tokio::test]
    async fn incr_is_monotonic() {
        let store = FakeStoreClient::new();
        assert_eq!(store.incr("c").await.unwrap(), 1);
        assert_eq!(store.incr("c").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn scan_keys_matches_prefix() {
        let store = FakeStoreClient::new();
        store.hash_set("session:aaa", HashMap::new()).await.unwrap();
        store.hash_set("session:bbb", HashMap::new()).await.unwrap();
        store.hash_set("queue:aaa", HashMap::new()).await.unwrap();
        let mut keys = store.scan_keys("session:*").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["session:aaa", "session:bbb"]);
    }
}
