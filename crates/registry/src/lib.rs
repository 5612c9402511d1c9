//! Session Registry: the authoritative view of sessions backed by the store
//! client. Every mutation that succeeds refreshes the TTL on the session's
//! keys so a session that stops being touched eventually expires on its own.

use sessionctl_core::naming;
use sessionctl_core::{ChatRecord, ControlPlaneError, Event, Session, SessionStatus};
use sessionctl_store::StoreClient;
use std::sync::Arc;
use tracing::{debug, instrument};

const MAX_EVENTS: isize = 100;
const MAX_CHAT_RECORDS: isize = 1000;

pub struct SessionRegistry {
    store: Arc<dyn StoreClient>,
    session_ttl_secs: u64,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn StoreClient>, session_ttl_secs: u64) -> Self {
        Self { store, session_ttl_secs }
    }

    /// Writes the session hash with `status=created` and sets TTL on the
    /// session and queue keys.
    #[instrument(skip(self))]
    pub async fn create(&self, uuid: &str, user_id: &str) -> Result<Session, ControlPlaneError> {
        let session = Session::new(uuid, user_id);
        self.store.hash_set(&naming::session_key(uuid), session.to_hash()).await?;
        self.refresh_ttl(uuid).await?;
        debug!(uuid, user_id, "session created in registry");
        Ok(session)
    }

    /// Returns the session hash or fails with `SessionNotFound`.
    #[instrument(skip(self))]
    pub async fn require(&self, uuid: &str) -> Result<Session, ControlPlaneError> {
        let map = self.store.hash_get_all(&naming::session_key(uuid)).await?;
        if map.is_empty() {
            return Err(ControlPlaneError::SessionNotFound(uuid.to_string()));
        }
        Session::from_hash(&map).ok_or_else(|| {
            ControlPlaneError::Internal(format!("corrupt session record for {uuid}"))
        })
    }

    /// Updates `last_activity` and optionally `status`; refreshes TTL on the
    /// session and queue keys.
    #[instrument(skip(self))]
    pub async fn touch(&self, uuid: &str, new_status: Option<SessionStatus>) -> Result<Session, ControlPlaneError> {
        let mut session = self.require(uuid).await?;
        session.last_activity = chrono::Utc::now();
        if let Some(status) = new_status {
            session.status = status;
        }
        self.store.hash_set(&naming::session_key(uuid), session.to_hash()).await?;
        self.refresh_ttl(uuid).await?;
        Ok(session)
    }

    /// Prepends a structured event to the session's event log and trims it
    /// to the most recent 100 entries.
    #[instrument(skip(self, details))]
    pub async fn record_event(
        &self,
        uuid: &str,
        event_type: &str,
        details: serde_json::Value,
    ) -> Result<(), ControlPlaneError> {
        let event = Event::new(event_type, details);
        let encoded = serde_json::to_string(&event)
            .map_err(|e| ControlPlaneError::Internal(format!("failed to encode event: {e}")))?;
        let key = naming::events_key(uuid);
        self.store.list_push_front(&key, &encoded).await?;
        self.store.list_trim(&key, 0, MAX_EVENTS - 1).await?;
        self.store.expire(&key, self.session_ttl_secs).await?;
        Ok(())
    }

    /// Prepends a chat record to the session's chat log and trims it to the
    /// most recent 1,000 entries.
    #[instrument(skip(self, content))]
    pub async fn record_chat(&self, uuid: &str, content: &str) -> Result<(), ControlPlaneError> {
        let record = ChatRecord::user_message(content);
        let encoded = serde_json::to_string(&record)
            .map_err(|e| ControlPlaneError::Internal(format!("failed to encode chat record: {e}")))?;
        let key = naming::chat_key(uuid);
        self.store.list_push_front(&key, &encoded).await?;
        self.store.list_trim(&key, 0, MAX_CHAT_RECORDS - 1).await?;
        self.store.expire(&key, self.session_ttl_secs).await?;
        Ok(())
    }

    /// Deletes every key belonging to the session.
    #[instrument(skip(self))]
    pub async fn destroy(&self, uuid: &str) -> Result<(), ControlPlaneError> {
        let keys = vec![
            naming::session_key(uuid),
            naming::queue_key(uuid),
            naming::chat_key(uuid),
            naming::events_key(uuid),
        ];
        self.store.delete(&keys).await
    }

    /// Scans `session:*` keys and returns the hydrated session records.
    /// Corrupt or partially-written records are skipped rather than failing
    /// the whole listing.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Session>, ControlPlaneError> {
        let keys = self.store.scan_keys("session:*").await?;
        let mut sessions = Vec::with_capacity(keys.len());
        for key in keys {
            let map = self.store.hash_get_all(&key).await?;
            if let Some(session) = Session::from_hash(&map) {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }

    /// Pushes `"chat"` onto the wake queue, the externally observable signal
    /// that a session has pending work.
    pub async fn enqueue_wake_signal(&self, uuid: &str) -> Result<(), ControlPlaneError> {
        let key = naming::queue_key(uuid);
        self.store.list_push_front(&key, "chat").await?;
        self.store.expire(&key, self.session_ttl_secs).await?;
        Ok(())
    }

    pub async fn clear_wake_queue(&self, uuid: &str) -> Result<(), ControlPlaneError> {
        self.store.delete(&[naming::queue_key(uuid)]).await
    }

    async fn refresh_ttl(&self, uuid: &str) -> Result<(), ControlPlaneError> {
        self.store.expire(&naming::session_key(uuid), self.session_ttl_secs).await?;
        self.store.expire(&naming::queue_key(uuid), self.session_ttl_secs).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessionctl_store::FakeStoreClient;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Arc::new(FakeStoreClient::new()), 86400)
    }

    #[tokio::test]
    async fn create_then_require_round_trips() {
        let registry = registry();
        let created = registry.create("abcd1234", "alice").await.unwrap();
        let fetched = registry.require("abcd1234").await.unwrap();
        assert_eq!(created.uuid, fetched.uuid);
        assert_eq!(fetched.status, SessionStatus::Created);
    }

    #[tokio::test]
    async fn require_missing_session_fails() {
        let registry = registry();
        let err = registry.require("missing1").await.unwrap_err();
        assert!(matches!(err, ControlPlaneError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn touch_updates_status_and_activity() {
        let registry = registry();
        let created = registry.create("abcd1234", "alice").await.unwrap();
        let touched = registry.touch("abcd1234", Some(SessionStatus::Running)).await.unwrap();
        assert_eq!(touched.status, SessionStatus::Running);
        assert!(touched.last_activity >= created.last_activity);
    }

    #[tokio::test]
    async fn destroy_removes_all_session_keys() {
        let registry = registry();
        registry.create("abcd1234", "alice").await.unwrap();
        registry.record_event("abcd1234", "session_created", serde_json::json!({})).await.unwrap();
        registry.destroy("abcd1234").await.unwrap();
        let err = registry.require("abcd1234").await.unwrap_err();
        assert!(matches!(err, ControlPlaneError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn list_returns_all_created_sessions() {
        let registry = registry();
        registry.create("abcd1234", "alice").await.unwrap();
        registry.create("ffff0000", "bob").await.unwrap();
        let mut sessions = registry.list().await.unwrap();
        sessions.sort_by(|a, b| a.uuid.cmp(&b.uuid));
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].uuid, "abcd1234");
        assert_eq!(sessions[1].uuid, "ffff0000");
    }
}
