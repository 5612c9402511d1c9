//! Session domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle status of a session. Transitions are monotonic: `created` ->
/// `running` <-> `sleeping` -> `terminated`. Nothing ever transitions out of
/// `terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Created,
    Running,
    Sleeping,
    Terminated,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Sleeping => "sleeping",
            Self::Terminated => "terminated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "running" => Some(Self::Running),
            "sleeping" => Some(Self::Sleeping),
            "terminated" => Some(Self::Terminated),
            _ => None,
        }
    }
}

/// A session record as stored in `session:{uuid}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub uuid: String,
    pub user_id: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new(uuid: impl Into<String>, user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uuid: uuid.into(),
            user_id: user_id.into(),
            status: SessionStatus::Created,
            created_at: now,
            last_activity: now,
        }
    }

    /// Serialize to the flat string map the store's hash operations deal in.
    pub fn to_hash(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("uuid".to_string(), self.uuid.clone());
        map.insert("user_id".to_string(), self.user_id.clone());
        map.insert("status".to_string(), self.status.as_str().to_string());
        map.insert("created_at".to_string(), self.created_at.to_rfc3339());
        map.insert("last_activity".to_string(), self.last_activity.to_rfc3339());
        map
    }

    pub fn from_hash(map: &HashMap<String, String>) -> Option<Self> {
        Some(Self {
            uuid: map.get("uuid")?.clone(),
            user_id: map.get("user_id")?.clone(),
            status: SessionStatus::parse(map.get("status")?)?,
            created_at: DateTime::parse_from_rfc3339(map.get("created_at")?)
                .ok()?
                .with_timezone(&Utc),
            last_activity: DateTime::parse_from_rfc3339(map.get("last_activity")?)
                .ok()?
                .with_timezone(&Utc),
        })
    }
}

/// A single entry in a session's append-only event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub details: serde_json::Value,
}

impl Event {
    pub fn new(event_type: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type: event_type.into(),
            details,
        }
    }
}

/// A single chat record in a session's chat log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub record_type: String,
    pub content: String,
}

impl ChatRecord {
    pub fn user_message(content: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            record_type: "user_message".to_string(),
            content: content.into(),
        }
    }
}

/// Resource request/limit pair applied to the user pod container.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub requests_memory: &'static str,
    pub requests_cpu: &'static str,
    pub limits_memory: &'static str,
    pub limits_cpu: &'static str,
}

/// Scale direction accepted by `POST /session/{uuid}/scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleDirection {
    Up,
    Down,
}

impl ScaleDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }
}
