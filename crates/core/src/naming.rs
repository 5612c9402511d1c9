//! Pure functions mapping a session UUID to the canonical names and labels of
//! every orchestrator object it owns. No I/O, no orchestrator state: deletion
//! computes the same names creation did.

use crate::profile::Profile;
use rand::RngCore;
use std::collections::BTreeMap;

/// Allocate a fresh 8-character lowercase hex session UUID.
pub fn new_session_uuid() -> String {
    let mut bytes = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn deployment_name(uuid: &str) -> String {
    format!("user-{uuid}")
}

pub fn service_name(uuid: &str) -> String {
    format!("user-{uuid}")
}

pub fn ingress_name(uuid: &str) -> String {
    format!("user-{uuid}")
}

pub fn claim_name(uuid: &str) -> String {
    format!("pvc-{uuid}")
}

pub fn tls_secret_name(uuid: &str) -> String {
    format!("tls-{uuid}")
}

pub fn backup_job_name(uuid: &str) -> String {
    format!("backup-{uuid}")
}

pub fn autoscaler_trigger_name(uuid: &str) -> String {
    format!("trigger-{uuid}")
}

pub fn app_selector(uuid: &str) -> String {
    format!("app=user-{uuid}")
}

/// External host: `<prefix>-{uuid}.<base_domain>`.
pub fn external_host(profile: &Profile, uuid: &str) -> String {
    format!("{}-{uuid}.{}", profile.prefix, profile.base_domain)
}

pub fn workspace_url(profile: &Profile, uuid: &str) -> String {
    format!("https://{}", external_host(profile, uuid))
}

/// `sanitize` replaces `@`, `/`, `:` with `-` so a user id is safe as a label
/// value.
pub fn sanitize_label_value(value: &str) -> String {
    value.replace(['@', '/', ':'], "-")
}

/// Labels applied to every object owned by a session.
pub fn labels(uuid: &str, user_id: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert("session-uuid".to_string(), uuid.to_string());
    map.insert("user-id".to_string(), sanitize_label_value(user_id));
    map
}

/// Store key for the session hash.
pub fn session_key(uuid: &str) -> String {
    format!("session:{uuid}")
}

pub fn queue_key(uuid: &str) -> String {
    format!("queue:{uuid}")
}

pub fn chat_key(uuid: &str) -> String {
    format!("chat:{uuid}")
}

pub fn events_key(uuid: &str) -> String {
    format!("events:{uuid}")
}

pub fn rate_key(caller_ip: &str, endpoint: &str) -> String {
    format!("rate:{caller_ip}:{endpoint}")
}

/// Internal cluster-DNS service address the chat fast path forwards to.
pub fn internal_service_address(uuid: &str, namespace: &str, port: u16) -> String {
    format!(
        "http://{}.{namespace}.svc.cluster.local:{port}",
        service_name(uuid)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naming_is_pure_and_deterministic() {
        let profile = Profile::new("user", "preview.example");
        let uuid = "abcd1234";
        assert_eq!(deployment_name(uuid), "user-abcd1234");
        assert_eq!(service_name(uuid), "user-abcd1234");
        assert_eq!(ingress_name(uuid), "user-abcd1234");
        assert_eq!(claim_name(uuid), "pvc-abcd1234");
        assert_eq!(tls_secret_name(uuid), "tls-abcd1234");
        assert_eq!(
            external_host(&profile, uuid),
            "user-abcd1234.preview.example"
        );
        assert_eq!(
            workspace_url(&profile, uuid),
            "https://user-abcd1234.preview.example"
        );
        // Calling twice produces identical names.
        assert_eq!(deployment_name(uuid), deployment_name(uuid));
    }

    #[test]
    fn sanitize_replaces_reserved_characters() {
        assert_eq!(sanitize_label_value("alice@example.com"), "alice-example.com");
        assert_eq!(sanitize_label_value("a/b:c"), "a-b-c");
    }

    #[test]
    fn labels_contain_uuid_and_sanitized_user() {
        let labels = labels("abcd1234", "alice@example");
        assert_eq!(labels.get("session-uuid").unwrap(), "abcd1234");
        assert_eq!(labels.get("user-id").unwrap(), "alice-example");
    }

    #[test]
    fn new_session_uuid_is_eight_lowercase_hex_chars() {
        let uuid = new_session_uuid();
        assert_eq!(uuid.len(), 8);
        assert!(uuid.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
