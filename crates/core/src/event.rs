//! Wire form of list watch events.

use serde::{Deserialize, Serialize};

use crate::{ChangeEvent, ObjectKey, Versioned, WorkloadInfo};

/// One list-stream event as sent by the dashboard API.
///
/// `type` is informational except for `DELETED`. A missing entity also
/// signals deletion, identified by the top-level `name`/`namespace`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkloadWatchEvent {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(alias = "workloadInfo")]
    pub rollout_info: Option<WorkloadInfo>,
    pub name: Option<String>,
    pub namespace: Option<String>,
}

impl WorkloadWatchEvent {
    pub fn upsert(info: WorkloadInfo) -> Self {
        Self { kind: Some("MODIFIED".into()), rollout_info: Some(info), ..Default::default() }
    }

    pub fn deleted(namespace: &str, name: &str) -> Self {
        Self {
            kind: Some("DELETED".into()),
            rollout_info: None,
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
        }
    }

    fn payload_key(&self) -> Option<ObjectKey> {
        let name = self.name.as_deref().filter(|n| !n.is_empty())?;
        Some(ObjectKey::new(self.namespace.clone().unwrap_or_default(), name))
    }

    pub fn into_change(self) -> ChangeEvent<WorkloadInfo> {
        let deleted = self.kind.as_deref().is_some_and(|k| k.eq_ignore_ascii_case("DELETED"));
        let fallback = self.payload_key();
        match self.rollout_info {
            Some(info) if deleted => ChangeEvent::Delete(info.key().or(fallback)),
            Some(info) => ChangeEvent::Upsert(info),
            None => ChangeEvent::Delete(fallback),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_present_is_upsert() {
        let ev: WorkloadWatchEvent = serde_json::from_value(serde_json::json!({
            "type": "ADDED",
            "rolloutInfo": { "objectMeta": { "name": "a", "namespace": "default", "resourceVersion": "1" } }
        }))
        .expect("decode");
        match ev.into_change() {
            ChangeEvent::Upsert(w) => assert_eq!(w.name(), "a"),
            other => panic!("expected upsert, got {:?}", other),
        }
    }

    #[test]
    fn null_entity_is_delete_by_payload_identity() {
        let ev: WorkloadWatchEvent = serde_json::from_value(serde_json::json!({
            "rolloutInfo": null, "name": "a", "namespace": "default"
        }))
        .expect("decode");
        assert_eq!(ev.into_change(), ChangeEvent::Delete(Some(ObjectKey::new("default", "a"))));
    }

    #[test]
    fn deleted_type_uses_entity_identity() {
        let ev: WorkloadWatchEvent = serde_json::from_value(serde_json::json!({
            "type": "DELETED",
            "rolloutInfo": { "objectMeta": { "name": "b", "namespace": "ns" } }
        }))
        .expect("decode");
        assert_eq!(ev.into_change(), ChangeEvent::Delete(Some(ObjectKey::new("ns", "b"))));
    }

    #[test]
    fn empty_event_is_anonymous_delete() {
        let ev: WorkloadWatchEvent = serde_json::from_str("{}").expect("decode");
        assert_eq!(ev.into_change(), ChangeEvent::Delete(None));
    }
}
