//! kdash core types: workload view-model, identity, change events.
//!
//! Every other crate in the workspace speaks in terms of these types. The
//! entity shown on the dashboard is [`WorkloadInfo`]; it is produced either
//! by the remote dashboard API or by projecting a [`cloneset::CloneSet`]
//! through [`project::workload_from_cloneset`].

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod cloneset;
pub mod columns;
pub mod event;
pub mod policy;
pub mod project;

pub use event::WorkloadWatchEvent;

pub mod prelude {
    pub use super::{
        ChangeEvent, NamespaceInfo, ObjectKey, RevisionEntry, RevisionStatus, Versioned, WorkloadContainer,
        WorkloadInfo, WorkloadMeta,
    };
    pub use crate::event::WorkloadWatchEvent;
}

/// Stable identity of a workload: `(namespace, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), name: name.into() }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

/// Anything the reconcilers can key and version.
///
/// `key()` returns `None` for malformed records (no metadata or an empty
/// name); such records never compare equal and are never stored.
pub trait Versioned {
    fn key(&self) -> Option<ObjectKey>;
    fn version(&self) -> Option<&str>;
}

/// Metadata carried by a workload on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkloadMeta {
    pub name: String,
    pub namespace: String,
    pub uid: String,
    pub resource_version: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    /// RFC3339 creation time.
    pub creation_timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkloadContainer {
    pub name: String,
    pub image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RevisionStatus {
    pub replicas: i32,
    pub available_replicas: i32,
    pub ready_replicas: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PodInfo {
    pub name: String,
    pub status: String,
    pub restarts: i32,
}

/// One revision of the workload's pod template (a derived sub-resource).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RevisionEntry {
    pub object_meta: WorkloadMeta,
    pub status: RevisionStatus,
    pub revision: i64,
    pub images: Vec<String>,
    pub pods: Vec<PodInfo>,
}

/// Status record for one workload as rendered by the dashboard.
///
/// Immutable by convention: updates arrive as whole new values.
/// `object_meta` is `None` only for the empty placeholder used before any
/// data arrived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkloadInfo {
    pub object_meta: Option<WorkloadMeta>,
    pub kind: String,
    pub status: String,
    pub strategy: String,
    pub step: String,
    pub set_weight: String,
    pub actual_weight: String,
    pub ready: String,
    pub replicas: i32,
    pub ready_replicas: i32,
    pub available_replicas: i32,
    pub updated_replicas: i32,
    pub updated_ready_replicas: i32,
    pub current_revision: String,
    pub update_revision: String,
    pub paused: bool,
    pub containers: Vec<WorkloadContainer>,
    pub images: Vec<String>,
    pub replica_sets: Vec<RevisionEntry>,
}

impl WorkloadInfo {
    pub fn name(&self) -> &str {
        self.object_meta.as_ref().map(|m| m.name.as_str()).unwrap_or("")
    }

    pub fn namespace(&self) -> &str {
        self.object_meta.as_ref().map(|m| m.namespace.as_str()).unwrap_or("")
    }
}

impl Versioned for WorkloadInfo {
    fn key(&self) -> Option<ObjectKey> {
        let meta = self.object_meta.as_ref()?;
        if meta.name.is_empty() {
            return None;
        }
        Some(ObjectKey::new(meta.namespace.clone(), meta.name.clone()))
    }

    fn version(&self) -> Option<&str> {
        self.object_meta.as_ref()?.resource_version.as_deref()
    }
}

/// Upsert or removal of one entity.
///
/// The wire does not distinguish add from update. A delete carries whatever
/// identity its payload had; `Delete(None)` is a no-op everywhere.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent<T> {
    Upsert(T),
    Delete(Option<ObjectKey>),
}

impl<T: Versioned> ChangeEvent<T> {
    pub fn key(&self) -> Option<ObjectKey> {
        match self {
            ChangeEvent::Upsert(e) => e.key(),
            ChangeEvent::Delete(k) => k.clone(),
        }
    }
}

/// Namespace context reported by the dashboard API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NamespaceInfo {
    pub namespace: String,
    pub available_namespaces: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_has_no_identity() {
        let w = WorkloadInfo::default();
        assert!(w.key().is_none());
        assert!(w.version().is_none());
        assert_eq!(w.name(), "");
    }

    #[test]
    fn decodes_partial_frame_with_defaults() {
        let w: WorkloadInfo = serde_json::from_value(serde_json::json!({
            "objectMeta": { "name": "a", "namespace": "default", "resourceVersion": "7" },
            "ready": "1/2"
        }))
        .expect("decode");
        assert_eq!(w.key(), Some(ObjectKey::new("default", "a")));
        assert_eq!(w.version(), Some("7"));
        assert_eq!(w.ready, "1/2");
        assert!(w.images.is_empty());
        assert_eq!(w.replicas, 0);
    }

    #[test]
    fn key_displays_namespace_slash_name() {
        assert_eq!(ObjectKey::new("ns", "a").to_string(), "ns/a");
        assert_eq!(ObjectKey::new("", "a").to_string(), "a");
    }
}
