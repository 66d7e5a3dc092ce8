//! CloneSet → WorkloadInfo projection.
//!
//! Total and stateless. Field table (target ← source, default when absent):
//!
//! | WorkloadInfo                    | CloneSet                                 | default |
//! |---------------------------------|------------------------------------------|---------|
//! | objectMeta.name                 | metadata.name                            | ""      |
//! | objectMeta.namespace            | metadata.namespace                       | ""      |
//! | objectMeta.uid                  | metadata.uid                             | ""      |
//! | objectMeta.resourceVersion      | metadata.resourceVersion                 | None    |
//! | objectMeta.labels / annotations | metadata.labels / annotations            | {}      |
//! | objectMeta.creationTimestamp    | metadata.creationTimestamp (RFC3339)     | None    |
//! | kind                            | kind                                     | "CloneSet" |
//! | strategy                        | spec.updateStrategy.type                 | "Recreate" |
//! | paused                          | spec.updateStrategy.paused               | false   |
//! | step / setWeight / actualWeight | (none)                                   | "0"     |
//! | replicas .. updatedReadyReplicas| status.*                                 | 0       |
//! | ready                           | "{status.readyReplicas}/{status.replicas}" | "0/0" |
//! | currentRevision/updateRevision  | status.currentRevision / updateRevision  | ""      |
//! | containers / images             | spec.template.spec.containers            | []      |
//! | status                          | derived, see [`derive_phase`]            |         |
//! | replicaSets                     | derived, see [`revision_history`]        | []      |

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::cloneset::{CloneSet, CloneSetStatus, KIND, REVISION_HASH_LABEL};
use crate::{RevisionEntry, RevisionStatus, WorkloadContainer, WorkloadInfo, WorkloadMeta};

pub const PHASE_PAUSED: &str = "Paused";
pub const PHASE_PROGRESSING: &str = "Progressing";
pub const PHASE_DEGRADED: &str = "Degraded";
pub const PHASE_HEALTHY: &str = "Healthy";

fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn workload_from_cloneset(cs: &CloneSet, now: DateTime<Utc>) -> WorkloadInfo {
    let status = cs.status.clone().unwrap_or_default();
    let containers: Vec<WorkloadContainer> = cs
        .containers()
        .into_iter()
        .map(|(name, image)| WorkloadContainer { name, image })
        .collect();
    let images = containers.iter().map(|c| c.image.clone()).collect::<Vec<_>>();
    let meta = WorkloadMeta {
        name: cs.metadata.name.clone().unwrap_or_default(),
        namespace: cs.metadata.namespace.clone().unwrap_or_default(),
        uid: cs.metadata.uid.clone().unwrap_or_default(),
        resource_version: cs.metadata.resource_version.clone(),
        labels: cs.labels(),
        annotations: cs.metadata.annotations.clone().unwrap_or_default(),
        creation_timestamp: cs.metadata.creation_timestamp.as_ref().map(|t| rfc3339(t.0)),
    };
    let strategy = &cs.spec.update_strategy;
    WorkloadInfo {
        kind: if cs.kind.is_empty() { KIND.to_string() } else { cs.kind.clone() },
        status: derive_phase(strategy.paused, &status).to_string(),
        strategy: strategy.type_.as_str().to_string(),
        step: "0".into(),
        set_weight: "0".into(),
        actual_weight: "0".into(),
        ready: format!("{}/{}", status.ready_replicas, status.replicas),
        replicas: status.replicas,
        ready_replicas: status.ready_replicas,
        available_replicas: status.available_replicas,
        updated_replicas: status.updated_replicas,
        updated_ready_replicas: status.updated_ready_replicas,
        current_revision: status.current_revision.clone(),
        update_revision: status.update_revision.clone(),
        paused: strategy.paused,
        replica_sets: revision_history(&meta, &status, &images, now),
        containers,
        images,
        object_meta: Some(meta),
    }
}

/// Dashboard phase. Paused wins, then an unfinished rollout, then missing
/// ready replicas.
pub fn derive_phase(paused: bool, status: &CloneSetStatus) -> &'static str {
    if paused {
        return PHASE_PAUSED;
    }
    let revision_pending = !status.update_revision.is_empty() && status.update_revision != status.current_revision;
    if revision_pending || status.updated_replicas < status.replicas {
        return PHASE_PROGRESSING;
    }
    if status.ready_replicas < status.replicas {
        return PHASE_DEGRADED;
    }
    PHASE_HEALTHY
}

fn revision_entry(
    owner: &WorkloadMeta,
    revision_hash: &str,
    revision: i64,
    status: RevisionStatus,
    images: &[String],
    created: DateTime<Utc>,
) -> RevisionEntry {
    let short: String = revision_hash.chars().take(5).collect();
    let mut labels = owner.labels.clone();
    labels.insert(REVISION_HASH_LABEL.to_string(), revision_hash.to_string());
    RevisionEntry {
        object_meta: WorkloadMeta {
            name: format!("{}-{}", owner.name, short),
            namespace: owner.namespace.clone(),
            labels,
            creation_timestamp: Some(rfc3339(created)),
            ..Default::default()
        },
        status,
        revision,
        images: images.to_vec(),
        pods: Vec::new(),
    }
}

/// Revision history derived from the current and update revisions.
///
/// The current revision holds the replicas not yet updated; the update
/// revision (only when it differs) holds the updated ones.
pub fn revision_history(
    owner: &WorkloadMeta,
    status: &CloneSetStatus,
    images: &[String],
    now: DateTime<Utc>,
) -> Vec<RevisionEntry> {
    let mut out = Vec::with_capacity(2);
    if !status.current_revision.is_empty() {
        let old = (status.replicas - status.updated_replicas).max(0);
        out.push(revision_entry(
            owner,
            &status.current_revision,
            1,
            RevisionStatus { replicas: old, available_replicas: old, ready_replicas: old },
            images,
            now - Duration::hours(24),
        ));
    }
    if !status.update_revision.is_empty() && status.update_revision != status.current_revision {
        out.push(revision_entry(
            owner,
            &status.update_revision,
            2,
            RevisionStatus {
                replicas: status.updated_replicas,
                available_replicas: status.updated_ready_replicas,
                ready_replicas: status.updated_ready_replicas,
            },
            images,
            now,
        ));
    }
    out
}
