//! Synthetic provider: in-memory CloneSets, no backend required.

use std::collections::BTreeMap;

use chrono::Utc;
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, Time};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kdash_core::cloneset::{
    CloneSet, CloneSetCondition, CloneSetSpec, CloneSetStatus, UpdateStrategy, UpdateStrategyType, API_VERSION, KIND,
};
use kdash_core::project::workload_from_cloneset;
use kdash_core::{NamespaceInfo, WorkloadInfo};
use tracing::debug;

use crate::stream::{FrameSource, FrameStream};
use crate::transport::SNAPSHOT_ONLY_MARKER;
use crate::{ApiError, ApiResult, WorkloadApi};

pub struct SyntheticApi {
    clonesets: Vec<CloneSet>,
    namespaces: NamespaceInfo,
}

impl Default for SyntheticApi {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticApi {
    /// Built-in demo data: an in-place rollout midway (2 of 5 updated) and
    /// a paused Recreate rollout.
    pub fn new() -> Self {
        Self::with_clonesets(demo_clonesets())
    }

    pub fn with_clonesets(clonesets: Vec<CloneSet>) -> Self {
        Self {
            clonesets,
            namespaces: NamespaceInfo {
                namespace: "default".into(),
                available_namespaces: vec!["default".into(), "kruise-system".into()],
            },
        }
    }
}

#[async_trait::async_trait]
impl WorkloadApi for SyntheticApi {
    async fn list_workloads(&self, namespace: &str) -> ApiResult<Vec<WorkloadInfo>> {
        let now = Utc::now();
        let out: Vec<WorkloadInfo> = self
            .clonesets
            .iter()
            .filter(|cs| namespace.is_empty() || cs.metadata.namespace.as_deref() == Some(namespace))
            .map(|cs| workload_from_cloneset(cs, now))
            .collect();
        debug!(ns = %namespace, items = out.len(), "synthetic: list");
        Ok(out)
    }

    async fn namespace_info(&self) -> ApiResult<NamespaceInfo> {
        Ok(self.namespaces.clone())
    }

    fn watch_list_path(&self, _namespace: &str) -> String {
        format!("/{}", SNAPSHOT_ONLY_MARKER)
    }

    fn watch_one_path(&self, _namespace: &str, name: &str) -> String {
        format!("/{}/{}", SNAPSHOT_ONLY_MARKER, name)
    }
}

/// Frame source for providers without live streams. Never opened in
/// practice: their watch URLs classify as snapshot-only.
pub struct NoFrames;

#[async_trait::async_trait]
impl FrameSource for NoFrames {
    async fn open(&self, url: &str) -> ApiResult<FrameStream> {
        Err(ApiError::Stream(format!("no live stream for {}", url)))
    }
}

fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

struct Demo<'a> {
    name: &'a str,
    uid: &'a str,
    app: &'a str,
    replicas: i32,
    strategy: UpdateStrategy,
    container: (&'a str, &'a str),
    status: CloneSetStatus,
}

fn demo(d: Demo<'_>) -> CloneSet {
    let now = Time(Utc::now());
    let app = labels(&[("app", d.app)]);
    CloneSet {
        api_version: API_VERSION.into(),
        kind: KIND.into(),
        metadata: ObjectMeta {
            name: Some(d.name.into()),
            namespace: Some("default".into()),
            uid: Some(d.uid.into()),
            resource_version: Some("100".into()),
            generation: Some(1),
            creation_timestamp: Some(now),
            labels: Some(app.clone()),
            ..Default::default()
        },
        spec: CloneSetSpec {
            replicas: Some(d.replicas),
            selector: LabelSelector { match_labels: Some(app.clone()), ..Default::default() },
            update_strategy: d.strategy,
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta { labels: Some(app), ..Default::default() }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: d.container.0.into(),
                        image: Some(d.container.1.into()),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
        },
        status: Some(d.status),
    }
}

fn condition(type_: &str, reason: &str, message: &str) -> CloneSetCondition {
    CloneSetCondition {
        type_: type_.into(),
        status: "True".into(),
        last_transition_time: Some(Time(Utc::now())),
        reason: reason.into(),
        message: message.into(),
    }
}

fn demo_clonesets() -> Vec<CloneSet> {
    vec![
        demo(Demo {
            name: "demo-cloneset-inplace",
            uid: "123",
            app: "demo",
            replicas: 5,
            strategy: UpdateStrategy {
                type_: UpdateStrategyType::InPlaceIfPossible,
                partition: Some(IntOrString::Int(0)),
                max_unavailable: Some(IntOrString::String("20%".into())),
                ..Default::default()
            },
            container: ("nginx", "nginx:1.19.0"),
            status: CloneSetStatus {
                replicas: 5,
                ready_replicas: 5,
                available_replicas: 5,
                updated_replicas: 2,
                updated_ready_replicas: 2,
                observed_generation: 2,
                current_revision: "rev-old-hash".into(),
                update_revision: "rev-new-hash".into(),
                conditions: vec![condition("Available", "MinimumReplicasAvailable", "Deployment has minimum availability.")],
                ..Default::default()
            },
        }),
        demo(Demo {
            name: "demo-cloneset-paused",
            uid: "124",
            app: "demo-paused",
            replicas: 3,
            strategy: UpdateStrategy { type_: UpdateStrategyType::Recreate, paused: true, ..Default::default() },
            container: ("redis", "redis:6.0"),
            status: CloneSetStatus {
                replicas: 3,
                ready_replicas: 3,
                available_replicas: 3,
                observed_generation: 1,
                current_revision: "rev-v1".into(),
                update_revision: "rev-v2".into(),
                conditions: vec![condition("Paused", "PausedByUser", "Paused by user.")],
                ..Default::default()
            },
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{resolve, TransportMode};
    use kdash_core::Versioned;

    #[tokio::test]
    async fn lists_projected_demo_workloads() {
        let api = SyntheticApi::new();
        let items = api.list_workloads("default").await.expect("list");
        assert_eq!(items.len(), 2);
        let inplace = &items[0];
        assert_eq!(inplace.name(), "demo-cloneset-inplace");
        assert_eq!(inplace.ready, "5/5");
        assert_eq!(inplace.strategy, "InPlaceIfPossible");
        assert_eq!(inplace.replica_sets.len(), 2);
        assert_eq!(inplace.version(), Some("100"));
        assert_eq!(items[1].status, "Paused");
    }

    #[tokio::test]
    async fn filters_by_namespace() {
        let api = SyntheticApi::new();
        assert!(api.list_workloads("kruise-system").await.expect("list").is_empty());
        assert_eq!(api.list_workloads("").await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn namespace_context() {
        let ns = SyntheticApi::new().namespace_info().await.expect("ns");
        assert_eq!(ns.namespace, "default");
        assert_eq!(ns.available_namespaces, vec!["default", "kruise-system"]);
    }

    #[test]
    fn watch_paths_are_snapshot_only() {
        let api = SyntheticApi::new();
        assert_eq!(resolve("http://x", &api.watch_list_path("default")).mode, TransportMode::SnapshotOnly);
        assert_eq!(api.watch_one_path("default", "a"), "/mock-stream/a");
    }
}
