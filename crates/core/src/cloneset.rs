//! CloneSet (apps.kruise.io/v1alpha1) source record.

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::core::v1::PodTemplateSpec;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, Time};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::{Deserialize, Serialize};

pub const API_VERSION: &str = "apps.kruise.io/v1alpha1";
pub const KIND: &str = "CloneSet";
/// Label carried by pods (and revision entries) of a given template revision.
pub const REVISION_HASH_LABEL: &str = "apps.kruise.io/controller-revision-hash";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneSet {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: CloneSetSpec,
    #[serde(default)]
    pub status: Option<CloneSetStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CloneSetSpec {
    pub replicas: Option<i32>,
    pub selector: LabelSelector,
    pub update_strategy: UpdateStrategy,
    pub template: PodTemplateSpec,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateStrategyType {
    #[default]
    #[serde(alias = "ReCreate")]
    Recreate,
    InPlaceIfPossible,
    InPlaceOnly,
}

impl UpdateStrategyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateStrategyType::Recreate => "Recreate",
            UpdateStrategyType::InPlaceIfPossible => "InPlaceIfPossible",
            UpdateStrategyType::InPlaceOnly => "InPlaceOnly",
        }
    }
}

impl fmt::Display for UpdateStrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateStrategy {
    #[serde(rename = "type")]
    pub type_: UpdateStrategyType,
    pub partition: Option<IntOrString>,
    pub max_unavailable: Option<IntOrString>,
    pub max_surge: Option<IntOrString>,
    pub paused: bool,
    pub priority_strategy: Option<PriorityStrategy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriorityStrategy {
    pub weight_priority: Vec<WeightPriority>,
    pub order_priority: Vec<OrderPriority>,
    pub scatter_strategy: Vec<ScatterTerm>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeightPriority {
    #[serde(alias = "weight")]
    pub value: i32,
    pub match_selector: LabelSelector,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderPriority {
    pub ordered_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterTerm {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CloneSetStatus {
    pub replicas: i32,
    pub ready_replicas: i32,
    pub available_replicas: i32,
    pub updated_replicas: i32,
    pub updated_ready_replicas: i32,
    pub start_schedule_time: Option<Time>,
    pub observed_generation: i64,
    pub current_revision: String,
    pub update_revision: String,
    pub collision_count: Option<i32>,
    pub conditions: Vec<CloneSetCondition>,
    pub label_selector: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CloneSetCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    pub last_transition_time: Option<Time>,
    pub reason: String,
    pub message: String,
}

impl CloneSet {
    pub fn labels(&self) -> BTreeMap<String, String> {
        self.metadata.labels.clone().unwrap_or_default()
    }

    /// `(name, image)` for every container in the pod template.
    pub fn containers(&self) -> Vec<(String, String)> {
        self.spec
            .template
            .spec
            .as_ref()
            .map(|ps| {
                ps.containers
                    .iter()
                    .map(|c| (c.name.clone(), c.image.clone().unwrap_or_default()))
                    .collect()
            })
            .unwrap_or_default()
    }
}
