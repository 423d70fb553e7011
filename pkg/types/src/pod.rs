use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::object::ObjectMeta;
use crate::quota::ResourceList;

// --- Resource requirements ---

/// Compute resources of a single container, e.g. `requests: {cpu: 500m, memory: 252Mi}`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ResourceRequirements {
    /// Amount guaranteed to the container.
    #[serde(default)]
    pub requests: ResourceList,
    /// Ceiling the container may not exceed.
    #[serde(default)]
    pub limits: ResourceList,
}

// --- Container spec ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub resources: ResourceRequirements,
}

// --- Pod status ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PodStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodStatus {
    /// Terminal pods no longer hold resources.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PodStatus::Succeeded | PodStatus::Failed)
    }
}

impl std::fmt::Display for PodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PodStatus::Pending => write!(f, "Pending"),
            PodStatus::Running => write!(f, "Running"),
            PodStatus::Succeeded => write!(f, "Succeeded"),
            PodStatus::Failed => write!(f, "Failed"),
            PodStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

// --- Pod spec ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PodSpec {
    pub containers: Vec<ContainerSpec>,
    /// Seconds the pod may run before it is terminated. `Some` marks the pod as terminating.
    #[serde(default)]
    pub active_deadline_seconds: Option<i64>,
    #[serde(default)]
    pub node_affinity: HashMap<String, String>,
}

// --- Pod ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pod {
    #[serde(flatten)]
    pub meta: ObjectMeta,
    pub spec: PodSpec,
    #[serde(default)]
    pub status: PodStatus,
    /// The node this pod is assigned to
    #[serde(default)]
    pub node_name: Option<String>,
    /// Owner reference (e.g. ReplicaSet that created this pod)
    #[serde(default)]
    pub owner_ref: Option<String>,
}
