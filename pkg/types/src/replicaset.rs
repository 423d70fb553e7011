use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::object::ObjectMeta;
use crate::pod::PodSpec;

// --- ReplicaSet status ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplicaSetStatus {
    pub replicas: u32,
    pub ready_replicas: u32,
}

// --- ReplicaSet spec ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicaSetSpec {
    pub replicas: u32,
    #[serde(default)]
    pub selector: HashMap<String, String>,
    pub template: PodSpec,
}

// --- ReplicaSet ---

/// Replica controller. Counted against the `replicasets` quota; the pods it
/// would create are admitted and counted on their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicaSet {
    #[serde(flatten)]
    pub meta: ObjectMeta,
    pub spec: ReplicaSetSpec,
    #[serde(default)]
    pub status: ReplicaSetStatus,
}
