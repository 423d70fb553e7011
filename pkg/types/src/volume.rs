use serde::{Deserialize, Serialize};

use crate::object::ObjectMeta;
use crate::quota::ResourceList;

// --- Persistent Volume Claims ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccessMode {
    ReadWriteOnce,
    ReadOnlyMany,
    ReadWriteMany,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PVCPhase {
    #[default]
    Pending,
    Bound,
    Lost,
}

impl std::fmt::Display for PVCPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PVCPhase::Pending => write!(f, "Pending"),
            PVCPhase::Bound => write!(f, "Bound"),
            PVCPhase::Lost => write!(f, "Lost"),
        }
    }
}

/// Persistent Volume Claim: a request for storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistentVolumeClaim {
    #[serde(flatten)]
    pub meta: ObjectMeta,
    /// Storage class name (e.g. "default", "fast-ssd")
    #[serde(default)]
    pub storage_class: Option<String>,
    #[serde(default)]
    pub access_modes: Vec<AccessMode>,
    /// Requested resources, keyed by `storage` (e.g. `storage: 1Gi`).
    #[serde(default)]
    pub requests: ResourceList,
    #[serde(default)]
    pub phase: PVCPhase,
}
