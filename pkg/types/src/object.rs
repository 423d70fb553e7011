use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::configmap::ConfigMap;
use crate::pod::{ContainerSpec, Pod};
use crate::quota::ResourceQuota;
use crate::replicaset::ReplicaSet;
use crate::secret::Secret;
use crate::service::Service;
use crate::volume::PersistentVolumeClaim;
use pkg_constants::state::REGISTRY_PREFIX;

/// Metadata shared by every namespaced object. Flattened into the object's JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Set once deletion has been requested; the object no longer counts as live.
    #[serde(default)]
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            created_at: Utc::now(),
            ..Default::default()
        }
    }

    pub fn is_deleting(&self) -> bool {
        self.deletion_timestamp.is_some()
    }
}

/// Every object kind the quota engine tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Pod,
    Service,
    Secret,
    ConfigMap,
    ReplicaSet,
    PersistentVolumeClaim,
    ResourceQuota,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Pod,
        ResourceKind::Service,
        ResourceKind::Secret,
        ResourceKind::ConfigMap,
        ResourceKind::ReplicaSet,
        ResourceKind::PersistentVolumeClaim,
        ResourceKind::ResourceQuota,
    ];

    /// Plural name used in registry keys and API paths.
    pub fn plural(self) -> &'static str {
        match self {
            ResourceKind::Pod => "pods",
            ResourceKind::Service => "services",
            ResourceKind::Secret => "secrets",
            ResourceKind::ConfigMap => "configmaps",
            ResourceKind::ReplicaSet => "replicasets",
            ResourceKind::PersistentVolumeClaim => "persistentvolumeclaims",
            ResourceKind::ResourceQuota => "resourcequotas",
        }
    }

    pub fn from_plural(plural: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.plural() == plural)
    }

    /// Key prefix holding every object of this kind in `namespace`.
    pub fn prefix(self, namespace: &str) -> String {
        format!("{}{}/{}/", REGISTRY_PREFIX, self.plural(), namespace)
    }

    pub fn key(self, namespace: &str, name: &str) -> String {
        format!("{}{}", self.prefix(namespace), name)
    }

    /// Split `/registry/{plural}/{namespace}/{name}` into its parts.
    pub fn parse_key(key: &str) -> Option<(ResourceKind, &str, &str)> {
        let rest = key.strip_prefix(REGISTRY_PREFIX)?;
        let mut parts = rest.splitn(3, '/');
        let kind = Self::from_plural(parts.next()?)?;
        let namespace = parts.next().filter(|s| !s.is_empty())?;
        let name = parts.next().filter(|s| !s.is_empty())?;
        Some((kind, namespace, name))
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Pod => write!(f, "Pod"),
            ResourceKind::Service => write!(f, "Service"),
            ResourceKind::Secret => write!(f, "Secret"),
            ResourceKind::ConfigMap => write!(f, "ConfigMap"),
            ResourceKind::ReplicaSet => write!(f, "ReplicaSet"),
            ResourceKind::PersistentVolumeClaim => write!(f, "PersistentVolumeClaim"),
            ResourceKind::ResourceQuota => write!(f, "ResourceQuota"),
        }
    }
}

/// A namespaced object stored under `/registry/{plural}/{namespace}/{name}`.
pub trait Object: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: ResourceKind;

    fn meta(&self) -> &ObjectMeta;

    fn meta_mut(&mut self) -> &mut ObjectMeta;

    fn into_tracked(self) -> TrackedObject;

    fn key(&self) -> String {
        Self::KIND.key(&self.meta().namespace, &self.meta().name)
    }
}

macro_rules! impl_object {
    ($ty:ty, $kind:ident) => {
        impl Object for $ty {
            const KIND: ResourceKind = ResourceKind::$kind;

            fn meta(&self) -> &ObjectMeta {
                &self.meta
            }

            fn meta_mut(&mut self) -> &mut ObjectMeta {
                &mut self.meta
            }

            fn into_tracked(self) -> TrackedObject {
                TrackedObject::$kind(self)
            }
        }
    };
}

impl_object!(Pod, Pod);
impl_object!(Service, Service);
impl_object!(Secret, Secret);
impl_object!(ConfigMap, ConfigMap);
impl_object!(ReplicaSet, ReplicaSet);
impl_object!(PersistentVolumeClaim, PersistentVolumeClaim);
impl_object!(ResourceQuota, ResourceQuota);

/// Any instance of a tracked kind, as seen by the evaluator and scope matcher.
#[derive(Debug, Clone)]
pub enum TrackedObject {
    Pod(Pod),
    Service(Service),
    Secret(Secret),
    ConfigMap(ConfigMap),
    ReplicaSet(ReplicaSet),
    PersistentVolumeClaim(PersistentVolumeClaim),
    ResourceQuota(ResourceQuota),
}

impl TrackedObject {
    pub fn kind(&self) -> ResourceKind {
        match self {
            TrackedObject::Pod(_) => ResourceKind::Pod,
            TrackedObject::Service(_) => ResourceKind::Service,
            TrackedObject::Secret(_) => ResourceKind::Secret,
            TrackedObject::ConfigMap(_) => ResourceKind::ConfigMap,
            TrackedObject::ReplicaSet(_) => ResourceKind::ReplicaSet,
            TrackedObject::PersistentVolumeClaim(_) => ResourceKind::PersistentVolumeClaim,
            TrackedObject::ResourceQuota(_) => ResourceKind::ResourceQuota,
        }
    }

    pub fn meta(&self) -> &ObjectMeta {
        match self {
            TrackedObject::Pod(o) => &o.meta,
            TrackedObject::Service(o) => &o.meta,
            TrackedObject::Secret(o) => &o.meta,
            TrackedObject::ConfigMap(o) => &o.meta,
            TrackedObject::ReplicaSet(o) => &o.meta,
            TrackedObject::PersistentVolumeClaim(o) => &o.meta,
            TrackedObject::ResourceQuota(o) => &o.meta,
        }
    }

    pub fn name(&self) -> &str {
        &self.meta().name
    }

    pub fn namespace(&self) -> &str {
        &self.meta().namespace
    }

    /// Compute units (containers) of the object; empty for kinds that run nothing.
    pub fn containers(&self) -> &[ContainerSpec] {
        match self {
            TrackedObject::Pod(pod) => &pod.spec.containers,
            _ => &[],
        }
    }

    /// Finite lifetime bound, if the object declares one.
    pub fn active_deadline_seconds(&self) -> Option<i64> {
        match self {
            TrackedObject::Pod(pod) => pod.spec.active_deadline_seconds,
            _ => None,
        }
    }
}
