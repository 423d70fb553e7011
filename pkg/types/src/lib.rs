//! Object model of the k3rs quota engine: quantities, quotas and the tracked kinds.

pub mod config;
pub mod configmap;
pub mod namespace;
pub mod object;
pub mod pod;
pub mod quantity;
pub mod quota;
pub mod replicaset;
pub mod secret;
pub mod selector;
pub mod service;
pub mod validate;
pub mod volume;

pub use object::{Object, ObjectMeta, ResourceKind, TrackedObject};
pub use quantity::{Quantity, QuantityError};
pub use quota::{QuotaScope, ResourceList, ResourceQuota};
