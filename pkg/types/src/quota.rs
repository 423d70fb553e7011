use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::object::ObjectMeta;
use crate::quantity::{Quantity, QuantityError};

/// Resource name → quantity, e.g. `{"requests.cpu": 500m, "pods": 3}`.
pub type ResourceList = BTreeMap<String, Quantity>;

/// Predicate a quota can restrict itself to. Scopes form two complementary pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuotaScope {
    /// Objects with a finite lifetime bound (`active_deadline_seconds`).
    Terminating,
    NotTerminating,
    /// Objects with no compute requests or limits.
    BestEffort,
    NotBestEffort,
}

impl std::fmt::Display for QuotaScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuotaScope::Terminating => write!(f, "Terminating"),
            QuotaScope::NotTerminating => write!(f, "NotTerminating"),
            QuotaScope::BestEffort => write!(f, "BestEffort"),
            QuotaScope::NotBestEffort => write!(f, "NotBestEffort"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceQuotaSpec {
    /// Declared ceilings per resource name.
    pub hard: ResourceList,
    /// Filters applied to every tracked object; empty matches everything.
    #[serde(default)]
    pub scopes: BTreeSet<QuotaScope>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceQuotaStatus {
    /// Mirror of `spec.hard` as last observed by the quota controller.
    #[serde(default)]
    pub hard: ResourceList,
    /// Reconciled usage. `None` until the quota controller has computed it.
    #[serde(default)]
    pub used: Option<ResourceList>,
}

/// Resource quota for a namespace: hard ceilings plus reconciled usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceQuota {
    #[serde(flatten)]
    pub meta: ObjectMeta,
    pub spec: ResourceQuotaSpec,
    #[serde(default)]
    pub status: ResourceQuotaStatus,
}

impl ResourceQuota {
    pub fn new(namespace: &str, name: &str, hard: ResourceList) -> Self {
        Self {
            meta: ObjectMeta::new(namespace, name),
            spec: ResourceQuotaSpec {
                hard,
                scopes: BTreeSet::new(),
            },
            status: ResourceQuotaStatus::default(),
        }
    }

    pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = QuotaScope>) -> Self {
        self.spec.scopes = scopes.into_iter().collect();
        self
    }

    /// Whether the quota controller has computed usage yet.
    pub fn is_reconciled(&self) -> bool {
        self.status.used.is_some()
    }
}

/// Build a ResourceList from textual quantities, e.g. `[("cpu", "500m")]`.
pub fn parse_resource_list(pairs: &[(&str, &str)]) -> Result<ResourceList, QuantityError> {
    pairs
        .iter()
        .map(|(name, value)| Ok((name.to_string(), value.parse()?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_json_distinguishes_absent_usage_from_zero() {
        let json = r#"{
            "name": "compute",
            "namespace": "team-a",
            "spec": { "hard": { "cpu": "500m", "memory": "252Mi" } }
        }"#;
        let quota: ResourceQuota = serde_json::from_str(json).unwrap();
        assert_eq!(quota.meta.name, "compute");
        assert!(quota.spec.scopes.is_empty());
        assert!(!quota.is_reconciled());
        assert_eq!(quota.spec.hard["memory"].to_string(), "252Mi");

        let mut reconciled = quota.clone();
        reconciled.status.used = Some(ResourceList::new());
        assert!(reconciled.is_reconciled());
    }

    #[test]
    fn malformed_hard_quantity_fails_to_parse() {
        let json = r#"{"name": "q", "spec": {"hard": {"cpu": "lots"}}}"#;
        assert!(serde_json::from_str::<ResourceQuota>(json).is_err());
        assert!(parse_resource_list(&[("cpu", "1x")]).is_err());
    }

    #[test]
    fn scopes_deserialize_as_a_set() {
        let json = r#"{"name": "q", "spec": {"hard": {"pods": 5},
            "scopes": ["Terminating", "BestEffort", "Terminating"]}}"#;
        let quota: ResourceQuota = serde_json::from_str(json).unwrap();
        assert_eq!(quota.spec.scopes.len(), 2);
        assert!(quota.spec.scopes.contains(&QuotaScope::Terminating));
        assert_eq!(quota.spec.hard["pods"], Quantity::from_int(5));
    }
}
