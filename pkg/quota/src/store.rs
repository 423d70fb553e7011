use pkg_state::client::StateStore;
use pkg_state::lister::Lister;
use pkg_types::quota::ResourceQuotaStatus;
use pkg_types::{ResourceKind, ResourceQuota};
use tracing::debug;

use crate::error::QuotaError;

/// Namespace-indexed access to quota objects.
///
/// Admission reads through it; the quota controller writes status back
/// through [`QuotaStore::update_status`].
#[derive(Clone)]
pub struct QuotaStore {
    store: StateStore,
    lister: Lister<ResourceQuota>,
}

impl QuotaStore {
    pub fn new(store: StateStore) -> Self {
        Self {
            lister: Lister::new(store.clone()),
            store,
        }
    }

    /// All quotas in `namespace`, in no particular order.
    pub async fn list(&self, namespace: &str) -> Result<Vec<ResourceQuota>, QuotaError> {
        Ok(self.lister.list_all(namespace).await?)
    }

    pub async fn get(&self, namespace: &str, name: &str) -> Result<ResourceQuota, QuotaError> {
        self.lister
            .get(namespace, name)
            .await?
            .ok_or_else(|| QuotaError::not_found(ResourceKind::ResourceQuota, namespace, name))
    }

    /// Replace the status of a quota, leaving its spec untouched.
    ///
    /// Runs under the quota's key lock, so it cannot interleave with an API
    /// update or delete of the same quota. Returns `Ok(false)` without writing
    /// when the quota is being deleted, when its Hard no longer matches
    /// `status.hard`, or when the stored status is already `status`.
    pub async fn update_status(
        &self,
        namespace: &str,
        name: &str,
        status: ResourceQuotaStatus,
    ) -> Result<bool, QuotaError> {
        let guard = self
            .store
            .lock(&ResourceKind::ResourceQuota.key(namespace, name))
            .await;
        let Some(data) = guard.get().await? else {
            return Err(QuotaError::not_found(
                ResourceKind::ResourceQuota,
                namespace,
                name,
            ));
        };
        let mut quota: ResourceQuota =
            serde_json::from_slice(&data).map_err(anyhow::Error::from)?;

        if quota.meta.is_deleting() || quota.spec.hard != status.hard {
            debug!("Quota {}/{} changed before status write", namespace, name);
            return Ok(false);
        }
        if quota.status == status {
            return Ok(false);
        }

        quota.status = status;
        guard.put_json(&quota).await?;
        Ok(true)
    }
}
