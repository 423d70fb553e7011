//! Bounded waits on reconciled quota status.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use pkg_constants::quota::{QUOTA_WAIT_POLL_MILLIS, QUOTA_WAIT_TIMEOUT_SECS};
use pkg_types::{ResourceList, ResourceQuota};

use crate::error::QuotaError;
use crate::resources::first_mismatch;
use crate::store::QuotaStore;

#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(QUOTA_WAIT_POLL_MILLIS),
            timeout: Duration::from_secs(QUOTA_WAIT_TIMEOUT_SECS),
        }
    }
}

/// Poll until every entry of `expected` appears in the quota's `status.used`.
///
/// Entries of `used` not named in `expected` are not compared. A quota that
/// has not been reconciled yet keeps the wait going; a missing quota ends it.
pub async fn wait_for_quota_usage(
    quotas: &QuotaStore,
    namespace: &str,
    name: &str,
    expected: &ResourceList,
    options: WaitOptions,
    cancel: &CancellationToken,
) -> Result<ResourceQuota, QuotaError> {
    let deadline = Instant::now() + options.timeout;
    loop {
        let quota = quotas.get(namespace, name).await?;
        let detail = match &quota.status.used {
            Some(used) => match first_mismatch(used, expected) {
                None => return Ok(quota),
                Some(mismatch) => mismatch,
            },
            None => "usage not yet computed".to_string(),
        };
        debug!("Quota {}/{} not settled: {}", namespace, name, detail);

        if Instant::now() >= deadline {
            return Err(QuotaError::WaitTimeout {
                namespace: namespace.to_string(),
                name: name.to_string(),
                timeout: options.timeout,
                detail,
            });
        }
        let next = (Instant::now() + options.poll_interval).min(deadline);
        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(QuotaError::Cancelled {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                });
            }
            _ = tokio::time::sleep_until(next) => {}
        }
    }
}
