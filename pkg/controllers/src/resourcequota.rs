use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{Semaphore, broadcast};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use pkg_constants::quota::{QUOTA_RESYNC_INTERVAL_SECS, QUOTA_SYNC_WORKERS};
use pkg_quota::evaluator::{evaluate, kinds_for};
use pkg_quota::resources::{add, mask, zeros};
use pkg_quota::scope::matches_all;
use pkg_quota::{QuotaError, QuotaStore};
use pkg_state::client::StateStore;
use pkg_state::lister::{list_tracked, namespaces_with};
use pkg_state::watch::WatchEvent;
use pkg_types::quota::ResourceQuotaStatus;
use pkg_types::{ResourceKind, ResourceList, ResourceQuota, TrackedObject};

#[derive(Debug, Clone, Copy)]
pub struct QuotaControllerConfig {
    /// Period of the full resync sweep.
    pub resync_interval: Duration,
    /// Namespaces synced concurrently.
    pub workers: usize,
}

impl Default for QuotaControllerConfig {
    fn default() -> Self {
        Self {
            resync_interval: Duration::from_secs(QUOTA_RESYNC_INTERVAL_SECS),
            workers: QUOTA_SYNC_WORKERS,
        }
    }
}

/// Controller that keeps `status.used` of every ResourceQuota in line with
/// the live objects of its namespace.
///
/// Usage is always recomputed from scratch, never adjusted incrementally, so
/// a missed event is corrected by the next pass. State events resync the
/// affected namespace; the periodic sweep resyncs every namespace that holds
/// a quota.
#[derive(Clone)]
pub struct ResourceQuotaController {
    store: StateStore,
    quotas: QuotaStore,
    config: QuotaControllerConfig,
}

impl ResourceQuotaController {
    pub fn new(store: StateStore, config: QuotaControllerConfig) -> Self {
        Self {
            quotas: QuotaStore::new(store.clone()),
            store,
            config,
        }
    }

    /// Start the controller loop as a background task.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "ResourceQuotaController started (resync={}s, workers={})",
                self.config.resync_interval.as_secs(),
                self.config.workers
            );
            let mut event_rx = self.store.event_log.subscribe();
            let mut interval = tokio::time::interval(self.config.resync_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = self.resync().await {
                            warn!("ResourceQuotaController resync error: {}", e);
                        }
                    }
                    result = event_rx.recv() => match collect_events(result, &mut event_rx) {
                        Trigger::Namespaces(dirty) => {
                            if !dirty.is_empty() {
                                self.sync_namespaces(dirty).await;
                            }
                        }
                        Trigger::Resync => {
                            if let Err(e) = self.resync().await {
                                warn!("ResourceQuotaController resync error: {}", e);
                            }
                            interval.reset();
                        }
                        Trigger::Stop => break,
                    },
                }
            }
            info!("ResourceQuotaController stopped");
        })
    }

    /// Full sweep over every namespace holding a quota.
    pub async fn resync(&self) -> anyhow::Result<()> {
        let namespaces = namespaces_with(&self.store, ResourceKind::ResourceQuota).await?;
        debug!("Resyncing quotas in {} namespace(s)", namespaces.len());
        self.sync_namespaces(namespaces).await;
        Ok(())
    }

    async fn sync_namespaces(&self, namespaces: BTreeSet<String>) {
        let permits = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let mut tasks = JoinSet::new();
        for namespace in namespaces {
            let controller = self.clone();
            let permits = permits.clone();
            tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                if let Err(e) = controller.sync_namespace(&namespace).await {
                    warn!("Failed to sync quotas in namespace {}: {}", namespace, e);
                }
            });
        }
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                warn!("Quota sync task failed: {}", e);
            }
        }
    }

    /// Recompute every quota in `namespace`. Returns how many statuses changed.
    pub async fn sync_namespace(&self, namespace: &str) -> anyhow::Result<usize> {
        let quotas: Vec<ResourceQuota> = self
            .quotas
            .list(namespace)
            .await?
            .into_iter()
            .filter(|q| !q.meta.is_deleting())
            .collect();
        if quotas.is_empty() {
            return Ok(0);
        }

        // List each needed kind once for all quotas of the namespace
        let kinds: BTreeSet<ResourceKind> = quotas
            .iter()
            .flat_map(|q| kinds_for(q.spec.hard.keys()))
            .collect();
        let mut objects: HashMap<ResourceKind, Vec<TrackedObject>> = HashMap::new();
        for kind in kinds {
            objects.insert(kind, list_tracked(&self.store, kind, namespace).await?);
        }

        let mut updated = 0;
        for quota in &quotas {
            let relevant: Vec<TrackedObject> = kinds_for(quota.spec.hard.keys())
                .into_iter()
                .filter_map(|kind| objects.get(&kind))
                .flatten()
                .cloned()
                .collect();
            if self.sync_quota(quota, &relevant).await? {
                updated += 1;
            }
        }
        Ok(updated)
    }

    /// Write the recomputed status of `quota` if it changed.
    ///
    /// The write goes through [`QuotaStore::update_status`], which re-reads
    /// the quota under its key lock; if it was deleted or its Hard changed in
    /// the meantime, nothing is written and the next pass recomputes against
    /// the new definition.
    pub async fn sync_quota(
        &self,
        quota: &ResourceQuota,
        objects: &[TrackedObject],
    ) -> anyhow::Result<bool> {
        let status = ResourceQuotaStatus {
            hard: quota.spec.hard.clone(),
            used: Some(calculate_usage(quota, objects)),
        };
        if quota.status == status {
            return Ok(false);
        }

        let namespace = &quota.meta.namespace;
        let name = &quota.meta.name;
        let summary = format_list(status.used.as_ref().unwrap_or(&ResourceList::new()));
        match self.quotas.update_status(namespace, name, status).await {
            Ok(true) => {
                info!("Quota {}/{} used: {}", namespace, name, summary);
                Ok(true)
            }
            Ok(false) => {
                debug!("Quota {}/{} changed during sync, deferring", namespace, name);
                Ok(false)
            }
            Err(QuotaError::NotFound { .. }) => {
                debug!("Quota {}/{} vanished during sync", namespace, name);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Usage of `quota` over `objects`: every hard resource starts at zero and
/// accumulates the contribution of each object matching all scopes.
pub fn calculate_usage(quota: &ResourceQuota, objects: &[TrackedObject]) -> ResourceList {
    objects
        .iter()
        .filter(|object| matches_all(&quota.spec.scopes, object))
        .fold(zeros(quota.spec.hard.keys()), |used, object| {
            add(&used, &mask(&evaluate(object), quota.spec.hard.keys()))
        })
}

/// What a batch of state events asks the controller to do.
#[derive(Debug, PartialEq, Eq)]
enum Trigger {
    /// Resync these namespaces.
    Namespaces(BTreeSet<String>),
    /// Events were dropped; only a full sweep is safe.
    Resync,
    Stop,
}

/// Fold `first` and every event already queued behind it into one trigger.
fn collect_events(
    first: Result<WatchEvent, RecvError>,
    event_rx: &mut broadcast::Receiver<WatchEvent>,
) -> Trigger {
    let mut dirty = BTreeSet::new();
    let mut lagged = false;
    match first {
        Ok(event) => dirty.extend(namespace_of(&event.key)),
        Err(RecvError::Lagged(n)) => {
            debug!("ResourceQuotaController lagged by {} events", n);
            lagged = true;
        }
        Err(RecvError::Closed) => return Trigger::Stop,
    }
    loop {
        match event_rx.try_recv() {
            Ok(event) => dirty.extend(namespace_of(&event.key)),
            Err(TryRecvError::Lagged(_)) => lagged = true,
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    if lagged {
        Trigger::Resync
    } else {
        Trigger::Namespaces(dirty)
    }
}

fn namespace_of(key: &str) -> Option<String> {
    ResourceKind::parse_key(key).map(|(_, namespace, _)| namespace.to_string())
}

fn format_list(list: &ResourceList) -> String {
    list.iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(",")
}
