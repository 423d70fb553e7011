use std::collections::BTreeSet;
use std::marker::PhantomData;
use tracing::warn;

use crate::client::StateStore;
use pkg_constants::state::REGISTRY_PREFIX;
use pkg_types::configmap::ConfigMap;
use pkg_types::pod::Pod;
use pkg_types::quota::ResourceQuota;
use pkg_types::replicaset::ReplicaSet;
use pkg_types::secret::Secret;
use pkg_types::service::Service;
use pkg_types::volume::PersistentVolumeClaim;
use pkg_types::{Object, ResourceKind, TrackedObject};

/// Typed read-through view over the objects of one kind.
///
/// Reads go straight to the state store; the lister adds decoding and
/// namespace scoping, nothing else.
pub struct Lister<T> {
    store: StateStore,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Clone for Lister<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _kind: PhantomData,
        }
    }
}

impl<T: Object> Lister<T> {
    pub fn new(store: StateStore) -> Self {
        Self {
            store,
            _kind: PhantomData,
        }
    }

    /// Objects in `namespace` accepted by `predicate`.
    pub async fn list<F>(&self, namespace: &str, predicate: F) -> anyhow::Result<Vec<T>>
    where
        F: Fn(&T) -> bool,
    {
        let entries = self.store.list_prefix(&T::KIND.prefix(namespace)).await?;
        Ok(entries
            .into_iter()
            .filter_map(|(key, value)| match serde_json::from_slice::<T>(&value) {
                Ok(object) => Some(object),
                Err(e) => {
                    warn!("Skipping undecodable {} at {}: {}", T::KIND, key, e);
                    None
                }
            })
            .filter(|object| predicate(object))
            .collect())
    }

    pub async fn list_all(&self, namespace: &str) -> anyhow::Result<Vec<T>> {
        self.list(namespace, |_| true).await
    }

    pub async fn get(&self, namespace: &str, name: &str) -> anyhow::Result<Option<T>> {
        match self.store.get(&T::KIND.key(namespace, name)).await? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }
}

async fn list_as_tracked<T: Object>(
    store: &StateStore,
    namespace: &str,
) -> anyhow::Result<Vec<TrackedObject>> {
    let objects = Lister::<T>::new(store.clone()).list_all(namespace).await?;
    Ok(objects.into_iter().map(Object::into_tracked).collect())
}

/// Every object of `kind` in `namespace`.
pub async fn list_tracked(
    store: &StateStore,
    kind: ResourceKind,
    namespace: &str,
) -> anyhow::Result<Vec<TrackedObject>> {
    match kind {
        ResourceKind::Pod => list_as_tracked::<Pod>(store, namespace).await,
        ResourceKind::Service => list_as_tracked::<Service>(store, namespace).await,
        ResourceKind::Secret => list_as_tracked::<Secret>(store, namespace).await,
        ResourceKind::ConfigMap => list_as_tracked::<ConfigMap>(store, namespace).await,
        ResourceKind::ReplicaSet => list_as_tracked::<ReplicaSet>(store, namespace).await,
        ResourceKind::PersistentVolumeClaim => {
            list_as_tracked::<PersistentVolumeClaim>(store, namespace).await
        }
        ResourceKind::ResourceQuota => list_as_tracked::<ResourceQuota>(store, namespace).await,
    }
}

/// Namespaces holding at least one object of `kind`.
pub async fn namespaces_with(
    store: &StateStore,
    kind: ResourceKind,
) -> anyhow::Result<BTreeSet<String>> {
    let prefix = format!("{}{}/", REGISTRY_PREFIX, kind.plural());
    let entries = store.list_prefix(&prefix).await?;
    Ok(entries
        .iter()
        .filter_map(|(key, _)| ResourceKind::parse_key(key))
        .map(|(_, namespace, _)| namespace.to_string())
        .collect())
}
