//! Namespaced CRUD for every tracked kind. Creates and updates pass through
//! quota admission before they reach the state store.

use axum::{
    Json,
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::ApiJson;
use pkg_quota::{Operation, QuotaError};
use pkg_state::client::KeyGuard;
use pkg_state::lister::Lister;
use pkg_types::configmap::ConfigMap;
use pkg_types::pod::Pod;
use pkg_types::replicaset::ReplicaSet;
use pkg_types::secret::Secret;
use pkg_types::selector::LabelSelector;
use pkg_types::service::Service;
use pkg_types::validate::{validate_claim, validate_meta, validate_pod, validate_quota};
use pkg_types::volume::PersistentVolumeClaim;
use pkg_types::{Object, ResourceQuota};

/// Per-kind hooks applied by the generic handlers.
pub trait ApiObject: Object {
    fn validate(&self) -> anyhow::Result<()> {
        validate_meta(self.meta())
    }

    /// Reset server-owned fields of a newly submitted object.
    fn on_create(&mut self) {}

    /// Carry server-owned fields over from the stored version.
    fn on_update(&mut self, _old: &Self) {}
}

impl ApiObject for Pod {
    fn validate(&self) -> anyhow::Result<()> {
        validate_pod(self)
    }

    fn on_create(&mut self) {
        self.status = Default::default();
        self.node_name = None;
    }

    fn on_update(&mut self, old: &Self) {
        self.node_name.clone_from(&old.node_name);
    }
}

impl ApiObject for Service {}

impl ApiObject for Secret {}

impl ApiObject for ConfigMap {}

impl ApiObject for ReplicaSet {
    fn on_update(&mut self, old: &Self) {
        self.status = old.status.clone();
    }
}

impl ApiObject for PersistentVolumeClaim {
    fn validate(&self) -> anyhow::Result<()> {
        validate_claim(self)
    }

    fn on_create(&mut self) {
        self.phase = Default::default();
    }

    fn on_update(&mut self, old: &Self) {
        self.phase = old.phase.clone();
    }
}

impl ApiObject for ResourceQuota {
    fn validate(&self) -> anyhow::Result<()> {
        validate_quota(self)
    }

    /// Usage is unknown until the quota controller has computed it.
    fn on_create(&mut self) {
        self.status = Default::default();
    }

    fn on_update(&mut self, old: &Self) {
        self.status = old.status.clone();
    }
}

/// Query parameters for listing resources.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default, rename = "labelSelector")]
    pub label_selector: Option<String>,
}

fn invalid<T: Object>(err: anyhow::Error) -> ApiError {
    ApiError(QuotaError::Invalid {
        kind: T::KIND,
        message: err.to_string(),
    })
}

async fn load<T: Object>(state: &AppState, ns: &str, name: &str) -> Result<T, ApiError> {
    Lister::<T>::new(state.store.clone())
        .get(ns, name)
        .await?
        .ok_or_else(|| ApiError(QuotaError::not_found(T::KIND, ns, name)))
}

/// Read the object behind a held key lock.
async fn load_locked<T: Object>(guard: &KeyGuard, ns: &str, name: &str) -> Result<T, ApiError> {
    let data = guard
        .get()
        .await?
        .ok_or_else(|| ApiError(QuotaError::not_found(T::KIND, ns, name)))?;
    Ok(serde_json::from_slice(&data).map_err(anyhow::Error::from)?)
}

pub async fn create<T: ApiObject>(
    State(state): State<AppState>,
    AxumPath(ns): AxumPath<String>,
    ApiJson(mut object): ApiJson<T>,
) -> Result<(StatusCode, Json<T>), ApiError> {
    {
        let meta = object.meta_mut();
        meta.id = Uuid::new_v4().to_string();
        meta.namespace = ns.clone();
        meta.created_at = Utc::now();
        meta.deletion_timestamp = None;
    }
    object.on_create();
    object.validate().map_err(invalid::<T>)?;

    let guard = state.store.lock(&object.key()).await;
    if guard.get().await?.is_some() {
        return Err(ApiError(QuotaError::AlreadyExists {
            kind: T::KIND,
            namespace: ns,
            name: object.meta().name.clone(),
        }));
    }
    state
        .admission
        .admit(Operation::Create, &object.clone().into_tracked(), None)
        .await?;
    guard.put_json(&object).await?;

    info!("Created {} {}/{}", T::KIND, ns, object.meta().name);
    Ok((StatusCode::CREATED, Json(object)))
}

pub async fn list<T: ApiObject>(
    State(state): State<AppState>,
    AxumPath(ns): AxumPath<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<T>>, ApiError> {
    let selector = LabelSelector::parse(query.label_selector.as_deref().unwrap_or_default())
        .map_err(invalid::<T>)?;
    let objects = Lister::<T>::new(state.store.clone())
        .list(&ns, |o| selector.matches(&o.meta().labels))
        .await?;
    Ok(Json(objects))
}

pub async fn get<T: ApiObject>(
    State(state): State<AppState>,
    AxumPath((ns, name)): AxumPath<(String, String)>,
) -> Result<Json<T>, ApiError> {
    Ok(Json(load::<T>(&state, &ns, &name).await?))
}

pub async fn update<T: ApiObject>(
    State(state): State<AppState>,
    AxumPath((ns, name)): AxumPath<(String, String)>,
    ApiJson(mut object): ApiJson<T>,
) -> Result<Json<T>, ApiError> {
    if object.meta().name != name {
        return Err(invalid::<T>(anyhow::anyhow!(
            "name '{}' does not match the request path '{}'",
            object.meta().name,
            name
        )));
    }
    let guard = state.store.lock(&T::KIND.key(&ns, &name)).await;
    let old = load_locked::<T>(&guard, &ns, &name).await?;
    {
        let old_meta = old.meta();
        let meta = object.meta_mut();
        meta.id.clone_from(&old_meta.id);
        meta.namespace = ns.clone();
        meta.created_at = old_meta.created_at;
        meta.deletion_timestamp = old_meta.deletion_timestamp;
    }
    object.on_update(&old);
    object.validate().map_err(invalid::<T>)?;

    state
        .admission
        .admit(
            Operation::Update,
            &object.clone().into_tracked(),
            Some(&old.into_tracked()),
        )
        .await?;
    guard.put_json(&object).await?;

    info!("Updated {} {}/{}", T::KIND, ns, name);
    Ok(Json(object))
}

pub async fn delete<T: ApiObject>(
    State(state): State<AppState>,
    AxumPath((ns, name)): AxumPath<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let guard = state.store.lock(&T::KIND.key(&ns, &name)).await;
    let object = load_locked::<T>(&guard, &ns, &name).await?;
    state
        .admission
        .admit(Operation::Delete, &object.clone().into_tracked(), None)
        .await?;
    guard.delete().await?;

    info!("Deleted {} {}/{}", T::KIND, ns, name);
    Ok(StatusCode::NO_CONTENT)
}
