use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use tracing::{info, warn};

use crate::AppState;
use pkg_constants::state::NAMESPACES_PREFIX;
use pkg_types::namespace::Namespace;
use pkg_types::validate::validate_name;

pub async fn create_namespace(
    State(state): State<AppState>,
    Json(mut ns): Json<Namespace>,
) -> impl IntoResponse {
    if let Err(e) = validate_name(&ns.name) {
        return (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response();
    }
    ns.created_at = Utc::now();
    let key = format!("{}{}", NAMESPACES_PREFIX, ns.name);
    match state.store.get(&key).await {
        Ok(Some(_)) => {
            return (
                StatusCode::CONFLICT,
                format!("namespace {} already exists", ns.name),
            )
                .into_response();
        }
        Ok(None) => {}
        Err(e) => {
            warn!("Failed to read namespace {}: {}", ns.name, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }
    if let Err(e) = state.store.put_json(&key, &ns).await {
        warn!("Failed to create namespace: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to create namespace",
        )
            .into_response();
    }
    info!("Created namespace: {}", ns.name);
    (StatusCode::CREATED, Json(ns)).into_response()
}

pub async fn list_namespaces(State(state): State<AppState>) -> impl IntoResponse {
    let entries = match state.store.list_prefix(NAMESPACES_PREFIX).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to list namespaces: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let namespaces: Vec<Namespace> = entries
        .into_iter()
        .filter_map(|(_, v)| serde_json::from_slice(&v).ok())
        .collect();
    (StatusCode::OK, Json(namespaces)).into_response()
}
