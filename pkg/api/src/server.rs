use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::AppState;
use crate::handlers::namespaces;
use crate::handlers::resources::{self, ApiObject};
use crate::request_id::request_id_middleware;
use pkg_constants::state::NAMESPACES_PREFIX;
use pkg_controllers::resourcequota::{QuotaControllerConfig, ResourceQuotaController};
use pkg_state::client::StateStore;
use pkg_types::configmap::ConfigMap;
use pkg_types::namespace::Namespace;
use pkg_types::pod::Pod;
use pkg_types::replicaset::ReplicaSet;
use pkg_types::secret::Secret;
use pkg_types::service::Service;
use pkg_types::volume::PersistentVolumeClaim;
use pkg_types::ResourceQuota;

/// Server configuration passed from the binary's CLI.
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub data_dir: String,
    pub controller: QuotaControllerConfig,
}

pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    let store = StateStore::new(&config.data_dir).await?;
    seed_default_namespaces(&store).await?;

    // The controller recomputes status.used for every quota
    let controller = ResourceQuotaController::new(store.clone(), config.controller);
    controller.start();

    let app = router(AppState::new(store.clone()));

    info!("Starting API server on {}", config.addr);
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await?;
    info!("API server stopped");
    Ok(())
}

/// All API routes.
pub fn router(state: AppState) -> Router {
    let routes = Router::new().route(
        "/api/v1/namespaces",
        post(namespaces::create_namespace).get(namespaces::list_namespaces),
    );
    let routes = kind_routes::<Pod>(routes);
    let routes = kind_routes::<Service>(routes);
    let routes = kind_routes::<Secret>(routes);
    let routes = kind_routes::<ConfigMap>(routes);
    let routes = kind_routes::<ReplicaSet>(routes);
    let routes = kind_routes::<PersistentVolumeClaim>(routes);
    let routes = kind_routes::<ResourceQuota>(routes);

    routes
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

fn kind_routes<T: ApiObject>(router: Router<AppState>) -> Router<AppState> {
    let collection = format!("/api/v1/namespaces/{{ns}}/{}", T::KIND.plural());
    let item = format!("{}/{{name}}", collection);
    router
        .route(
            &collection,
            post(resources::create::<T>).get(resources::list::<T>),
        )
        .route(
            &item,
            get(resources::get::<T>)
                .put(resources::update::<T>)
                .delete(resources::delete::<T>),
        )
}

/// Seed default namespaces on startup.
async fn seed_default_namespaces(store: &StateStore) -> anyhow::Result<()> {
    for name in ["default", "kube-system"] {
        let key = format!("{}{}", NAMESPACES_PREFIX, name);
        if store.get(&key).await?.is_none() {
            let ns = Namespace {
                name: name.to_string(),
                labels: Default::default(),
                created_at: chrono::Utc::now(),
            };
            store.put_json(&key, &ns).await?;
            info!("Seeded namespace: {}", name);
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
