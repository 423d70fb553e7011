pub mod error;
pub mod extract;
pub mod handlers;
pub mod request_id;
pub mod server;

use pkg_quota::{QuotaAdmission, QuotaStore};
use pkg_state::client::StateStore;

/// Shared application state injected into all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: StateStore,
    pub admission: QuotaAdmission,
}

impl AppState {
    pub fn new(store: StateStore) -> Self {
        Self {
            admission: QuotaAdmission::new(QuotaStore::new(store.clone())),
            store,
        }
    }
}
