use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

/// Account routes. `{scope}` is the cloud id when adding a cloud account and
/// the cloud account id for the records nested under one.
pub fn create_identity_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(handlers::create_account))
        .route("/countries.json", get(handlers::list_countries))
        .route("/auth", post(handlers::authenticate))
        .route("/cloud_accounts/{id}", get(handlers::get_cloud_account))
        .route(
            "/{id}",
            get(handlers::get_account)
                .put(handlers::update_account)
                .delete(handlers::delete_account),
        )
        .route("/{id}/permissions", post(handlers::add_permission))
        .route("/{id}/permissions/{permission_id}", delete(handlers::remove_permission))
        .route(
            "/{id}/cloud_accounts/{cloud_account_id}",
            put(handlers::update_cloud_account).delete(handlers::remove_cloud_account),
        )
        .route("/{id}/{scope}/cloud_accounts", post(handlers::add_cloud_account))
        .route("/{id}/{scope}/key_pairs", post(handlers::add_key_pair))
        .route("/{id}/{scope}/key_pairs/{key_pair_id}", delete(handlers::remove_key_pair))
        .route("/{id}/{scope}/audit_logs", post(handlers::add_audit_log))
        .route("/{id}/{scope}/cloud_resources", post(handlers::add_cloud_resource))
        .with_state(config)
}
