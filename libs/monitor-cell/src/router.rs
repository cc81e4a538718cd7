use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get},
    Router,
};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::credentials::CredentialService;
use shared_utils::extractor::CloudParams;

use crate::handlers;
use crate::services::{MonitorApi, MonitorConnector};

#[derive(Clone)]
pub struct MonitorState {
    pub config: Arc<AppConfig>,
    pub connector: Arc<dyn MonitorConnector>,
}

/// CloudWatch client built for the current request.
#[derive(Clone)]
pub struct Monitor(pub Arc<dyn MonitorApi>);

/// Resolves `cred_id` and attaches a CloudWatch client to the request.
/// Requests without usable credentials are rejected with 400.
pub async fn monitor_middleware(
    State(state): State<MonitorState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let params = CloudParams::from_uri(request.uri());

    let cred_id = params
        .cred_id()
        .ok_or_else(|| AppError::BadRequest("cred_id is required".to_string()))?;

    let credential = CredentialService::new(&state.config)
        .find(cred_id)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("No cloud credentials found for {}", cred_id)))?;

    let region = state
        .config
        .region_or_default(params.region().or(credential.default_region.as_deref()));

    debug!("Monitoring with credential {} in {}", credential.id, region);
    let monitor = state.connector.connect(&credential, region).await?;

    request.extensions_mut().insert(Monitor(monitor));

    Ok(next.run(request).await)
}

pub fn create_monitor_router(config: Arc<AppConfig>, connector: Arc<dyn MonitorConnector>) -> Router {
    let state = MonitorState { config, connector };

    Router::new()
        .route("/alarms", get(handlers::list_alarms).post(handlers::create_alarm))
        .route("/alarms/{id}", delete(handlers::delete_alarm))
        .route("/metrics", get(handlers::list_metrics))
        .route("/metric_statistics", get(handlers::get_metric_statistics))
        .route_layer(middleware::from_fn_with_state(state.clone(), monitor_middleware))
        .with_state(state)
}
