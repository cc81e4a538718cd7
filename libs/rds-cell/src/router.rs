use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
    Router,
};
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::credentials::CredentialService;
use shared_utils::extractor::CloudParams;

use crate::handlers;
use crate::services::{RdsApi, RdsConnector};

pub const RDS_SERVICE: &str = "RDS";

#[derive(Clone)]
pub struct RdsState {
    pub config: Arc<AppConfig>,
    pub connector: Arc<dyn RdsConnector>,
}

/// RDS client built for the current request.
#[derive(Clone)]
pub struct Rds(pub Arc<dyn RdsApi>);

/// Resolves `cred_id` and attaches an RDS client pointed at the cloud's
/// RDS service endpoint.
pub async fn rds_middleware(
    State(state): State<RdsState>,
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
        .ok_or_else(|| AppError::NotFound("Credentials not found.".to_string()))?;

    let Some(service) = credential.service(RDS_SERVICE) else {
        warn!("Cloud for credential {} has no RDS service", credential.id);
        return Err(AppError::BadRequest("No RDS service endpoint for this cloud".to_string()));
    };

    let endpoint_url = service.endpoint_url();
    debug!("Using RDS endpoint {} for credential {}", endpoint_url, credential.id);

    let rds = state
        .connector
        .connect(&credential, &endpoint_url, &state.config.default_region)
        .await?;

    request.extensions_mut().insert(Rds(rds));

    Ok(next.run(request).await)
}

pub fn create_rds_router(config: Arc<AppConfig>, connector: Arc<dyn RdsConnector>) -> Router {
    let state = RdsState { config, connector };

    Router::new()
        .route("/databases", get(handlers::list_databases).post(handlers::create_database))
        .route("/databases/{id}", delete(handlers::delete_database))
        .route("/engine_versions", get(handlers::list_engine_versions))
        .route(
            "/parameter_groups",
            get(handlers::list_parameter_groups).post(handlers::create_parameter_group),
        )
        .route("/parameter_groups/{id}", delete(handlers::delete_parameter_group))
        .route("/parameter_groups/describe/{id}", post(handlers::describe_parameters))
        .route(
            "/security_groups",
            get(handlers::list_security_groups).post(handlers::create_security_group),
        )
        .route("/security_groups/{id}", delete(handlers::delete_security_group))
        .route_layer(middleware::from_fn_with_state(state.clone(), rds_middleware))
        .with_state(state)
}
