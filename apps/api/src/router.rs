use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use identity_cell::router::create_identity_router;
use monitor_cell::router::create_monitor_router;
use monitor_cell::services::AwsMonitorConnector;
use rds_cell::router::create_rds_router;
use rds_cell::services::AwsRdsConnector;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Cloud Broker API is running!" }))
        .nest(
            "/api/v1/cloud_management/aws/monitor",
            create_monitor_router(state.clone(), Arc::new(AwsMonitorConnector)),
        )
        .nest(
            "/api/v1/cloud_management/topstack/rds",
            create_rds_router(state.clone(), Arc::new(AwsRdsConnector)),
        )
        .nest("/identity/v1/accounts", create_identity_router(state))
}
