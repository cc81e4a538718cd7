use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::FormRejection, Form, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::extractor::body_to_json;

use crate::models::{
    AccountUpdate, AccountView, AuditLogInput, AuthRequest, CloudAccountUpdate, CloudAccountView,
    CloudResourceInput, CountryQuery, KeyPairUpdate, PermissionUpdate,
};
use crate::services::AccountService;

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    let json = body_to_json(body)?;
    serde_json::from_value(Value::Object(json))
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))
}

/// Accepts both `/{id}` and `/{id}.json`.
fn strip_json(id: &str) -> &str {
    id.strip_suffix(".json").unwrap_or(id)
}

pub async fn list_countries(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<CountryQuery>, AppError> {
    let service = AccountService::new(&config);
    Ok(Json(service.countries().await?))
}

pub async fn get_account(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<String>,
) -> Result<Json<AccountView>, AppError> {
    let service = AccountService::new(&config);
    let account = service.get(strip_json(&id)).await?;

    Ok(Json(AccountView::from(&account)))
}

pub async fn create_account(
    State(config): State<Arc<AppConfig>>,
    body: Bytes,
) -> Result<(StatusCode, Json<AccountView>), AppError> {
    let update: AccountUpdate = parse_body(&body)?;

    let service = AccountService::new(&config);
    let account = service.create(update).await?;

    Ok((StatusCode::CREATED, Json(AccountView::from(&account))))
}

/// Credentials may come from a form body or the query string.
pub async fn authenticate(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<AuthRequest>,
    form: Result<Form<AuthRequest>, FormRejection>,
) -> Result<Json<AccountView>, AppError> {
    let request = match form {
        Ok(Form(form)) => form.or(query),
        Err(_) => query,
    };

    let Some((login, password)) = request.credentials() else {
        return Err(AppError::BadRequest("Login and password are required".to_string()));
    };

    let service = AccountService::new(&config);
    let account = service.authenticate(login, password).await?;

    Ok(Json(AccountView::from(&account)))
}

pub async fn update_account(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<AccountView>, AppError> {
    let update: AccountUpdate = parse_body(&body)?;

    let service = AccountService::new(&config);
    let account = service.update(strip_json(&id), update).await?;

    Ok(Json(AccountView::from(&account)))
}

pub async fn delete_account(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let service = AccountService::new(&config);
    service.delete(strip_json(&id)).await?;

    Ok(StatusCode::OK)
}

pub async fn add_cloud_account(
    State(config): State<Arc<AppConfig>>,
    Path((id, cloud_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<(StatusCode, Json<AccountView>), AppError> {
    let input: CloudAccountUpdate = parse_body(&body)?;

    let service = AccountService::new(&config);
    let account = service.add_cloud_account(&id, &cloud_id, input).await?;

    Ok((StatusCode::CREATED, Json(AccountView::from(&account))))
}

pub async fn update_cloud_account(
    State(config): State<Arc<AppConfig>>,
    Path((id, cloud_account_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<CloudAccountView>, AppError> {
    let input: CloudAccountUpdate = parse_body(&body)?;

    let service = AccountService::new(&config);
    let cloud_account = service
        .update_cloud_account(&id, &cloud_account_id, input)
        .await?;

    Ok(Json(CloudAccountView::from(&cloud_account)))
}

pub async fn remove_cloud_account(
    State(config): State<Arc<AppConfig>>,
    Path((id, cloud_account_id)): Path<(String, String)>,
) -> Result<Json<AccountView>, AppError> {
    let service = AccountService::new(&config);
    let account = service.remove_cloud_account(&id, &cloud_account_id).await?;

    Ok(Json(AccountView::from(&account)))
}

pub async fn add_key_pair(
    State(config): State<Arc<AppConfig>>,
    Path((id, cloud_account_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<(StatusCode, Json<AccountView>), AppError> {
    let input: KeyPairUpdate = parse_body(&body)?;

    let service = AccountService::new(&config);
    let account = service.add_key_pair(&id, &cloud_account_id, input).await?;

    Ok((StatusCode::CREATED, Json(AccountView::from(&account))))
}

pub async fn remove_key_pair(
    State(config): State<Arc<AppConfig>>,
    Path((id, cloud_account_id, key_pair_id)): Path<(String, String, String)>,
) -> Result<Json<AccountView>, AppError> {
    let service = AccountService::new(&config);
    let account = service
        .remove_key_pair(&id, &cloud_account_id, &key_pair_id)
        .await?;

    Ok(Json(AccountView::from(&account)))
}

pub async fn get_cloud_account(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<String>,
) -> Result<Json<CloudAccountView>, AppError> {
    let service = AccountService::new(&config);
    let cloud_account = service.find_cloud_account(strip_json(&id)).await?;

    Ok(Json(CloudAccountView::from(&cloud_account)))
}

pub async fn add_audit_log(
    State(config): State<Arc<AppConfig>>,
    Path((id, cloud_account_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<(StatusCode, Json<AccountView>), AppError> {
    let input: AuditLogInput = parse_body(&body)?;

    let service = AccountService::new(&config);
    let account = service.add_audit_log(&id, &cloud_account_id, input).await?;

    Ok((StatusCode::CREATED, Json(AccountView::from(&account))))
}

pub async fn add_cloud_resource(
    State(config): State<Arc<AppConfig>>,
    Path((id, cloud_account_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<(StatusCode, Json<AccountView>), AppError> {
    let input: CloudResourceInput = parse_body(&body)?;

    let service = AccountService::new(&config);
    let account = service
        .add_cloud_resource(&id, &cloud_account_id, input)
        .await?;

    Ok((StatusCode::CREATED, Json(AccountView::from(&account))))
}

pub async fn add_permission(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<AccountView>), AppError> {
    let input: PermissionUpdate = parse_body(&body)?;

    let service = AccountService::new(&config);
    let account = service.add_permission(&id, input).await?;

    Ok((StatusCode::CREATED, Json(AccountView::from(&account))))
}

pub async fn remove_permission(
    State(config): State<Arc<AppConfig>>,
    Path((id, permission_id)): Path<(String, String)>,
) -> Result<Json<AccountView>, AppError> {
    let service = AccountService::new(&config);
    let account = service.remove_permission(&id, &permission_id).await?;

    Ok(Json(AccountView::from(&account)))
}
