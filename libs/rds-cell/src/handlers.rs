use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query},
    Json,
};
use tracing::info;

use shared_models::error::AppError;
use shared_utils::extractor::{body_to_json, bracket_params, take_member};

use crate::models::{
    CreateDatabase, Database, DescribeFilters, DescribeParametersOptions, EngineVersion, Parameter,
    ParameterGroup, SecurityGroup,
};
use crate::router::Rds;

fn describe_filters(params: &HashMap<String, String>, identifier_key: &str) -> Result<DescribeFilters, AppError> {
    DescribeFilters::from_filters(&bracket_params(params, "filters"), identifier_key)
}

pub async fn list_databases(
    Extension(Rds(rds)): Extension<Rds>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Database>>, AppError> {
    let filters = describe_filters(&params, DescribeFilters::DATABASE)?;
    Ok(Json(rds.describe_databases(&filters).await?))
}

pub async fn create_database(
    Extension(Rds(rds)): Extension<Rds>,
    body: Bytes,
) -> Result<Json<Database>, AppError> {
    let mut json_body = body_to_json(&body)?;
    let request: CreateDatabase = take_member(&mut json_body, "relational_database")?;
    request.validate()?;

    let database = rds.create_database(&request).await?;
    info!("Created database {:?} ({})", database.id, request.flavor());

    Ok(Json(database))
}

pub async fn delete_database(
    Extension(Rds(rds)): Extension<Rds>,
    Path(id): Path<String>,
) -> Result<Json<bool>, AppError> {
    rds.delete_database(&id).await?;
    info!("Deleted database {}", id);

    Ok(Json(true))
}

pub async fn list_engine_versions(
    Extension(Rds(rds)): Extension<Rds>,
) -> Result<Json<Vec<EngineVersion>>, AppError> {
    let versions = rds
        .describe_engine_versions()
        .await?
        .into_iter()
        .map(EngineVersion::trimmed)
        .collect();

    Ok(Json(versions))
}

pub async fn list_parameter_groups(
    Extension(Rds(rds)): Extension<Rds>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<ParameterGroup>>, AppError> {
    let filters = describe_filters(&params, DescribeFilters::PARAMETER_GROUP)?;
    Ok(Json(rds.describe_parameter_groups(&filters).await?))
}

pub async fn create_parameter_group(
    Extension(Rds(rds)): Extension<Rds>,
    body: Bytes,
) -> Result<Json<ParameterGroup>, AppError> {
    let mut json_body = body_to_json(&body)?;
    let group: ParameterGroup = take_member(&mut json_body, "parameter_group")?;
    group.validate()?;

    let created = rds.create_parameter_group(&group).await?;
    info!("Created parameter group {:?}", created.id);

    Ok(Json(created))
}

pub async fn delete_parameter_group(
    Extension(Rds(rds)): Extension<Rds>,
    Path(id): Path<String>,
) -> Result<Json<bool>, AppError> {
    rds.delete_parameter_group(&id).await?;
    info!("Deleted parameter group {}", id);

    Ok(Json(true))
}

pub async fn describe_parameters(
    Extension(Rds(rds)): Extension<Rds>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Vec<Parameter>>, AppError> {
    let mut json_body = body_to_json(&body)?;
    let has_options = json_body.get("options").is_some_and(|value| !value.is_null());
    let options: DescribeParametersOptions = if has_options {
        take_member(&mut json_body, "options")?
    } else {
        DescribeParametersOptions::default()
    };

    Ok(Json(rds.describe_parameters(&id, &options).await?))
}

pub async fn list_security_groups(
    Extension(Rds(rds)): Extension<Rds>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<SecurityGroup>>, AppError> {
    let filters = describe_filters(&params, DescribeFilters::SECURITY_GROUP)?;
    Ok(Json(rds.describe_security_groups(&filters).await?))
}

pub async fn create_security_group(
    Extension(Rds(rds)): Extension<Rds>,
    body: Bytes,
) -> Result<Json<SecurityGroup>, AppError> {
    let mut json_body = body_to_json(&body)?;
    let group: SecurityGroup = take_member(&mut json_body, "security_group")?;
    group.validate()?;

    let created = rds.create_security_group(&group).await?;
    info!("Created security group {:?}", created.id);

    Ok(Json(created))
}

pub async fn delete_security_group(
    Extension(Rds(rds)): Extension<Rds>,
    Path(id): Path<String>,
) -> Result<Json<bool>, AppError> {
    rds.delete_security_group(&id).await?;
    info!("Deleted security group {}", id);

    Ok(Json(true))
}
