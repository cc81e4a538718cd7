use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query},
    Json,
};
use chrono::Utc;
use tracing::{debug, info};

use shared_models::error::AppError;
use shared_utils::extractor::{body_to_json, bracket_params, take_member};

use crate::models::{Alarm, AlarmFilters, Datapoint, Metric, MetricFilters, MetricStatisticsRequest};
use crate::router::Monitor;
use crate::services::statistics::{round_active_statistic, sort_metrics};

pub async fn list_alarms(
    Extension(Monitor(monitor)): Extension<Monitor>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Alarm>>, AppError> {
    let filters = AlarmFilters::from_filters(&bracket_params(&params, "filters"));
    let alarms = monitor.describe_alarms(&filters).await?;

    Ok(Json(alarms))
}

pub async fn create_alarm(
    Extension(Monitor(monitor)): Extension<Monitor>,
    body: Bytes,
) -> Result<Json<Alarm>, AppError> {
    let mut json_body = body_to_json(&body)?;
    let alarm: Alarm = take_member(&mut json_body, "alarm")?;
    alarm.validate_for_create()?;

    monitor.put_alarm(&alarm).await?;
    info!("Created alarm {:?}", alarm.id);

    Ok(Json(alarm))
}

pub async fn delete_alarm(
    Extension(Monitor(monitor)): Extension<Monitor>,
    Path(id): Path<String>,
) -> Result<Json<bool>, AppError> {
    let existing = monitor.describe_alarms(&AlarmFilters::by_name(&id)).await?;
    if existing.is_empty() {
        return Err(AppError::NotFound(format!("Alarm {} not found", id)));
    }

    monitor.delete_alarm(&id).await?;
    info!("Deleted alarm {}", id);

    Ok(Json(true))
}

pub async fn list_metrics(
    Extension(Monitor(monitor)): Extension<Monitor>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Metric>>, AppError> {
    let filters = MetricFilters::from_filters(&bracket_params(&params, "filters"));

    let mut metrics = monitor.list_metrics(&filters).await?;
    sort_metrics(&mut metrics);

    Ok(Json(metrics))
}

pub async fn get_metric_statistics(
    Extension(Monitor(monitor)): Extension<Monitor>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Datapoint>>, AppError> {
    let request = MetricStatisticsRequest::from_params(&params)?;
    let query = request.window_ending(Utc::now());

    let mut datapoints = monitor.get_metric_statistics(&query).await?;
    let statistic = round_active_statistic(&mut datapoints);
    debug!(
        "Returning {} datapoints for {} ({:?})",
        datapoints.len(),
        request.metric_name,
        statistic.map(|s| s.as_str())
    );

    Ok(Json(datapoints))
}
