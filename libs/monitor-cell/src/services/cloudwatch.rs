use std::sync::Arc;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_cloudwatch::config::http::HttpResponse;
use aws_sdk_cloudwatch::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudwatch::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudwatch::types::{
    ComparisonOperator, Dimension as AwsDimension, DimensionFilter, MetricAlarm, StandardUnit, StateValue,
    Statistic,
};
use aws_sdk_cloudwatch::Client;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use shared_models::credentials::CloudCredential;
use shared_models::error::AppError;
use shared_utils::cloud_error::classify;

use crate::models::{
    Alarm, AlarmFilters, Datapoint, Dimension, Metric, MetricFilters, MetricStatisticsQuery,
};

/// CloudWatch operations used by the monitor routes.
#[async_trait]
pub trait MonitorApi: Send + Sync {
    async fn describe_alarms(&self, filters: &AlarmFilters) -> Result<Vec<Alarm>, AppError>;

    async fn put_alarm(&self, alarm: &Alarm) -> Result<(), AppError>;

    async fn delete_alarm(&self, name: &str) -> Result<(), AppError>;

    async fn list_metrics(&self, filters: &MetricFilters) -> Result<Vec<Metric>, AppError>;

    async fn get_metric_statistics(
        &self,
        query: &MetricStatisticsQuery,
    ) -> Result<Vec<Datapoint>, AppError>;
}

/// Builds a request-scoped CloudWatch client from resolved credentials.
#[async_trait]
pub trait MonitorConnector: Send + Sync {
    async fn connect(
        &self,
        credential: &CloudCredential,
        region: &str,
    ) -> Result<Arc<dyn MonitorApi>, AppError>;
}

pub struct AwsMonitorConnector;

#[async_trait]
impl MonitorConnector for AwsMonitorConnector {
    async fn connect(
        &self,
        credential: &CloudCredential,
        region: &str,
    ) -> Result<Arc<dyn MonitorApi>, AppError> {
        debug!("Creating CloudWatch client for {} in {}", credential.id, region);

        let credentials = Credentials::new(
            credential.access_key.clone(),
            credential.secret_key.clone(),
            None,
            None,
            "cloud-broker",
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .load()
            .await;

        Ok(Arc::new(AwsMonitor {
            client: Client::new(&sdk_config),
        }))
    }
}

pub struct AwsMonitor {
    client: Client,
}

#[async_trait]
impl MonitorApi for AwsMonitor {
    #[instrument(skip(self))]
    async fn describe_alarms(&self, filters: &AlarmFilters) -> Result<Vec<Alarm>, AppError> {
        let mut alarms = Vec::new();
        let mut next_token = None;

        loop {
            let output = self
                .client
                .describe_alarms()
                .set_alarm_names(filters.alarm_names.clone())
                .set_alarm_name_prefix(filters.alarm_name_prefix.clone())
                .set_state_value(filters.state_value.as_deref().map(StateValue::from))
                .set_action_prefix(filters.action_prefix.clone())
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(sdk_error)?;

            alarms.extend(output.metric_alarms().iter().map(alarm_from_sdk));

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(alarms)
    }

    #[instrument(skip(self, alarm), fields(alarm = ?alarm.id))]
    async fn put_alarm(&self, alarm: &Alarm) -> Result<(), AppError> {
        let dimensions = alarm
            .dimensions
            .iter()
            .map(|d| {
                AwsDimension::builder()
                    .name(&d.name)
                    .value(d.value.clone().unwrap_or_default())
                    .build()
            })
            .collect::<Vec<_>>();

        self.client
            .put_metric_alarm()
            .set_alarm_name(alarm.id.clone())
            .set_alarm_description(alarm.description.clone())
            .set_actions_enabled(alarm.actions_enabled)
            .set_ok_actions(non_empty(&alarm.ok_actions))
            .set_alarm_actions(non_empty(&alarm.alarm_actions))
            .set_insufficient_data_actions(non_empty(&alarm.insufficient_data_actions))
            .set_metric_name(alarm.metric_name.clone())
            .set_namespace(alarm.namespace.clone())
            .set_statistic(alarm.statistic.as_deref().map(Statistic::from))
            .set_dimensions((!dimensions.is_empty()).then_some(dimensions))
            .set_period(alarm.period)
            .set_unit(alarm.unit.as_deref().map(StandardUnit::from))
            .set_evaluation_periods(alarm.evaluation_periods)
            .set_threshold(alarm.threshold)
            .set_comparison_operator(alarm.comparison_operator.as_deref().map(ComparisonOperator::from))
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_alarm(&self, name: &str) -> Result<(), AppError> {
        self.client
            .delete_alarms()
            .alarm_names(name)
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_metrics(&self, filters: &MetricFilters) -> Result<Vec<Metric>, AppError> {
        let dimension_filters = filters
            .dimensions
            .iter()
            .map(|d| {
                DimensionFilter::builder()
                    .name(&d.name)
                    .set_value(d.value.clone())
                    .build()
            })
            .collect::<Vec<_>>();

        let mut metrics = Vec::new();
        let mut next_token = None;

        loop {
            let output = self
                .client
                .list_metrics()
                .set_namespace(filters.namespace.clone())
                .set_metric_name(filters.metric_name.clone())
                .set_dimensions((!dimension_filters.is_empty()).then(|| dimension_filters.clone()))
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(sdk_error)?;

            metrics.extend(output.metrics().iter().map(|metric| Metric {
                namespace: metric.namespace().map(str::to_string),
                metric_name: metric.metric_name().map(str::to_string),
                dimensions: metric.dimensions().iter().map(dimension_from_sdk).collect(),
            }));

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(metrics)
    }

    #[instrument(skip(self))]
    async fn get_metric_statistics(
        &self,
        query: &MetricStatisticsQuery,
    ) -> Result<Vec<Datapoint>, AppError> {
        let dimension = AwsDimension::builder()
            .name(&query.dimension.name)
            .value(query.dimension.value.clone().unwrap_or_default())
            .build();

        let output = self
            .client
            .get_metric_statistics()
            .namespace(&query.namespace)
            .metric_name(&query.metric_name)
            .dimensions(dimension)
            .start_time(AwsDateTime::from_secs(query.start_time.timestamp()))
            .end_time(AwsDateTime::from_secs(query.end_time.timestamp()))
            .period(query.period)
            .statistics(Statistic::from(query.statistic.as_str()))
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(output
            .datapoints()
            .iter()
            .map(|point| Datapoint {
                timestamp: point.timestamp().and_then(to_chrono),
                unit: point.unit().map(|unit| unit.as_str().to_string()),
                average: point.average(),
                sum: point.sum(),
                sample_count: point.sample_count(),
                maximum: point.maximum(),
                minimum: point.minimum(),
            })
            .collect())
    }
}

fn sdk_error<E>(err: SdkError<E, HttpResponse>) -> AppError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|response| response.status().as_u16());
    let detail = DisplayErrorContext(&err).to_string();
    let service_error = err.as_service_error();

    classify(
        service_error.and_then(|e| e.code()),
        service_error.and_then(|e| e.message()),
        status,
        &detail,
    )
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}

fn to_chrono(timestamp: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}

fn dimension_from_sdk(dimension: &AwsDimension) -> Dimension {
    Dimension {
        name: dimension.name().unwrap_or_default().to_string(),
        value: dimension.value().map(str::to_string),
    }
}

fn alarm_from_sdk(alarm: &MetricAlarm) -> Alarm {
    Alarm {
        id: alarm.alarm_name().map(str::to_string),
        arn: alarm.alarm_arn().map(str::to_string),
        description: alarm.alarm_description().map(str::to_string),
        actions_enabled: alarm.actions_enabled(),
        ok_actions: alarm.ok_actions().to_vec(),
        alarm_actions: alarm.alarm_actions().to_vec(),
        insufficient_data_actions: alarm.insufficient_data_actions().to_vec(),
        state_value: alarm.state_value().map(|state| state.as_str().to_string()),
        state_reason: alarm.state_reason().map(str::to_string),
        state_updated_timestamp: alarm.state_updated_timestamp().and_then(to_chrono),
        metric_name: alarm.metric_name().map(str::to_string),
        namespace: alarm.namespace().map(str::to_string),
        statistic: alarm.statistic().map(|statistic| statistic.as_str().to_string()),
        dimensions: alarm.dimensions().iter().map(dimension_from_sdk).collect(),
        period: alarm.period(),
        unit: alarm.unit().map(|unit| unit.as_str().to_string()),
        evaluation_periods: alarm.evaluation_periods(),
        threshold: alarm.threshold(),
        comparison_operator: alarm
            .comparison_operator()
            .map(|operator| operator.as_str().to_string()),
    }
}
