use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shared_models::error::AppError;
use shared_utils::extractor::required_param;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    #[serde(rename = "Name", alias = "name")]
    pub name: String,
    #[serde(rename = "Value", alias = "value", default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    #[serde(alias = "AlarmName")]
    pub id: Option<String>,
    #[serde(alias = "AlarmArn")]
    pub arn: Option<String>,
    #[serde(alias = "AlarmDescription")]
    pub description: Option<String>,
    #[serde(alias = "ActionsEnabled")]
    pub actions_enabled: Option<bool>,
    #[serde(alias = "OKActions", default)]
    pub ok_actions: Vec<String>,
    #[serde(alias = "AlarmActions", default)]
    pub alarm_actions: Vec<String>,
    #[serde(alias = "InsufficientDataActions", default)]
    pub insufficient_data_actions: Vec<String>,
    #[serde(alias = "StateValue")]
    pub state_value: Option<String>,
    #[serde(alias = "StateReason")]
    pub state_reason: Option<String>,
    #[serde(alias = "StateUpdatedTimestamp")]
    pub state_updated_timestamp: Option<DateTime<Utc>>,
    #[serde(alias = "MetricName")]
    pub metric_name: Option<String>,
    #[serde(alias = "Namespace")]
    pub namespace: Option<String>,
    #[serde(alias = "Statistic")]
    pub statistic: Option<String>,
    #[serde(alias = "Dimensions", default)]
    pub dimensions: Vec<Dimension>,
    #[serde(alias = "Period")]
    pub period: Option<i32>,
    #[serde(alias = "Unit")]
    pub unit: Option<String>,
    #[serde(alias = "EvaluationPeriods")]
    pub evaluation_periods: Option<i32>,
    #[serde(alias = "Threshold")]
    pub threshold: Option<f64>,
    #[serde(alias = "ComparisonOperator")]
    pub comparison_operator: Option<String>,
}

impl Alarm {
    /// Checks the fields PutMetricAlarm cannot do without.
    pub fn validate_for_create(&self) -> Result<(), AppError> {
        let mut missing = Vec::new();

        if self.id.as_deref().map_or(true, str::is_empty) {
            missing.push("id");
        }
        if self.metric_name.as_deref().map_or(true, str::is_empty) {
            missing.push("metric_name");
        }
        if self.namespace.as_deref().map_or(true, str::is_empty) {
            missing.push("namespace");
        }
        if self.statistic.as_deref().map_or(true, str::is_empty) {
            missing.push("statistic");
        }
        if self.period.is_none() {
            missing.push("period");
        }
        if self.evaluation_periods.is_none() {
            missing.push("evaluation_periods");
        }
        if self.threshold.is_none() {
            missing.push("threshold");
        }
        if self.comparison_operator.as_deref().map_or(true, str::is_empty) {
            missing.push("comparison_operator");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::BadRequest(format!(
                "Alarm is missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub namespace: Option<String>,
    pub metric_name: Option<String>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
}

impl Metric {
    /// Sort key for metric listings; metrics without dimensions sort first.
    pub fn first_dimension_value(&self) -> &str {
        self.dimensions
            .first()
            .and_then(|d| d.value.as_deref())
            .unwrap_or("")
    }
}

/// A CloudWatch datapoint, keyed the way CloudWatch names its fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Datapoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatisticKind {
    Average,
    Sum,
    SampleCount,
    Maximum,
    Minimum,
}

impl StatisticKind {
    /// Order in which a datapoint's keys are checked for the active statistic.
    pub const PRIORITY: [StatisticKind; 5] = [
        StatisticKind::Average,
        StatisticKind::Sum,
        StatisticKind::SampleCount,
        StatisticKind::Maximum,
        StatisticKind::Minimum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatisticKind::Average => "Average",
            StatisticKind::Sum => "Sum",
            StatisticKind::SampleCount => "SampleCount",
            StatisticKind::Maximum => "Maximum",
            StatisticKind::Minimum => "Minimum",
        }
    }

    pub fn value(&self, datapoint: &Datapoint) -> Option<f64> {
        match self {
            StatisticKind::Average => datapoint.average,
            StatisticKind::Sum => datapoint.sum,
            StatisticKind::SampleCount => datapoint.sample_count,
            StatisticKind::Maximum => datapoint.maximum,
            StatisticKind::Minimum => datapoint.minimum,
        }
    }

    pub fn value_mut<'a>(&self, datapoint: &'a mut Datapoint) -> &'a mut Option<f64> {
        match self {
            StatisticKind::Average => &mut datapoint.average,
            StatisticKind::Sum => &mut datapoint.sum,
            StatisticKind::SampleCount => &mut datapoint.sample_count,
            StatisticKind::Maximum => &mut datapoint.maximum,
            StatisticKind::Minimum => &mut datapoint.minimum,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlarmFilters {
    pub alarm_names: Option<Vec<String>>,
    pub alarm_name_prefix: Option<String>,
    pub state_value: Option<String>,
    pub action_prefix: Option<String>,
}

impl AlarmFilters {
    pub fn from_filters(filters: &BTreeMap<String, String>) -> Self {
        Self {
            alarm_names: filters.get("AlarmNames").map(|names| {
                names
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            }),
            alarm_name_prefix: filters.get("AlarmNamePrefix").cloned(),
            state_value: filters.get("StateValue").cloned(),
            action_prefix: filters.get("ActionPrefix").cloned(),
        }
    }

    pub fn by_name(name: &str) -> Self {
        Self {
            alarm_names: Some(vec![name.to_string()]),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricFilters {
    pub namespace: Option<String>,
    pub metric_name: Option<String>,
    pub dimensions: Vec<Dimension>,
}

impl MetricFilters {
    /// A plain `Dimensions` string is a dimension name with no value.
    pub fn from_filters(filters: &BTreeMap<String, String>) -> Self {
        Self {
            namespace: filters.get("Namespace").cloned(),
            metric_name: filters.get("MetricName").cloned(),
            dimensions: filters
                .get("Dimensions")
                .filter(|name| !name.is_empty())
                .map(|name| {
                    vec![Dimension {
                        name: name.clone(),
                        value: None,
                    }]
                })
                .unwrap_or_default(),
        }
    }
}

/// CloudWatch keeps datapoints for at most 15 months.
pub const MAX_TIME_RANGE_SECS: i64 = 455 * 24 * 60 * 60;

/// Query parameters of `GET /metric_statistics`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricStatisticsRequest {
    pub time_range: i64,
    pub namespace: String,
    pub metric_name: String,
    pub period: i32,
    pub statistic: String,
    pub dimension_name: String,
    pub dimension_value: String,
}

impl MetricStatisticsRequest {
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, AppError> {
        let time_range = required_param(params, "time_range")?;
        let period = required_param(params, "period")?;

        let invalid_time_range = || AppError::BadRequest(format!("Invalid time_range '{}'", time_range));

        Ok(Self {
            time_range: time_range
                .parse()
                .ok()
                .filter(|seconds| (1..=MAX_TIME_RANGE_SECS).contains(seconds))
                .ok_or_else(invalid_time_range)?,
            namespace: required_param(params, "namespace")?.to_string(),
            metric_name: required_param(params, "metric_name")?.to_string(),
            period: period
                .parse()
                .map_err(|_| AppError::BadRequest(format!("Invalid period '{}'", period)))?,
            statistic: required_param(params, "statistic")?.to_string(),
            dimension_name: required_param(params, "dimension_name")?.to_string(),
            dimension_value: required_param(params, "dimension_value")?.to_string(),
        })
    }

    /// Resolves the request against `now` into the window sent to CloudWatch.
    pub fn window_ending(&self, now: DateTime<Utc>) -> MetricStatisticsQuery {
        MetricStatisticsQuery {
            namespace: self.namespace.clone(),
            metric_name: self.metric_name.clone(),
            dimension: Dimension {
                name: self.dimension_name.clone(),
                value: Some(self.dimension_value.clone()),
            },
            period: self.period,
            statistic: self.statistic.clone(),
            start_time: now - chrono::Duration::seconds(self.time_range),
            end_time: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricStatisticsQuery {
    pub namespace: String,
    pub metric_name: String,
    pub dimension: Dimension,
    pub period: i32,
    pub statistic: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn statistics_params() -> HashMap<String, String> {
        [
            ("time_range", "3600"),
            ("namespace", "AWS/EC2"),
            ("metric_name", "CPUUtilization"),
            ("period", "300"),
            ("statistic", "Average"),
            ("dimension_name", "InstanceId"),
            ("dimension_value", "i-1234"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_statistics_request_window() {
        let request = MetricStatisticsRequest::from_params(&statistics_params()).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let query = request.window_ending(now);

        assert_eq!(query.end_time, now);
        assert_eq!(query.start_time, Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap());
        assert_eq!(query.dimension.value.as_deref(), Some("i-1234"));
        assert_eq!(query.period, 300);
    }

    #[test]
    fn test_statistics_request_requires_every_param() {
        for name in ["time_range", "namespace", "metric_name", "period", "statistic", "dimension_name", "dimension_value"] {
            let mut params = statistics_params();
            params.remove(name);
            assert_matches!(MetricStatisticsRequest::from_params(&params), Err(AppError::BadRequest(_)));
        }

        let mut params = statistics_params();
        params.insert("period".to_string(), "five".to_string());
        assert_matches!(MetricStatisticsRequest::from_params(&params), Err(AppError::BadRequest(_)));
    }

    #[test]
    fn test_statistics_request_rejects_out_of_range_time_range() {
        for value in ["0", "-60", "100000000000000", "99999999999999999999"] {
            let mut params = statistics_params();
            params.insert("time_range".to_string(), value.to_string());
            assert_matches!(MetricStatisticsRequest::from_params(&params), Err(AppError::BadRequest(_)));
        }

        let mut params = statistics_params();
        params.insert("time_range".to_string(), MAX_TIME_RANGE_SECS.to_string());
        let request = MetricStatisticsRequest::from_params(&params).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let query = request.window_ending(now);
        assert_eq!(query.end_time - query.start_time, chrono::Duration::seconds(MAX_TIME_RANGE_SECS));
    }

    #[test]
    fn test_metric_filters_wrap_dimension_name() {
        let mut filters = BTreeMap::new();
        filters.insert("Namespace".to_string(), "AWS/RDS".to_string());
        filters.insert("Dimensions".to_string(), "DBInstanceIdentifier".to_string());

        let parsed = MetricFilters::from_filters(&filters);

        assert_eq!(parsed.namespace.as_deref(), Some("AWS/RDS"));
        assert_eq!(
            parsed.dimensions,
            vec![Dimension { name: "DBInstanceIdentifier".to_string(), value: None }]
        );
    }

    #[test]
    fn test_alarm_filters_split_names() {
        let mut filters = BTreeMap::new();
        filters.insert("AlarmNames".to_string(), "cpu-high, disk-full,".to_string());
        filters.insert("StateValue".to_string(), "ALARM".to_string());

        let parsed = AlarmFilters::from_filters(&filters);

        assert_eq!(parsed.alarm_names, Some(vec!["cpu-high".to_string(), "disk-full".to_string()]));
        assert_eq!(parsed.state_value.as_deref(), Some("ALARM"));
        assert_eq!(parsed.alarm_name_prefix, None);
    }

    #[test]
    fn test_alarm_accepts_cloudwatch_field_names() {
        let alarm: Alarm = serde_json::from_value(serde_json::json!({
            "AlarmName": "cpu-high",
            "MetricName": "CPUUtilization",
            "Namespace": "AWS/EC2",
            "Statistic": "Average",
            "Period": 300,
            "EvaluationPeriods": 2,
            "Threshold": 80.0,
            "ComparisonOperator": "GreaterThanThreshold",
            "Dimensions": [{ "Name": "InstanceId", "Value": "i-1234" }]
        }))
        .unwrap();

        assert!(alarm.validate_for_create().is_ok());
        assert_eq!(alarm.id.as_deref(), Some("cpu-high"));
        assert_eq!(alarm.dimensions[0].value.as_deref(), Some("i-1234"));
    }

    #[test]
    fn test_alarm_validation_lists_missing_fields() {
        let alarm = Alarm {
            id: Some("cpu-high".to_string()),
            ..Alarm::default()
        };

        let err = alarm.validate_for_create().unwrap_err();
        assert_matches!(err, AppError::BadRequest(msg) if msg.contains("metric_name") && !msg.contains("id,"));
    }
}
