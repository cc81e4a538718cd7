use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use monitor_cell::models::{Alarm, AlarmFilters, Datapoint, Dimension, Metric, MetricFilters, MetricStatisticsQuery};
use monitor_cell::router::create_monitor_router;
use monitor_cell::services::{MonitorApi, MonitorConnector};
use shared_models::credentials::CloudCredential;
use shared_models::error::AppError;
use shared_utils::test_utils::{StoreFixtures, TestConfig};

#[derive(Default)]
struct Recorded {
    regions: Vec<String>,
    put_alarms: Vec<Alarm>,
    deleted: Vec<String>,
    alarm_filters: Vec<AlarmFilters>,
    metric_filters: Vec<MetricFilters>,
    statistics_queries: Vec<MetricStatisticsQuery>,
}

#[derive(Default)]
struct FakeMonitor {
    alarms: Vec<Alarm>,
    metrics: Vec<Metric>,
    datapoints: Vec<Datapoint>,
    recorded: Arc<Mutex<Recorded>>,
}

#[async_trait]
impl MonitorApi for FakeMonitor {
    async fn describe_alarms(&self, filters: &AlarmFilters) -> Result<Vec<Alarm>, AppError> {
        self.recorded.lock().unwrap().alarm_filters.push(filters.clone());
        Ok(self
            .alarms
            .iter()
            .filter(|alarm| match &filters.alarm_names {
                Some(names) => alarm.id.as_ref().map_or(false, |id| names.contains(id)),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn put_alarm(&self, alarm: &Alarm) -> Result<(), AppError> {
        self.recorded.lock().unwrap().put_alarms.push(alarm.clone());
        Ok(())
    }

    async fn delete_alarm(&self, name: &str) -> Result<(), AppError> {
        self.recorded.lock().unwrap().deleted.push(name.to_string());
        Ok(())
    }

    async fn list_metrics(&self, filters: &MetricFilters) -> Result<Vec<Metric>, AppError> {
        self.recorded.lock().unwrap().metric_filters.push(filters.clone());
        Ok(self.metrics.clone())
    }

    async fn get_metric_statistics(
        &self,
        query: &MetricStatisticsQuery,
    ) -> Result<Vec<Datapoint>, AppError> {
        self.recorded.lock().unwrap().statistics_queries.push(query.clone());
        Ok(self.datapoints.clone())
    }
}

struct FakeConnector {
    monitor: Arc<FakeMonitor>,
}

#[async_trait]
impl MonitorConnector for FakeConnector {
    async fn connect(
        &self,
        _credential: &CloudCredential,
        region: &str,
    ) -> Result<Arc<dyn MonitorApi>, AppError> {
        self.monitor.recorded.lock().unwrap().regions.push(region.to_string());
        Ok(self.monitor.clone())
    }
}

async fn mount_credentials(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .and(query_param("cloud_accounts", r#"cs.[{"id":"ca1"}]"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            StoreFixtures::account_with_cloud_account("a1", "ca1", "c1")
        ])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clouds"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            StoreFixtures::cloud_document("c1", false)
        ])))
        .mount(mock_server)
        .await;
}

async fn create_test_app(mock_server: &MockServer, monitor: FakeMonitor) -> (Router, Arc<Mutex<Recorded>>) {
    mount_credentials(mock_server).await;

    let recorded = monitor.recorded.clone();
    let connector = FakeConnector {
        monitor: Arc::new(monitor),
    };
    let config = TestConfig::with_store_url(mock_server.uri()).to_arc();

    (create_monitor_router(config, Arc::new(connector)), recorded)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

fn alarm(name: &str) -> Alarm {
    Alarm {
        id: Some(name.to_string()),
        metric_name: Some("CPUUtilization".to_string()),
        namespace: Some("AWS/EC2".to_string()),
        statistic: Some("Average".to_string()),
        period: Some(300),
        evaluation_periods: Some(2),
        threshold: Some(80.0),
        comparison_operator: Some("GreaterThanThreshold".to_string()),
        ..Alarm::default()
    }
}

fn metric(name: &str, dimension_value: Option<&str>) -> Metric {
    Metric {
        namespace: Some("AWS/EC2".to_string()),
        metric_name: Some(name.to_string()),
        dimensions: dimension_value
            .map(|value| {
                vec![Dimension {
                    name: "InstanceId".to_string(),
                    value: Some(value.to_string()),
                }]
            })
            .unwrap_or_default(),
    }
}

#[tokio::test]
async fn test_missing_cred_id_is_bad_request() {
    let mock_server = MockServer::start().await;
    let (app, recorded) = create_test_app(&mock_server, FakeMonitor::default()).await;

    let (status, body) = send(app, get("/alarms")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("cred_id"));
    assert!(recorded.lock().unwrap().regions.is_empty());
}

#[tokio::test]
async fn test_unknown_cred_id_is_bad_request() {
    let mock_server = MockServer::start().await;
    let (app, _) = create_test_app(&mock_server, FakeMonitor::default()).await;

    let (status, _) = send(app, get("/alarms?cred_id=nope")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_region_falls_back_to_default() {
    let mock_server = MockServer::start().await;
    let (app, recorded) = create_test_app(&mock_server, FakeMonitor::default()).await;

    let (status, _) = send(app.clone(), get("/alarms?cred_id=ca1&region=undefined")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(app, get("/alarms?cred_id=ca1&region=eu-west-1")).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(recorded.lock().unwrap().regions, vec!["us-east-1", "eu-west-1"]);
}

#[tokio::test]
async fn test_list_alarms_passes_filters() {
    let mock_server = MockServer::start().await;
    let monitor = FakeMonitor {
        alarms: vec![alarm("cpu-high"), alarm("disk-full")],
        ..FakeMonitor::default()
    };
    let (app, recorded) = create_test_app(&mock_server, monitor).await;

    let (status, body) = send(
        app,
        get("/alarms?cred_id=ca1&filters%5BAlarmNames%5D=cpu-high&filters%5BStateValue%5D=ALARM"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], "cpu-high");

    let filters = recorded.lock().unwrap().alarm_filters[0].clone();
    assert_eq!(filters.state_value.as_deref(), Some("ALARM"));
}

#[tokio::test]
async fn test_create_alarm() {
    let mock_server = MockServer::start().await;
    let (app, recorded) = create_test_app(&mock_server, FakeMonitor::default()).await;

    let request = Request::builder()
        .method("POST")
        .uri("/alarms?cred_id=ca1")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "alarm": alarm("cpu-high") }).to_string()))
        .unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "cpu-high");
    assert_eq!(recorded.lock().unwrap().put_alarms.len(), 1);
}

#[tokio::test]
async fn test_create_alarm_rejects_incomplete_body() {
    let mock_server = MockServer::start().await;
    let (app, recorded) = create_test_app(&mock_server, FakeMonitor::default()).await;

    let request = Request::builder()
        .method("POST")
        .uri("/alarms?cred_id=ca1")
        .body(Body::from(json!({ "alarm": { "id": "cpu-high" } }).to_string()))
        .unwrap();
    let (status, _) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("POST")
        .uri("/alarms?cred_id=ca1")
        .body(Body::from("not json"))
        .unwrap();
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(recorded.lock().unwrap().put_alarms.is_empty());
}

#[tokio::test]
async fn test_delete_alarm() {
    let mock_server = MockServer::start().await;
    let monitor = FakeMonitor {
        alarms: vec![alarm("cpu-high")],
        ..FakeMonitor::default()
    };
    let (app, recorded) = create_test_app(&mock_server, monitor).await;

    let delete = |uri: &str| Request::builder().method("DELETE").uri(uri).body(Body::empty()).unwrap();

    let (status, body) = send(app.clone(), delete("/alarms/cpu-high?cred_id=ca1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(true));

    let (status, _) = send(app, delete("/alarms/missing?cred_id=ca1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(recorded.lock().unwrap().deleted, vec!["cpu-high"]);
}

#[tokio::test]
async fn test_list_metrics_sorted_by_dimension_value() {
    let mock_server = MockServer::start().await;
    let monitor = FakeMonitor {
        metrics: vec![
            metric("CPUUtilization", Some("i-b")),
            metric("NetworkIn", None),
            metric("CPUUtilization", Some("i-a")),
        ],
        ..FakeMonitor::default()
    };
    let (app, recorded) = create_test_app(&mock_server, monitor).await;

    let (status, body) = send(
        app,
        get("/metrics?cred_id=ca1&filters%5BNamespace%5D=AWS%2FEC2&filters%5BDimensions%5D=InstanceId"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let order: Vec<Value> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["dimensions"].get(0).map(|d| d["Value"].clone()).unwrap_or(Value::Null))
        .collect();
    assert_eq!(order, vec![Value::Null, json!("i-a"), json!("i-b")]);

    let filters = recorded.lock().unwrap().metric_filters[0].clone();
    assert_eq!(filters.namespace.as_deref(), Some("AWS/EC2"));
    assert_eq!(filters.dimensions[0].name, "InstanceId");
}

#[tokio::test]
async fn test_metric_statistics_rounds_active_statistic() {
    let mock_server = MockServer::start().await;
    let monitor = FakeMonitor {
        datapoints: vec![Datapoint {
            unit: Some("Percent".to_string()),
            average: Some(12.3456789),
            ..Datapoint::default()
        }],
        ..FakeMonitor::default()
    };
    let (app, recorded) = create_test_app(&mock_server, monitor).await;

    let (status, body) = send(
        app,
        get("/metric_statistics?cred_id=ca1&time_range=3600&namespace=AWS%2FEC2&metric_name=CPUUtilization&period=300&statistic=Average&dimension_name=InstanceId&dimension_value=i-1234"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["Average"], json!(12.34568));
    assert_eq!(body[0]["Unit"], "Percent");

    let query = recorded.lock().unwrap().statistics_queries[0].clone();
    assert_eq!((query.end_time - query.start_time).num_seconds(), 3600);
    assert_eq!(query.dimension.value.as_deref(), Some("i-1234"));
}

#[tokio::test]
async fn test_metric_statistics_requires_params() {
    let mock_server = MockServer::start().await;
    let (app, recorded) = create_test_app(&mock_server, FakeMonitor::default()).await;

    let (status, _) = send(app, get("/metric_statistics?cred_id=ca1&time_range=3600")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(recorded.lock().unwrap().statistics_queries.is_empty());
}

#[tokio::test]
async fn test_metric_statistics_rejects_huge_time_range() {
    let mock_server = MockServer::start().await;
    let (app, recorded) = create_test_app(&mock_server, FakeMonitor::default()).await;

    let (status, body) = send(
        app,
        get("/metric_statistics?cred_id=ca1&time_range=100000000000000&namespace=AWS%2FEC2&metric_name=CPUUtilization&period=300&statistic=Average&dimension_name=InstanceId&dimension_value=i-1234"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid time_range '100000000000000'");
    assert!(recorded.lock().unwrap().statistics_queries.is_empty());
}

#[tokio::test]
async fn test_unknown_path_is_not_found_without_cred_id() {
    let mock_server = MockServer::start().await;
    let (app, recorded) = create_test_app(&mock_server, FakeMonitor::default()).await;

    let (status, _) = send(app, get("/dashboards")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(recorded.lock().unwrap().regions.is_empty());
}
