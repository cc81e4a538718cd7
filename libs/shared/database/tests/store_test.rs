use assert_matches::assert_matches;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_database::{eq_filter, is_null_filter, DocumentStore, StoreError};
use shared_models::error::AppError;

fn store_config(url: String) -> AppConfig {
    AppConfig {
        document_store_url: url,
        document_store_api_key: "test-store-key".to_string(),
        default_region: "us-east-1".to_string(),
        server_host: "127.0.0.1".to_string(),
        server_port: 3000,
    }
}

#[tokio::test]
async fn test_find_by_sends_key_and_filter() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .and(query_param("login", "eq.jdoe"))
        .and(header("apikey", "test-store-key"))
        .and(header("Authorization", "Bearer test-store-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "a1", "login": "jdoe" }
        ])))
        .mount(&mock_server)
        .await;

    let store = DocumentStore::new(&store_config(mock_server.uri()));
    let found: Option<Value> = store.find_by("accounts", "login", "jdoe").await.unwrap();

    assert_eq!(found.unwrap()["id"], "a1");
}

#[tokio::test]
async fn test_find_by_returns_none_for_empty_result() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let store = DocumentStore::new(&store_config(mock_server.uri()));
    let found: Option<Value> = store.find_by("accounts", "id", "missing").await.unwrap();

    assert!(found.is_none());
}

#[tokio::test]
async fn test_find_containing_uses_contains_operator() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .and(query_param("cloud_accounts", r#"cs.[{"id":"ca1"}]"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "a1" }])))
        .mount(&mock_server)
        .await;

    let store = DocumentStore::new(&store_config(mock_server.uri()));
    let found: Option<Value> = store
        .find_containing("accounts", "cloud_accounts", &json!([{ "id": "ca1" }]))
        .await
        .unwrap();

    assert_eq!(found.unwrap()["id"], "a1");
}

#[tokio::test]
async fn test_insert_requests_representation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/orgs"))
        .and(header("Prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            { "id": "o1", "name": "MyOrganization" }
        ])))
        .mount(&mock_server)
        .await;

    let store = DocumentStore::new(&store_config(mock_server.uri()));
    let created: Value = store
        .insert("orgs", &json!({ "id": "o1", "name": "MyOrganization" }))
        .await
        .unwrap();

    assert_eq!(created["name"], "MyOrganization");
}

#[tokio::test]
async fn test_delete_by_counts_removed_rows() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/accounts"))
        .and(query_param("id", "eq.a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "a1" }])))
        .mount(&mock_server)
        .await;

    let store = DocumentStore::new(&store_config(mock_server.uri()));
    assert_eq!(store.delete_by("accounts", "id", "a1").await.unwrap(), 1);
}

#[tokio::test]
async fn test_count_reads_content_range() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/rest/v1/countries"))
        .and(header("Prefer", "count=exact"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", "0-1/249"))
        .mount(&mock_server)
        .await;

    let store = DocumentStore::new(&store_config(mock_server.uri()));
    assert_eq!(store.count("countries").await.unwrap(), 249);
}

#[tokio::test]
async fn test_error_statuses_are_classified() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clouds"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let store = DocumentStore::new(&store_config(mock_server.uri()));

    let unauthorized = store.select::<Value>("accounts", "").await.unwrap_err();
    assert_matches!(unauthorized, StoreError::Unauthorized(_));

    let failed = store.select::<Value>("clouds", "").await.unwrap_err();
    assert_matches!(failed, StoreError::Api { .. });
    assert_matches!(AppError::from(failed), AppError::Database(_));
}

#[tokio::test]
async fn test_update_where_requires_every_filter() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/accounts"))
        .and(query_param("id", "eq.a1"))
        .and(query_param("updated_at", "is.null"))
        .and(header("Prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "a1", "login": "jdoe" }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let store = DocumentStore::new(&store_config(mock_server.uri()));

    let updated: Option<Value> = store
        .update_where(
            "accounts",
            &[eq_filter("id", "a1"), is_null_filter("updated_at")],
            json!({ "login": "jdoe" }),
        )
        .await
        .unwrap();
    assert_eq!(updated.unwrap()["id"], "a1");

    let stale: Option<Value> = store
        .update_where(
            "accounts",
            &[eq_filter("id", "a1"), eq_filter("updated_at", "2024-01-01T00:00:00Z")],
            json!({ "login": "jdoe" }),
        )
        .await
        .unwrap();
    assert!(stale.is_none());
}
