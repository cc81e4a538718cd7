use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_utils::credentials::CredentialService;
use shared_utils::test_utils::{StoreFixtures, TestConfig};

#[tokio::test]
async fn test_find_resolves_keys_and_cloud() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .and(query_param("cloud_accounts", r#"cs.[{"id":"ca1"}]"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            StoreFixtures::account_with_cloud_account("a1", "ca1", "c1")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clouds"))
        .and(query_param("id", "eq.c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            StoreFixtures::cloud_document("c1", true)
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_store_url(mock_server.uri()).to_app_config();
    let credential = CredentialService::new(&config).find("ca1").await.unwrap().unwrap();

    assert_eq!(credential.account_id, "a1");
    assert_eq!(credential.access_key, "AKIAEXAMPLE");
    assert_eq!(credential.secret_key, "secret-example");
    assert_eq!(
        credential.service("RDS").unwrap().endpoint_url(),
        "http://rds.topstack.local:8080/RDSQuery"
    );
}

#[tokio::test]
async fn test_find_returns_none_for_unknown_cred_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_store_url(mock_server.uri()).to_app_config();
    let credential = CredentialService::new(&config).find("missing").await.unwrap();

    assert!(credential.is_none());
}

#[tokio::test]
async fn test_find_skips_cloud_accounts_without_keys() {
    let mock_server = MockServer::start().await;

    let mut account = StoreFixtures::account_with_cloud_account("a1", "ca1", "c1");
    account["cloud_accounts"][0]["secret_key"] = json!(null);

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([account])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_store_url(mock_server.uri()).to_app_config();
    assert!(CredentialService::new(&config).find("ca1").await.unwrap().is_none());
}
