use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;

pub struct TestConfig {
    pub document_store_url: String,
    pub document_store_api_key: String,
    pub default_region: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            document_store_url: "http://localhost:54321".to_string(),
            document_store_api_key: "test-store-key".to_string(),
            default_region: "us-east-1".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_store_url(url: impl Into<String>) -> Self {
        Self {
            document_store_url: url.into(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            document_store_url: self.document_store_url.clone(),
            document_store_api_key: self.document_store_api_key.clone(),
            default_region: self.default_region.clone(),
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// Documents shaped the way the store returns them.
pub struct StoreFixtures;

impl StoreFixtures {
    pub fn cloud_account_document(id: &str, cloud_id: &str) -> Value {
        json!({
            "id": id,
            "name": "Production AWS",
            "cloud_id": cloud_id,
            "cloud_provider": "AWS",
            "access_key": "AKIAEXAMPLE",
            "secret_key": "secret-example",
            "default_region": null,
            "key_pairs": [],
            "audit_logs": [],
            "cloud_resources": []
        })
    }

    pub fn account_document(id: &str, login: &str, password_hash: &str) -> Value {
        json!({
            "id": id,
            "login": login,
            "email": format!("{}@example.com", login),
            "first_name": "Test",
            "last_name": "User",
            "company": "MyOrganization",
            "org_id": Uuid::nil().to_string(),
            "password_hash": password_hash,
            "permissions": [],
            "cloud_accounts": [],
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn account_with_cloud_account(account_id: &str, cred_id: &str, cloud_id: &str) -> Value {
        let mut account = Self::account_document(account_id, "owner", "unused-hash");
        account["cloud_accounts"] = json!([Self::cloud_account_document(cred_id, cloud_id)]);
        account
    }

    pub fn cloud_document(id: &str, with_rds: bool) -> Value {
        let services = if with_rds {
            json!([{
                "service_type": "RDS",
                "host": "rds.topstack.local",
                "port": 8080,
                "path": "/RDSQuery",
                "protocol": "http"
            }])
        } else {
            json!([])
        };

        json!({
            "id": id,
            "name": "TopStack",
            "cloud_provider": "TopStack",
            "cloud_services": services
        })
    }

    pub fn org_document(id: &str, name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }
}
