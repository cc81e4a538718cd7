//! Records persisted in the document store.
//!
//! Embedded collections (cloud accounts, key pairs, audit logs, cloud
//! resources, permissions) live inside their owning document and are written
//! back as a whole when they change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ACCOUNTS: &str = "accounts";
pub const ORGS: &str = "orgs";
pub const GROUPS: &str = "groups";
pub const GROUP_POLICIES: &str = "group_policies";
pub const CLOUDS: &str = "clouds";
pub const COUNTRIES: &str = "countries";

/// Groups created for every new organisation.
pub const DEFAULT_GROUPS: [(&str, &str); 4] = [
    ("Development", "default development group"),
    ("Test", "default test group"),
    ("Stage", "default stage group"),
    ("Production", "default production group"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Org {
    pub id: String,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub org_id: String,
    pub group_policy_id: Option<String>,
}

/// Named bundle of policy rules shared by groups via `Group::group_policy_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupPolicy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub policy_rule_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub login: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub org_id: Option<String>,
    pub password_hash: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub cloud_accounts: Vec<CloudAccount>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn cloud_account(&self, cloud_account_id: &str) -> Option<&CloudAccount> {
        self.cloud_accounts.iter().find(|c| c.id == cloud_account_id)
    }

    pub fn cloud_account_mut(&mut self, cloud_account_id: &str) -> Option<&mut CloudAccount> {
        self.cloud_accounts.iter_mut().find(|c| c.id == cloud_account_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudAccount {
    pub id: String,
    pub name: String,
    pub cloud_id: String,
    pub cloud_provider: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub default_region: Option<String>,
    #[serde(default)]
    pub key_pairs: Vec<KeyPair>,
    #[serde(default)]
    pub audit_logs: Vec<AuditLog>,
    #[serde(default)]
    pub cloud_resources: Vec<CloudResource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPair {
    pub id: String,
    pub name: String,
    pub fingerprint: Option<String>,
    pub private_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: String,
    pub action: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub result: Option<String>,
    pub message: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudResource {
    pub id: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    #[serde(default)]
    pub properties: Value,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub id: String,
    pub name: String,
    pub action: Option<String>,
    pub resource: Option<String>,
    pub environment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cloud {
    pub id: String,
    pub name: String,
    pub cloud_provider: Option<String>,
    #[serde(default)]
    pub cloud_services: Vec<CloudService>,
}

impl Cloud {
    pub fn service(&self, service_type: &str) -> Option<&CloudService> {
        self.cloud_services
            .iter()
            .find(|s| s.service_type == service_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudService {
    pub service_type: String,
    pub host: String,
    pub port: Option<u16>,
    pub path: Option<String>,
    pub protocol: Option<String>,
}

impl CloudService {
    /// Endpoint URL in the form `{protocol}://{host}:{port}{path}`.
    pub fn endpoint_url(&self) -> String {
        let protocol = self.protocol.as_deref().unwrap_or("https");
        let path = self.path.as_deref().unwrap_or("");
        match self.port {
            Some(port) => format!("{}://{}:{}{}", protocol, self.host, port, path),
            None => format!("{}://{}{}", protocol, self.host, path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub code: String,
    pub name: String,
}
