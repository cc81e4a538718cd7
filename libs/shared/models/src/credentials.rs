use serde::{Deserialize, Serialize};

use crate::identity::{Cloud, CloudService};

/// Keys and endpoints resolved from a caller-supplied `cred_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudCredential {
    pub id: String,
    pub account_id: String,
    pub access_key: String,
    pub secret_key: String,
    pub default_region: Option<String>,
    pub cloud: Option<Cloud>,
}

impl CloudCredential {
    pub fn service(&self, service_type: &str) -> Option<&CloudService> {
        self.cloud.as_ref().and_then(|cloud| cloud.service(service_type))
    }
}
