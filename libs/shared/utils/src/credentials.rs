use serde_json::json;
use tracing::{debug, instrument, warn};

use shared_config::AppConfig;
use shared_database::DocumentStore;
use shared_models::credentials::CloudCredential;
use shared_models::error::AppError;
use shared_models::identity::{Account, Cloud, ACCOUNTS, CLOUDS};

/// Resolves a `cred_id` (the id of a cloud account embedded in some account)
/// into the keys and cloud endpoints needed to build an SDK client.
pub struct CredentialService {
    store: DocumentStore,
}

impl CredentialService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: DocumentStore::new(config),
        }
    }

    #[instrument(skip(self))]
    pub async fn find(&self, cred_id: &str) -> Result<Option<CloudCredential>, AppError> {
        let fragment = json!([{ "id": cred_id }]);
        let account: Option<Account> = self
            .store
            .find_containing(ACCOUNTS, "cloud_accounts", &fragment)
            .await?;

        let Some(account) = account else {
            debug!("No account owns cloud account {}", cred_id);
            return Ok(None);
        };

        let Some(cloud_account) = account.cloud_account(cred_id) else {
            return Ok(None);
        };

        let (Some(access_key), Some(secret_key)) = (
            cloud_account.access_key.clone(),
            cloud_account.secret_key.clone(),
        ) else {
            warn!("Cloud account {} has no access keys", cred_id);
            return Ok(None);
        };

        let cloud: Option<Cloud> = self
            .store
            .find_by(CLOUDS, "id", &cloud_account.cloud_id)
            .await?;

        Ok(Some(CloudCredential {
            id: cloud_account.id.clone(),
            account_id: account.id.clone(),
            access_key,
            secret_key,
            default_region: cloud_account.default_region.clone(),
            cloud,
        }))
    }
}
