use chrono::{SecondsFormat, Utc};
use serde_json::json;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{eq_filter, is_null_filter, DocumentStore};
use shared_models::error::AppError;
use shared_models::identity::{
    Account, AuditLog, CloudAccount, CloudResource, Country, Group, KeyPair, Org, Permission,
    ACCOUNTS, COUNTRIES, DEFAULT_GROUPS, GROUPS, ORGS,
};

use crate::models::{
    AccountUpdate, AuditLogInput, CloudAccountUpdate, CloudResourceInput, CountryQuery, KeyPairUpdate,
    PermissionUpdate,
};
use crate::services::password::{hash_password, verify_password};
use crate::services::validation::{check_account, Errors, BLANK, TAKEN};

pub const DEFAULT_COMPANY: &str = "MyOrganization";

const INVALID_LOGIN: &str = "Invalid login or password";

pub struct AccountService {
    store: DocumentStore,
}

impl AccountService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: DocumentStore::new(config),
        }
    }

    pub async fn countries(&self) -> Result<CountryQuery, AppError> {
        let countries: Vec<Country> = self.store.select(COUNTRIES, "order=name.asc").await?;
        let total = self.store.count(COUNTRIES).await?;

        Ok(CountryQuery::first_page(total, countries))
    }

    pub async fn get(&self, id: &str) -> Result<Account, AppError> {
        self.store
            .find_by(ACCOUNTS, "id", id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Account {} not found", id)))
    }

    /// Creates the account and, when no `org_id` is given, a new organisation
    /// with the default groups.
    #[instrument(skip(self, update), fields(login = ?update.login))]
    pub async fn create(&self, update: AccountUpdate) -> Result<Account, AppError> {
        let login = update.login.clone().unwrap_or_default();
        let email = update.email.clone().unwrap_or_default();
        let password = update.password.clone().filter(|p| !p.is_empty());

        let mut errors = check_account(&login, &email, password.is_some());
        if !login.trim().is_empty() && self.login_taken(&login, None).await? {
            errors.add("login", TAKEN);
        }
        errors.into_result()?;

        let company = update.company.clone().filter(|c| !c.trim().is_empty());
        let org = match update.org_id.as_deref().filter(|id| !id.is_empty()) {
            None => {
                self.create_org(company.as_deref().unwrap_or(DEFAULT_COMPANY))
                    .await?
            }
            Some(org_id) => self
                .store
                .find_by::<Org>(ORGS, "id", org_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Org {} not found", org_id)))?,
        };

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4().to_string(),
            login,
            email,
            first_name: update.first_name,
            last_name: update.last_name,
            company: Some(company.unwrap_or_else(|| org.name.clone())),
            org_id: Some(org.id.clone()),
            password_hash: hash_password(password.as_deref().unwrap_or_default())?,
            permissions: Vec::new(),
            cloud_accounts: Vec::new(),
            created_at: Some(now),
            updated_at: Some(now),
        };

        let created: Account = self.store.insert(ACCOUNTS, &account).await?;
        info!("Created account {} in org {}", created.id, org.id);

        self.get(&created.id).await
    }

    async fn create_org(&self, name: &str) -> Result<Org, AppError> {
        let org = Org {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: Some(Utc::now()),
        };
        let org: Org = self.store.insert(ORGS, &org).await?;

        for (group_name, description) in DEFAULT_GROUPS {
            let group = Group {
                id: Uuid::new_v4().to_string(),
                name: group_name.to_string(),
                description: Some(description.to_string()),
                org_id: org.id.clone(),
                group_policy_id: None,
            };
            let _: Group = self.store.insert(GROUPS, &group).await?;
        }

        debug!("Created org {} with default groups", org.id);
        Ok(org)
    }

    async fn login_taken(&self, login: &str, except_id: Option<&str>) -> Result<bool, AppError> {
        let existing: Option<Account> = self.store.find_by(ACCOUNTS, "login", login).await?;
        Ok(existing.is_some_and(|account| Some(account.id.as_str()) != except_id))
    }

    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<Account, AppError> {
        let account: Option<Account> = self.store.find_by(ACCOUNTS, "login", login).await?;
        let Some(account) = account else {
            return Err(AppError::Auth(INVALID_LOGIN.to_string()));
        };

        match verify_password(password, &account.password_hash) {
            Ok(true) => Ok(account),
            Ok(false) => Err(AppError::Auth(INVALID_LOGIN.to_string())),
            Err(e) => {
                warn!("Stored password hash for {} is unreadable: {}", account.id, e);
                Err(AppError::Auth(INVALID_LOGIN.to_string()))
            }
        }
    }

    #[instrument(skip(self, update))]
    pub async fn update(&self, id: &str, update: AccountUpdate) -> Result<Account, AppError> {
        let mut account = self.get(id).await?;

        if let Some(login) = update.login {
            account.login = login;
        }
        if let Some(email) = update.email {
            account.email = email;
        }
        if update.first_name.is_some() {
            account.first_name = update.first_name;
        }
        if update.last_name.is_some() {
            account.last_name = update.last_name;
        }
        if update.company.is_some() {
            account.company = update.company;
        }
        if update.org_id.is_some() {
            account.org_id = update.org_id;
        }

        let mut errors = check_account(&account.login, &account.email, true);
        if !account.login.trim().is_empty() && self.login_taken(&account.login, Some(id)).await? {
            errors.add("login", TAKEN);
        }
        errors.into_result()?;

        if let Some(password) = update.password.filter(|p| !p.is_empty()) {
            account.password_hash = hash_password(&password)?;
        }

        self.save(account).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let deleted = self.store.delete_by(ACCOUNTS, "id", id).await?;
        if deleted == 0 {
            return Err(AppError::NotFound(format!("Account {} not found", id)));
        }

        info!("Deleted account {}", id);
        Ok(())
    }

    /// Writes the whole document back, embedded records included.
    ///
    /// The write only applies while `updated_at` still holds the value that
    /// was read, so a concurrent change yields `Conflict` instead of being
    /// overwritten.
    async fn save(&self, mut account: Account) -> Result<Account, AppError> {
        let unchanged = match account.updated_at {
            Some(read_at) => eq_filter(
                "updated_at",
                &read_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            ),
            None => is_null_filter("updated_at"),
        };
        account.updated_at = Some(Utc::now());

        let document = serde_json::to_value(&account)
            .map_err(|e| AppError::Internal(format!("Failed to encode account: {}", e)))?;

        let saved = self
            .store
            .update_where(ACCOUNTS, &[eq_filter("id", &account.id), unchanged], document)
            .await?;
        if let Some(saved) = saved {
            return Ok(saved);
        }

        let current: Option<Account> = self.store.find_by(ACCOUNTS, "id", &account.id).await?;
        match current {
            Some(_) => {
                warn!("Account {} changed since it was read", account.id);
                Err(AppError::Conflict(format!(
                    "Account {} was modified by another request",
                    account.id
                )))
            }
            None => Err(AppError::NotFound(format!("Account {} not found", account.id))),
        }
    }

    async fn modify<F>(&self, id: &str, change: F) -> Result<Account, AppError>
    where
        F: FnOnce(&mut Account) -> Result<(), AppError>,
    {
        let mut account = self.get(id).await?;
        change(&mut account)?;
        self.save(account).await
    }

    pub async fn add_cloud_account(
        &self,
        id: &str,
        cloud_id: &str,
        input: CloudAccountUpdate,
    ) -> Result<Account, AppError> {
        self.modify(id, |account| {
            account.cloud_accounts.push(CloudAccount {
                id: Uuid::new_v4().to_string(),
                name: input.name.unwrap_or_default(),
                cloud_id: cloud_id.to_string(),
                cloud_provider: input.cloud_provider,
                access_key: input.access_key,
                secret_key: input.secret_key,
                default_region: input.default_region,
                key_pairs: Vec::new(),
                audit_logs: Vec::new(),
                cloud_resources: Vec::new(),
            });
            Ok(())
        })
        .await
    }

    pub async fn update_cloud_account(
        &self,
        id: &str,
        cloud_account_id: &str,
        input: CloudAccountUpdate,
    ) -> Result<CloudAccount, AppError> {
        let account = self
            .modify(id, |account| {
                let cloud_account = cloud_account_mut(account, cloud_account_id)?;

                if let Some(name) = input.name {
                    cloud_account.name = name;
                }
                if input.cloud_provider.is_some() {
                    cloud_account.cloud_provider = input.cloud_provider;
                }
                if input.access_key.is_some() {
                    cloud_account.access_key = input.access_key;
                }
                if input.secret_key.is_some() {
                    cloud_account.secret_key = input.secret_key;
                }
                if input.default_region.is_some() {
                    cloud_account.default_region = input.default_region;
                }

                let mut errors = Errors::new();
                if cloud_account.name.trim().is_empty() {
                    errors.add("name", BLANK);
                }
                errors.into_result()
            })
            .await?;

        account
            .cloud_account(cloud_account_id)
            .cloned()
            .ok_or_else(|| cloud_account_not_found(cloud_account_id))
    }

    pub async fn remove_cloud_account(&self, id: &str, cloud_account_id: &str) -> Result<Account, AppError> {
        self.modify(id, |account| {
            let before = account.cloud_accounts.len();
            account.cloud_accounts.retain(|c| c.id != cloud_account_id);

            if account.cloud_accounts.len() == before {
                return Err(cloud_account_not_found(cloud_account_id));
            }
            Ok(())
        })
        .await
    }

    pub async fn add_key_pair(
        &self,
        id: &str,
        cloud_account_id: &str,
        input: KeyPairUpdate,
    ) -> Result<Account, AppError> {
        self.modify(id, |account| {
            cloud_account_mut(account, cloud_account_id)?.key_pairs.push(KeyPair {
                id: Uuid::new_v4().to_string(),
                name: input.name.unwrap_or_default(),
                fingerprint: input.fingerprint,
                private_key: input.private_key,
            });
            Ok(())
        })
        .await
    }

    pub async fn remove_key_pair(
        &self,
        id: &str,
        cloud_account_id: &str,
        key_pair_id: &str,
    ) -> Result<Account, AppError> {
        self.modify(id, |account| {
            cloud_account_mut(account, cloud_account_id)?
                .key_pairs
                .retain(|k| k.id != key_pair_id);
            Ok(())
        })
        .await
    }

    /// Looks a cloud account up by its own id, across all accounts.
    pub async fn find_cloud_account(&self, cloud_account_id: &str) -> Result<CloudAccount, AppError> {
        let account: Option<Account> = self
            .store
            .find_containing(ACCOUNTS, "cloud_accounts", &json!([{ "id": cloud_account_id }]))
            .await?;

        account
            .as_ref()
            .and_then(|account| account.cloud_account(cloud_account_id))
            .cloned()
            .ok_or_else(|| cloud_account_not_found(cloud_account_id))
    }

    pub async fn add_audit_log(
        &self,
        id: &str,
        cloud_account_id: &str,
        input: AuditLogInput,
    ) -> Result<Account, AppError> {
        self.modify(id, |account| {
            cloud_account_mut(account, cloud_account_id)?.audit_logs.push(AuditLog {
                id: Uuid::new_v4().to_string(),
                action: input.action.unwrap_or_default(),
                resource_type: input.resource_type,
                resource_id: input.resource_id,
                result: input.result,
                message: input.message,
                created_at: Some(Utc::now()),
            });
            Ok(())
        })
        .await
    }

    pub async fn add_cloud_resource(
        &self,
        id: &str,
        cloud_account_id: &str,
        input: CloudResourceInput,
    ) -> Result<Account, AppError> {
        self.modify(id, |account| {
            cloud_account_mut(account, cloud_account_id)?
                .cloud_resources
                .push(CloudResource {
                    id: Uuid::new_v4().to_string(),
                    resource_type: input.resource_type.unwrap_or_default(),
                    resource_id: input.resource_id,
                    properties: input.properties,
                    created_at: Some(Utc::now()),
                });
            Ok(())
        })
        .await
    }

    pub async fn add_permission(&self, id: &str, input: PermissionUpdate) -> Result<Account, AppError> {
        self.modify(id, |account| {
            account.permissions.push(Permission {
                id: Uuid::new_v4().to_string(),
                name: input.name.unwrap_or_default(),
                action: input.action,
                resource: input.resource,
                environment: input.environment,
            });
            Ok(())
        })
        .await
    }

    pub async fn remove_permission(&self, id: &str, permission_id: &str) -> Result<Account, AppError> {
        self.modify(id, |account| {
            account.permissions.retain(|p| p.id != permission_id);
            Ok(())
        })
        .await
    }
}

fn cloud_account_mut<'a>(
    account: &'a mut Account,
    cloud_account_id: &str,
) -> Result<&'a mut CloudAccount, AppError> {
    account
        .cloud_account_mut(cloud_account_id)
        .ok_or_else(|| cloud_account_not_found(cloud_account_id))
}

fn cloud_account_not_found(cloud_account_id: &str) -> AppError {
    AppError::NotFound(format!("Cloud account {} not found", cloud_account_id))
}
