use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shared_models::error::AppError;

pub const DEFAULT_FLAVOR: &str = "db.m1.small";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub address: Option<String>,
    pub port: Option<i32>,
}

/// A database server as reported by DescribeDBInstances.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub id: Option<String>,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub state: Option<String>,
    pub flavor_id: Option<String>,
    pub allocated_storage: Option<i32>,
    pub master_username: Option<String>,
    pub db_name: Option<String>,
    pub endpoint: Option<Endpoint>,
    pub availability_zone: Option<String>,
    pub multi_az: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub backup_retention_period: Option<i32>,
    pub preferred_backup_window: Option<String>,
    pub preferred_maintenance_window: Option<String>,
    #[serde(default)]
    pub parameter_groups: Vec<String>,
    #[serde(default)]
    pub security_groups: Vec<String>,
    pub license_model: Option<String>,
    pub auto_minor_version_upgrade: Option<bool>,
    pub read_replica_source: Option<String>,
    #[serde(default)]
    pub read_replica_identifiers: Vec<String>,
}

/// Body member of `POST /databases`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateDatabase {
    pub id: Option<String>,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub allocated_storage: Option<i32>,
    pub master_username: Option<String>,
    pub password: Option<String>,
    pub flavor_id: Option<String>,
    pub db_name: Option<String>,
    pub availability_zone: Option<String>,
    pub multi_az: Option<bool>,
    pub port: Option<i32>,
    pub parameter_group_name: Option<String>,
    #[serde(default)]
    pub security_group_names: Vec<String>,
    pub backup_retention_period: Option<i32>,
    pub preferred_backup_window: Option<String>,
    pub preferred_maintenance_window: Option<String>,
    pub license_model: Option<String>,
    pub auto_minor_version_upgrade: Option<bool>,
}

impl CreateDatabase {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut missing = Vec::new();

        if is_blank(&self.id) {
            missing.push("id");
        }
        if is_blank(&self.engine) {
            missing.push("engine");
        }
        if self.allocated_storage.is_none() {
            missing.push("allocated_storage");
        }
        if is_blank(&self.master_username) {
            missing.push("master_username");
        }
        if is_blank(&self.password) {
            missing.push("password");
        }

        missing_fields("Database", &missing)
    }

    pub fn flavor(&self) -> &str {
        self.flavor_id
            .as_deref()
            .filter(|flavor| !flavor.is_empty())
            .unwrap_or(DEFAULT_FLAVOR)
    }

    /// What the new server looks like before the service reports back.
    pub fn to_database(&self) -> Database {
        Database {
            id: self.id.clone(),
            engine: self.engine.clone(),
            engine_version: self.engine_version.clone(),
            state: Some("creating".to_string()),
            flavor_id: Some(self.flavor().to_string()),
            allocated_storage: self.allocated_storage,
            master_username: self.master_username.clone(),
            db_name: self.db_name.clone(),
            availability_zone: self.availability_zone.clone(),
            multi_az: self.multi_az,
            parameter_groups: self.parameter_group_name.iter().cloned().collect(),
            security_groups: self.security_group_names.clone(),
            ..Database::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineVersion {
    #[serde(rename = "Engine")]
    pub engine: Option<String>,
    #[serde(rename = "EngineVersion")]
    pub engine_version: Option<String>,
    #[serde(rename = "DBParameterGroupFamily")]
    pub db_parameter_group_family: Option<String>,
    #[serde(rename = "DBEngineDescription")]
    pub db_engine_description: Option<String>,
    #[serde(rename = "DBEngineVersionDescription")]
    pub db_engine_version_description: Option<String>,
}

impl EngineVersion {
    /// TopStack pads these values with whitespace.
    pub fn trimmed(self) -> Self {
        let trim = |value: Option<String>| value.map(|v| v.trim().to_string());

        Self {
            engine: trim(self.engine),
            engine_version: trim(self.engine_version),
            db_parameter_group_family: trim(self.db_parameter_group_family),
            db_engine_description: trim(self.db_engine_description),
            db_engine_version_description: trim(self.db_engine_version_description),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterGroup {
    pub id: Option<String>,
    pub family: Option<String>,
    pub description: Option<String>,
}

impl ParameterGroup {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut missing = Vec::new();

        if is_blank(&self.id) {
            missing.push("id");
        }
        if is_blank(&self.family) {
            missing.push("family");
        }
        if is_blank(&self.description) {
            missing.push("description");
        }

        missing_fields("Parameter group", &missing)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: Option<String>,
    pub value: Option<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub apply_type: Option<String>,
    pub data_type: Option<String>,
    pub allowed_values: Option<String>,
    pub is_modifiable: Option<bool>,
    pub minimum_engine_version: Option<String>,
    pub apply_method: Option<String>,
}

/// Body member of `POST /parameter_groups/describe/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescribeParametersOptions {
    #[serde(alias = "Source")]
    pub source: Option<String>,
    #[serde(alias = "Marker")]
    pub marker: Option<String>,
    #[serde(alias = "MaxRecords")]
    pub max_records: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ec2SecurityGroup {
    pub name: Option<String>,
    pub owner_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpRange {
    pub cidr_ip: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub id: Option<String>,
    pub description: Option<String>,
    pub owner_id: Option<String>,
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub ec2_security_groups: Vec<Ec2SecurityGroup>,
    #[serde(default)]
    pub ip_ranges: Vec<IpRange>,
}

impl SecurityGroup {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut missing = Vec::new();

        if is_blank(&self.id) {
            missing.push("id");
        }
        if is_blank(&self.description) {
            missing.push("description");
        }

        missing_fields("Security group", &missing)
    }
}

/// `filters[...]` accepted by the describe routes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescribeFilters {
    pub identifier: Option<String>,
    pub marker: Option<String>,
    pub max_records: Option<i32>,
}

impl DescribeFilters {
    pub const DATABASE: &'static str = "DBInstanceIdentifier";
    pub const PARAMETER_GROUP: &'static str = "DBParameterGroupName";
    pub const SECURITY_GROUP: &'static str = "DBSecurityGroupName";

    pub fn from_filters(filters: &BTreeMap<String, String>, identifier_key: &str) -> Result<Self, AppError> {
        let max_records = filters
            .get("MaxRecords")
            .map(|value| {
                value
                    .parse::<i32>()
                    .map_err(|_| AppError::BadRequest(format!("Invalid MaxRecords '{}'", value)))
            })
            .transpose()?;

        Ok(Self {
            identifier: filters.get(identifier_key).filter(|v| !v.is_empty()).cloned(),
            marker: filters.get("Marker").filter(|v| !v.is_empty()).cloned(),
            max_records,
        })
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn missing_fields(record: &str, missing: &[&str]) -> Result<(), AppError> {
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "{} is missing required fields: {}",
            record,
            missing.join(", ")
        )))
    }
}
