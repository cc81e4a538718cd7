use std::sync::Arc;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_rds::config::http::HttpResponse;
use aws_sdk_rds::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_rds::primitives::DateTime as AwsDateTime;
use aws_sdk_rds::types::{
    DbEngineVersion, DbInstance, DbParameterGroup, DbSecurityGroup, Parameter as AwsParameter,
};
use aws_sdk_rds::Client;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use shared_models::credentials::CloudCredential;
use shared_models::error::AppError;
use shared_utils::cloud_error::classify;

use crate::models::{
    CreateDatabase, Database, DescribeFilters, DescribeParametersOptions, Ec2SecurityGroup, Endpoint,
    EngineVersion, IpRange, Parameter, ParameterGroup, SecurityGroup,
};

/// RDS operations used by the TopStack routes.
#[async_trait]
pub trait RdsApi: Send + Sync {
    async fn describe_databases(&self, filters: &DescribeFilters) -> Result<Vec<Database>, AppError>;

    async fn create_database(&self, request: &CreateDatabase) -> Result<Database, AppError>;

    /// Deletes without taking a final snapshot.
    async fn delete_database(&self, id: &str) -> Result<(), AppError>;

    async fn describe_engine_versions(&self) -> Result<Vec<EngineVersion>, AppError>;

    async fn describe_parameter_groups(
        &self,
        filters: &DescribeFilters,
    ) -> Result<Vec<ParameterGroup>, AppError>;

    async fn create_parameter_group(&self, group: &ParameterGroup) -> Result<ParameterGroup, AppError>;

    async fn delete_parameter_group(&self, id: &str) -> Result<(), AppError>;

    async fn describe_parameters(
        &self,
        group_id: &str,
        options: &DescribeParametersOptions,
    ) -> Result<Vec<Parameter>, AppError>;

    async fn describe_security_groups(
        &self,
        filters: &DescribeFilters,
    ) -> Result<Vec<SecurityGroup>, AppError>;

    async fn create_security_group(&self, group: &SecurityGroup) -> Result<SecurityGroup, AppError>;

    async fn delete_security_group(&self, id: &str) -> Result<(), AppError>;
}

/// Builds a request-scoped RDS client against a cloud's own endpoint.
#[async_trait]
pub trait RdsConnector: Send + Sync {
    async fn connect(
        &self,
        credential: &CloudCredential,
        endpoint_url: &str,
        region: &str,
    ) -> Result<Arc<dyn RdsApi>, AppError>;
}

pub struct AwsRdsConnector;

#[async_trait]
impl RdsConnector for AwsRdsConnector {
    async fn connect(
        &self,
        credential: &CloudCredential,
        endpoint_url: &str,
        region: &str,
    ) -> Result<Arc<dyn RdsApi>, AppError> {
        debug!("Creating RDS client for {} at {}", credential.id, endpoint_url);

        let credentials = Credentials::new(
            credential.access_key.clone(),
            credential.secret_key.clone(),
            None,
            None,
            "cloud-broker",
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .endpoint_url(endpoint_url)
            .credentials_provider(credentials)
            .load()
            .await;

        Ok(Arc::new(AwsRds {
            client: Client::new(&sdk_config),
        }))
    }
}

pub struct AwsRds {
    client: Client,
}

#[async_trait]
impl RdsApi for AwsRds {
    #[instrument(skip(self))]
    async fn describe_databases(&self, filters: &DescribeFilters) -> Result<Vec<Database>, AppError> {
        let output = self
            .client
            .describe_db_instances()
            .set_db_instance_identifier(filters.identifier.clone())
            .set_marker(filters.marker.clone())
            .set_max_records(filters.max_records)
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(output.db_instances().iter().map(database_from_sdk).collect())
    }

    #[instrument(skip(self, request), fields(id = ?request.id))]
    async fn create_database(&self, request: &CreateDatabase) -> Result<Database, AppError> {
        let security_groups = (!request.security_group_names.is_empty())
            .then(|| request.security_group_names.clone());

        let output = self
            .client
            .create_db_instance()
            .set_db_instance_identifier(request.id.clone())
            .set_engine(request.engine.clone())
            .set_engine_version(request.engine_version.clone())
            .set_allocated_storage(request.allocated_storage)
            .set_master_username(request.master_username.clone())
            .set_master_user_password(request.password.clone())
            .db_instance_class(request.flavor())
            .set_db_name(request.db_name.clone())
            .set_availability_zone(request.availability_zone.clone())
            .set_multi_az(request.multi_az)
            .set_port(request.port)
            .set_db_parameter_group_name(request.parameter_group_name.clone())
            .set_db_security_groups(security_groups)
            .set_backup_retention_period(request.backup_retention_period)
            .set_preferred_backup_window(request.preferred_backup_window.clone())
            .set_preferred_maintenance_window(request.preferred_maintenance_window.clone())
            .set_license_model(request.license_model.clone())
            .set_auto_minor_version_upgrade(request.auto_minor_version_upgrade)
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(output
            .db_instance()
            .map(database_from_sdk)
            .unwrap_or_else(|| request.to_database()))
    }

    #[instrument(skip(self))]
    async fn delete_database(&self, id: &str) -> Result<(), AppError> {
        self.client
            .delete_db_instance()
            .db_instance_identifier(id)
            .skip_final_snapshot(true)
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn describe_engine_versions(&self) -> Result<Vec<EngineVersion>, AppError> {
        let output = self
            .client
            .describe_db_engine_versions()
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(output
            .db_engine_versions()
            .iter()
            .map(engine_version_from_sdk)
            .collect())
    }

    #[instrument(skip(self))]
    async fn describe_parameter_groups(
        &self,
        filters: &DescribeFilters,
    ) -> Result<Vec<ParameterGroup>, AppError> {
        let output = self
            .client
            .describe_db_parameter_groups()
            .set_db_parameter_group_name(filters.identifier.clone())
            .set_marker(filters.marker.clone())
            .set_max_records(filters.max_records)
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(output
            .db_parameter_groups()
            .iter()
            .map(parameter_group_from_sdk)
            .collect())
    }

    #[instrument(skip(self, group), fields(id = ?group.id))]
    async fn create_parameter_group(&self, group: &ParameterGroup) -> Result<ParameterGroup, AppError> {
        let output = self
            .client
            .create_db_parameter_group()
            .set_db_parameter_group_name(group.id.clone())
            .set_db_parameter_group_family(group.family.clone())
            .set_description(group.description.clone())
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(output
            .db_parameter_group()
            .map(parameter_group_from_sdk)
            .unwrap_or_else(|| group.clone()))
    }

    #[instrument(skip(self))]
    async fn delete_parameter_group(&self, id: &str) -> Result<(), AppError> {
        self.client
            .delete_db_parameter_group()
            .db_parameter_group_name(id)
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn describe_parameters(
        &self,
        group_id: &str,
        options: &DescribeParametersOptions,
    ) -> Result<Vec<Parameter>, AppError> {
        let output = self
            .client
            .describe_db_parameters()
            .db_parameter_group_name(group_id)
            .set_source(options.source.clone())
            .set_marker(options.marker.clone())
            .set_max_records(options.max_records)
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(output.parameters().iter().map(parameter_from_sdk).collect())
    }

    #[instrument(skip(self))]
    async fn describe_security_groups(
        &self,
        filters: &DescribeFilters,
    ) -> Result<Vec<SecurityGroup>, AppError> {
        let output = self
            .client
            .describe_db_security_groups()
            .set_db_security_group_name(filters.identifier.clone())
            .set_marker(filters.marker.clone())
            .set_max_records(filters.max_records)
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(output
            .db_security_groups()
            .iter()
            .map(security_group_from_sdk)
            .collect())
    }

    #[instrument(skip(self, group), fields(id = ?group.id))]
    async fn create_security_group(&self, group: &SecurityGroup) -> Result<SecurityGroup, AppError> {
        let output = self
            .client
            .create_db_security_group()
            .set_db_security_group_name(group.id.clone())
            .set_db_security_group_description(group.description.clone())
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(output
            .db_security_group()
            .map(security_group_from_sdk)
            .unwrap_or_else(|| group.clone()))
    }

    #[instrument(skip(self))]
    async fn delete_security_group(&self, id: &str) -> Result<(), AppError> {
        self.client
            .delete_db_security_group()
            .db_security_group_name(id)
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(())
    }
}

fn sdk_error<E>(err: SdkError<E, HttpResponse>) -> AppError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|response| response.status().as_u16());
    let detail = DisplayErrorContext(&err).to_string();
    let service_error = err.as_service_error();

    classify(
        service_error.and_then(|e| e.code()),
        service_error.and_then(|e| e.message()),
        status,
        &detail,
    )
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

fn to_chrono(timestamp: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}

fn database_from_sdk(instance: &DbInstance) -> Database {
    Database {
        id: owned(instance.db_instance_identifier()),
        engine: owned(instance.engine()),
        engine_version: owned(instance.engine_version()),
        state: owned(instance.db_instance_status()),
        flavor_id: owned(instance.db_instance_class()),
        allocated_storage: instance.allocated_storage(),
        master_username: owned(instance.master_username()),
        db_name: owned(instance.db_name()),
        endpoint: instance.endpoint().map(|endpoint| Endpoint {
            address: owned(endpoint.address()),
            port: endpoint.port(),
        }),
        availability_zone: owned(instance.availability_zone()),
        multi_az: instance.multi_az(),
        created_at: instance.instance_create_time().and_then(to_chrono),
        backup_retention_period: instance.backup_retention_period(),
        preferred_backup_window: owned(instance.preferred_backup_window()),
        preferred_maintenance_window: owned(instance.preferred_maintenance_window()),
        parameter_groups: instance
            .db_parameter_groups()
            .iter()
            .filter_map(|group| owned(group.db_parameter_group_name()))
            .collect(),
        security_groups: instance
            .db_security_groups()
            .iter()
            .filter_map(|group| owned(group.db_security_group_name()))
            .collect(),
        license_model: owned(instance.license_model()),
        auto_minor_version_upgrade: instance.auto_minor_version_upgrade(),
        read_replica_source: owned(instance.read_replica_source_db_instance_identifier()),
        read_replica_identifiers: instance.read_replica_db_instance_identifiers().to_vec(),
    }
}

fn engine_version_from_sdk(version: &DbEngineVersion) -> EngineVersion {
    EngineVersion {
        engine: owned(version.engine()),
        engine_version: owned(version.engine_version()),
        db_parameter_group_family: owned(version.db_parameter_group_family()),
        db_engine_description: owned(version.db_engine_description()),
        db_engine_version_description: owned(version.db_engine_version_description()),
    }
}

fn parameter_group_from_sdk(group: &DbParameterGroup) -> ParameterGroup {
    ParameterGroup {
        id: owned(group.db_parameter_group_name()),
        family: owned(group.db_parameter_group_family()),
        description: owned(group.description()),
    }
}

fn parameter_from_sdk(parameter: &AwsParameter) -> Parameter {
    Parameter {
        name: owned(parameter.parameter_name()),
        value: owned(parameter.parameter_value()),
        description: owned(parameter.description()),
        source: owned(parameter.source()),
        apply_type: owned(parameter.apply_type()),
        data_type: owned(parameter.data_type()),
        allowed_values: owned(parameter.allowed_values()),
        is_modifiable: parameter.is_modifiable(),
        minimum_engine_version: owned(parameter.minimum_engine_version()),
        apply_method: parameter.apply_method().map(|method| method.as_str().to_string()),
    }
}

fn security_group_from_sdk(group: &DbSecurityGroup) -> SecurityGroup {
    SecurityGroup {
        id: owned(group.db_security_group_name()),
        description: owned(group.db_security_group_description()),
        owner_id: owned(group.owner_id()),
        vpc_id: owned(group.vpc_id()),
        ec2_security_groups: group
            .ec2_security_groups()
            .iter()
            .map(|ec2| Ec2SecurityGroup {
                name: owned(ec2.ec2_security_group_name()),
                owner_id: owned(ec2.ec2_security_group_owner_id()),
                status: owned(ec2.status()),
            })
            .collect(),
        ip_ranges: group
            .ip_ranges()
            .iter()
            .map(|range| IpRange {
                cidr_ip: owned(range.cidrip()),
                status: owned(range.status()),
            })
            .collect(),
    }
}
