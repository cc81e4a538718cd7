pub mod rds;

pub use rds::{AwsRdsConnector, RdsApi, RdsConnector};
