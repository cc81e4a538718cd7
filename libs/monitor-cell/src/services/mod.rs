pub mod cloudwatch;
pub mod statistics;

pub use cloudwatch::{AwsMonitorConnector, MonitorApi, MonitorConnector};
