use std::fmt;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, Secret, SecretString};

/// Data source of transfer configurations loading from Amazon S3.
pub const S3_DATA_SOURCE_ID: &str = "amazon_s3";

/// File format of the exported table data.
pub const PARQUET_FILE_FORMAT: &str = "PARQUET";

/// Server-assigned resource name of a transfer configuration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransferConfigId(String);

impl TransferConfigId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransferConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A transfer configuration as it exists in the transfer service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    pub id: TransferConfigId,
    /// Logical name, used as the sole matching key during reconciliation.
    pub name: String,
    pub destination_dataset_id: String,
    pub data_source_id: String,
    pub data_path: Option<String>,
    pub destination_table_name_template: Option<String>,
    pub auto_scheduling_disabled: bool,
}

/// Access credentials for reading the exported files from object storage.
#[derive(Debug, Clone)]
pub struct StorageCredentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
}

impl PartialEq for StorageCredentials {
    fn eq(&self, other: &Self) -> bool {
        self.access_key_id == other.access_key_id
            && self.secret_access_key.expose_secret() == other.secret_access_key.expose_secret()
    }
}

impl StorageCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: Secret::new(secret_access_key.into()),
        }
    }
}

/// Connector parameters of an S3 transfer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferParams {
    pub destination_table_name_template: String,
    pub data_path: String,
    pub file_format: String,
    pub credentials: StorageCredentials,
}

/// Everything needed to create a transfer configuration.
///
/// Configurations are always created with auto-scheduling disabled; runs are triggered
/// manually.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferConfigDescriptor {
    pub name: String,
    pub destination_dataset_id: String,
    pub data_source_id: String,
    pub params: TransferParams,
}

/// A manual run started against a transfer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRun {
    pub id: String,
    pub config_id: TransferConfigId,
    pub requested_run_time: DateTime<Utc>,
}
