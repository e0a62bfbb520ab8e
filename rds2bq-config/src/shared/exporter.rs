use serde::{Deserialize, Serialize};

use crate::Config;
use crate::shared::ValidationError;
use crate::shared::base::require_non_empty;

/// Number of snapshots requested from the snapshot service when not configured.
pub const DEFAULT_MAX_SNAPSHOTS: u32 = 20;

/// Smallest page size the snapshot service accepts.
const MIN_MAX_SNAPSHOTS: u32 = 20;

/// Largest page size the snapshot service accepts.
const MAX_MAX_SNAPSHOTS: u32 = 100;

/// Configuration of the snapshot export service.
///
/// Every field maps to the upper-case environment variable of the same name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Database instance whose manual snapshots are exported.
    pub rds_instance_identifier: String,
    /// KMS key used to encrypt the exported files.
    pub rds_kms_id: String,
    /// Bucket receiving the exported files.
    pub destination_s3_name: String,
    /// Prefix inside the bucket under which export tasks write.
    pub destination_s3_prefix: String,
    /// Role the snapshot service assumes to write to the bucket.
    pub access_s3_role_arn: String,
    /// How many snapshots to consider when looking for the latest one.
    #[serde(default = "default_max_snapshots")]
    pub max_snapshots: u32,
}

fn default_max_snapshots() -> u32 {
    DEFAULT_MAX_SNAPSHOTS
}

impl Config for ExporterConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("rds_instance_identifier", &self.rds_instance_identifier)?;
        require_non_empty("rds_kms_id", &self.rds_kms_id)?;
        require_non_empty("destination_s3_name", &self.destination_s3_name)?;
        require_non_empty("access_s3_role_arn", &self.access_s3_role_arn)?;

        if !(MIN_MAX_SNAPSHOTS..=MAX_MAX_SNAPSHOTS).contains(&self.max_snapshots) {
            return Err(ValidationError::MaxSnapshotsOutOfRange {
                min: MIN_MAX_SNAPSHOTS,
                max: MAX_MAX_SNAPSHOTS,
                actual: self.max_snapshots,
            });
        }

        Ok(())
    }
}
