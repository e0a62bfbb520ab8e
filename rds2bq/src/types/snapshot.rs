use std::fmt;

use chrono::{DateTime, Utc};

/// A manual snapshot of a database instance, as reported by the snapshot service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub identifier: String,
    pub created_at: DateTime<Utc>,
    /// Storage-layer reference used as the export source.
    pub arn: String,
}

impl Snapshot {
    pub fn new(
        identifier: impl Into<String>,
        created_at: DateTime<Utc>,
        arn: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            created_at,
            arn: arn.into(),
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.identifier, self.created_at.to_rfc3339())
    }
}

/// Parameters of an export task request sent to the snapshot service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTaskRequest {
    pub task_identifier: String,
    pub source_arn: String,
    pub s3_bucket_name: String,
    pub s3_prefix: String,
    pub kms_key_id: String,
    pub iam_role_arn: String,
}

/// An export task accepted by the snapshot service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTask {
    pub task_identifier: String,
    pub source_arn: String,
    /// Status reported by the service when the task was accepted, if any.
    pub status: Option<String>,
}
