use aws_config::SdkConfig;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::clients::{SnapshotSource, aws_sdk_error};
use crate::error::{ErrorKind, TransferResult};
use crate::types::{ExportTask, ExportTaskRequest, Snapshot};

/// Snapshot type of snapshots taken on demand.
const MANUAL_SNAPSHOT_TYPE: &str = "manual";

/// Snapshot source backed by Amazon RDS.
#[derive(Debug, Clone)]
pub struct RdsSnapshotSource {
    client: aws_sdk_rds::Client,
}

impl RdsSnapshotSource {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_rds::Client::new(sdk_config),
        }
    }
}

impl SnapshotSource for RdsSnapshotSource {
    async fn list_manual_snapshots(
        &self,
        instance_identifier: &str,
        max_records: u32,
    ) -> TransferResult<Vec<Snapshot>> {
        let output = self
            .client
            .describe_db_snapshots()
            .db_instance_identifier(instance_identifier)
            .snapshot_type(MANUAL_SNAPSHOT_TYPE)
            .max_records(i32::try_from(max_records).unwrap_or(i32::MAX))
            .send()
            .await
            .map_err(|err| {
                aws_sdk_error(
                    ErrorKind::SnapshotServiceFailed,
                    "Failed to describe database snapshots",
                    err,
                )
            })?;

        let mut snapshots = Vec::with_capacity(output.db_snapshots().len());
        for db_snapshot in output.db_snapshots() {
            let identifier = db_snapshot.db_snapshot_identifier();
            let arn = db_snapshot.db_snapshot_arn();
            let created_at = db_snapshot
                .snapshot_create_time()
                .and_then(|time| DateTime::<Utc>::from_timestamp(time.secs(), time.subsec_nanos()));

            match (identifier, arn, created_at) {
                (Some(identifier), Some(arn), Some(created_at)) => {
                    snapshots.push(Snapshot::new(identifier, created_at, arn));
                }
                _ => {
                    warn!(
                        identifier = identifier.unwrap_or("unknown"),
                        "skipping snapshot without identifier, arn or creation time"
                    );
                }
            }
        }

        debug!(instance_identifier, count = snapshots.len(), "described manual snapshots");

        Ok(snapshots)
    }

    async fn start_export_task(&self, request: ExportTaskRequest) -> TransferResult<ExportTask> {
        let output = self
            .client
            .start_export_task()
            .export_task_identifier(&request.task_identifier)
            .source_arn(&request.source_arn)
            .s3_bucket_name(&request.s3_bucket_name)
            .s3_prefix(&request.s3_prefix)
            .kms_key_id(&request.kms_key_id)
            .iam_role_arn(&request.iam_role_arn)
            .send()
            .await
            .map_err(|err| {
                aws_sdk_error(
                    ErrorKind::SnapshotServiceFailed,
                    "Failed to start snapshot export task",
                    err,
                )
            })?;

        Ok(ExportTask {
            task_identifier: output
                .export_task_identifier()
                .map(str::to_owned)
                .unwrap_or(request.task_identifier),
            source_arn: output
                .source_arn()
                .map(str::to_owned)
                .unwrap_or(request.source_arn),
            status: output.status().map(str::to_owned),
        })
    }
}
