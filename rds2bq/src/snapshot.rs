//! Selection of the latest manual snapshot and its export to object storage.

use chrono::{DateTime, FixedOffset, Utc};
use rds2bq_config::shared::ExporterConfig;
use tracing::{info, warn};

use crate::clients::SnapshotSource;
use crate::error::{ErrorKind, TransferResult};
use crate::transfer_error;
use crate::types::{ExportTask, ExportTaskRequest, Snapshot};

/// Offset of Japan Standard Time from UTC, in seconds.
const JST_OFFSET_SECONDS: i32 = 9 * 3600;

/// Prefix of every export task identifier.
const EXPORT_TASK_PREFIX: &str = "ExportTaskAt-";

/// Outcome of a snapshot export request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// An export task was started for the latest snapshot.
    Started {
        snapshot: Snapshot,
        task: ExportTask,
    },
    /// The instance has no manual snapshot; nothing was exported.
    NoSnapshot,
}

/// Returns the most recent snapshot among the first `max_candidates` entries.
///
/// Snapshots with equal creation times keep their relative order, so the earliest listed
/// one wins a tie.
pub fn select_latest(mut snapshots: Vec<Snapshot>, max_candidates: usize) -> Option<Snapshot> {
    snapshots.truncate(max_candidates);
    // `sort_by` is stable.
    snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    snapshots.into_iter().next()
}

/// Builds the identifier of an export task started at `now`, rendered in JST.
pub fn export_task_identifier(now: DateTime<Utc>) -> TransferResult<String> {
    let jst = FixedOffset::east_opt(JST_OFFSET_SECONDS).ok_or_else(|| {
        transfer_error!(
            ErrorKind::InvalidData,
            "Invalid time zone offset",
            JST_OFFSET_SECONDS
        )
    })?;

    Ok(format!(
        "{EXPORT_TASK_PREFIX}{}",
        now.with_timezone(&jst).format("%Y-%m-%d-%H-%M-%S")
    ))
}

/// Exports the latest manual snapshot of a database instance.
#[derive(Debug)]
pub struct SnapshotExporter<S> {
    source: S,
    config: ExporterConfig,
}

impl<S> SnapshotExporter<S>
where
    S: SnapshotSource,
{
    pub fn new(source: S, config: ExporterConfig) -> Self {
        Self { source, config }
    }

    /// Finds the latest manual snapshot and starts exporting it.
    ///
    /// Returns [`ExportOutcome::NoSnapshot`] without error when the instance has no manual
    /// snapshot.
    pub async fn export(&self, now: DateTime<Utc>) -> TransferResult<ExportOutcome> {
        let snapshots = self
            .source
            .list_manual_snapshots(
                &self.config.rds_instance_identifier,
                self.config.max_snapshots,
            )
            .await?;

        info!(
            instance = %self.config.rds_instance_identifier,
            count = snapshots.len(),
            "queried manual snapshots"
        );

        let Some(snapshot) = select_latest(snapshots, self.config.max_snapshots as usize) else {
            warn!(
                instance = %self.config.rds_instance_identifier,
                "no manual snapshot found, skipping export"
            );

            return Ok(ExportOutcome::NoSnapshot);
        };

        let request = ExportTaskRequest {
            task_identifier: export_task_identifier(now)?,
            source_arn: snapshot.arn.clone(),
            s3_bucket_name: self.config.destination_s3_name.clone(),
            s3_prefix: self.config.destination_s3_prefix.clone(),
            kms_key_id: self.config.rds_kms_id.clone(),
            iam_role_arn: self.config.access_s3_role_arn.clone(),
        };

        info!(
            snapshot = %snapshot,
            task = %request.task_identifier,
            bucket = %request.s3_bucket_name,
            "starting snapshot export"
        );

        let task = self.source.start_export_task(request).await?;

        info!(
            task = %task.task_identifier,
            status = task.status.as_deref().unwrap_or("unknown"),
            "snapshot export started"
        );

        Ok(ExportOutcome::Started { snapshot, task })
    }
}
