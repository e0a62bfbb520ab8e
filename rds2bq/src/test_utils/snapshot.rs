use std::sync::Arc;

use tokio::sync::Mutex;

use crate::clients::SnapshotSource;
use crate::error::TransferResult;
use crate::types::{ExportTask, ExportTaskRequest, Snapshot};

#[derive(Debug, Default)]
struct Inner {
    snapshots: Vec<(String, Snapshot)>,
    export_requests: Vec<ExportTaskRequest>,
}

/// In-memory snapshot service.
///
/// Lists snapshots in insertion order and records every export request.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotSource {
    inner: Arc<Mutex<Inner>>,
}

impl MemorySnapshotSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a manual snapshot of `instance_identifier`.
    pub async fn add_snapshot(&self, instance_identifier: &str, snapshot: Snapshot) {
        let mut inner = self.inner.lock().await;
        inner
            .snapshots
            .push((instance_identifier.to_owned(), snapshot));
    }

    /// Returns every export request received so far.
    pub async fn export_requests(&self) -> Vec<ExportTaskRequest> {
        let inner = self.inner.lock().await;
        inner.export_requests.clone()
    }
}

impl SnapshotSource for MemorySnapshotSource {
    async fn list_manual_snapshots(
        &self,
        instance_identifier: &str,
        max_records: u32,
    ) -> TransferResult<Vec<Snapshot>> {
        let inner = self.inner.lock().await;

        Ok(inner
            .snapshots
            .iter()
            .filter(|(instance, _)| instance == instance_identifier)
            .map(|(_, snapshot)| snapshot.clone())
            .take(max_records as usize)
            .collect())
    }

    async fn start_export_task(&self, request: ExportTaskRequest) -> TransferResult<ExportTask> {
        let mut inner = self.inner.lock().await;

        let task = ExportTask {
            task_identifier: request.task_identifier.clone(),
            source_arn: request.source_arn.clone(),
            status: Some("STARTING".to_owned()),
        };
        inner.export_requests.push(request);

        Ok(task)
    }
}
