//! End-to-end transfer of an exported snapshot into the warehouse.

use rds2bq_config::shared::TransfererConfig;
use tracing::{info, warn};

use crate::clients::{ObjectStorage, TransferService, WarehouseTables};
use crate::error::TransferResult;
use crate::metadata::ExportMetadataAggregator;
use crate::naming::derive_table_identities;
use crate::provisioner::WarehouseTableProvisioner;
use crate::reconciler::{ReconciliationReport, TransferConfigReconciler};
use crate::types::{StorageCredentials, WarehouseDatasetId};

/// Outcome of a transfer pipeline run.
#[derive(Debug, Clone)]
pub enum TransferOutcome {
    /// The export task has no status document; nothing was transferred.
    NoExportMetadata,
    /// Every exported table was provisioned and reconciled.
    Completed(ReconciliationReport),
}

/// Loads the tables of a completed export into the warehouse.
///
/// A run reads the export status documents, derives one warehouse table per exported table,
/// creates missing tables and reconciles their transfer configurations one table at a time.
#[derive(Debug)]
pub struct TransferPipeline<S, W, T> {
    metadata: ExportMetadataAggregator<S>,
    provisioner: WarehouseTableProvisioner<W>,
    reconciler: TransferConfigReconciler<T>,
    dataset: WarehouseDatasetId,
    bucket: String,
    export_task_name: String,
}

impl<S, W, T> TransferPipeline<S, W, T>
where
    S: ObjectStorage,
    W: WarehouseTables,
    T: TransferService,
{
    /// Creates a pipeline for the export task described by `config`.
    pub fn new(
        config: &TransfererConfig,
        credentials: StorageCredentials,
        storage: S,
        tables: W,
        transfers: T,
    ) -> TransferResult<Self> {
        let dataset = WarehouseDatasetId::parse(&config.bigquery_dataset_id, &config.gc_project_id)?;

        Ok(Self {
            metadata: ExportMetadataAggregator::new(storage),
            provisioner: WarehouseTableProvisioner::new(tables),
            reconciler: TransferConfigReconciler::new(
                transfers,
                config.gc_project_id.clone(),
                config.export_base_path(),
                credentials,
            ),
            dataset,
            bucket: config.source_s3_bucket_name.clone(),
            export_task_name: config.export_task_name.clone(),
        })
    }

    /// Runs the pipeline.
    ///
    /// Returns [`TransferOutcome::NoExportMetadata`] when the export wrote no status document.
    /// Every table is attempted before returning; if any of them failed, the failures are
    /// returned as one aggregated error.
    pub async fn run(&self) -> TransferResult<TransferOutcome> {
        let Some(document) = self
            .metadata
            .download_export_status(&self.bucket, &self.export_task_name)
            .await?
        else {
            warn!(
                bucket = %self.bucket,
                task = %self.export_task_name,
                "no export status document found, nothing to transfer"
            );

            return Ok(TransferOutcome::NoExportMetadata);
        };

        let identities = derive_table_identities(&self.dataset, &document);
        info!(
            records = document.per_table_status.len(),
            tables = identities.len(),
            dataset = %self.dataset,
            "derived warehouse tables from export"
        );

        let provisioned = self.provisioner.ensure_tables(&identities).await?;
        let created = provisioned.iter().filter(|table| table.created).count();
        info!(tables = provisioned.len(), created, "warehouse tables are in place");

        let report = self.reconciler.reconcile_all(&identities).await;
        info!(
            reconciled = report.reconciled.len(),
            failed = report.failed.len(),
            "transfer configurations reconciled"
        );

        if let Some(err) = report.error() {
            return Err(err);
        }

        Ok(TransferOutcome::Completed(report))
    }
}
