//! Reconciliation of one transfer configuration per warehouse table.
//!
//! The transfer service has no upsert. Each table is reconciled in two phases, first deleting
//! every configuration carrying the table's name and then creating a fresh one, after which a
//! single manual run is started on the new configuration. Repeated passes therefore converge
//! to one live configuration per table.

use chrono::Utc;
use tracing::{error, info};

use crate::clients::TransferService;
use crate::error::{TransferError, TransferResult};
use crate::naming::storage_data_path;
use crate::types::{
    PARQUET_FILE_FORMAT, S3_DATA_SOURCE_ID, StorageCredentials, TableIdentity, TransferConfig,
    TransferConfigDescriptor, TransferConfigId, TransferParams, TransferRun,
};

/// Result of reconciling the transfer configuration of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReconciliation {
    pub table: TableIdentity,
    /// Configurations removed during the purge phase.
    pub deleted: Vec<TransferConfigId>,
    pub created: TransferConfig,
    pub run: TransferRun,
}

/// A table whose reconciliation failed.
#[derive(Debug, Clone)]
pub struct FailedReconciliation {
    pub table: TableIdentity,
    pub error: TransferError,
}

/// Outcome of a reconciliation pass over several tables.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationReport {
    pub reconciled: Vec<TableReconciliation>,
    pub failed: Vec<FailedReconciliation>,
}

impl ReconciliationReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Returns an error aggregating every failed table, if any.
    pub fn error(&self) -> Option<TransferError> {
        if self.failed.is_empty() {
            return None;
        }

        let errors: Vec<TransferError> = self
            .failed
            .iter()
            .map(|failure| failure.error.clone())
            .collect();

        Some(errors.into())
    }

    /// Converts the report into the reconciled tables, or the aggregated error of the failed ones.
    pub fn into_result(self) -> TransferResult<Vec<TableReconciliation>> {
        match self.error() {
            Some(err) => Err(err),
            None => Ok(self.reconciled),
        }
    }
}

/// Reconciles the transfer configurations of a project.
#[derive(Debug, Clone)]
pub struct TransferConfigReconciler<T> {
    service: T,
    project_id: String,
    export_base_path: String,
    credentials: StorageCredentials,
}

impl<T> TransferConfigReconciler<T>
where
    T: TransferService,
{
    pub fn new(
        service: T,
        project_id: impl Into<String>,
        export_base_path: impl Into<String>,
        credentials: StorageCredentials,
    ) -> Self {
        Self {
            service,
            project_id: project_id.into(),
            export_base_path: export_base_path.into(),
            credentials,
        }
    }

    /// Builds the configuration loading the exported files of `table` into it.
    pub fn build_descriptor(&self, table: &TableIdentity) -> TransferConfigDescriptor {
        TransferConfigDescriptor {
            name: table.warehouse_table_id(),
            destination_dataset_id: table.dataset.dataset_id.clone(),
            data_source_id: S3_DATA_SOURCE_ID.to_owned(),
            params: TransferParams {
                destination_table_name_template: table.table_name.clone(),
                data_path: storage_data_path(&self.export_base_path, &table.storage_target),
                file_format: PARQUET_FILE_FORMAT.to_owned(),
                credentials: self.credentials.clone(),
            },
        }
    }

    /// Deletes every configuration of the project called `name` and returns their ids.
    pub async fn purge(&self, name: &str) -> TransferResult<Vec<TransferConfigId>> {
        let stale: Vec<TransferConfigId> = self
            .service
            .list_transfer_configs(&self.project_id)
            .await?
            .into_iter()
            .filter(|config| config.name == name)
            .map(|config| config.id)
            .collect();

        for id in &stale {
            self.service.delete_transfer_config(id).await?;
            info!(config = %id, name, "deleted stale transfer configuration");
        }

        Ok(stale)
    }

    /// Replaces the configuration of `table` and starts a manual run on the new one.
    pub async fn reconcile_table(&self, table: &TableIdentity) -> TransferResult<TableReconciliation> {
        let descriptor = self.build_descriptor(table);
        let deleted = self.purge(&descriptor.name).await?;

        let created = self
            .service
            .create_transfer_config(&self.project_id, &descriptor)
            .await?;
        info!(
            config = %created.id,
            name = %created.name,
            data_path = %descriptor.params.data_path,
            "created transfer configuration"
        );

        let run = self
            .service
            .start_manual_transfer_run(&created.id, Utc::now())
            .await?;
        info!(config = %created.id, run = %run.id, "started manual transfer run");

        Ok(TableReconciliation {
            table: table.clone(),
            deleted,
            created,
            run,
        })
    }

    /// Reconciles every table in order.
    ///
    /// A failing table is recorded in the report and does not stop the remaining ones.
    pub async fn reconcile_all(&self, tables: &[TableIdentity]) -> ReconciliationReport {
        let mut report = ReconciliationReport::default();

        for table in tables {
            match self.reconcile_table(table).await {
                Ok(reconciliation) => report.reconciled.push(reconciliation),
                Err(err) => {
                    error!(table = %table, error = %err, "failed to reconcile transfer configuration");
                    report.failed.push(FailedReconciliation {
                        table: table.clone(),
                        error: err,
                    });
                }
            }
        }

        report
    }
}
