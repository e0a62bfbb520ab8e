use std::future::Future;

use chrono::{DateTime, Utc};

use crate::error::TransferResult;
use crate::types::{
    ExportTask, ExportTaskRequest, ObjectRef, Snapshot, TableIdentity, TransferConfig,
    TransferConfigDescriptor, TransferConfigId, TransferRun,
};

/// Service holding database snapshots and exporting them to object storage.
pub trait SnapshotSource {
    /// Returns up to `max_records` manually created snapshots of `instance_identifier`.
    ///
    /// The order of the returned snapshots is unspecified.
    fn list_manual_snapshots(
        &self,
        instance_identifier: &str,
        max_records: u32,
    ) -> impl Future<Output = TransferResult<Vec<Snapshot>>> + Send;

    /// Starts an asynchronous export of a snapshot to object storage.
    fn start_export_task(
        &self,
        request: ExportTaskRequest,
    ) -> impl Future<Output = TransferResult<ExportTask>> + Send;
}

/// Object storage holding the exported files and their status documents.
pub trait ObjectStorage {
    /// Lists the keys of every object in `bucket` whose key starts with `prefix`.
    ///
    /// Implementations follow pagination until the listing is exhausted.
    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> impl Future<Output = TransferResult<Vec<ObjectRef>>> + Send;

    /// Downloads the full content of an object.
    fn get_object(&self, object: &ObjectRef) -> impl Future<Output = TransferResult<Vec<u8>>> + Send;
}

/// Store of named secrets.
pub trait SecretsProvider {
    /// Returns the string value of the secret called `name`.
    fn get_secret_string(&self, name: &str) -> impl Future<Output = TransferResult<String>> + Send;
}

/// Table management in the warehouse.
pub trait WarehouseTables {
    /// Returns whether the table exists.
    ///
    /// A missing table is not an error.
    fn table_exists(&self, table: &TableIdentity) -> impl Future<Output = TransferResult<bool>> + Send;

    /// Creates a table without schema; the schema is inferred from the loaded files.
    fn create_empty_table(
        &self,
        table: &TableIdentity,
    ) -> impl Future<Output = TransferResult<()>> + Send;
}

/// Control plane of the warehouse transfer service.
pub trait TransferService {
    /// Lists every transfer configuration owned by `project_id`.
    fn list_transfer_configs(
        &self,
        project_id: &str,
    ) -> impl Future<Output = TransferResult<Vec<TransferConfig>>> + Send;

    /// Deletes a transfer configuration.
    fn delete_transfer_config(
        &self,
        id: &TransferConfigId,
    ) -> impl Future<Output = TransferResult<()>> + Send;

    /// Creates a transfer configuration in `project_id`.
    fn create_transfer_config(
        &self,
        project_id: &str,
        descriptor: &TransferConfigDescriptor,
    ) -> impl Future<Output = TransferResult<TransferConfig>> + Send;

    /// Starts a manual run of a transfer configuration for `requested_run_time`.
    fn start_manual_transfer_run(
        &self,
        id: &TransferConfigId,
        requested_run_time: DateTime<Utc>,
    ) -> impl Future<Output = TransferResult<TransferRun>> + Send;
}
