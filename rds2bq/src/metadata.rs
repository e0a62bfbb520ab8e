//! Discovery and aggregation of the per-table status documents written by an export.
//!
//! A completed export writes one or more `export_tables_info_*.json` documents at the root
//! of its task prefix. Together they describe every exported table.

use serde_json::Value;
use tracing::{debug, info};

use crate::clients::ObjectStorage;
use crate::error::{ErrorKind, TransferResult};
use crate::types::{ExportStatusDocument, ObjectRef};
use crate::{bail, transfer_error};

/// Key of the table record collection in a status document.
const PER_TABLE_STATUS_KEY: &str = "perTableStatus";

/// File name prefix of the status documents under the task prefix.
const STATUS_FILE_PREFIX: &str = "export_tables_info_";

/// Suffix of the status documents.
const STATUS_FILE_SUFFIX: &str = ".json";

/// Reads the export status documents of an export task from object storage.
#[derive(Debug, Clone)]
pub struct ExportMetadataAggregator<S> {
    storage: S,
}

impl<S> ExportMetadataAggregator<S>
where
    S: ObjectStorage,
{
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Lists the status documents written under `export_task_prefix`.
    ///
    /// Files keep the order returned by the listing.
    pub async fn discover_status_files(
        &self,
        bucket: &str,
        export_task_prefix: &str,
    ) -> TransferResult<Vec<ObjectRef>> {
        let prefix = format!(
            "{}/{STATUS_FILE_PREFIX}",
            export_task_prefix.trim_end_matches('/')
        );

        let files: Vec<ObjectRef> = self
            .storage
            .list_objects(bucket, &prefix)
            .await?
            .into_iter()
            .filter(|object| object.key.ends_with(STATUS_FILE_SUFFIX))
            .collect();

        debug!(bucket, prefix = %prefix, count = files.len(), "discovered export status files");

        Ok(files)
    }

    /// Downloads `files` and merges them into one document.
    ///
    /// The first document is kept whole and the table records of every following document
    /// are appended to it. Returns [`None`] when `files` is empty. Fails with
    /// [`ErrorKind::MalformedMetadata`] if any document lacks its table records.
    pub async fn aggregate(
        &self,
        files: &[ObjectRef],
    ) -> TransferResult<Option<ExportStatusDocument>> {
        let mut aggregated: Option<ExportStatusDocument> = None;

        for file in files {
            let body = self.storage.get_object(file).await?;
            let document = parse_status_document(file, &body)?;

            aggregated = Some(match aggregated.take() {
                Some(mut accumulator) => {
                    accumulator.append(document);
                    accumulator
                }
                None => document,
            });
        }

        Ok(aggregated)
    }

    /// Discovers and aggregates the status documents of an export task.
    pub async fn download_export_status(
        &self,
        bucket: &str,
        export_task_prefix: &str,
    ) -> TransferResult<Option<ExportStatusDocument>> {
        let files = self.discover_status_files(bucket, export_task_prefix).await?;
        let document = self.aggregate(&files).await?;

        if let Some(document) = &document {
            info!(
                files = files.len(),
                tables = document.per_table_status.len(),
                "aggregated export status documents"
            );
        }

        Ok(document)
    }
}

/// Parses a status document, requiring its table record collection.
fn parse_status_document(file: &ObjectRef, body: &[u8]) -> TransferResult<ExportStatusDocument> {
    let value: Value = serde_json::from_slice(body)?;

    if value.get(PER_TABLE_STATUS_KEY).is_none() {
        bail!(
            ErrorKind::MalformedMetadata,
            "Export status document has no table records",
            format!("`{PER_TABLE_STATUS_KEY}` is missing in {file}")
        );
    }

    let document = serde_json::from_value(value).map_err(|err| {
        transfer_error!(
            ErrorKind::MalformedMetadata,
            "Export status document is malformed",
            format!("{file}: {err}"),
            source: err
        )
    })?;

    Ok(document)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_utils::storage::MemoryObjectStorage;

    const BUCKET: &str = "bucket";

    async fn storage_with(objects: &[(&str, Value)]) -> MemoryObjectStorage {
        let storage = MemoryObjectStorage::new();
        for (key, body) in objects {
            storage
                .put_object(BUCKET, key, serde_json::to_vec(body).unwrap())
                .await;
        }

        storage
    }

    fn targets(document: &ExportStatusDocument) -> Vec<&str> {
        document
            .per_table_status
            .iter()
            .map(|record| record.target.as_str())
            .collect()
    }

    #[tokio::test]
    async fn discovers_only_json_status_files() {
        let storage = storage_with(&[
            ("task/export_tables_info_1.json", json!({ "perTableStatus": [] })),
            ("task/export_tables_info_1.json.tmp", json!({})),
            ("task/export_info_task.json", json!({})),
            ("task/db/public.users/1/part-0.parquet", json!({})),
        ])
        .await;
        let aggregator = ExportMetadataAggregator::new(storage);

        let files = aggregator.discover_status_files(BUCKET, "task").await.unwrap();

        assert_eq!(
            files,
            vec![ObjectRef::new(BUCKET, "task/export_tables_info_1.json")]
        );
    }

    #[tokio::test]
    async fn aggregation_concatenates_records_in_file_order() {
        let storage = storage_with(&[
            (
                "task/export_tables_info_a.json",
                json!({
                    "exportTaskIdentifier": "task",
                    "perTableStatus": [
                        { "target": "db.public.a", "status": "COMPLETE" },
                        { "target": "db.public.b" }
                    ]
                }),
            ),
            (
                "task/export_tables_info_b.json",
                json!({
                    "exportTaskIdentifier": "other",
                    "perTableStatus": [{ "target": "db.public.c", "sizeGB": 1.5 }]
                }),
            ),
        ])
        .await;
        let aggregator = ExportMetadataAggregator::new(storage);
        let files = vec![
            ObjectRef::new(BUCKET, "task/export_tables_info_b.json"),
            ObjectRef::new(BUCKET, "task/export_tables_info_a.json"),
        ];

        let document = aggregator.aggregate(&files).await.unwrap().unwrap();

        assert_eq!(targets(&document), vec!["db.public.c", "db.public.a", "db.public.b"]);
        assert_eq!(document.extra["exportTaskIdentifier"], json!("other"));
        assert_eq!(document.per_table_status[1].extra["status"], json!("COMPLETE"));
    }

    #[tokio::test]
    async fn no_files_yield_no_document() {
        let aggregator = ExportMetadataAggregator::new(MemoryObjectStorage::new());

        assert_eq!(aggregator.aggregate(&[]).await.unwrap(), None);
        assert_eq!(
            aggregator.download_export_status(BUCKET, "task").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn missing_table_records_are_malformed() {
        let storage = storage_with(&[
            (
                "task/export_tables_info_1.json",
                json!({ "perTableStatus": [{ "target": "db.public.a" }] }),
            ),
            ("task/export_tables_info_2.json", json!({ "tables": [] })),
        ])
        .await;
        let aggregator = ExportMetadataAggregator::new(storage);

        let err = aggregator
            .download_export_status(BUCKET, "task")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedMetadata);
    }

    #[tokio::test]
    async fn records_without_target_are_malformed() {
        let storage = storage_with(&[(
            "task/export_tables_info_1.json",
            json!({ "perTableStatus": [{ "status": "COMPLETE" }] }),
        )])
        .await;
        let aggregator = ExportMetadataAggregator::new(storage);

        let err = aggregator
            .download_export_status(BUCKET, "task")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedMetadata);
    }
}
