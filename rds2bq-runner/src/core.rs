use aws_config::{BehaviorVersion, Region};
use chrono::Utc;
use rds2bq::clients::bigquery::BigQueryClient;
use rds2bq::clients::data_transfer::DataTransferClient;
use rds2bq::clients::rds::RdsSnapshotSource;
use rds2bq::clients::s3::S3ObjectStorage;
use rds2bq::clients::secrets::{
    SecretsManagerProvider, fetch_service_account_key, fetch_storage_credentials,
    parse_service_account_key,
};
use rds2bq::pipeline::{TransferOutcome, TransferPipeline};
use rds2bq::snapshot::{ExportOutcome, SnapshotExporter};
use rds2bq_config::shared::{ExporterConfig, TransfererConfig};
use tracing::info;

use crate::error::RunnerResult;

/// Requests the export of the latest manual snapshot of the configured instance.
///
/// AWS credentials and region come from the default provider chain.
pub async fn export_snapshot(config: ExporterConfig) -> RunnerResult<ExportOutcome> {
    let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let exporter = SnapshotExporter::new(RdsSnapshotSource::new(&sdk_config), config);

    let outcome = exporter.export(Utc::now()).await?;
    match &outcome {
        ExportOutcome::Started { task, .. } => {
            info!(task = %task.task_identifier, "snapshot export requested");
        }
        ExportOutcome::NoSnapshot => info!("no snapshot to export"),
    }

    Ok(outcome)
}

/// Loads the tables of a completed export into BigQuery.
///
/// Secrets are read from the configured secrets region. When `gc_service_account_key_path`
/// is set, the service account key is read from that file instead.
pub async fn transfer_to_bigquery(config: TransfererConfig) -> RunnerResult<TransferOutcome> {
    let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let secrets_sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws_secret_region.clone()))
        .load()
        .await;
    let secrets = SecretsManagerProvider::new(&secrets_sdk_config);

    let credentials =
        fetch_storage_credentials(&secrets, &config.aws_secret_name_for_iam_user).await?;
    let sa_key = match &config.gc_service_account_key_path {
        Some(path) => {
            info!(path = %path, "reading service account key from file");
            let raw = tokio::fs::read_to_string(path).await?;
            parse_service_account_key(&raw)?
        }
        None => {
            fetch_service_account_key(&secrets, &config.aws_secret_name_for_gc_service_account)
                .await?
        }
    };

    let bigquery = BigQueryClient::new_with_key(sa_key.clone()).await?;
    let data_transfer = DataTransferClient::new_with_key(sa_key).await?;

    let pipeline = TransferPipeline::new(
        &config,
        credentials,
        S3ObjectStorage::new(&sdk_config),
        bigquery,
        data_transfer,
    )?;

    info!(
        source = %config.export_base_path(),
        dataset = %config.bigquery_dataset_id,
        "starting transfer to bigquery"
    );

    let outcome = pipeline.run().await?;
    match &outcome {
        TransferOutcome::Completed(report) => {
            info!(tables = report.reconciled.len(), "transfer to bigquery completed");
        }
        TransferOutcome::NoExportMetadata => info!("nothing to transfer"),
    }

    Ok(outcome)
}
