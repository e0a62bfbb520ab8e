#![cfg(feature = "test-utils")]

use rds2bq::error::ErrorKind;
use rds2bq::pipeline::{TransferOutcome, TransferPipeline};
use rds2bq::test_utils::storage::MemoryObjectStorage;
use rds2bq::test_utils::warehouse::MemoryWarehouse;
use rds2bq::types::StorageCredentials;
use rds2bq_config::shared::TransfererConfig;
use rds2bq_telemetry::tracing::init_test_tracing;
use serde_json::json;

fn transferer_config() -> TransfererConfig {
    TransfererConfig {
        gc_project_id: "proj".to_owned(),
        bigquery_dataset_id: "proj.dataset".to_owned(),
        aws_secret_name_for_gc_service_account: "gc-service-account".to_owned(),
        aws_secret_name_for_iam_user: "iam-user".to_owned(),
        aws_secret_region: "ap-northeast-1".to_owned(),
        source_s3_bucket_name: "bucket".to_owned(),
        export_task_name: "task".to_owned(),
        gc_service_account_key_path: None,
    }
}

fn pipeline(
    storage: &MemoryObjectStorage,
    warehouse: &MemoryWarehouse,
) -> TransferPipeline<MemoryObjectStorage, MemoryWarehouse, MemoryWarehouse> {
    TransferPipeline::new(
        &transferer_config(),
        StorageCredentials::new("AKIAEXAMPLE", "secret"),
        storage.clone(),
        warehouse.clone(),
        warehouse.clone(),
    )
    .unwrap()
}

async fn put_status(storage: &MemoryObjectStorage, key: &str, targets: &[&str]) {
    let records: Vec<_> = targets
        .iter()
        .map(|target| json!({ "target": target, "status": "COMPLETE", "sizeGB": 0.1 }))
        .collect();
    let body = json!({ "exportTaskIdentifier": "task", "perTableStatus": records });

    storage
        .put_object("bucket", key, serde_json::to_vec(&body).unwrap())
        .await;
}

#[tokio::test]
async fn only_public_tables_are_transferred() {
    init_test_tracing();

    let storage = MemoryObjectStorage::new();
    let warehouse = MemoryWarehouse::new();
    put_status(
        &storage,
        "task/export_tables_info_task_from_1_to_2.json",
        &["db.public.users", "db.internal.sessions"],
    )
    .await;

    let outcome = pipeline(&storage, &warehouse).run().await.unwrap();

    let report = match outcome {
        TransferOutcome::Completed(report) => report,
        other => panic!("expected a completed transfer, got {other:?}"),
    };
    assert_eq!(report.reconciled.len(), 1);
    assert!(report.failed.is_empty());

    assert_eq!(warehouse.created_tables().await, vec!["proj.dataset.users"]);

    let configs = warehouse.transfer_configs().await;
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].name, "proj.dataset.users");
    assert_eq!(configs[0].destination_dataset_id, "dataset");
    assert_eq!(configs[0].data_source_id, "amazon_s3");
    assert_eq!(
        configs[0].data_path.as_deref(),
        Some("s3://bucket/task/db/public.users/*/*.parquet")
    );

    let runs = warehouse.runs().await;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].config_id, configs[0].id);
}

#[tokio::test]
async fn rerunning_converges_to_one_config_per_table() {
    init_test_tracing();

    let storage = MemoryObjectStorage::new();
    let warehouse = MemoryWarehouse::new();
    put_status(&storage, "task/export_tables_info_1.json", &["db.public.users"]).await;
    put_status(&storage, "task/export_tables_info_2.json", &["db.public.orders"]).await;
    let pipeline = pipeline(&storage, &warehouse);

    pipeline.run().await.unwrap();
    pipeline.run().await.unwrap();

    assert_eq!(
        warehouse.created_tables().await,
        vec!["proj.dataset.users", "proj.dataset.orders"]
    );
    assert_eq!(warehouse.transfer_configs_named("proj.dataset.users").await.len(), 1);
    assert_eq!(warehouse.transfer_configs_named("proj.dataset.orders").await.len(), 1);
    assert_eq!(warehouse.deleted_configs().await.len(), 2);
    assert_eq!(warehouse.runs().await.len(), 4);
}

#[tokio::test]
async fn missing_metadata_transfers_nothing() {
    init_test_tracing();

    let storage = MemoryObjectStorage::new();
    let warehouse = MemoryWarehouse::new();
    storage
        .put_object("bucket", "task/export_info_task.json", b"{}".to_vec())
        .await;

    let outcome = pipeline(&storage, &warehouse).run().await.unwrap();

    assert!(matches!(outcome, TransferOutcome::NoExportMetadata));
    assert!(warehouse.tables().await.is_empty());
    assert!(warehouse.transfer_configs().await.is_empty());
}

#[tokio::test]
async fn malformed_metadata_stops_before_touching_the_warehouse() {
    init_test_tracing();

    let storage = MemoryObjectStorage::new();
    let warehouse = MemoryWarehouse::new();
    put_status(&storage, "task/export_tables_info_1.json", &["db.public.users"]).await;
    storage
        .put_object(
            "bucket",
            "task/export_tables_info_2.json",
            serde_json::to_vec(&json!({ "status": "COMPLETE" })).unwrap(),
        )
        .await;

    let err = pipeline(&storage, &warehouse).run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MalformedMetadata);
    assert!(warehouse.tables().await.is_empty());
}

#[tokio::test]
async fn failing_table_is_reported_after_the_others_are_transferred() {
    init_test_tracing();

    let storage = MemoryObjectStorage::new();
    let warehouse = MemoryWarehouse::new();
    put_status(
        &storage,
        "task/export_tables_info_1.json",
        &["db.public.users", "db.public.orders", "db.public.items"],
    )
    .await;
    warehouse.fail_creates_of("proj.dataset.orders").await;

    let err = pipeline(&storage, &warehouse).run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TransferServiceFailed);
    let names: Vec<String> = warehouse
        .transfer_configs()
        .await
        .into_iter()
        .map(|config| config.name)
        .collect();
    assert_eq!(names, vec!["proj.dataset.users", "proj.dataset.items"]);
    assert_eq!(warehouse.runs().await.len(), 2);
}
