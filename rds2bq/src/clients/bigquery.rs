use gcp_bigquery_client::Client;
use gcp_bigquery_client::client_builder::ClientBuilder;
use gcp_bigquery_client::error::BQError;
use gcp_bigquery_client::model::table::Table;
use gcp_bigquery_client::model::table_schema::TableSchema;
use gcp_bigquery_client::yup_oauth2::ServiceAccountKey;
use tracing::debug;

use crate::clients::WarehouseTables;
use crate::error::TransferResult;
use crate::types::TableIdentity;

/// Table management backed by the BigQuery REST API.
#[derive(Clone)]
pub struct BigQueryClient {
    client: Client,
}

impl std::fmt::Debug for BigQueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BigQueryClient").finish_non_exhaustive()
    }
}

impl BigQueryClient {
    /// Creates a client authenticated with a service account key.
    pub async fn new_with_key(sa_key: ServiceAccountKey) -> TransferResult<BigQueryClient> {
        let client = ClientBuilder::new()
            .build_from_service_account_key(sa_key, false)
            .await?;

        Ok(BigQueryClient { client })
    }
}

impl WarehouseTables for BigQueryClient {
    async fn table_exists(&self, table: &TableIdentity) -> TransferResult<bool> {
        let result = self
            .client
            .table()
            .get(
                &table.dataset.project_id,
                &table.dataset.dataset_id,
                &table.table_name,
                None,
            )
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(BQError::ResponseError { error }) if error.error.code == 404 => {
                debug!(table = %table, "table not found");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn create_empty_table(&self, table: &TableIdentity) -> TransferResult<()> {
        let empty_table = Table::new(
            &table.dataset.project_id,
            &table.dataset.dataset_id,
            &table.table_name,
            TableSchema::new(vec![]),
        );

        self.client.table().create(empty_table).await?;

        Ok(())
    }
}
