use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::bail;
use crate::clients::{TransferService, WarehouseTables};
use crate::error::{ErrorKind, TransferResult};
use crate::types::{
    TableIdentity, TransferConfig, TransferConfigDescriptor, TransferConfigId, TransferRun,
};

/// Inner state of [`MemoryWarehouse`].
#[derive(Debug, Default)]
struct Inner {
    /// Fully-qualified ids of existing tables.
    tables: BTreeSet<String>,
    /// Every table creation, in call order.
    created_tables: Vec<String>,
    /// Live transfer configurations, in creation order.
    configs: Vec<TransferConfig>,
    /// Every deleted configuration, in call order.
    deleted_configs: Vec<TransferConfigId>,
    /// Every manual run started, in call order.
    runs: Vec<TransferRun>,
    next_config_number: u64,
    failing_deletes: HashSet<String>,
    failing_creates: HashSet<String>,
}

/// In-memory warehouse serving both table management and the transfer service.
#[derive(Debug, Clone, Default)]
pub struct MemoryWarehouse {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an existing table by its fully-qualified id.
    pub async fn add_table(&self, table_id: &str) {
        let mut inner = self.inner.lock().await;
        inner.tables.insert(table_id.to_owned());
    }

    /// Registers an existing transfer configuration and returns its id.
    pub async fn add_transfer_config(
        &self,
        project_id: &str,
        descriptor: &TransferConfigDescriptor,
    ) -> TransferConfigId {
        let mut inner = self.inner.lock().await;
        let config = inner.insert_config(project_id, descriptor);

        config.id
    }

    /// Makes every deletion of a configuration called `name` fail.
    pub async fn fail_deletes_of(&self, name: &str) {
        let mut inner = self.inner.lock().await;
        inner.failing_deletes.insert(name.to_owned());
    }

    /// Makes every creation of a configuration called `name` fail.
    pub async fn fail_creates_of(&self, name: &str) {
        let mut inner = self.inner.lock().await;
        inner.failing_creates.insert(name.to_owned());
    }

    pub async fn tables(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner.tables.iter().cloned().collect()
    }

    pub async fn created_tables(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner.created_tables.clone()
    }

    pub async fn transfer_configs(&self) -> Vec<TransferConfig> {
        let inner = self.inner.lock().await;
        inner.configs.clone()
    }

    /// Returns the live configurations called `name`.
    pub async fn transfer_configs_named(&self, name: &str) -> Vec<TransferConfig> {
        let inner = self.inner.lock().await;
        inner
            .configs
            .iter()
            .filter(|config| config.name == name)
            .cloned()
            .collect()
    }

    pub async fn deleted_configs(&self) -> Vec<TransferConfigId> {
        let inner = self.inner.lock().await;
        inner.deleted_configs.clone()
    }

    pub async fn runs(&self) -> Vec<TransferRun> {
        let inner = self.inner.lock().await;
        inner.runs.clone()
    }
}

impl Inner {
    fn insert_config(
        &mut self,
        project_id: &str,
        descriptor: &TransferConfigDescriptor,
    ) -> TransferConfig {
        self.next_config_number += 1;

        let config = TransferConfig {
            id: TransferConfigId::new(format!(
                "projects/{project_id}/locations/us/transferConfigs/{}",
                self.next_config_number
            )),
            name: descriptor.name.clone(),
            destination_dataset_id: descriptor.destination_dataset_id.clone(),
            data_source_id: descriptor.data_source_id.clone(),
            data_path: Some(descriptor.params.data_path.clone()),
            destination_table_name_template: Some(
                descriptor.params.destination_table_name_template.clone(),
            ),
            auto_scheduling_disabled: true,
        };
        self.configs.push(config.clone());

        config
    }
}

impl WarehouseTables for MemoryWarehouse {
    async fn table_exists(&self, table: &TableIdentity) -> TransferResult<bool> {
        let inner = self.inner.lock().await;

        Ok(inner.tables.contains(&table.warehouse_table_id()))
    }

    async fn create_empty_table(&self, table: &TableIdentity) -> TransferResult<()> {
        let mut inner = self.inner.lock().await;

        let table_id = table.warehouse_table_id();
        if !inner.tables.insert(table_id.clone()) {
            bail!(
                ErrorKind::WarehouseQueryFailed,
                "Table already exists",
                table_id
            );
        }
        inner.created_tables.push(table_id);

        Ok(())
    }
}

impl TransferService for MemoryWarehouse {
    async fn list_transfer_configs(&self, project_id: &str) -> TransferResult<Vec<TransferConfig>> {
        let inner = self.inner.lock().await;
        let parent = format!("projects/{project_id}/");

        Ok(inner
            .configs
            .iter()
            .filter(|config| config.id.as_str().starts_with(&parent))
            .cloned()
            .collect())
    }

    async fn delete_transfer_config(&self, id: &TransferConfigId) -> TransferResult<()> {
        let mut inner = self.inner.lock().await;

        let Some(position) = inner.configs.iter().position(|config| &config.id == id) else {
            bail!(
                ErrorKind::TransferServiceFailed,
                "Transfer configuration not found",
                id
            );
        };

        if inner.failing_deletes.contains(&inner.configs[position].name) {
            bail!(
                ErrorKind::TransferServiceFailed,
                "Transfer configuration deletion failed",
                id
            );
        }

        inner.configs.remove(position);
        inner.deleted_configs.push(id.clone());

        Ok(())
    }

    async fn create_transfer_config(
        &self,
        project_id: &str,
        descriptor: &TransferConfigDescriptor,
    ) -> TransferResult<TransferConfig> {
        let mut inner = self.inner.lock().await;

        if inner.failing_creates.contains(&descriptor.name) {
            bail!(
                ErrorKind::TransferServiceFailed,
                "Transfer configuration creation failed",
                descriptor.name
            );
        }

        Ok(inner.insert_config(project_id, descriptor))
    }

    async fn start_manual_transfer_run(
        &self,
        id: &TransferConfigId,
        requested_run_time: DateTime<Utc>,
    ) -> TransferResult<TransferRun> {
        let mut inner = self.inner.lock().await;

        if !inner.configs.iter().any(|config| &config.id == id) {
            bail!(
                ErrorKind::TransferServiceFailed,
                "Transfer configuration not found",
                id
            );
        }

        let run = TransferRun {
            id: format!("{id}/runs/{}", inner.runs.len() + 1),
            config_id: id.clone(),
            requested_run_time,
        };
        inner.runs.push(run.clone());

        Ok(run)
    }
}
