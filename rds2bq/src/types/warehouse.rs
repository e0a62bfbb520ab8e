use std::fmt;

use crate::bail;
use crate::error::{ErrorKind, TransferResult};
use crate::naming::derive_warehouse_table_id;

/// Dataset in the warehouse, qualified by its project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WarehouseDatasetId {
    pub project_id: String,
    pub dataset_id: String,
}

impl WarehouseDatasetId {
    /// Parses `{project}.{dataset}` or a bare `{dataset}`, which falls back to `default_project`.
    pub fn parse(raw: &str, default_project: &str) -> TransferResult<Self> {
        let parts: Vec<&str> = raw.split('.').collect();

        let (project_id, dataset_id) = match parts.as_slice() {
            [dataset] => (default_project, *dataset),
            [project, dataset] => (*project, *dataset),
            _ => bail!(
                ErrorKind::ConfigError,
                "Invalid warehouse dataset id",
                format!("expected `project.dataset` or `dataset`, got `{raw}`")
            ),
        };

        if project_id.is_empty() || dataset_id.is_empty() {
            bail!(
                ErrorKind::ConfigError,
                "Invalid warehouse dataset id",
                format!("empty project or dataset in `{raw}`")
            );
        }

        Ok(Self {
            project_id: project_id.to_owned(),
            dataset_id: dataset_id.to_owned(),
        })
    }
}

impl fmt::Display for WarehouseDatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.project_id, self.dataset_id)
    }
}

/// A warehouse table paired with the storage target its data is loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableIdentity {
    /// Storage target name, e.g. `mydb/public.orders`.
    pub storage_target: String,
    pub dataset: WarehouseDatasetId,
    /// Bare table name, e.g. `orders`.
    pub table_name: String,
}

impl TableIdentity {
    /// Returns the fully-qualified table id, `{project}.{dataset}.{table}`.
    pub fn warehouse_table_id(&self) -> String {
        derive_warehouse_table_id(&self.dataset.to_string(), &self.storage_target)
    }
}

impl fmt::Display for TableIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.warehouse_table_id())
    }
}
