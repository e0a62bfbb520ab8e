//! Creation of the warehouse tables receiving the exported data.

use tracing::{debug, info};

use crate::clients::WarehouseTables;
use crate::error::TransferResult;
use crate::types::TableIdentity;

/// A table after provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedTable {
    pub identity: TableIdentity,
    /// Whether the table was created by this provisioning pass.
    pub created: bool,
}

/// Ensures warehouse tables exist, creating missing ones without schema.
#[derive(Debug, Clone)]
pub struct WarehouseTableProvisioner<W> {
    warehouse: W,
}

impl<W> WarehouseTableProvisioner<W>
where
    W: WarehouseTables,
{
    pub fn new(warehouse: W) -> Self {
        Self { warehouse }
    }

    /// Makes sure every table in `tables` exists.
    ///
    /// Existing tables are left untouched. The result is in the same order as `tables`.
    pub async fn ensure_tables(
        &self,
        tables: &[TableIdentity],
    ) -> TransferResult<Vec<ProvisionedTable>> {
        let mut provisioned = Vec::with_capacity(tables.len());

        for identity in tables {
            let created = if self.warehouse.table_exists(identity).await? {
                debug!(table = %identity, "table already exists");
                false
            } else {
                self.warehouse.create_empty_table(identity).await?;
                info!(table = %identity, "created table without schema");
                true
            };

            provisioned.push(ProvisionedTable {
                identity: identity.clone(),
                created,
            });
        }

        Ok(provisioned)
    }
}
