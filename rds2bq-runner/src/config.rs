use rds2bq_config::load_config;
use rds2bq_config::shared::{ExporterConfig, TransfererConfig};

use crate::error::{RunnerError, RunnerResult};

/// Loads and validates the snapshot export configuration.
pub fn load_exporter_config() -> RunnerResult<ExporterConfig> {
    load_config::<ExporterConfig>().map_err(RunnerError::config)
}

/// Loads and validates the transfer configuration.
pub fn load_transferer_config() -> RunnerResult<TransfererConfig> {
    load_config::<TransfererConfig>().map_err(RunnerError::config)
}
