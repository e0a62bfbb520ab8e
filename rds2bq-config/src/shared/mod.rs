//! Configuration types shared by the export and transfer services.

mod base;
mod exporter;
mod transferer;

pub use base::ValidationError;
pub use exporter::{DEFAULT_MAX_SNAPSHOTS, ExporterConfig};
pub use transferer::TransfererConfig;
