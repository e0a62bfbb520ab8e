//! Moves a database snapshot export from S3 into BigQuery.
//!
//! The crate covers two steps. [`snapshot::SnapshotExporter`] picks the latest manual
//! snapshot of a database instance and asks the snapshot service to export it as Parquet
//! files. [`pipeline::TransferPipeline`] reads the export metadata, derives one BigQuery
//! table per exported table, makes sure those tables exist and reconciles one BigQuery
//! Data Transfer configuration per table before triggering a manual run.
//!
//! Every remote system sits behind a trait in [`clients`], so the pipeline can be driven
//! by the AWS and Google Cloud implementations in production and by the in-memory ones in
//! `test_utils` during tests.

pub mod clients;
pub mod error;
mod macros;
pub mod metadata;
pub mod naming;
pub mod pipeline;
pub mod provisioner;
pub mod reconciler;
pub mod snapshot;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
