//! Service entry points for the snapshot export and the BigQuery transfer.
//!
//! Each binary loads its configuration, installs tracing and runs one of the functions in
//! [`core`] on a Tokio runtime. Failures are reported through [`error::RunnerError`].

pub mod config;
pub mod core;
pub mod error;
