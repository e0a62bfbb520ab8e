//! Remote collaborators of the pipeline and their AWS and Google Cloud implementations.

use aws_sdk_s3::error::DisplayErrorContext;

use crate::error::{ErrorKind, TransferError};
use crate::transfer_error;

mod base;
pub mod bigquery;
pub mod data_transfer;
pub mod rds;
pub mod s3;
pub mod secrets;

pub use base::*;

/// Converts an AWS SDK error into a [`TransferError`], keeping the full error chain as detail.
fn aws_sdk_error<E>(kind: ErrorKind, description: &'static str, err: E) -> TransferError
where
    E: std::error::Error,
{
    transfer_error!(
        kind,
        description,
        detail = DisplayErrorContext(&err).to_string()
    )
}
