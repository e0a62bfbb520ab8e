use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required identifier was supplied but is blank.
    #[error("`{0}` cannot be empty")]
    EmptyValue(&'static str),
    /// The snapshot page size is outside what the snapshot service accepts.
    #[error("`max_snapshots` must be between {min} and {max}, got {actual}")]
    MaxSnapshotsOutOfRange { min: u32, max: u32, actual: u32 },
    /// The BigQuery dataset id is not `{dataset}` or `{project}.{dataset}`.
    #[error("`bigquery_dataset_id` must be `dataset` or `project.dataset`, got `{0}`")]
    InvalidDatasetId(String),
}

/// Returns [`ValidationError::EmptyValue`] when `value` is blank.
pub(crate) fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyValue(field));
    }

    Ok(())
}
