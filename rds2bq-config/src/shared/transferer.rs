use serde::{Deserialize, Serialize};

use crate::Config;
use crate::shared::ValidationError;
use crate::shared::base::require_non_empty;

/// Configuration of the BigQuery transfer service.
///
/// Every field maps to the upper-case environment variable of the same name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransfererConfig {
    /// Google Cloud project owning the transfer configurations.
    pub gc_project_id: String,
    /// Destination dataset, either `{dataset}` or `{project}.{dataset}`.
    pub bigquery_dataset_id: String,
    /// Secret holding the Google Cloud service account key.
    pub aws_secret_name_for_gc_service_account: String,
    /// Secret holding the access key pair used by BigQuery to read the bucket.
    pub aws_secret_name_for_iam_user: String,
    /// Region of the secrets provider.
    pub aws_secret_region: String,
    /// Bucket holding the exported snapshot.
    #[serde(alias = "souce_s3_bucket_name")]
    pub source_s3_bucket_name: String,
    /// Prefix of the export task inside the bucket.
    pub export_task_name: String,
    /// Reads the service account key from this file instead of the secrets provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gc_service_account_key_path: Option<String>,
}

impl TransfererConfig {
    /// Returns the `s3://` location under which the export task wrote its files.
    pub fn export_base_path(&self) -> String {
        format!(
            "s3://{}/{}",
            self.source_s3_bucket_name.trim_end_matches('/'),
            self.export_task_name.trim_matches('/')
        )
    }
}

impl Config for TransfererConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("gc_project_id", &self.gc_project_id)?;
        require_non_empty("source_s3_bucket_name", &self.source_s3_bucket_name)?;
        require_non_empty("export_task_name", &self.export_task_name)?;
        require_non_empty("aws_secret_region", &self.aws_secret_region)?;

        let segments: Vec<&str> = self.bigquery_dataset_id.split('.').collect();
        if segments.len() > 2 || segments.iter().any(|segment| segment.is_empty()) {
            return Err(ValidationError::InvalidDatasetId(
                self.bigquery_dataset_id.clone(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::{Environment, LoadConfigError, load_config_from};

    fn complete_variables() -> HashMap<String, String> {
        [
            ("GC_PROJECT_ID", "analytics"),
            ("BIGQUERY_DATASET_ID", "analytics.rds_snapshot"),
            ("AWS_SECRET_NAME_FOR_GC_SERVICE_ACCOUNT", "gc-sa"),
            ("AWS_SECRET_NAME_FOR_IAM_USER", "bq-reader"),
            ("AWS_SECRET_REGION", "ap-northeast-1"),
            ("SOURCE_S3_BUCKET_NAME", "snapshots"),
            ("EXPORT_TASK_NAME", "exports/ExportTaskAt-2024-03-01-09-00-00"),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
    }

    fn load(vars: HashMap<String, String>) -> Result<TransfererConfig, LoadConfigError> {
        load_config_from(Path::new("missing-directory"), Environment::Dev, Some(vars))
    }

    #[test]
    fn loads_from_environment() {
        let config = load(complete_variables()).unwrap();

        assert_eq!(config.gc_project_id, "analytics");
        assert_eq!(config.source_s3_bucket_name, "snapshots");
        assert_eq!(config.gc_service_account_key_path, None);
        assert_eq!(
            config.export_base_path(),
            "s3://snapshots/exports/ExportTaskAt-2024-03-01-09-00-00"
        );
    }

    #[test]
    fn accepts_historical_bucket_variable_name() {
        let mut vars = complete_variables();
        let bucket = vars.remove("SOURCE_S3_BUCKET_NAME").unwrap();
        vars.insert("SOUCE_S3_BUCKET_NAME".to_string(), bucket);

        let config = load(vars).unwrap();

        assert_eq!(config.source_s3_bucket_name, "snapshots");
    }

    #[test]
    fn rejects_dataset_id_with_too_many_segments() {
        let mut vars = complete_variables();
        vars.insert("BIGQUERY_DATASET_ID".to_string(), "a.b.c".to_string());

        let err = load(vars).unwrap_err();

        assert!(matches!(
            err,
            LoadConfigError::Validation(ValidationError::InvalidDatasetId(_))
        ));
    }

    #[test]
    fn environment_overrides_configuration_files() {
        let directory = std::env::temp_dir().join(format!(
            "rds2bq-config-test-{}",
            std::process::id()
        ));
        fs::create_dir_all(&directory).unwrap();
        fs::write(
            directory.join("base.yaml"),
            "gc_project_id: from-file\nexport_task_name: from-file\n",
        )
        .unwrap();

        let mut vars = complete_variables();
        vars.remove("EXPORT_TASK_NAME");
        let config: TransfererConfig =
            load_config_from(&directory, Environment::Dev, Some(vars)).unwrap();

        assert_eq!(config.gc_project_id, "analytics");
        assert_eq!(config.export_task_name, "from-file");

        fs::remove_dir_all(&directory).unwrap();
    }
}
