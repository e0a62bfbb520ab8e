use aws_config::SdkConfig;
use gcp_bigquery_client::error::BQError;
use gcp_bigquery_client::yup_oauth2::{self, ServiceAccountKey};
use serde::Deserialize;

use crate::clients::{SecretsProvider, aws_sdk_error};
use crate::error::{ErrorKind, TransferResult};
use crate::types::StorageCredentials;
use crate::{bail, transfer_error};

/// Secrets provider backed by AWS Secrets Manager.
#[derive(Debug, Clone)]
pub struct SecretsManagerProvider {
    client: aws_sdk_secretsmanager::Client,
}

impl SecretsManagerProvider {
    /// Creates a provider for the region configured in `sdk_config`.
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_secretsmanager::Client::new(sdk_config),
        }
    }
}

impl SecretsProvider for SecretsManagerProvider {
    async fn get_secret_string(&self, name: &str) -> TransferResult<String> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(|err| {
                aws_sdk_error(
                    ErrorKind::SecretsProviderFailed,
                    "Failed to retrieve secret",
                    err,
                )
            })?;

        match output.secret_string() {
            Some(value) => Ok(value.to_owned()),
            None => bail!(
                ErrorKind::SecretsProviderFailed,
                "Secret has no string value",
                name
            ),
        }
    }
}

#[derive(Deserialize)]
struct StorageCredentialsSecret {
    access_key_id: String,
    secret_access_key: String,
}

impl StorageCredentials {
    /// Parses an `{access_key_id, secret_access_key}` secret.
    pub fn from_secret(secret: &str) -> TransferResult<Self> {
        let parsed: StorageCredentialsSecret = serde_json::from_str(secret).map_err(|err| {
            // The secret itself must not end up in the error detail.
            transfer_error!(
                ErrorKind::ConfigError,
                "Storage credentials secret is malformed",
                format!("line {}, column {}", err.line(), err.column())
            )
        })?;

        Ok(StorageCredentials::new(
            parsed.access_key_id,
            parsed.secret_access_key,
        ))
    }
}

/// Parses a Google Cloud service account key document.
pub fn parse_service_account_key(secret: &str) -> TransferResult<ServiceAccountKey> {
    let key = yup_oauth2::parse_service_account_key(secret).map_err(BQError::from)?;

    Ok(key)
}

/// Fetches a secret and parses it as storage credentials.
pub async fn fetch_storage_credentials<P>(
    provider: &P,
    secret_name: &str,
) -> TransferResult<StorageCredentials>
where
    P: SecretsProvider,
{
    let secret = provider.get_secret_string(secret_name).await?;

    StorageCredentials::from_secret(&secret)
}

/// Fetches a secret and parses it as a service account key.
pub async fn fetch_service_account_key<P>(
    provider: &P,
    secret_name: &str,
) -> TransferResult<ServiceAccountKey>
where
    P: SecretsProvider,
{
    let secret = provider.get_secret_string(secret_name).await?;

    parse_service_account_key(&secret)
}
