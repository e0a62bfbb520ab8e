//! BigQuery Data Transfer Service client over its REST API.
//!
//! The service assigns configuration resource names itself, so the logical name of a
//! configuration travels in its display name and the resource name is kept as its
//! [`TransferConfigId`].

use chrono::{DateTime, SecondsFormat, Utc};
use gcp_bigquery_client::error::BQError;
use gcp_bigquery_client::yup_oauth2::authenticator::DefaultAuthenticator;
use gcp_bigquery_client::yup_oauth2::{ServiceAccountAuthenticator, ServiceAccountKey};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bail;
use crate::clients::TransferService;
use crate::error::{ErrorKind, TransferResult};
use crate::types::{TransferConfig, TransferConfigDescriptor, TransferConfigId, TransferRun};

/// Root of the Data Transfer REST API.
const DATA_TRANSFER_API_URL: &str = "https://bigquerydatatransfer.googleapis.com/v1";

/// OAuth scope granting access to the Data Transfer API.
const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleOptions {
    disable_auto_scheduling: bool,
}

/// Connector parameters; the S3 connector expects them in snake case.
#[derive(Debug, Serialize)]
struct S3Params<'a> {
    destination_table_name_template: &'a str,
    data_path: &'a str,
    file_format: &'a str,
    access_key_id: &'a str,
    secret_access_key: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTransferConfigBody<'a> {
    display_name: &'a str,
    destination_dataset_id: &'a str,
    data_source_id: &'a str,
    schedule_options: ScheduleOptions,
    params: S3Params<'a>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleOptionsResource {
    #[serde(default)]
    disable_auto_scheduling: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransferConfigResource {
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    destination_dataset_id: String,
    #[serde(default)]
    data_source_id: String,
    #[serde(default)]
    params: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    schedule_options: ScheduleOptionsResource,
}

impl From<TransferConfigResource> for TransferConfig {
    fn from(resource: TransferConfigResource) -> Self {
        let param = |key: &str| {
            resource
                .params
                .get(key)
                .and_then(|value| value.as_str())
                .map(str::to_owned)
        };

        TransferConfig {
            data_path: param("data_path"),
            destination_table_name_template: param("destination_table_name_template"),
            id: TransferConfigId::new(resource.name),
            name: resource.display_name,
            destination_dataset_id: resource.destination_dataset_id,
            data_source_id: resource.data_source_id,
            auto_scheduling_disabled: resource.schedule_options.disable_auto_scheduling,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListTransferConfigsResponse {
    #[serde(default)]
    transfer_configs: Vec<TransferConfigResource>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartManualRunsBody {
    requested_run_time: String,
}

#[derive(Debug, Deserialize)]
struct TransferRunResource {
    name: String,
}

#[derive(Debug, Deserialize)]
struct StartManualRunsResponse {
    #[serde(default)]
    runs: Vec<TransferRunResource>,
}

/// Source of the bearer token attached to every request.
#[derive(Clone)]
enum AccessTokenSource {
    ServiceAccount(DefaultAuthenticator),
    #[cfg(test)]
    Fixed(String),
}

impl AccessTokenSource {
    async fn access_token(&self) -> TransferResult<String> {
        match self {
            AccessTokenSource::ServiceAccount(authenticator) => {
                let token = authenticator
                    .token(&[CLOUD_PLATFORM_SCOPE])
                    .await
                    .map_err(BQError::from)?;

                match token.token() {
                    Some(token) => Ok(token.to_owned()),
                    None => Err(BQError::NoToken.into()),
                }
            }
            #[cfg(test)]
            AccessTokenSource::Fixed(token) => Ok(token.clone()),
        }
    }
}

/// Transfer service backed by the BigQuery Data Transfer REST API.
#[derive(Clone)]
pub struct DataTransferClient {
    http: reqwest::Client,
    token_source: AccessTokenSource,
    base_url: String,
}

impl std::fmt::Debug for DataTransferClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataTransferClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl DataTransferClient {
    /// Creates a client authenticated with a service account key.
    pub async fn new_with_key(sa_key: ServiceAccountKey) -> TransferResult<DataTransferClient> {
        let authenticator = ServiceAccountAuthenticator::builder(sa_key)
            .build()
            .await
            .map_err(BQError::InvalidServiceAccountAuthenticator)?;

        Ok(DataTransferClient {
            http: reqwest::Client::new(),
            token_source: AccessTokenSource::ServiceAccount(authenticator),
            base_url: DATA_TRANSFER_API_URL.to_owned(),
        })
    }

    #[cfg(test)]
    fn with_base_url(base_url: &str, token: &str) -> DataTransferClient {
        DataTransferClient {
            http: reqwest::Client::new(),
            token_source: AccessTokenSource::Fixed(token.to_owned()),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    async fn send<R>(&self, request: reqwest::RequestBuilder) -> TransferResult<R>
    where
        R: DeserializeOwned,
    {
        let token = self.token_source.access_token().await?;
        let response = request.bearer_auth(token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                ErrorKind::TransferServiceFailed,
                "Data Transfer API request failed",
                format!("{status}: {body}")
            );
        }

        Ok(response.json().await?)
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/{}", self.base_url, resource.trim_start_matches('/'))
    }
}

impl TransferService for DataTransferClient {
    async fn list_transfer_configs(&self, project_id: &str) -> TransferResult<Vec<TransferConfig>> {
        let url = self.url(&format!("projects/{project_id}/transferConfigs"));
        let mut configs = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http.get(&url);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: ListTransferConfigsResponse = self.send(request).await?;
            configs.extend(page.transfer_configs.into_iter().map(TransferConfig::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(project_id, count = configs.len(), "listed transfer configurations");

        Ok(configs)
    }

    async fn delete_transfer_config(&self, id: &TransferConfigId) -> TransferResult<()> {
        let request = self.http.delete(self.url(id.as_str()));
        let _: serde_json::Value = self.send(request).await?;

        Ok(())
    }

    async fn create_transfer_config(
        &self,
        project_id: &str,
        descriptor: &TransferConfigDescriptor,
    ) -> TransferResult<TransferConfig> {
        let params = &descriptor.params;
        let body = CreateTransferConfigBody {
            display_name: &descriptor.name,
            destination_dataset_id: &descriptor.destination_dataset_id,
            data_source_id: &descriptor.data_source_id,
            schedule_options: ScheduleOptions {
                disable_auto_scheduling: true,
            },
            params: S3Params {
                destination_table_name_template: &params.destination_table_name_template,
                data_path: &params.data_path,
                file_format: &params.file_format,
                access_key_id: &params.credentials.access_key_id,
                secret_access_key: params.credentials.secret_access_key.expose_secret(),
            },
        };

        let request = self
            .http
            .post(self.url(&format!("projects/{project_id}/transferConfigs")))
            .json(&body);
        let resource: TransferConfigResource = self.send(request).await?;

        Ok(resource.into())
    }

    async fn start_manual_transfer_run(
        &self,
        id: &TransferConfigId,
        requested_run_time: DateTime<Utc>,
    ) -> TransferResult<TransferRun> {
        let body = StartManualRunsBody {
            requested_run_time: requested_run_time.to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        let request = self
            .http
            .post(self.url(&format!("{id}:startManualRuns")))
            .json(&body);
        let response: StartManualRunsResponse = self.send(request).await?;

        let Some(run) = response.runs.into_iter().next() else {
            bail!(
                ErrorKind::TransferServiceFailed,
                "Data Transfer API started no run",
                id
            );
        };

        Ok(TransferRun {
            id: run.name,
            config_id: id.clone(),
            requested_run_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{
        body_partial_json, header, method, path, query_param, query_param_is_missing,
    };
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::types::{StorageCredentials, TransferParams};

    const TOKEN: &str = "test-token";
    const CONFIGS_PATH: &str = "/projects/proj/transferConfigs";
    const CONFIG_NAME: &str = "projects/1/locations/us/transferConfigs/abc";

    fn config_resource(name: &str, display_name: &str) -> serde_json::Value {
        json!({
            "name": name,
            "displayName": display_name,
            "destinationDatasetId": "dataset",
            "dataSourceId": "amazon_s3",
            "scheduleOptions": { "disableAutoScheduling": true }
        })
    }

    fn descriptor() -> TransferConfigDescriptor {
        TransferConfigDescriptor {
            name: "proj.dataset.users".to_owned(),
            destination_dataset_id: "dataset".to_owned(),
            data_source_id: "amazon_s3".to_owned(),
            params: TransferParams {
                destination_table_name_template: "users".to_owned(),
                data_path: "s3://bucket/task/db/public.users/*/*.parquet".to_owned(),
                file_format: "PARQUET".to_owned(),
                credentials: StorageCredentials::new("AKIAEXAMPLE", "secret"),
            },
        }
    }

    #[tokio::test]
    async fn list_follows_next_page_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CONFIGS_PATH))
            .and(header("authorization", "Bearer test-token"))
            .and(query_param_is_missing("pageToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "transferConfigs": [
                    config_resource("projects/1/locations/us/transferConfigs/a", "proj.dataset.users")
                ],
                "nextPageToken": "page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(CONFIGS_PATH))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "transferConfigs": [
                    config_resource("projects/1/locations/us/transferConfigs/b", "proj.dataset.orders")
                ],
                "nextPageToken": ""
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = DataTransferClient::with_base_url(&server.uri(), TOKEN);
        let configs = client.list_transfer_configs("proj").await.unwrap();

        let names: Vec<&str> = configs.iter().map(|config| config.name.as_str()).collect();
        assert_eq!(names, vec!["proj.dataset.users", "proj.dataset.orders"]);
        assert_eq!(
            configs[1].id.as_str(),
            "projects/1/locations/us/transferConfigs/b"
        );
    }

    #[tokio::test]
    async fn error_status_is_a_transfer_service_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CONFIGS_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
            .mount(&server)
            .await;

        let client = DataTransferClient::with_base_url(&server.uri(), TOKEN);
        let err = client.list_transfer_configs("proj").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransferServiceFailed);
        let detail = err.detail().unwrap_or_default();
        assert!(detail.contains("403"), "{detail}");
        assert!(detail.contains("permission denied"), "{detail}");
    }

    #[tokio::test]
    async fn delete_targets_the_config_resource() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("/{CONFIG_NAME}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = DataTransferClient::with_base_url(&server.uri(), TOKEN);
        client
            .delete_transfer_config(&TransferConfigId::new(CONFIG_NAME))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_sends_descriptor_with_auto_scheduling_disabled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CONFIGS_PATH))
            .and(body_partial_json(json!({
                "displayName": "proj.dataset.users",
                "destinationDatasetId": "dataset",
                "dataSourceId": "amazon_s3",
                "scheduleOptions": { "disableAutoScheduling": true },
                "params": {
                    "destination_table_name_template": "users",
                    "file_format": "PARQUET",
                    "access_key_id": "AKIAEXAMPLE",
                    "secret_access_key": "secret"
                }
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(config_resource(CONFIG_NAME, "proj.dataset.users")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = DataTransferClient::with_base_url(&server.uri(), TOKEN);
        let config = client
            .create_transfer_config("proj", &descriptor())
            .await
            .unwrap();

        assert_eq!(config.id.as_str(), CONFIG_NAME);
        assert_eq!(config.name, "proj.dataset.users");
    }

    #[tokio::test]
    async fn manual_run_is_started_at_the_requested_time() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/{CONFIG_NAME}:startManualRuns")))
            .and(body_partial_json(json!({
                "requestedRunTime": "2024-03-01T09:30:00.000Z"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "runs": [{ "name": format!("{CONFIG_NAME}/runs/r1") }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = DataTransferClient::with_base_url(&server.uri(), TOKEN);
        let requested = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let run = client
            .start_manual_transfer_run(&TransferConfigId::new(CONFIG_NAME), requested)
            .await
            .unwrap();

        assert_eq!(run.id, format!("{CONFIG_NAME}/runs/r1"));
        assert_eq!(run.config_id.as_str(), CONFIG_NAME);
        assert_eq!(run.requested_run_time, requested);
    }

    #[tokio::test]
    async fn manual_run_without_runs_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/{CONFIG_NAME}:startManualRuns")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = DataTransferClient::with_base_url(&server.uri(), TOKEN);
        let err = client
            .start_manual_transfer_run(&TransferConfigId::new(CONFIG_NAME), Utc::now())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransferServiceFailed);
    }

    #[test]
    fn resources_map_display_name_to_config_name() {
        let resource: TransferConfigResource = serde_json::from_value(json!({
            "name": "projects/1/locations/us/transferConfigs/abc",
            "displayName": "proj.dataset.users",
            "destinationDatasetId": "dataset",
            "dataSourceId": "amazon_s3",
            "scheduleOptions": { "disableAutoScheduling": true },
            "params": {
                "data_path": "s3://bucket/task/db/public.users/*/*.parquet",
                "destination_table_name_template": "users"
            }
        }))
        .unwrap();

        let config = TransferConfig::from(resource);

        assert_eq!(config.id.as_str(), "projects/1/locations/us/transferConfigs/abc");
        assert_eq!(config.name, "proj.dataset.users");
        assert_eq!(
            config.data_path.as_deref(),
            Some("s3://bucket/task/db/public.users/*/*.parquet")
        );
        assert_eq!(config.destination_table_name_template.as_deref(), Some("users"));
        assert!(config.auto_scheduling_disabled);
    }

    #[test]
    fn empty_list_response_is_accepted() {
        let page: ListTransferConfigsResponse = serde_json::from_value(json!({})).unwrap();

        assert!(page.transfer_configs.is_empty());
        assert_eq!(page.next_page_token, None);
    }

    #[test]
    fn create_body_uses_api_field_names() {
        let body = CreateTransferConfigBody {
            display_name: "proj.dataset.users",
            destination_dataset_id: "dataset",
            data_source_id: "amazon_s3",
            schedule_options: ScheduleOptions {
                disable_auto_scheduling: true,
            },
            params: S3Params {
                destination_table_name_template: "users",
                data_path: "s3://bucket/task/db/public.users/*/*.parquet",
                file_format: "PARQUET",
                access_key_id: "AKIAEXAMPLE",
                secret_access_key: "secret",
            },
        };

        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["displayName"], json!("proj.dataset.users"));
        assert_eq!(value["scheduleOptions"]["disableAutoScheduling"], json!(true));
        assert_eq!(value["params"]["file_format"], json!("PARQUET"));
        assert_eq!(value["params"]["destination_table_name_template"], json!("users"));
    }
}
