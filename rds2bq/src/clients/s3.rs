use aws_config::SdkConfig;
use tracing::debug;

use crate::clients::{ObjectStorage, aws_sdk_error};
use crate::error::{ErrorKind, TransferResult};
use crate::types::ObjectRef;

/// Object storage backed by Amazon S3.
#[derive(Debug, Clone)]
pub struct S3ObjectStorage {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStorage {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(sdk_config),
        }
    }

    /// Wraps an already configured S3 client.
    pub fn from_client(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

impl ObjectStorage for S3ObjectStorage {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> TransferResult<Vec<ObjectRef>> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|err| {
                    aws_sdk_error(ErrorKind::ObjectStorageFailed, "Failed to list objects", err)
                })?;

            objects.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .map(|key| ObjectRef::new(bucket, key)),
            );

            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_owned());
                }
                _ => break,
            }
        }

        debug!(bucket, prefix, count = objects.len(), "listed objects");

        Ok(objects)
    }

    async fn get_object(&self, object: &ObjectRef) -> TransferResult<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .send()
            .await
            .map_err(|err| {
                aws_sdk_error(ErrorKind::ObjectStorageFailed, "Failed to get object", err)
            })?;

        let body = output.body.collect().await.map_err(|err| {
            aws_sdk_error(
                ErrorKind::ObjectStorageFailed,
                "Failed to read object body",
                err,
            )
        })?;

        Ok(body.into_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn storage(endpoint: &str) -> S3ObjectStorage {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("AKIAEXAMPLE", "secret", None, None, "test"))
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();

        S3ObjectStorage::from_client(aws_sdk_s3::Client::from_conf(config))
    }

    fn list_page(keys: &[&str], next_token: Option<&str>) -> ResponseTemplate {
        let contents: String = keys
            .iter()
            .map(|key| format!("<Contents><Key>{key}</Key><Size>1</Size></Contents>"))
            .collect();
        let continuation = next_token
            .map(|token| format!("<NextContinuationToken>{token}</NextContinuationToken>"))
            .unwrap_or_default();
        let body = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Name>bucket</Name><Prefix>task/export_tables_info_</Prefix><KeyCount>{}</KeyCount><MaxKeys>1000</MaxKeys><IsTruncated>{}</IsTruncated>{contents}{continuation}</ListBucketResult>"#,
            keys.len(),
            next_token.is_some()
        );

        ResponseTemplate::new(200).set_body_raw(body, "application/xml")
    }

    #[tokio::test]
    async fn list_follows_continuation_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bucket"))
            .and(query_param("list-type", "2"))
            .and(query_param_is_missing("continuation-token"))
            .respond_with(list_page(&["task/export_tables_info_1.json"], Some("page-2")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bucket"))
            .and(query_param("continuation-token", "page-2"))
            .respond_with(list_page(&["task/export_tables_info_2.json"], None))
            .expect(1)
            .mount(&server)
            .await;

        let objects = storage(&server.uri())
            .list_objects("bucket", "task/export_tables_info_")
            .await
            .unwrap();

        let keys: Vec<&str> = objects.iter().map(|object| object.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "task/export_tables_info_1.json",
                "task/export_tables_info_2.json"
            ]
        );
        assert!(objects.iter().all(|object| object.bucket == "bucket"));
    }
}
