use async_trait::async_trait;
use aws_sdk_s3::primitives::DateTimeFormat;
use aws_sdk_s3::Client;
use tracing::debug;

use super::{has_dot_segment, OriginObject, OriginStore};
use crate::error::StoreError;

/// S3-backed implementation of `OriginStore`.
///
/// Objects are read with `GetObject` from a bucket, optionally under a key
/// prefix. Works with S3-compatible services (MinIO, R2) via a custom
/// endpoint on the client.
#[derive(Clone)]
pub struct S3OriginStore {
    client: Client,
    bucket: String,
    prefix: String,
    identifier: String,
}

impl S3OriginStore {
    /// Create a store for `bucket`, reading keys under `prefix`.
    pub fn new(client: Client, bucket: String, prefix: Option<String>) -> Self {
        let prefix = normalize_prefix(prefix.as_deref());
        let identifier = format!("s3://{}/{}", bucket, prefix);
        Self {
            client,
            bucket,
            prefix,
            identifier,
        }
    }

    /// Get the bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Full object key for a store-relative key.
    ///
    /// Keys arrive percent-encoded from the request path; S3 keys are literal.
    pub fn object_key(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        let decoded = urlencoding::decode(key)
            .map(|k| k.into_owned())
            .unwrap_or_else(|_| key.to_string());
        format!("{}{}", self.prefix, decoded)
    }
}

/// Turn `maps`, `/maps/` or `maps/` into `maps/`; empty stays empty.
fn normalize_prefix(prefix: Option<&str>) -> String {
    let trimmed = prefix.unwrap_or("").trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

#[async_trait]
impl OriginStore for S3OriginStore {
    async fn fetch(&self, key: &str) -> Result<OriginObject, StoreError> {
        let object_key = self.object_key(key);
        let location = format!("s3://{}/{}", self.bucket, object_key);
        if has_dot_segment(key) {
            return Err(StoreError::NotFound(location));
        }
        debug!(location = %location, "Fetching from origin");

        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
            .map_err(|e| {
                let is_no_such_key = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);

                let status_is_404 = e
                    .raw_response()
                    .map(|r| r.status().as_u16() == 404)
                    .unwrap_or(false);

                if is_no_such_key || status_is_404 {
                    return StoreError::NotFound(location.clone());
                }

                if let Some(status) = e.raw_response().map(|r| r.status().as_u16()) {
                    return StoreError::Status {
                        status,
                        url: location.clone(),
                    };
                }

                StoreError::S3(e.to_string())
            })?;

        let content_type = resp.content_type().map(str::to_string);
        let content_encoding = resp.content_encoding().map(str::to_string);
        let etag = resp.e_tag().map(str::to_string);
        let last_modified = resp
            .last_modified()
            .and_then(|t| t.fmt(DateTimeFormat::HttpDate).ok());

        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?
            .into_bytes();

        Ok(OriginObject {
            body,
            content_type,
            content_encoding,
            etag,
            last_modified,
        })
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// Create an S3 client with optional custom endpoint and region.
///
/// Use a custom endpoint for S3-compatible services like MinIO or R2:
/// ```ignore
/// let client = create_s3_client(Some("http://localhost:9000"), "us-east-1").await;
/// ```
pub async fn create_s3_client(endpoint_url: Option<&str>, region: &str) -> Client {
    let region = aws_config::Region::new(region.to_string());
    let mut config_loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let Some(endpoint) = endpoint_url {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    let sdk_config = config_loader.load().await;

    // S3-compatible services usually need path-style addressing
    let s3_config = if endpoint_url.is_some() {
        aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build()
    } else {
        aws_sdk_s3::config::Builder::from(&sdk_config).build()
    };

    Client::from_conf(s3_config)
}
