use async_trait::async_trait;
use reqwest::header::{HeaderName, CONTENT_ENCODING, CONTENT_TYPE, ETAG, LAST_MODIFIED};
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::{has_dot_segment, OriginObject, OriginStore};
use crate::error::StoreError;

/// Origin store reached with plain HTTP GETs under a base URL.
///
/// Used for public buckets (R2, GCS, S3 website endpoints) and for a style
/// document hosted elsewhere.
#[derive(Clone)]
pub struct HttpOriginStore {
    client: Client,
    base_url: String,
}

impl HttpOriginStore {
    /// Create a store rooted at `base_url`.
    ///
    /// A trailing slash on the base is ignored.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Create a store that shares an existing HTTP client.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Full URL for an object key.
    pub fn url_for(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        if key.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, key)
        }
    }
}

#[async_trait]
impl OriginStore for HttpOriginStore {
    async fn fetch(&self, key: &str) -> Result<OriginObject, StoreError> {
        let url = self.url_for(key);
        // The URL parser would resolve these against the base
        if has_dot_segment(key) {
            return Err(StoreError::NotFound(url));
        }
        debug!(url = %url, "Fetching from origin");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(url));
        }
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let header = |name: HeaderName| {
            resp.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let content_encoding = header(CONTENT_ENCODING);
        let etag = header(ETAG);
        let last_modified = header(LAST_MODIFIED);

        let body = resp
            .bytes()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(OriginObject {
            body,
            content_type,
            content_encoding,
            etag,
            last_modified,
        })
    }

    fn identifier(&self) -> &str {
        &self.base_url
    }
}
