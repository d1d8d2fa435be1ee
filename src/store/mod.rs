//! Origin object store access.
//!
//! Tiles, sprites, glyphs and the style document all live in an external
//! object store. This module hides whether that store is reached over plain
//! HTTP(S) or through the S3 API.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │               HTTP Handlers              │
//! └────────────────────┬─────────────────────┘
//!                      │ fetch(key)
//!                      ▼
//! ┌──────────────────────────────────────────┐
//! │            OriginStore Trait             │
//! └────────────────────┬─────────────────────┘
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │ HttpOriginStore │    │   S3OriginStore     │
//! │  (reqwest GET)  │    │  (aws-sdk-s3 Get)   │
//! └─────────────────┘    └─────────────────────┘
//! ```

mod http_store;
mod s3_store;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;

pub use http_store::HttpOriginStore;
pub use s3_store::{create_s3_client, S3OriginStore};

/// An object fetched from the origin, with the headers worth forwarding.
#[derive(Debug, Clone, Default)]
pub struct OriginObject {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl OriginObject {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }
}

/// Read-only access to objects keyed by path.
///
/// Implementations must be thread-safe; a single store is shared by every
/// in-flight request.
#[async_trait]
pub trait OriginStore: Send + Sync {
    /// Fetch the object stored under `key` (no leading slash).
    ///
    /// An empty key addresses the store's base location itself.
    async fn fetch(&self, key: &str) -> Result<OriginObject, StoreError>;

    /// Human-readable location of the store, for logging.
    fn identifier(&self) -> &str;
}

/// Shared handle to an origin store.
pub type SharedStore = Arc<dyn OriginStore>;

/// Whether `key` contains a `.` or `..` segment once percent-decoded.
///
/// URL parsers resolve `%2e%2e` exactly like `..`, and treat `\` as a
/// separator, so a raw comparison against the undecoded key is not enough.
pub fn has_dot_segment(key: &str) -> bool {
    key.split('/').any(|segment| {
        let decoded = urlencoding::decode(segment)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| segment.to_string());
        decoded
            .split(|c: char| c == '/' || c == '\\')
            .any(|part| part == "." || part == "..")
    })
}
