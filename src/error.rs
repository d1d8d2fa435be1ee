use thiserror::Error;

use crate::server::auth::GateError;

/// I/O errors that can occur when fetching objects from the origin store
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Object does not exist at the origin
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Origin answered with a non-success status other than 404
    #[error("Origin returned status {status} for {url}")]
    Status { status: u16, url: String },

    /// Network or connection error (including body read failures)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),
}

impl StoreError {
    /// Whether the origin answered, but without the object.
    ///
    /// Transport failures return `false`: the origin never got to answer.
    pub fn is_missing(&self) -> bool {
        matches!(self, StoreError::NotFound(_) | StoreError::Status { .. })
    }
}

/// Signature text could not be decoded from its URL-safe form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid signature encoding: {0}")]
pub struct DecodeError(pub String);

/// Request-level failures, each mapped to exactly one HTTP status.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Malformed request path (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Tile Gate rejection (400 for a bad tile path, 403 otherwise)
    #[error(transparent)]
    Gate(#[from] GateError),

    /// Origin lacks the resource, or no route matched (404)
    #[error("{0}")]
    NotFound(String),

    /// Origin could not be reached or returned garbage (502)
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl ProxyError {
    /// Map an origin fetch failure for a pass-through asset or tile.
    pub fn from_asset_fetch(err: StoreError) -> Self {
        if err.is_missing() {
            ProxyError::NotFound(err.to_string())
        } else {
            ProxyError::UpstreamUnavailable(err.to_string())
        }
    }
}
