//! HTTP request handlers for the tile proxy.
//!
//! # Endpoints
//!
//! - `GET /style.json` - Upstream style with a signed tile template
//! - `GET /sprite.json`, `/sprite@2x.json`, `/sprite.png`, `/sprite@2x.png` - Sprite pass-through
//! - `GET /fonts/{*rest}` - Glyph pass-through
//! - `GET /tiles/{z}/{x}/{y}.pbf?exp=&sig=` - Signed tile fetch
//! - `OPTIONS *` - Empty 204 (CORS headers are added by the router)

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::ProxyError;
use crate::store::{has_dot_segment, OriginObject, SharedStore};
use crate::style::StyleService;

use super::auth::{TileCredentials, TileGate};

/// Content type of vector tiles and glyph ranges.
pub const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

/// Default `max-age` of the signed style document (1 minute).
pub const DEFAULT_STYLE_MAX_AGE: u32 = 60;

/// Default `max-age` of tiles, sprites and glyphs (1 year).
pub const DEFAULT_ASSET_MAX_AGE: u32 = 31_536_000;

// =============================================================================
// Application State
// =============================================================================

/// Cache-Control policy for responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// max-age of the style document, kept short since it embeds a token
    pub style_max_age: u32,

    /// max-age of immutable assets
    pub asset_max_age: u32,
}

impl CachePolicy {
    pub fn style_header(&self) -> String {
        format!("public, max-age={}", self.style_max_age)
    }

    pub fn asset_header(&self) -> String {
        format!("public, max-age={}, immutable", self.asset_max_age)
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            style_max_age: DEFAULT_STYLE_MAX_AGE,
            asset_max_age: DEFAULT_ASSET_MAX_AGE,
        }
    }
}

/// Shared application state.
///
/// Everything in here is read-only after startup; each request gets a
/// cheap clone.
#[derive(Clone)]
pub struct AppState {
    /// Origin store for tiles, sprites and glyphs
    pub store: SharedStore,

    /// Style fetch and rewrite
    pub style: StyleService,

    /// Tile request authentication
    pub gate: TileGate,

    /// Cache-Control policy
    pub cache: CachePolicy,

    /// Fixed external origin for minted tile URLs (None = derive per request)
    pub public_url: Option<String>,

    /// Key prefix of tiles within the store
    pub tiles_prefix: String,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_signature")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert ProxyError to HTTP response.
///
/// - 5xx errors are logged at ERROR level
/// - 404s at DEBUG level (common and expected)
/// - other 4xx at WARN level
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ProxyError::Gate(gate_err) => return gate_err.into_response(),
            ProxyError::BadRequest(message) => (StatusCode::BAD_REQUEST, "bad_request", message),
            ProxyError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ProxyError::UpstreamUnavailable(message) => {
                (StatusCode::BAD_GATEWAY, "upstream_unavailable", message)
            }
        };

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Work out the externally visible origin (`scheme://host[:port]`).
///
/// A configured public URL wins. Otherwise the origin comes from
/// `X-Forwarded-Proto` (default `http`) and `X-Forwarded-Host` or `Host`.
pub fn external_origin(public_url: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(url) = public_url {
        return url.trim_end_matches('/').to_string();
    }

    let scheme = first_header_value(headers, "x-forwarded-proto").unwrap_or("http");
    let host = first_header_value(headers, "x-forwarded-host")
        .or_else(|| first_header_value(headers, header::HOST.as_str()))
        .unwrap_or("localhost");

    format!("{}://{}", scheme, host)
}

/// First comma-separated value of a header, trimmed.
fn first_header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Build a 200 response for an origin object.
///
/// Content-Type and Cache-Control are set by the proxy; Content-Encoding,
/// ETag and Last-Modified are forwarded from the origin.
fn asset_response(
    object: OriginObject,
    content_type: &'static str,
    cache_control: &str,
) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    insert_header(&mut headers, header::CACHE_CONTROL, Some(cache_control));
    insert_header(
        &mut headers,
        header::CONTENT_ENCODING,
        object.content_encoding.as_deref(),
    );
    insert_header(&mut headers, header::ETAG, object.etag.as_deref());
    insert_header(
        &mut headers,
        header::LAST_MODIFIED,
        object.last_modified.as_deref(),
    );

    (StatusCode::OK, headers, Body::from(object.body)).into_response()
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: Option<&str>) {
    if let Some(value) = value.and_then(|v| HeaderValue::from_str(v).ok()) {
        headers.insert(name, value);
    }
}

/// Fetch `key` from the store and wrap it as an immutable asset.
async fn proxy_asset(
    state: &AppState,
    key: &str,
    content_type: &'static str,
) -> Result<Response, ProxyError> {
    let object = state
        .store
        .fetch(key)
        .await
        .map_err(ProxyError::from_asset_fetch)?;

    Ok(asset_response(
        object,
        content_type,
        &state.cache.asset_header(),
    ))
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle style document requests.
///
/// # Endpoint
///
/// `GET /style.json`
///
/// # Response
///
/// - `200 OK`: style JSON, `Cache-Control: public, max-age={style_max_age}`
/// - `502 Bad Gateway`: upstream style missing, unreachable or not JSON
pub async fn style_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ProxyError> {
    let origin = external_origin(state.public_url.as_deref(), &headers);
    let style = state.style.signed_style(&origin).await?;

    let mut response = Json(style).into_response();
    insert_header(
        response.headers_mut(),
        header::CACHE_CONTROL,
        Some(&state.cache.style_header()),
    );
    Ok(response)
}

/// Handle sprite requests.
///
/// # Endpoint
///
/// `GET /sprite.json`, `/sprite@2x.json`, `/sprite.png`, `/sprite@2x.png`
///
/// Served from the same key in the store, JSON or PNG by extension.
pub async fn sprite_handler(
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Response, ProxyError> {
    let key = uri.path().trim_start_matches('/');
    let content_type = if key.ends_with(".png") {
        "image/png"
    } else {
        "application/json"
    };

    proxy_asset(&state, key, content_type).await
}

/// Handle glyph requests.
///
/// # Endpoint
///
/// `GET /fonts/{*rest}`
///
/// The remainder is forwarded still percent-encoded to `fonts/{rest}`.
///
/// # Errors
///
/// - `400 Bad Request`: a `.` or `..` segment in the remainder, encoded or not
/// - `404 Not Found`: origin lacks the glyph range
pub async fn fonts_handler(
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Response, ProxyError> {
    let rest = uri.path().strip_prefix("/fonts/").unwrap_or_default();

    if has_dot_segment(rest) {
        return Err(ProxyError::BadRequest(format!(
            "invalid glyph path: {}",
            uri.path()
        )));
    }

    proxy_asset(&state, &format!("fonts/{}", rest), PROTOBUF_CONTENT_TYPE).await
}

/// Handle tile requests.
///
/// # Endpoint
///
/// `GET /tiles/{z}/{x}/{y}.pbf?exp={exp}&sig={sig}`
///
/// # Response
///
/// - `200 OK`: tile bytes, `Content-Type: application/x-protobuf`,
///   `Cache-Control: public, max-age={asset_max_age}, immutable`
/// - `400 Bad Request`: path is not `/tiles/<z>/<x>/<y>.pbf`
/// - `403 Forbidden`: missing, expired or invalid token
/// - `404 Not Found`: origin lacks the tile, or the path does not end in `.pbf`
pub async fn tile_handler(
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Response, ProxyError> {
    let path = uri.path();
    if !path.ends_with(".pbf") {
        return Err(ProxyError::NotFound("Not found".to_string()));
    }

    let creds = TileCredentials::from_query(uri.query());
    let coord = state.gate.authorize(path, &creds)?;

    let key = coord.origin_key(&state.tiles_prefix);
    proxy_asset(&state, &key, PROTOBUF_CONTENT_TYPE).await
}

/// Answer any OPTIONS request with an empty 204.
pub async fn preflight_handler() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Fallback for unmatched paths and methods.
///
/// OPTIONS still gets its 204 so preflights succeed everywhere.
pub async fn fallback_handler(method: Method) -> Response {
    if method == Method::OPTIONS {
        return preflight_handler().await.into_response();
    }
    ProxyError::NotFound("Not found".to_string()).into_response()
}

// =============================================================================
// Tests
// =============================================================================
