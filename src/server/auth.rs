//! Tile Gate: signed URL verification for tile requests.
//!
//! Tile URLs carry an expiry and an HMAC-SHA256 over `exp=<expiry>`:
//!
//! ```text
//! /tiles/3/4/5.pbf?exp=1735689600&sig=3q2-7w...
//! ```
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. the path is exactly `/tiles/<z>/<x>/<y>.pbf` (400 otherwise)
//! 2. `exp` and `sig` are present and `exp` is a non-zero integer (403)
//! 3. the current time is not past `exp`; a request at exactly `exp` passes (403)
//! 4. `sig` verifies against `exp=<exp>` (403)
//!
//! # Security Properties
//!
//! - **Time-limited**: tokens stop working once their expiry passes
//! - **Constant-time comparison**: signature bytes are compared in constant time
//! - **Coordinate-free**: the signature does not cover z/x/y, so one token
//!   authorizes every tile until it expires
//!
//! # Example
//!
//! ```rust
//! use tile_proxy::clock::ManualClock;
//! use tile_proxy::server::auth::{TileCredentials, TileGate};
//! use tile_proxy::token::{SharedSecret, Signer};
//! use std::sync::Arc;
//!
//! let signer = Signer::new(SharedSecret::new("my-secret-key"));
//! let gate = TileGate::new(signer.clone(), Arc::new(ManualClock::new(1_000)));
//!
//! let token = signer.mint(4_600);
//! let creds = TileCredentials::from_query(Some(&token.query()));
//! let coord = gate.authorize("/tiles/3/4/5.pbf", &creds).unwrap();
//! assert_eq!((coord.z, coord.x, coord.y), (3, 4, 5));
//! ```

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{debug, warn};
use url::form_urlencoded;

use super::handlers::ErrorResponse;
use crate::clock::SharedClock;
use crate::token::{canonical_message, Signer, EXPIRY_PARAM, SIGNATURE_PARAM};

// =============================================================================
// Types
// =============================================================================

/// Tile Gate rejection reasons.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// Path is not `/tiles/<z>/<x>/<y>.pbf`
    #[error("Bad tile path: {0}")]
    BadTilePath(String),

    /// `exp` or `sig` is absent, empty, zero or not an integer
    #[error("Missing exp/sig parameters")]
    MissingCredentials,

    /// Token has expired
    #[error("URL expired at {expired_at} (current time: {current_time})")]
    Expired {
        /// When the token expired
        expired_at: u64,
        /// Current time
        current_time: u64,
    },

    /// Signature does not match the expiry
    #[error("Invalid signature")]
    InvalidSignature,
}

impl GateError {
    /// HTTP status and machine-readable error code.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            GateError::BadTilePath(_) => (StatusCode::BAD_REQUEST, "bad_tile_path"),
            GateError::MissingCredentials => (StatusCode::FORBIDDEN, "missing_credentials"),
            GateError::Expired { .. } => (StatusCode::FORBIDDEN, "signature_expired"),
            GateError::InvalidSignature => (StatusCode::FORBIDDEN, "invalid_signature"),
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_code();
        let message = self.to_string();

        // Invalid signatures may be forgery attempts; the rest are routine
        match &self {
            GateError::InvalidSignature => {
                warn!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Tile request rejected: {}",
                    message
                );
            }
            _ => {
                debug!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Tile request rejected: {}",
                    message
                );
            }
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

/// Coordinates of a requested tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCoord {
    pub z: u32,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    /// Parse `/tiles/<z>/<x>/<y>.pbf`, each coordinate being ASCII digits.
    pub fn parse_path(path: &str) -> Option<Self> {
        let rest = path.strip_prefix("/tiles/")?.strip_suffix(".pbf")?;

        let mut parts = rest.split('/');
        let z = parse_coordinate(parts.next()?)?;
        let x = parse_coordinate(parts.next()?)?;
        let y = parse_coordinate(parts.next()?)?;

        if parts.next().is_some() {
            return None;
        }

        Some(Self { z, x, y })
    }

    /// Origin store key, `<prefix>/<z>/<x>/<y>.pbf` or `<z>/<x>/<y>.pbf`.
    pub fn origin_key(&self, prefix: &str) -> String {
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            self.to_string()
        } else {
            format!("{}/{}", prefix, self)
        }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}.pbf", self.z, self.x, self.y)
    }
}

fn parse_coordinate(part: &str) -> Option<u32> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

// =============================================================================
// Query Parameters for Auth
// =============================================================================

/// Raw `exp` and `sig` query values.
///
/// Kept as strings: a malformed `exp` is a missing credential (403), not a
/// query rejection (400).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileCredentials {
    pub exp: Option<String>,
    pub sig: Option<String>,
}

impl TileCredentials {
    /// Extract credentials from a raw query string.
    ///
    /// Values are form-urlencoded decoded; the first occurrence of each
    /// parameter wins.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut creds = Self::default();

        for (key, value) in form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
            if key == EXPIRY_PARAM && creds.exp.is_none() {
                creds.exp = Some(value.into_owned());
            } else if key == SIGNATURE_PARAM && creds.sig.is_none() {
                creds.sig = Some(value.into_owned());
            }
        }

        creds
    }
}

// =============================================================================
// Tile Gate
// =============================================================================

/// Authenticates tile requests against signed URL parameters.
#[derive(Clone)]
pub struct TileGate {
    signer: Signer,
    clock: SharedClock,
}

impl TileGate {
    pub fn new(signer: Signer, clock: SharedClock) -> Self {
        Self { signer, clock }
    }

    /// Authorize a tile request at the current time.
    pub fn authorize(&self, path: &str, creds: &TileCredentials) -> Result<TileCoord, GateError> {
        self.authorize_at(path, creds, self.clock.now())
    }

    /// Authorize a tile request as of Unix time `now`.
    ///
    /// Returns the parsed coordinates when every check passes.
    pub fn authorize_at(
        &self,
        path: &str,
        creds: &TileCredentials,
        now: u64,
    ) -> Result<TileCoord, GateError> {
        let coord =
            TileCoord::parse_path(path).ok_or_else(|| GateError::BadTilePath(path.to_string()))?;

        let exp = creds
            .exp
            .as_deref()
            .and_then(|e| e.parse::<u64>().ok())
            .filter(|e| *e != 0)
            .ok_or(GateError::MissingCredentials)?;
        let sig = creds
            .sig
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(GateError::MissingCredentials)?;

        if now > exp {
            return Err(GateError::Expired {
                expired_at: exp,
                current_time: now,
            });
        }

        if !self.signer.verify(&canonical_message(exp), sig) {
            return Err(GateError::InvalidSignature);
        }

        Ok(coord)
    }
}

// =============================================================================
// Tests
// =============================================================================
