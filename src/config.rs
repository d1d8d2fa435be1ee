//! Configuration management for the tile proxy.
//!
//! This module provides a configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables (the names used by existing edge deployments)
//! - Sensible defaults for all optional settings
//!
//! # Subcommands
//!
//! - `serve` - run the proxy
//! - `sign` - mint a signed tile URL template offline
//! - `check` - fetch the upstream style and report on its tile template
//!
//! # Environment Variables
//!
//! - `PROXY_HOST` - Server bind address (default: 0.0.0.0)
//! - `PROXY_PORT` - Server port (default: 8787)
//! - `BUCKET_BASE` - Base URL of the object store (HTTP backend)
//! - `S3_BUCKET` - S3 bucket name (S3 backend)
//! - `S3_PREFIX` - Key prefix within the bucket
//! - `S3_ENDPOINT` - Custom S3 endpoint for S3-compatible services
//! - `S3_REGION` - AWS region (default: us-east-1)
//! - `STYLE_ORIGIN` - Absolute URL of the upstream style document
//! - `SPRITE_URL` - Override for the style's `sprite` field
//! - `GLYPHS_URL` - Override for the style's `glyphs` field
//! - `TILES_HMAC_SECRET` - HMAC secret for tile tokens (required, never logged)
//! - `PUBLIC_URL` - External origin used in minted tile URLs
//! - `STYLE_SOURCE` - Style source whose tiles get signed (default: openmaptiles)
//! - `TOKEN_TTL` - Token lifetime in seconds (default: 3600)
//! - `STYLE_MAX_AGE` - Style Cache-Control max-age (default: 60)
//! - `ASSET_MAX_AGE` - Asset Cache-Control max-age (default: 31536000)
//! - `TILES_PREFIX` - Key prefix of tiles within the store (default: none)

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::server::{DEFAULT_ASSET_MAX_AGE, DEFAULT_STYLE_MAX_AGE};
use crate::style::{DEFAULT_SOURCE_KEY, DEFAULT_TOKEN_TTL};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8787;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

// =============================================================================
// CLI Arguments
// =============================================================================

/// Tile Proxy - signed-URL reverse proxy for map tiles and styles.
///
/// Serves a style document whose tile template carries a short-lived HMAC
/// token, and only lets tile requests through to the object store when
/// that token checks out.
#[derive(Parser, Debug, Clone)]
#[command(name = "tile-proxy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the proxy server
    Serve(ServeConfig),

    /// Mint a signed tile URL template
    Sign(SignConfig),

    /// Check that the upstream style can be fetched and signed
    Check(CheckConfig),
}

/// Where the origin objects live.
#[derive(Args, Debug, Clone, Default)]
pub struct OriginArgs {
    /// Base URL of the object store, e.g. https://bucket.example.com.
    #[arg(long, env = "BUCKET_BASE")]
    pub bucket_base: Option<String>,

    /// S3 bucket holding the assets (instead of --bucket-base).
    #[arg(long, env = "S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// Key prefix within the S3 bucket.
    #[arg(long, env = "S3_PREFIX")]
    pub s3_prefix: Option<String>,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, R2, etc.).
    #[arg(long, env = "S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "S3_REGION")]
    pub s3_region: String,

    /// Absolute URL of the upstream style document.
    ///
    /// If not specified, `style.json` is read from the object store.
    #[arg(long, env = "STYLE_ORIGIN")]
    pub style_origin: Option<String>,
}

impl OriginArgs {
    /// Validate the backend selection and URLs.
    pub fn validate(&self) -> Result<(), String> {
        match (&self.bucket_base, &self.s3_bucket) {
            (None, None) => {
                return Err(
                    "No object store configured. Set --bucket-base (BUCKET_BASE) \
                     or --s3-bucket (S3_BUCKET)"
                        .to_string(),
                )
            }
            (Some(_), Some(_)) => {
                return Err(
                    "--bucket-base and --s3-bucket are mutually exclusive".to_string(),
                )
            }
            (Some(base), None) => validate_http_url("bucket-base", base)?,
            (None, Some(bucket)) => {
                if bucket.is_empty() {
                    return Err("S3 bucket name must not be empty".to_string());
                }
            }
        }

        if let Some(ref endpoint) = self.s3_endpoint {
            validate_http_url("s3-endpoint", endpoint)?;
        }
        if let Some(ref origin) = self.style_origin {
            validate_http_url("style-origin", origin)?;
        }

        Ok(())
    }
}

/// Configuration for the `serve` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "PROXY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PROXY_PORT")]
    pub port: u16,

    // =========================================================================
    // Origin Configuration
    // =========================================================================
    #[command(flatten)]
    pub origin: OriginArgs,

    /// Override for the style's `sprite` field.
    #[arg(long, env = "SPRITE_URL")]
    pub sprite_url: Option<String>,

    /// Override for the style's `glyphs` field.
    #[arg(long, env = "GLYPHS_URL")]
    pub glyphs_url: Option<String>,

    // =========================================================================
    // Token Configuration
    // =========================================================================
    /// Secret key for HMAC-SHA256 tile tokens.
    #[arg(long, env = "TILES_HMAC_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// External origin of this proxy, used in minted tile URLs.
    ///
    /// If not specified, derived per request from X-Forwarded-Proto and
    /// X-Forwarded-Host or Host.
    #[arg(long, env = "PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Style source whose tile list gets signed.
    #[arg(long, default_value = DEFAULT_SOURCE_KEY, env = "STYLE_SOURCE")]
    pub style_source: String,

    /// Token lifetime in seconds.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL, env = "TOKEN_TTL")]
    pub token_ttl: u64,

    /// Key prefix of tiles within the store.
    #[arg(long, env = "TILES_PREFIX")]
    pub tiles_prefix: Option<String>,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Cache-Control max-age of the style document, in seconds.
    #[arg(long, default_value_t = DEFAULT_STYLE_MAX_AGE, env = "STYLE_MAX_AGE")]
    pub style_max_age: u32,

    /// Cache-Control max-age of tiles, sprites and glyphs, in seconds.
    #[arg(long, default_value_t = DEFAULT_ASSET_MAX_AGE, env = "ASSET_MAX_AGE")]
    pub asset_max_age: u32,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.secret.as_deref().map_or(true, str::is_empty) {
            return Err(
                "No tile signing secret provided. Set --secret or TILES_HMAC_SECRET".to_string(),
            );
        }

        self.origin.validate()?;

        if let Some(ref url) = self.public_url {
            validate_http_url("public-url", url)?;
        }

        if self.style_source.is_empty() {
            return Err("style_source must not be empty".to_string());
        }

        if self.token_ttl == 0 {
            return Err("token_ttl must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the secret, or an empty string if unset (call validate() first).
    pub fn secret_or_empty(&self) -> &str {
        self.secret.as_deref().unwrap_or("")
    }
}

/// Output format for the `sign` subcommand.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutputFormat {
    /// Full tile URL template (needs --base-url, otherwise path and query)
    Url,
    /// JSON object with exp, sig and template
    Json,
    /// Only `exp=...&sig=...`
    Query,
}

/// Configuration for the `sign` subcommand.
#[derive(Args, Debug, Clone)]
pub struct SignConfig {
    /// Secret key for HMAC-SHA256 tile tokens.
    #[arg(long, env = "TILES_HMAC_SECRET", hide_env_values = true)]
    pub secret: String,

    /// Token lifetime in seconds.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL)]
    pub ttl: u64,

    /// External origin of the proxy, e.g. https://tiles.example.com.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = SignOutputFormat::Url)]
    pub format: SignOutputFormat,
}

impl SignConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.secret.is_empty() {
            return Err("Secret must not be empty".to_string());
        }
        if self.ttl == 0 {
            return Err("ttl must be greater than 0".to_string());
        }
        if let Some(ref base_url) = self.base_url {
            validate_http_url("base-url", base_url)?;
        }
        Ok(())
    }
}

/// Configuration for the `check` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    #[command(flatten)]
    pub origin: OriginArgs,

    /// Style source whose tile list would be signed.
    #[arg(long, default_value = DEFAULT_SOURCE_KEY, env = "STYLE_SOURCE")]
    pub style_source: String,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

fn validate_http_url(name: &str, value: &str) -> Result<(), String> {
    let url = url::Url::parse(value).map_err(|e| format!("Invalid {} '{}': {}", name, value, e))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!(
            "Invalid {} '{}': scheme must be http or https, got {}",
            name, value, other
        )),
    }
}

// =============================================================================
// Tests
// =============================================================================
