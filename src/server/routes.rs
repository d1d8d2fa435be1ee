//! Router configuration for the tile proxy.
//!
//! This module defines the HTTP routes and applies the response headers
//! shared by every endpoint.
//!
//! # Route Structure
//!
//! ```text
//! /style.json                            - Signed style document
//! /sprite.json, /sprite@2x.json          - Sprite metadata (pass-through)
//! /sprite.png, /sprite@2x.png            - Sprite atlas (pass-through)
//! /fonts/{*rest}                         - Glyph ranges (pass-through)
//! /tiles/{z}/{x}/{y}.pbf?exp=&sig=       - Tiles (signed)
//! OPTIONS *                              - 204 preflight
//! anything else                          - 404
//! ```
//!
//! Every response, errors included, carries:
//!
//! ```text
//! Access-Control-Allow-Origin: *
//! Access-Control-Allow-Methods: GET, HEAD, OPTIONS
//! Access-Control-Allow-Headers: Content-Type
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tile_proxy::server::routes::{create_router, RouterConfig};
//! use tile_proxy::store::HttpOriginStore;
//!
//! let store = Arc::new(HttpOriginStore::new("https://bucket.example.com"));
//! let config = RouterConfig::new("my-secret-key")
//!     .with_public_url("https://tiles.example.com");
//!
//! let router = create_router(store, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8787").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;

use axum::{
    handler::Handler,
    routing::{get, MethodRouter},
    Router,
};
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use http::HeaderValue;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use super::auth::TileGate;
use super::handlers::{
    fallback_handler, fonts_handler, preflight_handler, sprite_handler, style_handler,
    tile_handler, AppState, CachePolicy, DEFAULT_ASSET_MAX_AGE, DEFAULT_STYLE_MAX_AGE,
};
use crate::clock::{SharedClock, SystemClock};
use crate::store::SharedStore;
use crate::style::{
    StyleRewriter, StyleService, DEFAULT_SOURCE_KEY, DEFAULT_STYLE_KEY, DEFAULT_TOKEN_TTL,
};
use crate::token::{SharedSecret, Signer};

/// Value of `Access-Control-Allow-Methods`.
pub const CORS_ALLOW_METHODS: &str = "GET, HEAD, OPTIONS";

/// Value of `Access-Control-Allow-Headers`.
pub const CORS_ALLOW_HEADERS: &str = "Content-Type";

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Secret for minting and verifying tile tokens
    pub secret: SharedSecret,

    /// Lifetime of minted tokens in seconds
    pub token_ttl: u64,

    /// Style source whose tile list gets signed
    pub style_source: String,

    /// Upstream style location (None = `style.json` in the main store)
    pub style_origin: Option<SharedStore>,

    /// Override for the style's `sprite` field
    pub sprite_url: Option<String>,

    /// Override for the style's `glyphs` field
    pub glyphs_url: Option<String>,

    /// Fixed external origin for minted tile URLs
    pub public_url: Option<String>,

    /// Key prefix of tiles within the store
    pub tiles_prefix: String,

    /// Cache-Control policy
    pub cache: CachePolicy,

    /// Time source for minting and expiry checks
    pub clock: SharedClock,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a new router configuration with the given secret.
    ///
    /// By default:
    /// - Tokens live 1 hour and sign the `openmaptiles` source
    /// - The style is `style.json` in the store, served with max-age 60
    /// - Assets are cached for 1 year
    /// - The public origin is derived from each request
    /// - Tracing is enabled
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: SharedSecret::new(secret),
            token_ttl: DEFAULT_TOKEN_TTL,
            style_source: DEFAULT_SOURCE_KEY.to_string(),
            style_origin: None,
            sprite_url: None,
            glyphs_url: None,
            public_url: None,
            tiles_prefix: String::new(),
            cache: CachePolicy {
                style_max_age: DEFAULT_STYLE_MAX_AGE,
                asset_max_age: DEFAULT_ASSET_MAX_AGE,
            },
            clock: Arc::new(SystemClock),
            enable_tracing: true,
        }
    }

    /// Set the lifetime of minted tokens in seconds.
    pub fn with_token_ttl(mut self, seconds: u64) -> Self {
        self.token_ttl = seconds;
        self
    }

    /// Set the style source whose tile list gets signed.
    pub fn with_style_source(mut self, source: impl Into<String>) -> Self {
        self.style_source = source.into();
        self
    }

    /// Read the upstream style from a separate location.
    pub fn with_style_origin(mut self, origin: SharedStore) -> Self {
        self.style_origin = Some(origin);
        self
    }

    /// Overwrite the style's `sprite` field.
    pub fn with_sprite_url(mut self, url: impl Into<String>) -> Self {
        self.sprite_url = Some(url.into());
        self
    }

    /// Overwrite the style's `glyphs` field.
    pub fn with_glyphs_url(mut self, url: impl Into<String>) -> Self {
        self.glyphs_url = Some(url.into());
        self
    }

    /// Use a fixed external origin for minted tile URLs.
    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = Some(url.into());
        self
    }

    /// Set the key prefix of tiles within the store.
    pub fn with_tiles_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tiles_prefix = prefix.into();
        self
    }

    /// Set the Cache-Control max-age of the style document.
    pub fn with_style_max_age(mut self, seconds: u32) -> Self {
        self.cache.style_max_age = seconds;
        self
    }

    /// Set the Cache-Control max-age of tiles, sprites and glyphs.
    pub fn with_asset_max_age(mut self, seconds: u32) -> Self {
        self.cache.asset_max_age = seconds;
        self
    }

    /// Replace the wall clock.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Build the application state from a store and configuration.
pub fn build_state(store: SharedStore, config: RouterConfig) -> AppState {
    let signer = Signer::new(config.secret);

    let rewriter = StyleRewriter::new(signer.clone())
        .with_token_ttl(config.token_ttl)
        .with_source_key(config.style_source)
        .with_sprite_url(config.sprite_url)
        .with_glyphs_url(config.glyphs_url);

    // An explicit style origin is addressed as a whole, hence the empty key
    let style = match config.style_origin {
        Some(origin) => StyleService::new(origin, "", rewriter, config.clock.clone()),
        None => StyleService::new(
            store.clone(),
            DEFAULT_STYLE_KEY,
            rewriter,
            config.clock.clone(),
        ),
    };

    AppState {
        store,
        style,
        gate: TileGate::new(signer, config.clock),
        cache: config.cache,
        public_url: config.public_url,
        tiles_prefix: config.tiles_prefix,
    }
}

/// Create the main application router.
///
/// This function builds the complete Axum router with:
/// - Style, sprite, glyph and tile routes
/// - A 204 answer to OPTIONS on any path and a 404 for everything else
/// - CORS headers on every response
/// - Request tracing (optional)
pub fn create_router(store: SharedStore, config: RouterConfig) -> Router {
    let enable_tracing = config.enable_tracing;
    let state = build_state(store, config);

    let router = Router::new()
        .route("/style.json", endpoint(style_handler))
        .route("/sprite.json", endpoint(sprite_handler))
        .route("/sprite@2x.json", endpoint(sprite_handler))
        .route("/sprite.png", endpoint(sprite_handler))
        .route("/sprite@2x.png", endpoint(sprite_handler))
        .route("/fonts/{*rest}", endpoint(fonts_handler))
        .route("/tiles/{*rest}", endpoint(tile_handler))
        .fallback(fallback_handler)
        .with_state(state);

    let router = apply_cors_headers(router);

    if enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// GET (and HEAD) to `handler`, OPTIONS to 204, any other method to 404.
fn endpoint<H, T>(handler: H) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    get(handler)
        .options(preflight_handler)
        .fallback(fallback_handler)
}

/// Set the fixed CORS headers on every response.
fn apply_cors_headers(router: Router) -> Router {
    router
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        ))
}

// =============================================================================
// Tests
// =============================================================================
