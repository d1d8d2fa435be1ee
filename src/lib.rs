//! # Tile Proxy
//!
//! An edge reverse proxy for vector map tiles, styles, sprites and glyphs.
//!
//! The proxy sits in front of an object store. It hands out a style document
//! whose tile URL template carries a short-lived HMAC-SHA256 token, and lets
//! tile requests through only when that token is present, unexpired and
//! authentic. Sprites and glyphs pass through unauthenticated.
//!
//! ## Features
//!
//! - **Signed styles**: The configured source's tile list is replaced with a
//!   single template pointing back at this proxy, with `exp` and `sig` attached
//! - **Tile gate**: Strict `/tiles/{z}/{x}/{y}.pbf` parsing, expiry check and
//!   constant-time signature comparison
//! - **Pass-through assets**: Sprites and glyphs with long-lived caching
//! - **Pluggable origins**: Plain HTTP object stores or S3-compatible buckets
//! - **Permissive CORS**: The same three CORS headers on every response
//!
//! ## Architecture
//!
//! - [`token`] - Signature codec and HMAC signer
//! - [`style`] - Style rewriting and upstream style fetches
//! - [`store`] - Origin object store abstraction (HTTP, S3)
//! - [`server`] - Axum-based HTTP server, tile gate and routes
//! - [`clock`] - Time source used for minting and expiry
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tile_proxy::{create_router, HttpOriginStore, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(HttpOriginStore::new("https://bucket.example.com"));
//!     let config = RouterConfig::new("my-secret-key");
//!     let router = create_router(store, config);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8787").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod style;
pub mod token;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{CheckConfig, Cli, Command, OriginArgs, ServeConfig, SignConfig, SignOutputFormat};
pub use error::{DecodeError, ProxyError, StoreError};
pub use server::{
    create_router, AppState, CachePolicy, ErrorResponse, GateError, RouterConfig, TileCoord,
    TileCredentials, TileGate,
};
pub use store::{
    create_s3_client, HttpOriginStore, OriginObject, OriginStore, S3OriginStore, SharedStore,
};
pub use style::{signed_tile_url, StyleRewriter, StyleService};
pub use token::{SharedSecret, SignedToken, Signer};
