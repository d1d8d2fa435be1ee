//! HTTP server layer for the tile proxy.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │   /style.json   /sprite*   /fonts/*   /tiles/{z}/{x}/{y}.pbf    │
//! │                                                                 │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────────────┐  │
//! │  │  handlers   │  │     auth     │  │        routes          │  │
//! │  │ (requests)  │  │ (tile gate)  │  │ (router, CORS headers) │  │
//! │  └─────────────┘  └──────────────┘  └────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod routes;

pub use auth::{GateError, TileCoord, TileCredentials, TileGate};
pub use handlers::{
    external_origin, fallback_handler, fonts_handler, preflight_handler, sprite_handler,
    style_handler, tile_handler, AppState, CachePolicy, ErrorResponse, DEFAULT_ASSET_MAX_AGE,
    DEFAULT_STYLE_MAX_AGE, PROTOBUF_CONTENT_TYPE,
};
pub use routes::{
    build_state, create_router, RouterConfig, CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS,
};
