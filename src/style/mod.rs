//! Style document rewriting.
//!
//! The upstream style references tiles directly. Before handing it to a
//! client, the proxy replaces the tile template with a URL pointing back at
//! itself and carrying a freshly minted token:
//!
//! ```text
//! upstream:  "tiles": ["https://x/{z}/{x}/{y}.pbf"]
//! rewritten: "tiles": ["https://proxy/tiles/{z}/{x}/{y}.pbf?exp=1735689600&sig=..."]
//! ```
//!
//! - [`StyleRewriter`]: pure, synchronous rewrite of an in-memory document
//! - [`StyleService`]: fetches the upstream document and applies the rewriter

mod rewriter;
mod service;

pub use rewriter::{
    has_token_marker, signed_tile_url, RewriteOutcome, StyleRewriter, DEFAULT_SOURCE_KEY,
    DEFAULT_TOKEN_TTL, TILE_PATH_TEMPLATE,
};
pub use service::{StyleService, DEFAULT_STYLE_KEY};
