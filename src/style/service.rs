use serde_json::Value;
use tracing::{info, warn};

use crate::clock::SharedClock;
use crate::error::ProxyError;
use crate::store::SharedStore;

use super::rewriter::{RewriteOutcome, StyleRewriter};

/// Default store key of the upstream style document.
pub const DEFAULT_STYLE_KEY: &str = "style.json";

/// Fetches the upstream style document and signs its tile template.
///
/// Every call fetches and signs afresh: minted tokens are never cached, so
/// two calls a second apart return two different signatures.
#[derive(Clone)]
pub struct StyleService {
    origin: SharedStore,
    key: String,
    rewriter: StyleRewriter,
    clock: SharedClock,
}

impl StyleService {
    /// Create a service reading the style from `key` within `origin`.
    pub fn new(
        origin: SharedStore,
        key: impl Into<String>,
        rewriter: StyleRewriter,
        clock: SharedClock,
    ) -> Self {
        Self {
            origin,
            key: key.into(),
            rewriter,
            clock,
        }
    }

    pub fn rewriter(&self) -> &StyleRewriter {
        &self.rewriter
    }

    /// Fetch the raw upstream style without rewriting it.
    ///
    /// Any failure, including a body that is not JSON, is reported as the
    /// upstream being unavailable. There is no retry.
    pub async fn fetch_upstream(&self) -> Result<Value, ProxyError> {
        let object = self.origin.fetch(&self.key).await.map_err(|e| {
            warn!(origin = %self.origin.identifier(), error = %e, "Style fetch failed");
            ProxyError::UpstreamUnavailable(format!("style document unavailable: {}", e))
        })?;

        serde_json::from_slice(&object.body).map_err(|e| {
            warn!(origin = %self.origin.identifier(), error = %e, "Style is not valid JSON");
            ProxyError::UpstreamUnavailable(format!("style document is not valid JSON: {}", e))
        })
    }

    /// Fetch the upstream style and sign it for clients of `public_origin`.
    pub async fn signed_style(&self, public_origin: &str) -> Result<Value, ProxyError> {
        let mut style = self.fetch_upstream().await?;

        let now = self.clock.now();
        if let RewriteOutcome::Signed(token) =
            self.rewriter.rewrite_at(&mut style, public_origin, now)
        {
            info!(exp = token.exp, origin = %public_origin, "Issued tile token");
        }

        Ok(style)
    }
}
