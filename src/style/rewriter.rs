use serde_json::Value;
use tracing::debug;

use crate::token::{SignedToken, Signer, EXPIRY_PARAM, SIGNATURE_PARAM};

/// Default lifetime of a minted token, in seconds.
pub const DEFAULT_TOKEN_TTL: u64 = 3600;

/// Default style source whose tile list gets signed.
pub const DEFAULT_SOURCE_KEY: &str = "openmaptiles";

/// Tile path template advertised to clients, relative to the proxy origin.
pub const TILE_PATH_TEMPLATE: &str = "/tiles/{z}/{x}/{y}.pbf";

/// What [`StyleRewriter::rewrite_at`] did to the tile list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// The tile list was replaced by one signed URL carrying this token
    Signed(SignedToken),

    /// The first template already carried `exp=` or `sig=`; left alone
    AlreadySigned,

    /// The source has no tile templates; left alone
    NoTiles,
}

/// Rewrites style documents so their tile template is a signed proxy URL.
#[derive(Debug, Clone)]
pub struct StyleRewriter {
    signer: Signer,
    token_ttl: u64,
    source_key: String,
    sprite_url: Option<String>,
    glyphs_url: Option<String>,
}

impl StyleRewriter {
    /// Create a rewriter with a one hour token lifetime, signing the
    /// `openmaptiles` source and leaving sprite/glyph URLs alone.
    pub fn new(signer: Signer) -> Self {
        Self {
            signer,
            token_ttl: DEFAULT_TOKEN_TTL,
            source_key: DEFAULT_SOURCE_KEY.to_string(),
            sprite_url: None,
            glyphs_url: None,
        }
    }

    /// Set how long minted tokens stay valid.
    pub fn with_token_ttl(mut self, seconds: u64) -> Self {
        self.token_ttl = seconds;
        self
    }

    /// Set the style source whose tile list is signed.
    pub fn with_source_key(mut self, key: impl Into<String>) -> Self {
        self.source_key = key.into();
        self
    }

    /// Overwrite the style's `sprite` field.
    pub fn with_sprite_url(mut self, url: Option<String>) -> Self {
        self.sprite_url = url;
        self
    }

    /// Overwrite the style's `glyphs` field.
    pub fn with_glyphs_url(mut self, url: Option<String>) -> Self {
        self.glyphs_url = url;
        self
    }

    pub fn token_ttl(&self) -> u64 {
        self.token_ttl
    }

    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    /// Rewrite `style` in place as of Unix time `now`.
    ///
    /// `origin` is the proxy's externally visible scheme and authority,
    /// e.g. `https://tiles.example.com`.
    pub fn rewrite_at(&self, style: &mut Value, origin: &str, now: u64) -> RewriteOutcome {
        if let Some(doc) = style.as_object_mut() {
            if let Some(ref sprite) = self.sprite_url {
                doc.insert("sprite".to_string(), Value::String(sprite.clone()));
            }
            if let Some(ref glyphs) = self.glyphs_url {
                doc.insert("glyphs".to_string(), Value::String(glyphs.clone()));
            }
        }

        let Some(tiles) = tile_templates_mut(style, &self.source_key) else {
            return RewriteOutcome::NoTiles;
        };

        if tiles
            .first()
            .and_then(Value::as_str)
            .is_some_and(has_token_marker)
        {
            debug!(source = %self.source_key, "Tile template already signed, leaving as is");
            return RewriteOutcome::AlreadySigned;
        }

        let token = self.signer.mint(now.saturating_add(self.token_ttl));
        *tiles = vec![Value::String(signed_tile_url(origin, &token))];

        debug!(source = %self.source_key, exp = token.exp, "Signed tile template");
        RewriteOutcome::Signed(token)
    }
}

/// Locate `sources.<key>.tiles`, if it is a non-empty array.
fn tile_templates_mut<'a>(style: &'a mut Value, source_key: &str) -> Option<&'a mut Vec<Value>> {
    style
        .get_mut("sources")?
        .get_mut(source_key)?
        .get_mut("tiles")?
        .as_array_mut()
        .filter(|tiles| !tiles.is_empty())
}

/// Build `<origin>/tiles/{z}/{x}/{y}.pbf?exp=<exp>&sig=<sig>`.
pub fn signed_tile_url(origin: &str, token: &SignedToken) -> String {
    format!(
        "{}{}?{}",
        origin.trim_end_matches('/'),
        TILE_PATH_TEMPLATE,
        token.query()
    )
}

/// Whether a template already carries a token parameter.
///
/// Matches `exp=` or `sig=` starting at a word boundary, so `?exp=` and
/// `&sig=` count but `resig=` does not.
pub fn has_token_marker(template: &str) -> bool {
    [EXPIRY_PARAM, SIGNATURE_PARAM].iter().any(|param| {
        let needle = format!("{}=", param);
        template.match_indices(&needle).any(|(idx, _)| {
            template[..idx]
                .chars()
                .next_back()
                .map_or(true, |c| !(c.is_ascii_alphanumeric() || c == '_'))
        })
    })
}
