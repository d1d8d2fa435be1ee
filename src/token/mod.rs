//! Signed tile tokens.
//!
//! A token is an expiry timestamp plus an HMAC-SHA256 over the literal
//! string `exp=<expiry>`:
//!
//! ```text
//! sig = base64url_nopad(HMAC-SHA256(secret, "exp=1735689600"))
//! /tiles/3/4/5.pbf?exp=1735689600&sig=...
//! ```
//!
//! Tile coordinates are not part of the signed message, so one token covers
//! every tile until it expires. This keeps one signature per style load.
//!
//! # Example
//!
//! ```rust
//! use tile_proxy::token::{canonical_message, SharedSecret, Signer};
//!
//! let signer = Signer::new(SharedSecret::new("my-secret-key"));
//! let token = signer.mint(1735689600);
//!
//! assert!(signer.verify(&canonical_message(token.exp), &token.sig));
//! ```

mod codec;
mod signer;

pub use codec::{
    canonical_message, decode_signature, encode_signature, EXPIRY_PARAM, SIGNATURE_PARAM,
};
pub use signer::{SharedSecret, SignedToken, Signer, SIGNATURE_LEN};
