//! URL-safe signature encoding and the canonical signed message.
//!
//! Signatures travel in the `sig` query parameter as unpadded base64 using
//! the URL-safe alphabet (`-` and `_` instead of `+` and `/`). Decoding is
//! lenient about padding so that clients which re-pad, or strip it, both
//! verify.

use base64::{
    alphabet,
    engine::general_purpose::URL_SAFE_NO_PAD,
    engine::{GeneralPurpose, GeneralPurposeConfig},
    Engine,
};

use crate::error::DecodeError;

/// Query parameter carrying the expiry timestamp.
pub const EXPIRY_PARAM: &str = "exp";

/// Query parameter carrying the encoded signature.
pub const SIGNATURE_PARAM: &str = "sig";

/// Standard-alphabet decoder that ignores non-zero bits in the final symbol.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Build the message that gets signed for a given expiry.
///
/// Always `exp=<exp>` in base 10. Minting and verification must both go
/// through this function so the bytes match exactly.
pub fn canonical_message(exp: u64) -> String {
    format!("{}={}", EXPIRY_PARAM, exp)
}

/// Encode raw signature bytes as unpadded URL-safe base64.
pub fn encode_signature(signature: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(signature)
}

/// Decode a URL-safe base64 signature, with or without padding.
///
/// The URL-safe substitutions are undone and padding restored before the
/// standard decoder runs, so anything outside `[A-Za-z0-9+/=]` after
/// substitution is rejected. Leftover bits in the last symbol are dropped
/// rather than rejected.
pub fn decode_signature(text: &str) -> Result<Vec<u8>, DecodeError> {
    let mut standard: String = text
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    while standard.len() % 4 != 0 {
        standard.push('=');
    }

    LENIENT_STANDARD
        .decode(standard.as_bytes())
        .map_err(|e| DecodeError(e.to_string()))
}
