//! HMAC-SHA256 signing and verification of tile access tokens.

use std::fmt;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::codec::{
    canonical_message, decode_signature, encode_signature, EXPIRY_PARAM, SIGNATURE_PARAM,
};

/// HMAC-SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// Length in bytes of a raw signature.
pub const SIGNATURE_LEN: usize = 32;

/// The process-wide signing secret.
///
/// Loaded once at startup and shared read-only. Never printed: `Debug`
/// is redacted.
#[derive(Clone)]
pub struct SharedSecret(Arc<[u8]>);

impl SharedSecret {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self(Arc::from(secret.as_ref()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret([REDACTED])")
    }
}

/// An expiry plus the encoded signature over its canonical message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken {
    /// Unix timestamp (seconds) after which the token is rejected
    pub exp: u64,

    /// URL-safe base64 signature
    pub sig: String,
}

impl SignedToken {
    /// Render as `exp=<exp>&sig=<sig>`.
    pub fn query(&self) -> String {
        format!("{}={}&{}={}", EXPIRY_PARAM, self.exp, SIGNATURE_PARAM, self.sig)
    }
}

/// Signs and verifies messages with the shared secret.
///
/// Stateless apart from the secret; cheap to clone.
#[derive(Clone, Debug)]
pub struct Signer {
    secret: SharedSecret,
}

impl Signer {
    pub fn new(secret: SharedSecret) -> Self {
        Self { secret }
    }

    /// Compute the raw HMAC-SHA256 of `message`.
    pub fn sign(&self, message: &str) -> [u8; SIGNATURE_LEN] {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(message.as_bytes());

        let mut signature = [0u8; SIGNATURE_LEN];
        signature.copy_from_slice(&mac.finalize().into_bytes());
        signature
    }

    /// Check an encoded signature against `message`.
    ///
    /// Returns `false` for signatures that fail to decode or have the wrong
    /// length. The byte comparison is constant time.
    pub fn verify(&self, message: &str, signature: &str) -> bool {
        let Ok(provided) = decode_signature(signature) else {
            return false;
        };

        let expected = self.sign(message);
        provided.as_slice().ct_eq(&expected[..]).into()
    }

    /// Mint a token that expires at `exp`.
    pub fn mint(&self, exp: u64) -> SignedToken {
        let signature = self.sign(&canonical_message(exp));
        SignedToken {
            exp,
            sig: encode_signature(&signature),
        }
    }
}
