use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::Digest;
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Deterministic one-way digest of a high-entropy token.
///
/// Unsalted by design: the presented token is re-hashed and used as the
/// store lookup key, so the token itself is never persisted in clear.
/// Only suitable for machine-generated tokens; human secrets go through
/// [`crate::SecretHasher`].
#[derive(Debug, Clone)]
pub struct LookupDigest(String);

impl LookupDigest {
    /// Digest a presented token.
    pub fn of(plain: &str) -> Self {
        let digest = Sha256::digest(plain.as_bytes());
        Self(URL_SAFE_NO_PAD.encode(digest))
    }

    /// Rehydrate a digest previously produced by [`LookupDigest::of`].
    pub fn from_stored(encoded: String) -> Self {
        Self(encoded)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Digest equality is constant-time so in-memory stores keyed by digest
// cannot leak prefix-match timing.
impl PartialEq for LookupDigest {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl Eq for LookupDigest {}

impl fmt::Display for LookupDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
