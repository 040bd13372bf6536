use crate::lookup::LookupDigest;
use crate::secret::HashedSecret;
use crate::secret::SecretError;
use crate::secret::SecretHasher;
use crate::token;
use crate::token::TokenClass;

/// Hashing seam injected into the authentication engine and token issuer.
///
/// A trait rather than a concrete type so tests can observe verification
/// call counts and substitute cheap hashing.
pub trait SecretCodec: Send + Sync + 'static {
    /// Slow salted hash for password-like values. Non-queryable; verified
    /// by re-hash-and-compare.
    fn hash_secret(&self, plain: &str) -> Result<HashedSecret, SecretError>;

    /// Verify a plaintext against a stored digest.
    fn verify(&self, plain: &str, stored: &HashedSecret) -> bool;

    /// Verify against an optional digest.
    ///
    /// When the record is absent the same verification work runs against a
    /// decoy digest and the result is always false, so a missing principal
    /// is not distinguishable from a wrong secret by response latency.
    fn verify_or_reject(&self, plain: &str, stored: Option<&HashedSecret>) -> bool;

    /// Fast deterministic hash for high-entropy tokens used as store keys.
    fn lookup_digest(&self, plain: &str) -> LookupDigest;
}

/// Production codec: Argon2id secrets, SHA-256 lookup keys.
pub struct Codec {
    hasher: SecretHasher,
    decoy: HashedSecret,
}

impl Codec {
    /// Build a codec, pre-hashing the decoy digest used for absent-record
    /// verification.
    ///
    /// # Errors
    /// * `HashingFailed` - Decoy digest could not be produced
    pub fn new() -> Result<Self, SecretError> {
        let hasher = SecretHasher::new();
        let decoy = hasher.hash(&token::generate(TokenClass::BrokerPassword))?;

        Ok(Self { hasher, decoy })
    }
}

impl SecretCodec for Codec {
    fn hash_secret(&self, plain: &str) -> Result<HashedSecret, SecretError> {
        self.hasher.hash(plain)
    }

    fn verify(&self, plain: &str, stored: &HashedSecret) -> bool {
        // Stored digests are valid PHC strings by construction; a corrupt
        // one reads as a plain mismatch.
        self.hasher.verify(plain, stored).unwrap_or(false)
    }

    fn verify_or_reject(&self, plain: &str, stored: Option<&HashedSecret>) -> bool {
        match stored {
            Some(digest) => self.verify(plain, digest),
            None => {
                let _ = self.verify(plain, &self.decoy);
                false
            }
        }
    }

    fn lookup_digest(&self, plain: &str) -> LookupDigest {
        LookupDigest::of(plain)
    }
}
