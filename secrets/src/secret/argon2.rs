use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::PasswordHash;
use argon2::password_hash::PasswordHasher as Argon2PasswordHasher;
use argon2::password_hash::PasswordVerifier;
use argon2::password_hash::SaltString;
use argon2::Argon2;

use super::errors::SecretError;
use super::HashedSecret;

/// Slow salted hasher for password-like secrets.
///
/// Internally Argon2id with a fresh random salt per digest. Holds no
/// mutable state, so concurrent verification needs no synchronization.
pub struct SecretHasher;

impl SecretHasher {
    /// Create a new hasher configured with secure defaults.
    pub fn new() -> Self {
        Self
    }

    /// Hash a plaintext secret for storage.
    ///
    /// # Arguments
    /// * `plain` - Plaintext secret to hash
    ///
    /// # Returns
    /// [`HashedSecret`] wrapping a PHC string (algorithm, parameters, salt, hash)
    ///
    /// # Errors
    /// * `HashingFailed` - Hashing operation failed
    pub fn hash(&self, plain: &str) -> Result<HashedSecret, SecretError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| HashedSecret::from_phc(hash.to_string()))
            .map_err(|e| SecretError::HashingFailed(e.to_string()))
    }

    /// Verify a plaintext secret against a stored digest.
    ///
    /// # Arguments
    /// * `plain` - Plaintext secret to verify
    /// * `stored` - Digest previously produced by [`SecretHasher::hash`]
    ///
    /// # Returns
    /// True if the secret matches, false otherwise
    ///
    /// # Errors
    /// * `InvalidDigest` - Stored value is not a parseable PHC string
    pub fn verify(&self, plain: &str, stored: &HashedSecret) -> Result<bool, SecretError> {
        let parsed_hash = PasswordHash::new(stored.as_str())
            .map_err(|e| SecretError::InvalidDigest(e.to_string()))?;

        let argon2 = Argon2::default();

        Ok(argon2
            .verify_password(plain.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

impl Default for SecretHasher {
    fn default() -> Self {
        Self::new()
    }
}
