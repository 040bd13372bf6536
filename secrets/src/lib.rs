//! Credential codec library
//!
//! Provides the hashing and token-generation primitives shared by the
//! credential service:
//! - Slow salted secret hashing (Argon2id) for password-like values
//! - Deterministic lookup-key hashing (SHA-256) for opaque bearer tokens
//! - Constant-behavior verification, including the record-absent case
//! - Opaque token text generation
//!
//! The service defines its own repository and engine traits and injects a
//! [`SecretCodec`] implementation. Keeping the primitives here avoids
//! coupling the domain crates to a specific hash construction.
//!
//! # Examples
//!
//! ## Secret hashing
//! ```
//! use secrets::secret::SecretHasher;
//!
//! let hasher = SecretHasher::new();
//! let digest = hasher.hash("correct horse battery staple").unwrap();
//! assert!(hasher.verify("correct horse battery staple", &digest).unwrap());
//! ```
//!
//! ## Lookup keys
//! ```
//! use secrets::LookupDigest;
//!
//! // Deterministic: the presented token can be re-hashed and queried.
//! assert_eq!(LookupDigest::of("act_abc"), LookupDigest::of("act_abc"));
//! ```
//!
//! ## Full codec
//! ```
//! use secrets::{Codec, SecretCodec};
//!
//! let codec = Codec::new().unwrap();
//! let stored = codec.hash_secret("hunter2").unwrap();
//!
//! assert!(codec.verify("hunter2", &stored));
//! // Absent record: same verification work, always false.
//! assert!(!codec.verify_or_reject("hunter2", None));
//! ```

pub mod codec;
pub mod lookup;
pub mod secret;
pub mod token;

// Re-export commonly used items
pub use codec::Codec;
pub use codec::SecretCodec;
pub use lookup::LookupDigest;
pub use secret::HashedSecret;
pub use secret::SecretError;
pub use secret::SecretHasher;
pub use token::TokenClass;
