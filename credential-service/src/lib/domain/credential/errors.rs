use thiserror::Error;

use crate::credential::models::OwnerKind;

/// Top-level error for credential persistence and issuance.
///
/// Expected denial conditions (bad secret, missing record, suspended team)
/// are values, not errors; only faults appear here.
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    #[error("Secret error: {0}")]
    Secret(#[from] secrets::SecretError),

    #[error("Broker credentials cannot be issued for {0} owners")]
    UnsupportedBrokerOwner(OwnerKind),

    // Infrastructure errors - the only class that propagates to callers
    #[error("Database error: {0}")]
    DatabaseError(String),
}
