use thiserror::Error;

use crate::credential::errors::CredentialError;
use crate::user::errors::UserError;

/// Top-level error for authentication operations.
///
/// Carries persistence faults only. Expected denial conditions — wrong
/// secret, missing record, suspended team, expired credential — are
/// returned as values so callers cannot tell them apart.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Credential store error: {0}")]
    Credential(#[from] CredentialError),

    #[error("User lookup failed: {0}")]
    User(#[from] UserError),
}
