use thiserror::Error;

use crate::user::errors::UserError;

/// Error for session-policy construction failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionPolicyError {
    #[error("Idle grace window must be shorter than the idle timeout")]
    GraceExceedsTimeout,
}

/// Top-level error for session operations
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Invalid session policy: {0}")]
    InvalidPolicy(#[from] SessionPolicyError),

    #[error("User lookup failed: {0}")]
    User(#[from] UserError),

    // Infrastructure errors
    #[error("Database error: {0}")]
    DatabaseError(String),
}
