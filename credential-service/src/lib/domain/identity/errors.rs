use thiserror::Error;

/// Error for structured broker-identity parsing failures.
///
/// Every variant is terminal for the request that presented the identity;
/// none is retried. The variant is logged internally and never reaches the
/// wire.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityParseError {
    #[error("Expected 4 colon-separated username segments, got {actual}")]
    MalformedUsername { actual: usize },

    #[error("Expected 4 or 5 colon-separated client id segments, got {actual}")]
    MalformedClientId { actual: usize },

    #[error("Identity segments must be non-empty")]
    EmptySegment,

    #[error("Unknown protocol tag: {0}")]
    UnknownProtocol(String),

    #[error("Unknown scope tag: {0}")]
    UnknownScope(String),

    #[error("Client id does not match username")]
    ClientIdMismatch,

    #[error("Devices cannot carry a high-availability suffix")]
    HaSuffixOnDevice,
}
