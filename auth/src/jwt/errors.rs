use thiserror::Error;

/// Error type for token operations.
///
/// Verification failures keep their cause so callers can log it; callers
/// facing the outside world are expected to collapse them into one error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    EncodingFailed(String),

    #[error("Token is malformed: {0}")]
    Malformed(String),

    #[error("Token signature does not match")]
    InvalidSignature,

    #[error("Token is expired")]
    Expired,
}
