use thiserror::Error;

/// Error for UserId parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserIdError {
    #[error("Invalid UUID format: {0}")]
    InvalidFormat(String),
}

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Outward-facing category of an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    Conflict,
    Internal,
}

/// Top-level error for all credential operations.
///
/// The business variants render the exact message sent back to callers.
/// Infrastructure variants carry detail for logs only and are reported to
/// callers as a generic internal error.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("User not found")]
    UserNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("Stored user record is invalid: {0}")]
    CorruptRecord(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token generation failed: {0}")]
    TokenGeneration(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::UserNotFound => ErrorKind::NotFound,
            AuthError::InvalidCredentials | AuthError::InvalidToken => ErrorKind::Unauthorized,
            AuthError::UserAlreadyExists => ErrorKind::Conflict,
            AuthError::CorruptRecord(_)
            | AuthError::Hashing(_)
            | AuthError::TokenGeneration(_)
            | AuthError::DatabaseError(_)
            | AuthError::Unknown(_) => ErrorKind::Internal,
        }
    }
}

impl From<UserIdError> for AuthError {
    fn from(err: UserIdError) -> Self {
        AuthError::CorruptRecord(err.to_string())
    }
}

impl From<EmailError> for AuthError {
    fn from(err: EmailError) -> Self {
        AuthError::CorruptRecord(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_messages() {
        assert_eq!(AuthError::UserNotFound.to_string(), "User not found");
        assert_eq!(AuthError::InvalidCredentials.to_string(), "Invalid credentials");
        assert_eq!(AuthError::InvalidToken.to_string(), "Invalid token");
        assert_eq!(AuthError::UserAlreadyExists.to_string(), "User already exists");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(AuthError::UserNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(AuthError::InvalidCredentials.kind(), ErrorKind::Unauthorized);
        assert_eq!(AuthError::InvalidToken.kind(), ErrorKind::Unauthorized);
        assert_eq!(AuthError::UserAlreadyExists.kind(), ErrorKind::Conflict);
        assert_eq!(
            AuthError::DatabaseError("connection refused".to_string()).kind(),
            ErrorKind::Internal
        );
        assert_eq!(
            AuthError::from(UserIdError::InvalidFormat("x".to_string())).kind(),
            ErrorKind::Internal
        );
    }
}
