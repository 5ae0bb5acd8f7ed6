use async_trait::async_trait;

use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::LoginOutcome;
use crate::domain::user::models::RegisterCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserProfile;
use crate::user::errors::AuthError;

/// Port for the credential operations exposed to the transport layer.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Authenticate with email and password.
    ///
    /// # Returns
    /// Public user view and a freshly issued token
    ///
    /// # Errors
    /// * `UserNotFound` - No user with this email
    /// * `InvalidCredentials` - Password does not match
    async fn login(&self, command: LoginCommand) -> Result<LoginOutcome, AuthError>;

    /// Register a new user. No token is issued.
    ///
    /// # Errors
    /// * `UserAlreadyExists` - Email is already registered
    async fn register(&self, command: RegisterCommand) -> Result<UserProfile, AuthError>;

    /// Resolve the user a token was issued for.
    ///
    /// # Errors
    /// * `InvalidToken` - Token is malformed, forged or expired
    /// * `UserNotFound` - Token is valid but the user no longer exists
    async fn verify(&self, token: &str) -> Result<UserProfile, AuthError>;
}

/// Persistence operations for the user directory.
#[async_trait]
pub trait UserDirectory: Send + Sync + 'static {
    /// Retrieve user by email address, compared exactly as stored.
    ///
    /// # Returns
    /// Optional user entity (None if not found)
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, AuthError>;

    /// Retrieve user by identifier.
    ///
    /// # Returns
    /// Optional user entity (None if not found)
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError>;

    /// Persist a new user atomically.
    ///
    /// # Errors
    /// * `UserAlreadyExists` - Email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, user: User) -> Result<User, AuthError>;
}
