use std::sync::Arc;

use async_trait::async_trait;
use auth::AuthenticationError;
use auth::Authenticator;

use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::LoginOutcome;
use crate::domain::user::models::PasswordDigest;
use crate::domain::user::models::RegisterCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserProfile;
use crate::user::errors::AuthError;
use crate::user::ports::AuthServicePort;
use crate::user::ports::UserDirectory;

/// Domain service implementation for credential operations.
///
/// Composes a user directory with the shared authenticator. Argon2 work is
/// moved to the blocking pool so it does not stall other requests.
pub struct AuthService<D>
where
    D: UserDirectory,
{
    directory: Arc<D>,
    authenticator: Arc<Authenticator>,
}

impl<D> AuthService<D>
where
    D: UserDirectory,
{
    /// Create a new auth service with injected dependencies.
    ///
    /// # Arguments
    /// * `directory` - User persistence implementation
    /// * `authenticator` - Password hasher and token issuer
    pub fn new(directory: Arc<D>, authenticator: Arc<Authenticator>) -> Self {
        Self {
            directory,
            authenticator,
        }
    }

    async fn hash_password(&self, password: String) -> Result<PasswordDigest, AuthError> {
        let authenticator = Arc::clone(&self.authenticator);

        tokio::task::spawn_blocking(move || authenticator.hash_password(&password))
            .await
            .map_err(|e| AuthError::Unknown(format!("Hashing task failed: {}", e)))?
            .map(PasswordDigest::new)
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }
}

#[async_trait]
impl<D> AuthServicePort for AuthService<D>
where
    D: UserDirectory,
{
    async fn login(&self, command: LoginCommand) -> Result<LoginOutcome, AuthError> {
        let user = self
            .directory
            .find_by_email(&command.email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let authenticator = Arc::clone(&self.authenticator);
        let stored_hash = user.password_hash.clone();
        let id = user.id.to_string();
        let email = user.email.as_str().to_string();

        let result = tokio::task::spawn_blocking(move || {
            authenticator.authenticate(&command.password, stored_hash.as_str(), &id, &email)
        })
        .await
        .map_err(|e| AuthError::Unknown(format!("Authentication task failed: {}", e)))?;

        let access = result.map_err(|e| match e {
            AuthenticationError::InvalidCredentials => {
                tracing::info!(user_id = %user.id, "Login rejected: password mismatch");
                AuthError::InvalidCredentials
            }
            AuthenticationError::JwtError(err) => AuthError::TokenGeneration(err.to_string()),
        })?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginOutcome {
            user: UserProfile::from(&user),
            token: access.access_token,
        })
    }

    async fn register(&self, command: RegisterCommand) -> Result<UserProfile, AuthError> {
        // Fast path for a friendly error; the store's unique constraint is the real guard
        if self
            .directory
            .find_by_email(&command.email)
            .await?
            .is_some()
        {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = self.hash_password(command.password).await?;

        let user = User {
            id: UserId::new(),
            name: command.name,
            email: command.email,
            password_hash,
        };

        let created_user = self.directory.create(user).await?;

        tracing::info!(user_id = %created_user.id, "User registered");

        Ok(UserProfile::from(&created_user))
    }

    async fn verify(&self, token: &str) -> Result<UserProfile, AuthError> {
        let claims = self.authenticator.validate_token(token).map_err(|e| {
            tracing::warn!(reason = %e, "Token verification failed");
            AuthError::InvalidToken
        })?;

        let user_id = UserId::from_string(&claims.id).map_err(|e| {
            tracing::warn!(reason = %e, "Token carries an unusable subject id");
            AuthError::InvalidToken
        })?;

        let user = self
            .directory
            .find_by_id(&user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        Ok(UserProfile::from(&user))
    }
}
