use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auth::Authenticator;
use auth::PasswordHasher;
use auth_service::domain::user::errors::AuthError;
use auth_service::domain::user::models::EmailAddress;
use auth_service::domain::user::models::User;
use auth_service::domain::user::models::UserId;
use auth_service::domain::user::ports::UserDirectory;
use auth_service::domain::user::service::AuthService;
use auth_service::inbound::messaging::messages::ResponseEnvelope;
use auth_service::inbound::messaging::MessageDispatcher;
use serde_json::json;
use serde_json::Value;
use tokio::sync::RwLock;

pub const TEST_SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";

/// In-memory user directory with the same uniqueness rule as the Postgres table
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserDirectory {
    pub async fn remove(&self, id: &UserId) {
        self.users.write().await.remove(id);
    }

    pub async fn stored(&self, email: &str) -> Option<User> {
        self.users
            .read()
            .await
            .values()
            .find(|user| user.email.as_str() == email)
            .cloned()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, AuthError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| &user.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn create(&self, user: User) -> Result<User, AuthError> {
        let mut users = self.users.write().await;
        if users.values().any(|existing| existing.email == user.email) {
            return Err(AuthError::UserAlreadyExists);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

/// Test application wiring the real service and dispatcher over an in-memory store
pub struct TestApp {
    pub directory: Arc<InMemoryUserDirectory>,
    pub authenticator: Arc<Authenticator>,
    pub dispatcher: MessageDispatcher<AuthService<InMemoryUserDirectory>>,
    next_id: std::sync::atomic::AtomicU64,
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::with_token_ttl(chrono::Duration::hours(1))
    }

    pub fn with_token_ttl(ttl: chrono::Duration) -> Self {
        let directory = Arc::new(InMemoryUserDirectory::default());
        let hasher = PasswordHasher::with_work_factor(1).expect("Valid work factor");
        let authenticator =
            Arc::new(Authenticator::new(TEST_SECRET, ttl).with_password_hasher(hasher));
        let service = Arc::new(AuthService::new(
            Arc::clone(&directory),
            Arc::clone(&authenticator),
        ));
        let dispatcher = MessageDispatcher::new(service, Duration::from_secs(10));

        Self {
            directory,
            authenticator,
            dispatcher,
            next_id: std::sync::atomic::AtomicU64::new(1),
        }
    }

    /// Send a request through the dispatcher and return the reply envelope
    pub async fn send(&self, cmd: &str, data: Value) -> ResponseEnvelope {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            .to_string();
        let payload = serde_json::to_vec(&json!({
            "id": id,
            "pattern": { "cmd": cmd },
            "data": data,
        }))
        .expect("Failed to encode request");

        let reply = self
            .dispatcher
            .dispatch(&payload)
            .await
            .expect("Dispatcher rejected envelope");
        assert_eq!(reply.envelope.id, id);
        reply.envelope
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> ResponseEnvelope {
        self.send(
            "register_user",
            json!({ "name": name, "email": email, "password": password }),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> ResponseEnvelope {
        self.send("login", json!({ "email": email, "password": password }))
            .await
    }

    pub async fn verify(&self, token: &str) -> ResponseEnvelope {
        self.send("verify_user", json!({ "token": token })).await
    }
}

/// Assert that no field anywhere in a response carries password material
pub fn assert_no_password_material(value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                let key = key.to_ascii_lowercase();
                assert!(
                    !key.contains("password") && !key.contains("hash"),
                    "response leaks field {key}"
                );
                assert_no_password_material(nested);
            }
        }
        Value::Array(items) => items.iter().for_each(assert_no_password_material),
        Value::String(s) => assert!(!s.starts_with("$argon2"), "response leaks a hash"),
        _ => {}
    }
}
