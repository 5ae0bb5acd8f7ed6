use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Identity claims embedded in an access token.
///
/// `id` and `email` identify the subject; `iat` and `exp` are Unix timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityClaims {
    /// User identifier
    pub id: String,

    /// User email as stored
    pub email: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl IdentityClaims {
    /// Build claims issued now and expiring after `ttl`.
    pub fn new(id: impl ToString, email: impl ToString, ttl: Duration) -> Self {
        Self::issued_at(id, email, Utc::now(), ttl)
    }

    /// Build claims for an explicit issuance instant.
    pub fn issued_at(
        id: impl ToString,
        email: impl ToString,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let expiration = issued_at + ttl;

        Self {
            id: id.to_string(),
            email: email.to_string(),
            iat: issued_at.timestamp(),
            exp: expiration.timestamp(),
        }
    }

    /// A token stops being valid at the instant its expiry is reached.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        current_timestamp >= self.exp
    }
}
