use chrono::Duration;
use chrono::Utc;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;

use super::claims::IdentityClaims;
use super::errors::JwtError;

/// Issues and verifies signed, time-limited identity tokens.
///
/// Uses HS256. Keys and TTL are fixed at construction and never change.
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    ttl: Duration,
}

impl JwtHandler {
    /// Create a new token handler.
    ///
    /// # Arguments
    /// * `secret` - Secret key for signing tokens
    /// * `ttl` - Lifetime of every issued token
    ///
    /// # Security Notes
    /// - The secret should be at least 256 bits (32 bytes) for HS256
    /// - Store secrets in environment variables or secure vaults, never in code
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
            ttl,
        }
    }

    /// Lifetime applied to issued tokens.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for the given identity, expiring after the configured TTL.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token encoding failed
    pub fn issue(&self, id: &str, email: &str) -> Result<String, JwtError> {
        self.encode(&IdentityClaims::new(id, email, self.ttl))
    }

    /// Sign already-built claims.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token encoding failed
    pub fn encode(&self, claims: &IdentityClaims) -> Result<String, JwtError> {
        let header = Header::new(self.algorithm);

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    /// Verify a token and return its claims exactly as issued.
    ///
    /// # Errors
    /// * `Malformed` - Token cannot be decoded or lacks required claims
    /// * `InvalidSignature` - Signature does not match the secret
    /// * `Expired` - Current time is at or past the embedded expiry
    pub fn verify(&self, token: &str) -> Result<IdentityClaims, JwtError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let token_data =
            decode::<IdentityClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => JwtError::Expired,
                    ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                    _ => JwtError::Malformed(e.to_string()),
                }
            })?;

        // jsonwebtoken accepts `now == exp`; tokens are invalid from that instant on.
        if token_data.claims.is_expired(Utc::now().timestamp()) {
            return Err(JwtError::Expired);
        }

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"my_secret_key_at_least_32_bytes_long!";

    #[test]
    fn test_issue_and_verify() {
        let handler = JwtHandler::new(SECRET, Duration::hours(1));

        let token = handler
            .issue("user123", "ana@x.com")
            .expect("Failed to issue token");
        assert!(!token.is_empty());

        let claims = handler.verify(&token).expect("Failed to verify token");
        assert_eq!(claims.id, "user123");
        assert_eq!(claims.email, "ana@x.com");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_verify_returns_claims_as_issued() {
        let handler = JwtHandler::new(SECRET, Duration::hours(1));
        let claims = IdentityClaims::new("user123", "ana@x.com", Duration::minutes(5));

        let token = handler.encode(&claims).expect("Failed to encode token");

        assert_eq!(handler.verify(&token), Ok(claims));
    }

    #[test]
    fn test_verify_malformed_token() {
        let handler = JwtHandler::new(SECRET, Duration::hours(1));

        assert!(matches!(
            handler.verify("invalid.token.here"),
            Err(JwtError::Malformed(_))
        ));
        assert!(matches!(handler.verify(""), Err(JwtError::Malformed(_))));
    }

    #[test]
    fn test_verify_with_wrong_secret() {
        let issuer = JwtHandler::new(b"secret1_at_least_32_bytes_long_key!", Duration::hours(1));
        let verifier = JwtHandler::new(b"secret2_at_least_32_bytes_long_key!", Duration::hours(1));

        let token = issuer
            .issue("user123", "ana@x.com")
            .expect("Failed to issue token");

        assert_eq!(verifier.verify(&token), Err(JwtError::InvalidSignature));
    }

    #[test]
    fn test_verify_expired_token() {
        let handler = JwtHandler::new(SECRET, Duration::hours(1));
        let issued = Utc::now() - Duration::hours(2);
        let claims = IdentityClaims::issued_at("user123", "ana@x.com", issued, Duration::hours(1));

        let token = handler.encode(&claims).expect("Failed to encode token");

        assert_eq!(handler.verify(&token), Err(JwtError::Expired));
    }

    #[test]
    fn test_zero_ttl_token_is_already_expired() {
        let handler = JwtHandler::new(SECRET, Duration::zero());

        let token = handler
            .issue("user123", "ana@x.com")
            .expect("Failed to issue token");

        assert_eq!(handler.verify(&token), Err(JwtError::Expired));
    }

    #[test]
    fn test_verify_tampered_payload() {
        let handler = JwtHandler::new(SECRET, Duration::hours(1));
        let token = handler
            .issue("user123", "ana@x.com")
            .expect("Failed to issue token");
        let other = handler
            .issue("user456", "eve@x.com")
            .expect("Failed to issue token");

        // Header and signature from one token, payload from another
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert_eq!(handler.verify(&forged), Err(JwtError::InvalidSignature));
    }
}
