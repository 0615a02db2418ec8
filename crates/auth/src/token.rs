//! HS256 token issuance and verification.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use thiserror::Error;

use akademi_core::UserId;

use crate::Claims;

/// Access tokens are short-lived (24 hours).
pub const ACCESS_TOKEN_TTL: Duration = Duration::hours(24);

/// Refresh tokens are long-lived (7 days).
pub const REFRESH_TOKEN_TTL: Duration = Duration::days(7);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("invalid token")]
    Invalid,
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,

    /// Unix expiry of the access token.
    pub expires_at: i64,
}

/// Signs and verifies session tokens with a process-wide HS256 secret.
///
/// Tokens are stateless: they are never updated or revoked, only reissued.
/// A presented refresh token stays valid until its own expiry.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign a token for `user_id` expiring `ttl` from now.
    pub fn issue(&self, user_id: UserId, ttl: Duration) -> Result<String, TokenError> {
        let claims = Claims::new(user_id, Utc::now() + ttl);
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|_| TokenError::Invalid)
    }

    /// Issue a fresh access + refresh pair for one subject.
    pub fn issue_pair(&self, user_id: UserId) -> Result<TokenPair, TokenError> {
        let expires_at = (Utc::now() + ACCESS_TOKEN_TTL).timestamp();
        Ok(TokenPair {
            access_token: self.issue(user_id, ACCESS_TOKEN_TTL)?,
            refresh_token: self.issue(user_id, REFRESH_TOKEN_TTL)?,
            expires_at,
        })
    }

    /// Verify signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_round_trips() {
        let issuer = TokenIssuer::new(b"test-secret");
        let user_id = UserId::new();
        let token = issuer.issue(user_id, ACCESS_TOKEN_TTL).unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.user_id, user_id);
    }

    #[test]
    fn pair_embeds_the_same_subject() {
        let issuer = TokenIssuer::new(b"test-secret");
        let user_id = UserId::new();
        let pair = issuer.issue_pair(user_id).unwrap();
        assert_eq!(issuer.verify(&pair.access_token).unwrap().user_id, user_id);
        assert_eq!(issuer.verify(&pair.refresh_token).unwrap().user_id, user_id);
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let issuer = TokenIssuer::new(b"test-secret");
        let token = issuer.issue(UserId::new(), Duration::seconds(-60)).unwrap();
        assert_eq!(issuer.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn wrong_secret_is_rejected_as_invalid() {
        let issuer = TokenIssuer::new(b"test-secret");
        let other = TokenIssuer::new(b"other-secret");
        let token = issuer.issue(UserId::new(), ACCESS_TOKEN_TTL).unwrap();
        assert_eq!(other.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn garbage_is_rejected() {
        let issuer = TokenIssuer::new(b"test-secret");
        assert_eq!(issuer.verify("not-a-token"), Err(TokenError::Invalid));
    }
}
