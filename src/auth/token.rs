use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use super::gate::Role;
use crate::config::SecurityConfig;

/// Reset tokens stay valid for ten minutes after issue.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub role: Role,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error, PartialEq)]
pub enum TokenError {
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    Expired,
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Signs and verifies bearer credentials with a shared HS256 secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").field("expiry", &self.expiry).finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: &str, expiry: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry,
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(&config.jwt_secret, Duration::hours(config.jwt_expiry_hours as i64))
    }

    pub fn issue(&self, id: Uuid, role: Role, name: &str) -> Result<String, TokenError> {
        self.issue_at(id, role, name, Utc::now())
    }

    /// Same inputs and clock always produce the same token.
    pub fn issue_at(&self, id: Uuid, role: Role, name: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            id,
            role,
            name: name.to_string(),
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Expiry is checked against `now` with no leeway.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|_| TokenError::InvalidToken)?;
        if now.timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

/// A freshly minted password reset token. `plain` goes to the user, `hashed` is stored.
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub plain: String,
    pub hashed: String,
    pub expires_at: DateTime<Utc>,
}

pub fn issue_reset_token() -> ResetToken {
    issue_reset_token_at(Utc::now())
}

pub fn issue_reset_token_at(now: DateTime<Utc>) -> ResetToken {
    let bytes: [u8; 20] = rand::random();
    let plain: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    let hashed = hash_reset_token(&plain);
    ResetToken {
        plain,
        hashed,
        expires_at: now + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
    }
}

pub fn hash_reset_token(plain: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plain.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn match_reset_token(candidate: &str, stored_hash: &str, stored_expiry: DateTime<Utc>) -> bool {
    match_reset_token_at(candidate, stored_hash, stored_expiry, Utc::now())
}

pub fn match_reset_token_at(
    candidate: &str,
    stored_hash: &str,
    stored_expiry: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    hash_reset_token(candidate) == stored_hash && now < stored_expiry
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret", Duration::hours(1))
    }

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn issue_then_verify_round_trip() {
        let id = Uuid::new_v4();
        let token = issuer().issue_at(id, Role::Publisher, "Pat", epoch()).unwrap();
        let claims = issuer().verify_at(&token, epoch() + Duration::minutes(59)).unwrap();
        assert_eq!(claims.id, id);
        assert_eq!(claims.role, Role::Publisher);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn issue_is_deterministic_for_fixed_clock() {
        let id = Uuid::new_v4();
        let a = issuer().issue_at(id, Role::User, "A", epoch()).unwrap();
        let b = issuer().issue_at(id, Role::User, "A", epoch()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn expired_at_exact_boundary() {
        let token = issuer().issue_at(Uuid::new_v4(), Role::User, "A", epoch()).unwrap();
        assert_eq!(
            issuer().verify_at(&token, epoch() + Duration::hours(1)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn wrong_secret_and_garbage_are_invalid() {
        let token = issuer().issue_at(Uuid::new_v4(), Role::User, "A", epoch()).unwrap();
        let other = TokenIssuer::new("other-secret", Duration::hours(1));
        assert_eq!(other.verify_at(&token, epoch()), Err(TokenError::InvalidToken));
        assert_eq!(issuer().verify_at("not.a.jwt", epoch()), Err(TokenError::InvalidToken));
    }

    #[test]
    fn reset_tokens_are_unique_and_hashed() {
        let a = issue_reset_token_at(epoch());
        let b = issue_reset_token_at(epoch());
        assert_ne!(a.plain, b.plain);
        assert_eq!(a.plain.len(), 40);
        assert_eq!(a.hashed.len(), 64);
        assert_eq!(a.hashed, hash_reset_token(&a.plain));
        assert_eq!(a.expires_at, epoch() + Duration::minutes(10));
    }

    #[test]
    fn reset_token_match_requires_digest_and_time() {
        let token = issue_reset_token_at(epoch());
        assert!(match_reset_token_at(&token.plain, &token.hashed, token.expires_at, epoch()));
        assert!(!match_reset_token_at("nope", &token.hashed, token.expires_at, epoch()));
        assert!(!match_reset_token_at(&token.plain, &token.hashed, token.expires_at, token.expires_at));
    }
}
