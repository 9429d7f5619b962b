//! Password hashing and JWT handling
//!
//! Tokens are HS256-signed with the configured secret. Access tokens
//! authenticate requests; refresh tokens only mint new access tokens and can
//! be revoked in Redis until they expire.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use common::cache::RedisPool;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{config::JwtConfig, models::new_id};

const REVOKED_NAMESPACE: &str = "revoked_token";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Expected a {expected:?} token")]
    WrongTokenType { expected: TokenType },

    #[error("Token has been revoked")]
    Revoked,

    #[error("Failed to hash password: {0}")]
    Hashing(String),

    #[error("Failed to issue token: {0}")]
    Issuing(String),
}

/// Hash a password with argon2 and a random salt
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Check a password against a stored hash; unreadable hashes never match
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Unique token ID, used as the revocation key
    pub jti: String,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_expiry: u64,
    refresh_token_expiry: u64,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            access_token_expiry: config.access_token_expiry,
            refresh_token_expiry: config.refresh_token_expiry,
        }
    }

    fn issue(&self, user_id: &str, token_type: TokenType, lifetime: u64) -> Result<String, AuthError> {
        let iat = now();
        let claims = Claims {
            sub: user_id.to_string(),
            jti: new_id(),
            iat,
            exp: iat + lifetime,
            token_type,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Issuing(e.to_string()))
    }

    pub fn generate_access_token(&self, user_id: &str) -> Result<String, AuthError> {
        self.issue(user_id, TokenType::Access, self.access_token_expiry)
    }

    pub fn generate_refresh_token(&self, user_id: &str) -> Result<String, AuthError> {
        self.issue(user_id, TokenType::Refresh, self.refresh_token_expiry)
    }

    /// Validate signature, expiry and token type
    pub fn validate_token(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!("Rejected token: {}", e);
                AuthError::InvalidToken
            })?
            .claims;
        if claims.token_type != expected {
            return Err(AuthError::WrongTokenType { expected });
        }
        Ok(claims)
    }

    pub fn access_token_expiry(&self) -> u64 {
        self.access_token_expiry
    }

    /// Check if a token is revoked in Redis
    pub async fn is_revoked(&self, redis_pool: &RedisPool, claims: &Claims) -> Result<bool> {
        redis_pool.has_flag(REVOKED_NAMESPACE, &claims.jti).await
    }

    /// Revoke a token in Redis for the rest of its lifetime
    pub async fn revoke(&self, redis_pool: &RedisPool, claims: &Claims) -> Result<()> {
        let remaining = claims.exp.saturating_sub(now());
        redis_pool
            .set_flag(REVOKED_NAMESPACE, &claims.jti, remaining)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new(&JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expiry: 60,
            refresh_token_expiry: 120,
        })
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("Correct-Horse-1").unwrap();
        assert_ne!(hash, "Correct-Horse-1");
        assert!(verify_password("Correct-Horse-1", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("Correct-Horse-1", "not-a-hash"));
    }

    #[test]
    fn access_token_round_trip() {
        let jwt = service();
        let token = jwt.generate_access_token("user-1").unwrap();
        let claims = jwt.validate_token(&token, TokenType::Access).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let jwt = service();
        let token = jwt.generate_refresh_token("user-1").unwrap();
        assert!(matches!(
            jwt.validate_token(&token, TokenType::Access),
            Err(AuthError::WrongTokenType { .. })
        ));
        assert!(jwt.validate_token(&token, TokenType::Refresh).is_ok());
    }

    #[test]
    fn foreign_signatures_are_rejected() {
        let other = JwtService::new(&JwtConfig {
            secret: "another-secret".to_string(),
            ..JwtConfig::default()
        });
        let token = other.generate_access_token("user-1").unwrap();
        assert!(matches!(
            service().validate_token(&token, TokenType::Access),
            Err(AuthError::InvalidToken)
        ));
    }
}
