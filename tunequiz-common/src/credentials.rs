//! Credential management: password hashing and bearer tokens
//!
//! Passwords are hashed with argon2id. Bearer tokens are HS256 JWTs carrying
//! `{sub: username, email, iat, exp}`. The rest of the service only ever
//! consumes the verified `(username, email)` pair; token mechanics stay
//! inside this module.

use crate::{Error, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims embedded in access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — player username
    pub sub: String,
    /// Player email
    pub email: String,
    /// Issued at (unix timestamp)
    pub iat: i64,
    /// Expiry (unix timestamp)
    pub exp: i64,
}

/// Issues and verifies bearer tokens for a fixed secret and lifetime
#[derive(Clone)]
pub struct CredentialManager {
    secret: String,
    ttl_hours: i64,
}

impl CredentialManager {
    pub fn new(secret: impl Into<String>, ttl_hours: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl_hours,
        }
    }

    /// Issue a token for a verified player identity
    pub fn issue(&self, username: &str, email: &str) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: username.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now + self.ttl_hours * 3600,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| Error::Internal(format!("Token encoding failed: {}", e)))
    }

    /// Verify a token and return its claims
    ///
    /// Expired and malformed tokens both come back as `InvalidCredential`;
    /// the messages differ for logging, not for the caller's control flow.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                Error::InvalidCredential("token expired".to_string())
            }
            _ => Error::InvalidCredential("token invalid".to_string()),
        })
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header_value: &str) -> Result<&str> {
    let (scheme, token) = header_value
        .split_once(' ')
        .ok_or_else(|| Error::Unauthorized("malformed authorization header".to_string()))?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(Error::Unauthorized("bearer token required".to_string()));
    }
    Ok(token)
}

/// Hash a password with argon2id and a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored argon2 hash
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
