//! JWT signing and verification (HS256, shared secret)

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{UserIdentity, UserRole};

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Identity carried by the token; the user's existence is checked separately
    pub fn identity(&self) -> Result<UserIdentity, JwtError> {
        let id = Uuid::parse_str(&self.sub).map_err(|e| JwtError::InvalidToken(e.to_string()))?;
        let role = UserRole::parse(&self.role)
            .ok_or_else(|| JwtError::InvalidToken(format!("unknown role {}", self.role)))?;

        Ok(UserIdentity {
            id,
            email: self.email.clone(),
            role,
        })
    }
}

/// Sign a token for `identity` valid for `ttl`.
///
/// Login lives in another service; this is for operators and tests.
pub fn issue_token(
    identity: &UserIdentity,
    secret: &str,
    ttl: Duration,
) -> Result<String, JwtError> {
    let now = Utc::now();
    let claims = Claims {
        sub: identity.id.to_string(),
        email: identity.email.clone(),
        role: identity.role.as_str().to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::EncodingFailed(e.to_string()))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::TokenExpired,
        _ => JwtError::InvalidToken(e.to_string()),
    })?;

    Ok(token_data.claims)
}
