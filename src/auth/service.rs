use std::sync::Arc;

use crate::auth::jwt::{verify_token, JwtError};
use crate::error::ApiError;
use crate::models::UserIdentity;
use crate::store::Store;

/// Resolves bearer tokens to live users
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, jwt_secret: impl Into<String>) -> Self {
        Self {
            store,
            jwt_secret: jwt_secret.into(),
        }
    }

    /// Invalid or expired tokens are `Forbidden`; a valid token for a user that
    /// no longer exists is `Unauthorized`.
    pub async fn authenticate(&self, token: &str) -> Result<UserIdentity, ApiError> {
        let claims = verify_token(token, &self.jwt_secret).map_err(|e| {
            tracing::debug!("Rejected bearer token: {}", e);
            match e {
                JwtError::TokenExpired => ApiError::Forbidden("Token expired".to_string()),
                _ => ApiError::Forbidden("Invalid token".to_string()),
            }
        })?;

        let claimed = claims
            .identity()
            .map_err(|_| ApiError::Forbidden("Invalid token".to_string()))?;

        let user = self
            .store
            .find_user(claimed.id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

        Ok(user.identity())
    }
}
