//! Authentication extractors
//!
//! Route handlers take [`AuthenticatedUser`] or [`AdminUser`] as arguments;
//! rejections render through [`ApiError`] like every other failure.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;

use crate::auth::AuthService;
use crate::error::ApiError;
use crate::models::{UserIdentity, UserRole};

/// Caller resolved from a valid bearer token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub UserIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Unauthorized("Access token required".to_string()))?;

        let auth_service = Arc::<AuthService>::from_ref(state);
        let identity = auth_service.authenticate(bearer.token()).await?;

        Ok(AuthenticatedUser(identity))
    }
}

/// Caller holding the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub UserIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(identity) =
            AuthenticatedUser::from_request_parts(parts, state).await?;

        if identity.role != UserRole::Admin {
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }

        Ok(AdminUser(identity))
    }
}
