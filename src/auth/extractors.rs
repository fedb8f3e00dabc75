use axum::{
    async_trait,
    extract::{FromRef, FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
    Json,
};
use serde::de::DeserializeOwned;
use tracing::warn;

use super::jwt::JwtKeys;
use crate::error::ApiError;

/// Extracts and validates the bearer JWT, returning the user ID.
pub struct AuthUser(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let missing = || ApiError::unauthorized("Authorization header is required");
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(missing)?
            .to_str()
            .map_err(|_| ApiError::unauthorized("Invalid authorization header format"))?
            .trim();
        if header.is_empty() {
            return Err(missing());
        }

        // Expect exactly "Bearer <token>"
        let token = match header.split_once(' ') {
            Some(("Bearer", token)) if !token.is_empty() && !token.contains(' ') => token,
            _ => return Err(ApiError::unauthorized("Invalid authorization header format")),
        };

        let keys = JwtKeys::from_ref(state);
        let user_id = keys
            .verify(token)
            .and_then(|claims| claims.user_id())
            .map_err(|e| {
                warn!(error = %e, "invalid or expired token");
                ApiError::unauthorized("Invalid or expired token")
            })?;

        Ok(AuthUser(user_id))
    }
}

/// `axum::Json`, but a bad body becomes a `{"error":"Bad Request"}` response.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                warn!(error = %rejection.body_text(), "rejected request body");
                Err(ApiError::bad_request(rejection.body_text()))
            }
        }
    }
}
