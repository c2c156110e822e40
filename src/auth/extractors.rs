use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::warn;

use crate::{
    auth::jwt::JwtKeys,
    error::{ApiError, BAD_CREDENTIALS},
    state::AppState,
    users::repo_types::User,
};

/// The caller resolved from the `Authorization: Bearer` header.
pub struct CurrentUser(pub User);

pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".into()))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".into()))?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(ApiError::Unauthorized("Not authenticated".into()));
    }
    Ok(token.trim())
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;

        let email = JwtKeys::from_ref(state).verify(token).map_err(|e| {
            warn!(error = %e, "rejected bearer token");
            ApiError::Unauthorized(BAD_CREDENTIALS.into())
        })?;

        let user = state.users.get_by_email(&email).await?.ok_or_else(|| {
            warn!("token subject no longer resolves to a user");
            ApiError::Unauthorized(BAD_CREDENTIALS.into())
        })?;

        Ok(CurrentUser(user))
    }
}
