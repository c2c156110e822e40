use axum::{
    extract::{FromRef, State},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginForm, TokenResponse},
        jwt::JwtKeys,
        services::authenticate,
    },
    error::ApiError,
    extract::ApiForm,
    state::AppState,
};

pub fn login_routes() -> Router<AppState> {
    Router::new().route("/login/access-token", post(login_access_token))
}

#[instrument(skip(state, form), fields(username = %form.username))]
pub async fn login_access_token(
    State(state): State<AppState>,
    ApiForm(form): ApiForm<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = authenticate(&state.users, &form.username, &form.password)
        .await?
        .ok_or_else(|| {
            warn!("login failed");
            ApiError::BadRequest("Incorrect email or password".into())
        })?;

    if !user.is_active {
        warn!(user_id = user.id, "login refused for inactive user");
        return Err(ApiError::BadRequest("Inactive user".into()));
    }

    let token = JwtKeys::from_ref(&state).issue(&user.email)?;
    info!(user_id = user.id, "access token issued");
    Ok(Json(TokenResponse::bearer(token)))
}
