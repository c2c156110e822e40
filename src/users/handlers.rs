use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        extractors::CurrentUser,
        password::verify_password,
        policy::{can_list_users, ensure_can_manage, UserAction},
    },
    error::{ApiError, StoreError, USER_NOT_FOUND},
    extract::{ApiPath, ApiQuery, ValidatedJson},
    state::AppState,
    users::{
        dto::{Message, Pagination, PasswordChange, UserCreate, UserUpdate},
        repo::UserChanges,
        repo_types::User,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/", get(list_users).post(create_user))
        .route("/users/me", get(read_me))
        .route("/users/me/password", post(change_password))
        .route(
            "/users/:user_id",
            get(read_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, body))]
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<UserCreate>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.users.create(body.into()).await.map_err(|e| {
        if matches!(e, StoreError::Conflict) {
            warn!("registration with an email already in use");
        }
        ApiError::from(e)
    })?;
    info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, caller))]
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ApiQuery(page): ApiQuery<Pagination>,
) -> Result<Json<Vec<User>>, ApiError> {
    if !can_list_users(&caller) {
        return Err(ApiError::Forbidden("Not authorized to list users".into()));
    }
    let users = state.users.list(page.skip, page.limit).await?;
    Ok(Json(users))
}

pub async fn read_me(CurrentUser(caller): CurrentUser) -> Json<User> {
    Json(caller)
}

#[instrument(skip(state, caller, body), fields(user_id = caller.id))]
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ValidatedJson(body): ValidatedJson<PasswordChange>,
) -> Result<Json<Message>, ApiError> {
    if !verify_password(&body.current_password, &caller.hashed_password) {
        warn!("password change with wrong current password");
        return Err(ApiError::BadRequest("Incorrect current password".into()));
    }

    let changes = UserChanges {
        password: Some(body.new_password),
        ..Default::default()
    };
    match state.users.update(caller.id, changes).await {
        Ok(_) => {}
        Err(StoreError::NotFound) => {
            error!(user_id = caller.id, "authenticated user vanished during password change");
            return Err(ApiError::Inconsistency(format!(
                "User {} disappeared while updating the password",
                caller.id
            )));
        }
        Err(e) => return Err(e.into()),
    }

    info!("password changed");
    Ok(Json(Message {
        msg: "Password updated successfully".into(),
    }))
}

#[instrument(skip(state, caller))]
pub async fn read_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<User>, ApiError> {
    ensure_can_manage(&caller, user_id, UserAction::Read)?;
    let user = state
        .users
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND.into()))?;
    Ok(Json(user))
}

#[instrument(skip(state, caller, body))]
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ApiPath(user_id): ApiPath<i64>,
    ValidatedJson(body): ValidatedJson<UserUpdate>,
) -> Result<Json<User>, ApiError> {
    ensure_can_manage(&caller, user_id, UserAction::Update)?;
    let user = state.users.update(user_id, body.into()).await?;
    info!(user_id, "user updated");
    Ok(Json(user))
}

#[instrument(skip(state, caller))]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<User>, ApiError> {
    ensure_can_manage(&caller, user_id, UserAction::Delete)?;
    let deleted = state.users.delete(user_id).await?;
    info!(user_id, "user deleted");
    Ok(Json(deleted))
}
