//! Error types shared by the repository, token and HTTP layers.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// Failures surfaced by a [`crate::users::repo::UserStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    Conflict,

    #[error("user not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Errors returned to HTTP clients as `{"detail": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    /// A row that had just been read disappeared before the write landed.
    #[error("{0}")]
    Inconsistency(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub const EMAIL_TAKEN: &str = "The user with this email already exists in the system.";
pub const USER_NOT_FOUND: &str = "User not found";
pub const BAD_CREDENTIALS: &str = "Could not validate credentials";

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Inconsistency(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => ApiError::Conflict(EMAIL_TAKEN.into()),
            StoreError::NotFound => ApiError::NotFound(USER_NOT_FOUND.into()),
            StoreError::Database(e) => ApiError::Internal(e.into()),
            StoreError::Internal(e) => ApiError::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            ApiError::Internal(e) => {
                error!(error = ?e, "internal error");
                "Internal server error".to_string()
            }
            ApiError::Inconsistency(msg) => {
                error!(detail = %msg, "data inconsistency, needs operator attention");
                msg.clone()
            }
            other => other.to_string(),
        };

        let body = Json(json!({ "detail": detail }));
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}
