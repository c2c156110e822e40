use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Welcome {
    pub message: String,
}

pub fn meta_routes() -> Router<AppState> {
    Router::new().route("/meta/health", get(health))
}

pub async fn health() -> Json<HealthCheck> {
    Json(HealthCheck { status: "OK" })
}

pub async fn welcome(State(state): State<AppState>) -> Json<Welcome> {
    Json(Welcome {
        message: format!("Welcome to {}", state.config.project_name),
    })
}
