use anyhow::Context;
use tracing::info;
use validator::Validate;

use crate::{
    config::FirstSuperuser,
    error::StoreError,
    users::{
        dto::UserCreate,
        repo::{NewUser, UserRepository},
    },
};

/// Creates the configured superuser unless that email is already registered.
/// The seed must pass the same rules as a registration. Returns whether an
/// account was created.
pub async fn ensure_first_superuser(
    users: &UserRepository,
    seed: &FirstSuperuser,
) -> anyhow::Result<bool> {
    let body = UserCreate {
        email: seed.email.trim().to_string(),
        password: seed.password.clone(),
        full_name: None,
        is_active: true,
        is_superuser: true,
    };
    body.validate().context("FIRST_SUPERUSER_EMAIL / FIRST_SUPERUSER_PASSWORD rejected")?;

    if users.get_by_email(&body.email).await?.is_some() {
        return Ok(false);
    }
    match users.create(NewUser::from(body)).await {
        Ok(user) => {
            info!(user_id = user.id, "first superuser created");
            Ok(true)
        }
        // another instance won the race
        Err(StoreError::Conflict) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
