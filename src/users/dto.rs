use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::users::repo::{NewUser, UserChanges};

fn default_true() -> bool {
    true
}

/// Keeps an explicit `null` apart from a missing field: `null` becomes `Some(None)`.
fn nullable<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Request body for registration.
#[derive(Debug, Deserialize, Validate)]
pub struct UserCreate {
    #[validate(email(message = "value is not a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    pub full_name: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
}

impl From<UserCreate> for NewUser {
    fn from(body: UserCreate) -> Self {
        Self {
            email: body.email,
            password: body.password,
            full_name: body.full_name,
            is_active: body.is_active,
            is_superuser: body.is_superuser,
        }
    }
}

/// Request body for a partial update; absent fields are left as they are.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(email(message = "value is not a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub full_name: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
}

impl From<UserUpdate> for UserChanges {
    fn from(body: UserUpdate) -> Self {
        Self {
            email: body.email,
            password: body.password,
            full_name: body.full_name,
            is_active: body.is_active,
            is_superuser: body.is_superuser,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct PasswordChange {
    pub current_password: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default, alias = "offset")]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub msg: String,
}
