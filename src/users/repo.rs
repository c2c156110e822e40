use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::{
    auth::password::hash_password,
    error::StoreError,
    users::repo_types::{NewUserRow, User, UserRowChanges},
};

const USER_COLUMNS: &str =
    "id, email, hashed_password, full_name, is_active, is_superuser, created_at, updated_at";

/// Row-level persistence for users. Passwords arrive already hashed.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// Users in id order.
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>, StoreError>;
    async fn insert(&self, row: NewUserRow) -> Result<User, StoreError>;
    async fn update(&self, id: i64, changes: UserRowChanges) -> Result<User, StoreError>;
    async fn delete(&self, id: i64) -> Result<User, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn write_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::Conflict;
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn insert(&self, row: NewUserRow) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, hashed_password, full_name, is_active, is_superuser)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&row.email)
        .bind(&row.hashed_password)
        .bind(&row.full_name)
        .bind(row.is_active)
        .bind(row.is_superuser)
        .fetch_one(&self.db)
        .await
        .map_err(write_error)
    }

    async fn update(&self, id: i64, changes: UserRowChanges) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                email           = COALESCE($2, email),
                hashed_password = COALESCE($3, hashed_password),
                full_name       = CASE WHEN $4 THEN $5 ELSE full_name END,
                is_active       = COALESCE($6, is_active),
                is_superuser    = COALESCE($7, is_superuser),
                updated_at      = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.email)
        .bind(&changes.hashed_password)
        .bind(changes.full_name.is_some())
        .bind(changes.full_name.flatten())
        .bind(changes.is_active)
        .bind(changes.is_superuser)
        .fetch_optional(&self.db)
        .await
        .map_err(write_error)?
        .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: i64) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            "DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }
}

/// Registration input with a plaintext password.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
}

impl NewUser {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            full_name: None,
            is_active: true,
            is_superuser: false,
        }
    }
}

/// Partial update with an optional plaintext password.
/// `full_name: Some(None)` clears the name; `None` leaves it alone.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User operations over a [`UserStore`]; hashes passwords on the way in.
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn UserStore>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        self.store.find_by_id(id).await
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.store.find_by_email(&normalize_email(email)).await
    }

    pub async fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>, StoreError> {
        self.store.list(offset.max(0), limit.max(0)).await
    }

    pub async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let row = NewUserRow {
            email: normalize_email(&new.email),
            hashed_password: hash_password(&new.password)?,
            full_name: new.full_name,
            is_active: new.is_active,
            is_superuser: new.is_superuser,
        };
        let user = self.store.insert(row).await?;
        debug!(user_id = user.id, "user row inserted");
        Ok(user)
    }

    pub async fn update(&self, id: i64, changes: UserChanges) -> Result<User, StoreError> {
        let hashed_password = match changes.password.as_deref() {
            Some(plain) => Some(hash_password(plain)?),
            None => None,
        };
        let row = UserRowChanges {
            email: changes.email.as_deref().map(normalize_email),
            hashed_password,
            full_name: changes.full_name,
            is_active: changes.is_active,
            is_superuser: changes.is_superuser,
        };
        self.store.update(id, row).await
    }

    pub async fn delete(&self, id: i64) -> Result<User, StoreError> {
        self.store.delete(id).await
    }
}
