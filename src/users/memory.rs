use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::{
    error::StoreError,
    users::{
        repo::UserStore,
        repo_types::{NewUserRow, User, UserRowChanges},
    },
};

#[derive(Default)]
struct Table {
    rows: Vec<User>,
    last_id: i64,
}

/// Process-local [`UserStore`]. Rows are kept in id order; every operation
/// takes the table lock once, so writes are atomic.
#[derive(Default)]
pub struct MemoryUserStore {
    table: RwLock<Table>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let table = self.table.read().await;
        Ok(table.rows.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let table = self.table.read().await;
        Ok(table.rows.iter().find(|u| u.email == email).cloned())
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>, StoreError> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn insert(&self, row: NewUserRow) -> Result<User, StoreError> {
        let mut table = self.table.write().await;
        if table.rows.iter().any(|u| u.email == row.email) {
            return Err(StoreError::Conflict);
        }
        table.last_id += 1;
        let user = User {
            id: table.last_id,
            email: row.email,
            hashed_password: row.hashed_password,
            full_name: row.full_name,
            is_active: row.is_active,
            is_superuser: row.is_superuser,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
        };
        table.rows.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: i64, changes: UserRowChanges) -> Result<User, StoreError> {
        let mut table = self.table.write().await;
        if let Some(email) = &changes.email {
            if table.rows.iter().any(|u| &u.email == email && u.id != id) {
                return Err(StoreError::Conflict);
            }
        }
        let user = table
            .rows
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound)?;

        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(hash) = changes.hashed_password {
            user.hashed_password = hash;
        }
        if let Some(name) = changes.full_name {
            user.full_name = name;
        }
        if let Some(active) = changes.is_active {
            user.is_active = active;
        }
        if let Some(superuser) = changes.is_superuser {
            user.is_superuser = superuser;
        }
        user.updated_at = Some(OffsetDateTime::now_utc());
        Ok(user.clone())
    }

    async fn delete(&self, id: i64) -> Result<User, StoreError> {
        let mut table = self.table.write().await;
        let pos = table
            .rows
            .iter()
            .position(|u| u.id == id)
            .ok_or(StoreError::NotFound)?;
        Ok(table.rows.remove(pos))
    }
}
