use std::sync::Arc;

use crate::{
    config::AppConfig,
    users::{
        memory::MemoryUserStore,
        repo::{PgUserStore, UserRepository, UserStore},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub users: UserRepository,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Connects to Postgres, applies migrations and wires the sqlx-backed store.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let db = crate::db::connect(&config).await?;
        crate::db::migrate(&db).await?;
        let store = Arc::new(PgUserStore::new(db)) as Arc<dyn UserStore>;
        Ok(Self::from_parts(store, config))
    }

    pub fn from_parts(store: Arc<dyn UserStore>, config: AppConfig) -> Self {
        Self {
            users: UserRepository::new(store),
            config: Arc::new(config),
        }
    }

    /// State over a process-local store; nothing survives a restart.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::from_parts(Arc::new(MemoryUserStore::default()), config)
    }
}
