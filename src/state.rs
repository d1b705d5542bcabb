use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::{
    jwt::JwtKeys,
    repo::{PgUserRepo, UserRepo},
};
use crate::categories::repo::{CategoryRepo, PgCategoryRepo};
use crate::config::AppConfig;
use crate::operations::repo::{OperationRepo, PgOperationRepo};

#[derive(Clone)]
pub struct AppState {
    pub jwt: JwtKeys,
    pub users: Arc<dyn UserRepo>,
    pub categories: Arc<dyn CategoryRepo>,
    pub operations: Arc<dyn OperationRepo>,
}

impl AppState {
    pub fn new(db: PgPool, config: &AppConfig) -> Self {
        Self {
            jwt: JwtKeys::new(&config.jwt),
            users: Arc::new(PgUserRepo::new(db.clone())),
            categories: Arc::new(PgCategoryRepo::new(db.clone())),
            operations: Arc::new(PgOperationRepo::new(db)),
        }
    }

    #[cfg(test)]
    pub fn with_memory_store(store: Arc<crate::memory::MemoryStore>) -> Self {
        Self {
            jwt: JwtKeys::new(&crate::config::JwtConfig {
                secret: "test".into(),
                ttl_minutes: 60,
            }),
            users: store.clone(),
            categories: store.clone(),
            operations: store,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::with_memory_store(Arc::new(crate::memory::MemoryStore::default()))
    }
}
