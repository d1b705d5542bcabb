use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::AppConfig;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Failures surfaced by the persistence gateways.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("the email or the user is already in use")]
    Conflict,
    #[error("row is still referenced")]
    Referenced,
    #[error("stored value could not be decoded: {0}")]
    Decode(String),
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        let code = e
            .as_database_error()
            .and_then(|db| db.code())
            .map(|c| c.into_owned());
        match code.as_deref() {
            Some(UNIQUE_VIOLATION) => RepoError::Conflict,
            Some(FOREIGN_KEY_VIOLATION) => RepoError::Referenced,
            _ => RepoError::Database(e),
        }
    }
}

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("connect to database")
}
