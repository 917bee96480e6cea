//! Database error types.

use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl DbError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}
