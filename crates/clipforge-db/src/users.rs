//! User repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use clipforge_models::UserId;

use crate::error::DbResult;

/// A registered user row. Identity provisioning lives outside this
/// service; this table exists to anchor ownership.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Repository for users.
#[derive(Clone)]
pub struct UserRepo {
    pool: PgPool,
}

impl UserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new user.
    pub async fn create(&self, id: UserId, email: &str, pw_hash: &str) -> DbResult<()> {
        sqlx::query("INSERT INTO users (id, email, pw_hash) VALUES ($1, $2, $3)")
            .bind(id.as_uuid())
            .bind(email)
            .bind(pw_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Fetch by id.
    pub async fn get(&self, id: UserId) -> DbResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, created_at FROM users WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Whether the user exists.
    pub async fn exists(&self, id: UserId) -> DbResult<bool> {
        let found: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }
}
