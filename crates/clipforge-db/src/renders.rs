//! Render repository.
//!
//! The render row is the render pipeline's job record: it carries the
//! same guarded status machine as jobs plus the per-pair progress and
//! output map.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use clipforge_models::{JobStatus, Render, RenderFiles, RenderId, RenderParams, UserId};

use crate::error::{DbError, DbResult};

#[derive(Debug, sqlx::FromRow)]
struct RenderRow {
    id: Uuid,
    owner_id: Uuid,
    params: Json<RenderParams>,
    status: String,
    progress: i32,
    files: Json<RenderFiles>,
    created_at: DateTime<Utc>,
}

impl TryFrom<RenderRow> for Render {
    type Error = DbError;

    fn try_from(row: RenderRow) -> Result<Self, Self::Error> {
        Ok(Render {
            id: RenderId(row.id),
            owner_id: UserId(row.owner_id),
            params: row.params.0,
            status: JobStatus::from_str(&row.status)
                .map_err(|e| DbError::NotFound(format!("corrupt render status: {e}")))?,
            progress: row.progress,
            files: row.files.0,
            created_at: row.created_at,
        })
    }
}

const RENDER_COLUMNS: &str = "id, owner_id, params, status, progress, files, created_at";

/// Repository for render requests.
#[derive(Clone)]
pub struct RenderRepo {
    pool: PgPool,
}

impl RenderRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a render, enforcing the per-owner concurrency cap.
    /// Returns false when the cap would be exceeded.
    pub async fn create_capped(&self, render: &Render, max_active: i64) -> DbResult<bool> {
        self.create_batch_capped(std::slice::from_ref(render), max_active)
            .await
    }

    /// Insert a batch of renders for one owner, all or nothing.
    ///
    /// Cap checks under READ COMMITTED race each other, so the count
    /// and the inserts run in one transaction behind a per-owner
    /// advisory lock: concurrent submissions for the same owner
    /// serialize here and each sees the other's committed rows.
    /// Returns false (inserting nothing) when the whole batch does not
    /// fit under `max_active`.
    pub async fn create_batch_capped(
        &self,
        renders: &[Render],
        max_active: i64,
    ) -> DbResult<bool> {
        let Some(first) = renders.first() else {
            return Ok(true);
        };
        let owner_id = first.owner_id;

        let mut tx = self.pool.begin().await?;

        // Held until commit/rollback.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text))")
            .bind(owner_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        let (active,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM renders
             WHERE owner_id = $1 AND status IN ('pending', 'processing')",
        )
        .bind(owner_id.as_uuid())
        .fetch_one(&mut *tx)
        .await?;

        if active + renders.len() as i64 > max_active {
            tx.rollback().await?;
            return Ok(false);
        }

        for render in renders {
            sqlx::query(
                "INSERT INTO renders (id, owner_id, params, status, progress, files, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(render.id.as_uuid())
            .bind(render.owner_id.as_uuid())
            .bind(Json(&render.params))
            .bind(render.status.as_str())
            .bind(render.progress)
            .bind(Json(&render.files))
            .bind(render.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Fetch by id.
    pub async fn get(&self, id: RenderId) -> DbResult<Option<Render>> {
        let row = sqlx::query_as::<_, RenderRow>(&format!(
            "SELECT {RENDER_COLUMNS} FROM renders WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Render::try_from).transpose()
    }

    /// Fetch by id, constrained to an owner.
    pub async fn get_owned(&self, id: RenderId, owner_id: UserId) -> DbResult<Option<Render>> {
        let row = sqlx::query_as::<_, RenderRow>(&format!(
            "SELECT {RENDER_COLUMNS} FROM renders WHERE id = $1 AND owner_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(owner_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Render::try_from).transpose()
    }

    /// List an owner's renders, newest first.
    pub async fn list_for_owner(
        &self,
        owner_id: UserId,
        status: Option<JobStatus>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Render>> {
        let rows = sqlx::query_as::<_, RenderRow>(&format!(
            "SELECT {RENDER_COLUMNS} FROM renders
             WHERE owner_id = $1 AND ($2::varchar IS NULL OR status = $2)
             ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(owner_id.as_uuid())
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Render::try_from).collect()
    }

    /// Current status only, for milestone cancellation polls.
    pub async fn status(&self, id: RenderId) -> DbResult<Option<JobStatus>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT status FROM renders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(s,)| {
            JobStatus::from_str(&s).map_err(|e| DbError::NotFound(format!("corrupt status: {e}")))
        })
        .transpose()
    }

    /// Idempotency CAS, identical in shape to the job repo's.
    pub async fn begin_processing(&self, id: RenderId) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE renders SET status = 'processing' WHERE id = $1 AND status = 'pending'",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Record one completed pair: merge the blob key into `files` and
    /// bump progress. Progress only moves forward and only while
    /// processing.
    pub async fn record_pair(
        &self,
        id: RenderId,
        files: &RenderFiles,
        progress: i32,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE renders SET files = $2, progress = $3
             WHERE id = $1 AND status = 'processing' AND progress <= $3",
        )
        .bind(id.as_uuid())
        .bind(Json(files))
        .bind(progress)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Terminal success.
    pub async fn mark_completed(&self, id: RenderId) -> DbResult<()> {
        sqlx::query(
            "UPDATE renders SET status = 'completed', progress = 100
             WHERE id = $1 AND status IN ('pending', 'processing')",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Terminal failure. Uploaded outputs recorded so far stay in
    /// `files`.
    pub async fn mark_failed(&self, id: RenderId) -> DbResult<()> {
        sqlx::query(
            "UPDATE renders SET status = 'failed'
             WHERE id = $1 AND status IN ('pending', 'processing')",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Cooperative cancellation.
    pub async fn cancel(&self, id: RenderId) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE renders SET status = 'cancelled'
             WHERE id = $1 AND status IN ('pending', 'processing')",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Delete a render record. Candidates are referenced, not owned, so
    /// nothing cascades beyond the row itself.
    pub async fn delete(&self, id: RenderId, owner_id: UserId) -> DbResult<Option<Render>> {
        let row = sqlx::query_as::<_, RenderRow>(&format!(
            "DELETE FROM renders WHERE id = $1 AND owner_id = $2 RETURNING {RENDER_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(owner_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Render::try_from).transpose()
    }
}
