//! Job repository with guarded status transitions.
//!
//! Every transition is expressed as a conditional UPDATE so concurrent
//! workers and redelivered messages cannot regress a job: terminal
//! states are absorbing, progress only moves forward, and the
//! `pending -> processing` CAS doubles as the at-least-once idempotency
//! guard.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use clipforge_models::{Job, JobId, JobKind, JobStatus, LogEntry, UserId, VideoId};

use crate::error::{DbError, DbResult};

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    video_id: Uuid,
    kind: String,
    status: String,
    progress: i32,
    logs: Json<Vec<LogEntry>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = DbError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Job {
            id: JobId(row.id),
            video_id: VideoId(row.video_id),
            kind: JobKind::from_str(&row.kind)
                .map_err(|e| DbError::NotFound(format!("corrupt job kind: {e}")))?,
            status: JobStatus::from_str(&row.status)
                .map_err(|e| DbError::NotFound(format!("corrupt job status: {e}")))?,
            progress: row.progress,
            logs: row.logs.0,
            created_at: row.created_at,
        })
    }
}

const JOB_COLUMNS: &str = "id, video_id, kind, status, progress, logs, created_at";
const JOB_COLUMNS_QUALIFIED: &str =
    "j.id, j.video_id, j.kind, j.status, j.progress, j.logs, j.created_at";

/// Repository for pipeline jobs.
#[derive(Clone)]
pub struct JobRepo {
    pool: PgPool,
}

impl JobRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new job, with admission built into the statement.
    ///
    /// The insert arbitrates against the partial unique index on live
    /// analyze jobs, so two concurrent submissions for the same video
    /// cannot both land: the loser's insert conflicts and this returns
    /// false. Render-kind rows never match the index and always admit.
    pub async fn create_admitted(&self, job: &Job) -> DbResult<bool> {
        let result = sqlx::query(
            "INSERT INTO jobs (id, video_id, kind, status, progress, logs, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (video_id)
                 WHERE kind = 'analyze' AND status IN ('pending', 'processing')
                 DO NOTHING",
        )
        .bind(job.id.as_uuid())
        .bind(job.video_id.as_uuid())
        .bind(job.kind.as_str())
        .bind(job.status.as_str())
        .bind(job.progress)
        .bind(Json(&job.logs))
        .bind(job.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Fetch by id.
    pub async fn get(&self, id: JobId) -> DbResult<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Job::try_from).transpose()
    }

    /// Fetch by id, constrained to videos the user owns.
    pub async fn get_owned(&self, id: JobId, owner_id: UserId) -> DbResult<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS_QUALIFIED} FROM jobs j
             JOIN videos v ON v.id = j.video_id
             WHERE j.id = $1 AND v.owner_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(owner_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Job::try_from).transpose()
    }

    /// List jobs over a user's videos with optional filters.
    pub async fn list_for_owner(
        &self,
        owner_id: UserId,
        video_id: Option<VideoId>,
        kind: Option<JobKind>,
        status: Option<JobStatus>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS_QUALIFIED} FROM jobs j
             JOIN videos v ON v.id = j.video_id
             WHERE v.owner_id = $1
               AND ($2::uuid IS NULL OR j.video_id = $2)
               AND ($3::varchar IS NULL OR j.kind = $3)
               AND ($4::varchar IS NULL OR j.status = $4)
             ORDER BY j.created_at DESC
             LIMIT $5 OFFSET $6"
        ))
        .bind(owner_id.as_uuid())
        .bind(video_id.map(|v| v.as_uuid()))
        .bind(kind.map(|k| k.as_str()))
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Job::try_from).collect()
    }

    /// Current status only, for milestone cancellation polls.
    pub async fn status(&self, id: JobId) -> DbResult<Option<JobStatus>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT status FROM jobs WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(s,)| {
            JobStatus::from_str(&s).map_err(|e| DbError::NotFound(format!("corrupt status: {e}")))
        })
        .transpose()
    }

    /// The at-least-once idempotency guard: claim the job by moving it
    /// from `pending` to `processing`. Returns false when another
    /// delivery already claimed it (or it was cancelled while queued).
    pub async fn begin_processing(&self, id: JobId) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'processing' WHERE id = $1 AND status = 'pending'",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Write a milestone: progress plus a step log entry. Progress is
    /// monotone and only moves while the job is processing.
    pub async fn update_progress(&self, id: JobId, progress: i32, step: &str) -> DbResult<()> {
        sqlx::query(
            "UPDATE jobs SET progress = $2, logs = logs || $3::jsonb
             WHERE id = $1 AND status = 'processing' AND progress <= $2",
        )
        .bind(id.as_uuid())
        .bind(progress)
        .bind(Json(vec![LogEntry::step(step)]))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Append an arbitrary log entry without touching progress.
    pub async fn append_log(&self, id: JobId, entry: &LogEntry) -> DbResult<()> {
        sqlx::query("UPDATE jobs SET logs = logs || $2::jsonb WHERE id = $1")
            .bind(id.as_uuid())
            .bind(Json(vec![entry]))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Terminal success. No-op if the job already reached a terminal
    /// state.
    pub async fn mark_completed(&self, id: JobId) -> DbResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'completed', progress = 100
             WHERE id = $1 AND status IN ('pending', 'processing')",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Terminal failure with the error recorded in the log.
    pub async fn mark_failed(&self, id: JobId, error: &str) -> DbResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'failed', logs = logs || $2::jsonb
             WHERE id = $1 AND status IN ('pending', 'processing')",
        )
        .bind(id.as_uuid())
        .bind(Json(vec![LogEntry::error(error)]))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Cooperative cancellation: flips the row; the worker observes it
    /// at its next milestone. Returns false when the job was already
    /// terminal.
    pub async fn cancel(&self, id: JobId) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'cancelled'
             WHERE id = $1 AND status IN ('pending', 'processing')",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Admission check: is there a non-terminal analyze job for this
    /// video?
    pub async fn find_active_analyze(&self, video_id: VideoId) -> DbResult<Option<JobId>> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM jobs
             WHERE video_id = $1 AND kind = 'analyze'
               AND status IN ('pending', 'processing')
             LIMIT 1",
        )
        .bind(video_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id,)| JobId(id)))
    }
}
