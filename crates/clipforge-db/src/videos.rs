//! Video repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use clipforge_models::{UserId, Video, VideoId};

use crate::error::DbResult;

#[derive(Debug, sqlx::FromRow)]
struct VideoRow {
    id: Uuid,
    owner_id: Uuid,
    source_blob_key: String,
    title: String,
    duration_seconds: Option<f64>,
    resolution: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<VideoRow> for Video {
    fn from(row: VideoRow) -> Self {
        Video {
            id: VideoId(row.id),
            owner_id: UserId(row.owner_id),
            source_blob_key: row.source_blob_key,
            title: row.title,
            duration_seconds: row.duration_seconds,
            resolution: row.resolution,
            created_at: row.created_at,
        }
    }
}

const VIDEO_COLUMNS: &str =
    "id, owner_id, source_blob_key, title, duration_seconds, resolution, created_at";

/// Repository for source videos.
#[derive(Clone)]
pub struct VideoRepo {
    pool: PgPool,
}

impl VideoRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new video record.
    pub async fn create(&self, video: &Video) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO videos (id, owner_id, source_blob_key, title, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(video.id.as_uuid())
        .bind(video.owner_id.as_uuid())
        .bind(&video.source_blob_key)
        .bind(&video.title)
        .bind(video.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetch by id.
    pub async fn get(&self, id: VideoId) -> DbResult<Option<Video>> {
        let row = sqlx::query_as::<_, VideoRow>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Video::from))
    }

    /// Fetch by id, constrained to an owner.
    pub async fn get_owned(&self, id: VideoId, owner_id: UserId) -> DbResult<Option<Video>> {
        let row = sqlx::query_as::<_, VideoRow>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE id = $1 AND owner_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(owner_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Video::from))
    }

    /// List an owner's videos, newest first.
    pub async fn list_for_owner(
        &self,
        owner_id: UserId,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Video>> {
        let rows = sqlx::query_as::<_, VideoRow>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE owner_id = $1
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(owner_id.as_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Video::from).collect())
    }

    /// Fill duration and resolution once, after the probe. Videos are
    /// otherwise immutable, so the update only fires while the fields
    /// are still empty.
    pub async fn set_probe_info(
        &self,
        id: VideoId,
        duration_seconds: f64,
        resolution: &str,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE videos SET duration_seconds = $2, resolution = $3
             WHERE id = $1 AND duration_seconds IS NULL",
        )
        .bind(id.as_uuid())
        .bind(duration_seconds)
        .bind(resolution)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a video; jobs, transcripts and candidates cascade.
    pub async fn delete(&self, id: VideoId) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM videos WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
