//! Transcript repository.

use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use clipforge_models::{Transcript, VideoId, Word};

use crate::error::DbResult;

#[derive(Debug, sqlx::FromRow)]
struct TranscriptRow {
    video_id: Uuid,
    lang: String,
    words: Json<Vec<Word>>,
}

impl From<TranscriptRow> for Transcript {
    fn from(row: TranscriptRow) -> Self {
        Transcript {
            video_id: VideoId(row.video_id),
            lang: row.lang,
            words: row.words.0,
        }
    }
}

/// Repository for transcripts.
#[derive(Clone)]
pub struct TranscriptRepo {
    pool: PgPool,
}

impl TranscriptRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a transcript for a video.
    pub async fn create(&self, transcript: &Transcript) -> DbResult<()> {
        sqlx::query("INSERT INTO transcripts (id, video_id, lang, words) VALUES ($1, $2, $3, $4)")
            .bind(Uuid::new_v4())
            .bind(transcript.video_id.as_uuid())
            .bind(&transcript.lang)
            .bind(Json(&transcript.words))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Fetch the transcript for a video, if any.
    pub async fn get_for_video(&self, video_id: VideoId) -> DbResult<Option<Transcript>> {
        let row = sqlx::query_as::<_, TranscriptRow>(
            "SELECT video_id, lang, words FROM transcripts WHERE video_id = $1 LIMIT 1",
        )
        .bind(video_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Transcript::from))
    }
}
