//! Candidate repository.

use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use clipforge_models::{Candidate, CandidateId, FeatureScores, VideoId};

use crate::error::DbResult;

/// Sort order for candidate listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CandidateSort {
    /// Highest score first
    #[default]
    Score,
    /// Longest interval first
    Duration,
    /// Earliest start first
    Start,
}

impl CandidateSort {
    fn order_clause(&self) -> &'static str {
        match self {
            CandidateSort::Score => "score DESC",
            CandidateSort::Duration => "(end_s - start_s) DESC",
            CandidateSort::Start => "start_s ASC",
        }
    }

    /// Parse a query-string value, defaulting to score.
    pub fn parse(s: &str) -> Self {
        match s {
            "duration" => CandidateSort::Duration,
            "start" => CandidateSort::Start,
            _ => CandidateSort::Score,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    id: Uuid,
    video_id: Uuid,
    start_s: f64,
    end_s: f64,
    score: f64,
    features: Json<FeatureScores>,
    thumb_blob_key: Option<String>,
}

impl From<CandidateRow> for Candidate {
    fn from(row: CandidateRow) -> Self {
        Candidate {
            id: CandidateId(row.id),
            video_id: VideoId(row.video_id),
            start_s: row.start_s,
            end_s: row.end_s,
            score: row.score,
            features: row.features.0,
            thumb_blob_key: row.thumb_blob_key,
        }
    }
}

const CANDIDATE_COLUMNS: &str =
    "id, video_id, start_s, end_s, score, features, thumb_blob_key";

/// Repository for scored clip candidates.
#[derive(Clone)]
pub struct CandidateRepo {
    pool: PgPool,
}

impl CandidateRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert one candidate.
    pub async fn create(&self, candidate: &Candidate) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO candidates (id, video_id, start_s, end_s, score, features, thumb_blob_key)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(candidate.id.as_uuid())
        .bind(candidate.video_id.as_uuid())
        .bind(candidate.start_s)
        .bind(candidate.end_s)
        .bind(candidate.score)
        .bind(Json(&candidate.features))
        .bind(&candidate.thumb_blob_key)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetch by id.
    pub async fn get(&self, id: CandidateId) -> DbResult<Option<Candidate>> {
        let row = sqlx::query_as::<_, CandidateRow>(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Candidate::from))
    }

    /// Fetch several by id; missing ids are silently absent from the
    /// result, the caller compares lengths.
    pub async fn get_many(&self, ids: &[CandidateId]) -> DbResult<Vec<Candidate>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query_as::<_, CandidateRow>(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates WHERE id = ANY($1)"
        ))
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Candidate::from).collect())
    }

    /// List a video's candidates with an optional score floor.
    pub async fn list_for_video(
        &self,
        video_id: VideoId,
        min_score: Option<f64>,
        sort: CandidateSort,
    ) -> DbResult<Vec<Candidate>> {
        let rows = sqlx::query_as::<_, CandidateRow>(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates
             WHERE video_id = $1 AND ($2::float8 IS NULL OR score >= $2)
             ORDER BY {}",
            sort.order_clause()
        ))
        .bind(video_id.as_uuid())
        .bind(min_score)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Candidate::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_parse_defaults_to_score() {
        assert_eq!(CandidateSort::parse("score"), CandidateSort::Score);
        assert_eq!(CandidateSort::parse("duration"), CandidateSort::Duration);
        assert_eq!(CandidateSort::parse("start"), CandidateSort::Start);
        assert_eq!(CandidateSort::parse("nonsense"), CandidateSort::Score);
    }
}
