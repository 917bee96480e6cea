//! Upload, video CRUD and candidate listing.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use clipforge_db::CandidateSort;
use clipforge_models::{Candidate, FeatureScores, Video, VideoId};
use clipforge_storage::{upload_key, UPLOAD_URL_TTL};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Content types accepted for upload, with their file extensions.
const ALLOWED_CONTENT_TYPES: &[(&str, &str)] = &[
    ("video/mp4", "mp4"),
    ("video/x-matroska", "mkv"),
    ("video/quicktime", "mov"),
    ("video/x-msvideo", "avi"),
];

#[derive(Debug, Deserialize)]
pub struct UploadInitRequest {
    pub filename: String,
    pub filesize: u64,
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_content_type() -> String {
    "video/mp4".to_string()
}

#[derive(Debug, Serialize)]
pub struct UploadInitResponse {
    pub upload_url: String,
    pub upload_id: String,
    pub expires_in: u64,
}

/// `POST /api/uploads/init` — validate the upload and mint a presigned
/// PUT URL.
pub async fn init_upload(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<UploadInitRequest>,
) -> ApiResult<Json<UploadInitResponse>> {
    if req.filesize > state.config.max_upload_bytes {
        return Err(ApiError::validation(format!(
            "file size exceeds maximum of {} bytes",
            state.config.max_upload_bytes
        )));
    }

    let ext = ALLOWED_CONTENT_TYPES
        .iter()
        .find(|(ct, _)| *ct == req.content_type)
        .map(|(_, ext)| *ext)
        .ok_or_else(|| {
            ApiError::validation(format!("unsupported content type: {}", req.content_type))
        })?;

    let upload_id = Uuid::new_v4().to_string();
    let key = upload_key(user_id, &upload_id, ext);
    let upload_url = state
        .storage
        .presign_put(&key, &req.content_type, UPLOAD_URL_TTL)
        .await?;

    info!(user_id = %user_id, upload_id = %upload_id, filename = %req.filename, "Upload initialized");

    Ok(Json(UploadInitResponse {
        upload_url,
        upload_id,
        expires_in: UPLOAD_URL_TTL.as_secs(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateVideoRequest {
    pub upload_id: String,
    #[serde(default = "default_upload_ext")]
    pub ext: String,
    pub title: Option<String>,
}

fn default_upload_ext() -> String {
    "mp4".to_string()
}

#[derive(Debug, Serialize)]
pub struct VideoResponse {
    pub video_id: VideoId,
    pub title: String,
    pub duration_seconds: Option<f64>,
    pub resolution: Option<String>,
    pub created_at: String,
}

impl From<Video> for VideoResponse {
    fn from(video: Video) -> Self {
        Self {
            video_id: video.id,
            title: video.title,
            duration_seconds: video.duration_seconds,
            resolution: video.resolution,
            created_at: video.created_at.to_rfc3339(),
        }
    }
}

/// `POST /api/videos` — register the uploaded blob as a video.
pub async fn create_video(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<CreateVideoRequest>,
) -> ApiResult<(StatusCode, Json<VideoResponse>)> {
    if Uuid::parse_str(&req.upload_id).is_err() {
        return Err(ApiError::validation("upload_id must be a UUID"));
    }
    if !ALLOWED_CONTENT_TYPES.iter().any(|(_, e)| *e == req.ext) {
        return Err(ApiError::validation(format!("unknown extension: {}", req.ext)));
    }

    let blob_key = upload_key(user_id, &req.upload_id, &req.ext);
    let title = req
        .title
        .unwrap_or_else(|| format!("Video {}", &req.upload_id[..8]));

    let video = Video::new(user_id, blob_key, title);
    state.db.videos().create(&video).await?;

    info!(user_id = %user_id, video_id = %video.id, "Video created");
    Ok((StatusCode::CREATED, Json(video.into())))
}

/// `GET /api/videos/{id}`.
pub async fn get_video(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(video_id): Path<VideoId>,
) -> ApiResult<Json<VideoResponse>> {
    let video = state
        .db
        .videos()
        .get_owned(video_id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("video not found"))?;
    Ok(Json(video.into()))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
}

/// `GET /api/videos`.
pub async fn list_videos(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<VideoResponse>>> {
    let videos = state
        .db
        .videos()
        .list_for_owner(user_id, query.limit.clamp(1, 100), query.skip.max(0))
        .await?;
    Ok(Json(videos.into_iter().map(VideoResponse::from).collect()))
}

/// `DELETE /api/videos/{id}` — removes the video and all owned
/// children; blobs are best-effort.
pub async fn delete_video(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(video_id): Path<VideoId>,
) -> ApiResult<StatusCode> {
    let video = state
        .db
        .videos()
        .get_owned(video_id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("video not found"))?;

    state.db.videos().delete(video_id).await?;
    state.storage.delete_object(&video.source_blob_key).await.ok();

    info!(user_id = %user_id, video_id = %video_id, "Video deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct CandidatesQuery {
    pub min_score: Option<f64>,
    #[serde(default = "default_sort")]
    pub sort_by: String,
}

fn default_sort() -> String {
    "score".to_string()
}

#[derive(Debug, Serialize)]
pub struct CandidateResponse {
    pub id: String,
    pub start_s: f64,
    pub end_s: f64,
    pub score: f64,
    pub features: FeatureScores,
    pub thumb_blob_key: Option<String>,
}

impl From<Candidate> for CandidateResponse {
    fn from(c: Candidate) -> Self {
        Self {
            id: c.id.to_string(),
            start_s: c.start_s,
            end_s: c.end_s,
            score: c.score,
            features: c.features,
            thumb_blob_key: c.thumb_blob_key,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CandidatesListResponse {
    pub video_id: VideoId,
    pub total: usize,
    pub candidates: Vec<CandidateResponse>,
}

/// `GET /api/videos/{id}/candidates`.
pub async fn list_candidates(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(video_id): Path<VideoId>,
    Query(query): Query<CandidatesQuery>,
) -> ApiResult<Json<CandidatesListResponse>> {
    state
        .db
        .videos()
        .get_owned(video_id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("video not found"))?;

    let candidates = state
        .db
        .candidates()
        .list_for_video(video_id, query.min_score, CandidateSort::parse(&query.sort_by))
        .await?;

    Ok(Json(CandidatesListResponse {
        video_id,
        total: candidates.len(),
        candidates: candidates.into_iter().map(CandidateResponse::from).collect(),
    }))
}
