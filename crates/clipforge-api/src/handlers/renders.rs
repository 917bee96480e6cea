//! Render submission, status, download URLs and deletion.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;

use clipforge_models::{
    AspectRatio, CandidateId, JobStatus, Render, RenderFiles, RenderId, RenderParams,
};
use clipforge_queue::{Priority, QueueMessage, RenderMessage};
use clipforge_storage::{render_key, DOWNLOAD_URL_TTL};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RenderResponse {
    pub render_id: Option<RenderId>,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RenderStatusResponse {
    pub render_id: RenderId,
    pub status: JobStatus,
    pub progress: i32,
    pub files: RenderFiles,
    pub created_at: String,
}

impl From<Render> for RenderStatusResponse {
    fn from(render: Render) -> Self {
        Self {
            render_id: render.id,
            status: render.status,
            progress: render.progress,
            files: render.files,
            created_at: render.created_at.to_rfc3339(),
        }
    }
}

/// Validate a render request and check candidate ownership.
async fn validate_request(
    state: &AppState,
    user_id: clipforge_models::UserId,
    params: &RenderParams,
) -> ApiResult<()> {
    if params.candidate_ids.is_empty() {
        return Err(ApiError::validation("at least one candidate must be selected"));
    }
    if params.outputs.is_empty() {
        return Err(ApiError::validation("at least one output aspect is required"));
    }
    if params.loudness.trim().parse::<f64>().is_err() {
        return Err(ApiError::validation(format!(
            "loudness must be a LUFS number, got {:?}",
            params.loudness
        )));
    }

    let candidates = state.db.candidates().get_many(&params.candidate_ids).await?;
    if candidates.len() != params.candidate_ids.len() {
        return Err(ApiError::not_found("one or more candidates not found"));
    }

    for candidate in &candidates {
        state
            .db
            .videos()
            .get_owned(candidate.video_id, user_id)
            .await?
            .ok_or_else(|| {
                ApiError::forbidden(format!("access denied for candidate {}", candidate.id))
            })?;
    }

    Ok(())
}

/// Create one render row (cap-checked atomically) and enqueue it.
async fn submit_render(
    state: &AppState,
    user_id: clipforge_models::UserId,
    params: RenderParams,
) -> ApiResult<Render> {
    let render = Render::new(user_id, params);
    let admitted = state
        .db
        .renders()
        .create_capped(&render, state.config.max_concurrent_renders)
        .await?;

    if !admitted {
        return Err(ApiError::too_many_requests(format!(
            "maximum {} concurrent renders allowed",
            state.config.max_concurrent_renders
        )));
    }

    let message = QueueMessage::Render(RenderMessage::new(render.id, user_id));
    state.queue.enqueue(&message, Priority::Normal).await?;

    info!(
        user_id = %user_id,
        render_id = %render.id,
        pairs = render.params.total_pairs(),
        "Render job submitted"
    );
    Ok(render)
}

/// `POST /api/renders`.
pub async fn create_render(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(params): Json<RenderParams>,
) -> ApiResult<(StatusCode, Json<RenderResponse>)> {
    validate_request(&state, user_id, &params).await?;
    let clip_count = params.candidate_ids.len();
    let render = submit_render(&state, user_id, params).await?;

    Ok((
        StatusCode::CREATED,
        Json(RenderResponse {
            render_id: Some(render.id),
            status: "pending".to_string(),
            message: format!("Render job started for {clip_count} clips"),
        }),
    ))
}

/// Batch submissions are capped to this many requests.
const MAX_BATCH: usize = 5;

/// `POST /api/renders/batch`.
///
/// The whole batch is admitted or rejected against the concurrency cap
/// before any row is created.
pub async fn batch_render(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(requests): Json<Vec<RenderParams>>,
) -> ApiResult<Json<Vec<RenderResponse>>> {
    if requests.is_empty() {
        return Err(ApiError::validation("batch is empty"));
    }
    if requests.len() > MAX_BATCH {
        return Err(ApiError::validation(format!(
            "maximum {MAX_BATCH} batch renders allowed per request"
        )));
    }

    for params in &requests {
        validate_request(&state, user_id, params).await?;
    }

    // Whole-batch admission: the repo counts and inserts under one
    // per-owner lock, so either every row lands or none do.
    let renders: Vec<Render> = requests
        .into_iter()
        .map(|params| Render::new(user_id, params))
        .collect();
    let admitted = state
        .db
        .renders()
        .create_batch_capped(&renders, state.config.max_concurrent_renders)
        .await?;
    if !admitted {
        return Err(ApiError::too_many_requests(format!(
            "would exceed maximum {} concurrent renders",
            state.config.max_concurrent_renders
        )));
    }

    let mut responses = Vec::with_capacity(renders.len());
    for render in renders {
        let clip_count = render.params.candidate_ids.len();
        let message = QueueMessage::Render(RenderMessage::new(render.id, user_id));
        match state.queue.enqueue(&message, Priority::Normal).await {
            Ok(_) => {
                info!(
                    user_id = %user_id,
                    render_id = %render.id,
                    pairs = render.params.total_pairs(),
                    "Render job submitted"
                );
                responses.push(RenderResponse {
                    render_id: Some(render.id),
                    status: "pending".to_string(),
                    message: format!("Render job started for {clip_count} clips"),
                });
            }
            Err(e) => responses.push(RenderResponse {
                render_id: Some(render.id),
                status: "error".to_string(),
                message: format!("render accepted but enqueue failed: {e}"),
            }),
        }
    }

    Ok(Json(responses))
}

/// `GET /api/renders/{id}`.
pub async fn get_render(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(render_id): Path<RenderId>,
) -> ApiResult<Json<RenderStatusResponse>> {
    let render = state
        .db
        .renders()
        .get_owned(render_id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("render not found"))?;
    Ok(Json(render.into()))
}

#[derive(Debug, Deserialize)]
pub struct RendersQuery {
    pub status: Option<String>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
}

/// `GET /api/renders`.
pub async fn list_renders(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<RendersQuery>,
) -> ApiResult<Json<Vec<RenderStatusResponse>>> {
    let status = query
        .status
        .as_deref()
        .map(JobStatus::from_str)
        .transpose()
        .map_err(ApiError::validation)?;

    let renders = state
        .db
        .renders()
        .list_for_owner(user_id, status, query.limit.clamp(1, 100), query.skip.max(0))
        .await?;

    Ok(Json(
        renders.into_iter().map(RenderStatusResponse::from).collect(),
    ))
}

/// `DELETE /api/renders/{id}` — removes the record and its uploaded
/// outputs; referenced candidates are untouched.
pub async fn delete_render(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(render_id): Path<RenderId>,
) -> ApiResult<StatusCode> {
    let render = state
        .db
        .renders()
        .delete(render_id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("render not found"))?;

    let keys: Vec<String> = render.files.blob_keys().map(String::from).collect();
    state.storage.delete_objects(&keys).await.ok();

    info!(user_id = %user_id, render_id = %render_id, blobs = keys.len(), "Render deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub download_url: String,
    pub expires_in: u64,
    pub filename: String,
}

/// `GET /api/renders/{id}/download/{candidate_id}/{aspect}` — 24-hour
/// signed URL for one completed output.
pub async fn download_render(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path((render_id, candidate_id, aspect)): Path<(RenderId, CandidateId, String)>,
) -> ApiResult<Json<DownloadResponse>> {
    let aspect = AspectRatio::from_str(&aspect).map_err(ApiError::validation)?;

    let render = state
        .db
        .renders()
        .get_owned(render_id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("render not found"))?;

    if render.status != JobStatus::Completed {
        return Err(ApiError::validation(format!(
            "render not completed (status: {})",
            render.status
        )));
    }

    render
        .files
        .get(candidate_id, aspect)
        .ok_or_else(|| {
            ApiError::not_found(format!(
                "no file for candidate {candidate_id} in format {aspect}"
            ))
        })?;

    let key = render_key(render_id, candidate_id, aspect);
    let download_url = state.storage.presign_get(&key, DOWNLOAD_URL_TTL).await?;

    Ok(Json(DownloadResponse {
        download_url,
        expires_in: DOWNLOAD_URL_TTL.as_secs(),
        filename: format!("clip_{candidate_id}_{}.mp4", aspect.sanitized()),
    }))
}
