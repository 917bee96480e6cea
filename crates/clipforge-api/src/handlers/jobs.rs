//! Analyze job submission, status, cancellation and retry.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;

use clipforge_models::{
    AnalysisConfig, AnalysisTargets, Job, JobConfig, JobId, JobKind, JobStatus, LogEntry, VideoId,
};
use clipforge_queue::{AnalyzeMessage, Priority, QueueMessage};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub video_id: VideoId,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Clip-length target overrides
    pub targets: Option<AnalysisTargets>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub job_id: JobId,
    pub video_id: VideoId,
    pub status: JobStatus,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: JobId,
    pub video_id: VideoId,
    pub kind: JobKind,
    pub status: JobStatus,
    pub progress: i32,
    pub logs: Vec<LogEntry>,
    pub created_at: String,
}

impl From<Job> for JobStatusResponse {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            video_id: job.video_id,
            kind: job.kind,
            status: job.status,
            progress: job.progress,
            logs: job.logs,
            created_at: job.created_at.to_rfc3339(),
        }
    }
}

/// Validate clip-length targets before they reach a worker.
fn validate_targets(targets: &AnalysisTargets) -> ApiResult<()> {
    if targets.clip_min_s <= 0.0
        || targets.clip_min_s > targets.clip_max_s
        || targets.target_s < targets.clip_min_s
        || targets.target_s > targets.clip_max_s
    {
        return Err(ApiError::validation(
            "targets must satisfy 0 < clip_min_s <= target_s <= clip_max_s",
        ));
    }
    if targets.max_candidates == 0 || targets.max_candidates > 100 {
        return Err(ApiError::validation("max_candidates must be in 1..=100"));
    }
    Ok(())
}

/// `POST /api/jobs/analyze`.
///
/// Admission rejects with `Conflict` while a non-terminal analyze job
/// exists for the video, keeping the per-video scratch directory
/// exclusive to one job.
pub async fn start_analysis(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<AnalyzeRequest>,
) -> ApiResult<(StatusCode, Json<AnalyzeResponse>)> {
    state
        .db
        .videos()
        .get_owned(req.video_id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("video not found"))?;

    let config = AnalysisConfig {
        targets: req.targets.unwrap_or_default(),
        keywords: req.keywords,
        ..Default::default()
    };
    validate_targets(&config.targets)?;

    let mut job = Job::new(req.video_id, JobKind::Analyze);
    job.logs.push(LogEntry::Config {
        config: JobConfig::Analysis(config.clone()),
    });

    // Admission rides on the insert: the partial unique index on live
    // analyze jobs makes a concurrent duplicate lose here, not after a
    // separate check.
    if !state.db.jobs().create_admitted(&job).await? {
        let active = state.db.jobs().find_active_analyze(req.video_id).await?;
        return Err(ApiError::conflict(match active {
            Some(id) => format!("analysis already in progress for this video (job {id})"),
            None => "analysis already in progress for this video".to_string(),
        }));
    }

    let message = QueueMessage::Analyze(AnalyzeMessage::new(job.id, req.video_id, config));
    state.queue.enqueue(&message, Priority::Normal).await?;

    info!(user_id = %user_id, job_id = %job.id, video_id = %req.video_id, "Analysis job submitted");

    Ok((
        StatusCode::CREATED,
        Json(AnalyzeResponse {
            job_id: job.id,
            video_id: req.video_id,
            status: JobStatus::Pending,
            message: "Analysis job started".to_string(),
        }),
    ))
}

/// `GET /api/jobs/{id}`.
pub async fn get_job(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(job_id): Path<JobId>,
) -> ApiResult<Json<JobStatusResponse>> {
    let job = state
        .db
        .jobs()
        .get_owned(job_id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("job not found"))?;
    Ok(Json(job.into()))
}

#[derive(Debug, Deserialize)]
pub struct JobsQuery {
    pub video_id: Option<VideoId>,
    pub kind: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
}

/// `GET /api/jobs`.
pub async fn list_jobs(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<JobsQuery>,
) -> ApiResult<Json<Vec<JobStatusResponse>>> {
    let kind = query
        .kind
        .as_deref()
        .map(JobKind::from_str)
        .transpose()
        .map_err(ApiError::validation)?;
    let status = query
        .status
        .as_deref()
        .map(JobStatus::from_str)
        .transpose()
        .map_err(ApiError::validation)?;

    let jobs = state
        .db
        .jobs()
        .list_for_owner(
            user_id,
            query.video_id,
            kind,
            status,
            query.limit.clamp(1, 100),
            query.skip.max(0),
        )
        .await?;

    Ok(Json(jobs.into_iter().map(JobStatusResponse::from).collect()))
}

/// `DELETE /api/jobs/{id}` — cooperative cancel. A pending job stops
/// immediately; a processing one stops at its next milestone.
pub async fn cancel_job(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(job_id): Path<JobId>,
) -> ApiResult<StatusCode> {
    let job = state
        .db
        .jobs()
        .get_owned(job_id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("job not found"))?;

    if job.status.is_terminal() {
        return Err(ApiError::validation(format!(
            "cannot cancel job with status: {}",
            job.status
        )));
    }

    state.db.jobs().cancel(job_id).await?;
    info!(user_id = %user_id, job_id = %job_id, "Job cancelled");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/jobs/{id}/retry` — clone a failed job's recorded config
/// into a fresh pending job.
pub async fn retry_job(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(job_id): Path<JobId>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let original = state
        .db
        .jobs()
        .get_owned(job_id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("job not found"))?;

    if original.status != JobStatus::Failed {
        return Err(ApiError::validation(format!(
            "cannot retry job with status: {}",
            original.status
        )));
    }

    let config = match original.recorded_config() {
        Some(JobConfig::Analysis(config)) => config.clone(),
        _ => AnalysisConfig::default(),
    };

    let mut job = Job::new(original.video_id, original.kind);
    job.logs.push(LogEntry::RetriedFrom { job_id });
    job.logs.push(LogEntry::Config {
        config: JobConfig::Analysis(config.clone()),
    });
    if !state.db.jobs().create_admitted(&job).await? {
        return Err(ApiError::conflict(
            "analysis already in progress for this video",
        ));
    }

    let message = QueueMessage::Analyze(AnalyzeMessage::new(job.id, original.video_id, config));
    state.queue.enqueue(&message, Priority::Normal).await?;

    info!(user_id = %user_id, job_id = %job.id, retried_from = %job_id, "Job retried");

    Ok(Json(AnalyzeResponse {
        job_id: job.id,
        video_id: original.video_id,
        status: JobStatus::Pending,
        message: "Job retried".to_string(),
    }))
}
