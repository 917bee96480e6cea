//! Analyzer pipeline orchestration.
//!
//! Sequences download, probe, transcription, signal extraction,
//! candidate scoring and thumbnails for one video, reporting progress
//! at named milestones and honoring cooperative cancellation.

use metrics::counter;
use tracing::{info, warn};

use clipforge_asr::{transcribe_file, TranscriberConfig};
use clipforge_media::{
    audio_energy_signal, detect_scene_boundaries, extract_audio, extract_frame, motion_signal,
    probe, SCENE_THRESHOLD,
};
use clipforge_models::{Candidate, CandidateId, JobStatus, Transcript};
use clipforge_queue::{AnalyzeMessage, StatusSnapshot};
use clipforge_storage::thumbnail_key;

use crate::candidates::{enumerate_and_score, select_top, ScoringInputs};
use crate::context::WorkerContext;
use crate::deadline::JobDeadline;
use crate::error::{WorkerError, WorkerResult};
use crate::progress::JobProgress;
use crate::scratch::ScratchDir;

/// Run one analyze job end to end.
///
/// The `pending -> processing` CAS is the idempotency guard: a
/// redelivered message that loses the CAS is dropped without side
/// effects. Failures mark the job failed and re-raise; cancellation
/// stops quietly at the milestone that observed it.
pub async fn run_analyze(ctx: &WorkerContext, msg: &AnalyzeMessage) -> WorkerResult<()> {
    if !ctx.db.jobs().begin_processing(msg.job_id).await? {
        info!(job_id = %msg.job_id, "Job is not pending, dropping message");
        return Ok(());
    }

    let deadline = JobDeadline::new(ctx.config.job_hard_timeout);
    let progress = JobProgress::new(&ctx.db, &ctx.progress, msg.job_id);

    match analyze(ctx, msg, &progress, &deadline).await {
        Ok(candidate_count) => {
            ctx.db.jobs().mark_completed(msg.job_id).await?;
            ctx.progress
                .publish(&StatusSnapshot::new(
                    msg.job_id.to_string(),
                    JobStatus::Completed,
                    100,
                ))
                .await
                .ok();
            counter!("clipforge_analyze_jobs_completed_total").increment(1);
            info!(job_id = %msg.job_id, candidates = candidate_count, "Analysis complete");
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            info!(job_id = %msg.job_id, "Analysis stopped at cancellation");
            counter!("clipforge_analyze_jobs_cancelled_total").increment(1);
            Ok(())
        }
        Err(e) => {
            warn!(job_id = %msg.job_id, error = %e, "Analysis failed");
            ctx.db.jobs().mark_failed(msg.job_id, &e.to_string()).await.ok();
            ctx.progress
                .publish(&StatusSnapshot::new(
                    msg.job_id.to_string(),
                    JobStatus::Failed,
                    0,
                ))
                .await
                .ok();
            counter!("clipforge_analyze_jobs_failed_total").increment(1);
            Err(e)
        }
    }
}

async fn analyze(
    ctx: &WorkerContext,
    msg: &AnalyzeMessage,
    progress: &JobProgress<'_>,
    deadline: &JobDeadline,
) -> WorkerResult<usize> {
    let video = ctx
        .db
        .videos()
        .get(msg.video_id)
        .await?
        .ok_or_else(|| WorkerError::job_failed(format!("video {} not found", msg.video_id)))?;

    // Scratch space lives for the whole job and is removed on every
    // exit path, including unwinds.
    let scratch = ScratchDir::create(&ctx.config.work_dir, &msg.job_id.to_string())?;

    progress.milestone("downloading", 5).await?;
    let source_path = scratch.file("source.mp4");
    ctx.storage
        .download_file(&video.source_blob_key, &source_path)
        .await?;

    progress.milestone("analyzing_metadata", 10).await?;
    let info = probe(&source_path).await?;
    // Partial writes like these stay even if a later step fails.
    ctx.db
        .videos()
        .set_probe_info(video.id, info.duration_s, &info.resolution())
        .await?;

    progress.milestone("transcribing", 20).await?;
    let audio_path = scratch.file("audio.wav");
    extract_audio(&source_path, &audio_path, Some(deadline.remaining()?)).await?;

    let asr_config = TranscriberConfig {
        model: msg.config.whisper_model.clone(),
        language: msg.config.language.clone(),
        ..Default::default()
    };
    let asr_output = transcribe_file(&audio_path, asr_config).await?;
    let transcript = Transcript::new(video.id, asr_output.language, asr_output.words);
    ctx.db.transcripts().create(&transcript).await?;

    progress.milestone("detecting_scenes", 40).await?;
    let boundaries =
        detect_scene_boundaries(&source_path, info.duration_s, info.fps, SCENE_THRESHOLD).await?;

    progress.milestone("analyzing_motion", 55).await?;
    let motion = motion_signal(&source_path, info.duration_s, info.fps).await?;

    progress.milestone("analyzing_audio", 70).await?;
    let audio_energy = audio_energy_signal(&audio_path, info.duration_s).await?;

    progress.milestone("generating_candidates", 80).await?;
    let scoring = ScoringInputs {
        words: &transcript.words,
        motion: &motion,
        audio: &audio_energy,
        keywords: &msg.config.keywords,
        weights: &msg.config.weights,
    };
    let scored = enumerate_and_score(&boundaries, info.duration_s, &msg.config.targets, &scoring);
    let top = select_top(scored, msg.config.targets.max_candidates);

    progress.milestone("creating_thumbnails", 90).await?;
    for (idx, interval) in top.iter().enumerate() {
        let thumb_path = scratch.file(&format!("thumb_{idx}.jpg"));
        let midpoint = (interval.start_s + interval.end_s) / 2.0;
        extract_frame(&source_path, midpoint, &thumb_path, Some(deadline.remaining()?)).await?;

        let thumb_key = thumbnail_key(video.id, idx);
        ctx.storage
            .upload_file(&thumb_path, &thumb_key, "image/jpeg")
            .await?;

        let candidate = Candidate {
            id: CandidateId::new(),
            video_id: video.id,
            start_s: interval.start_s,
            end_s: interval.end_s,
            score: interval.score,
            features: interval.features,
            thumb_blob_key: Some(thumb_key),
        };
        ctx.db.candidates().create(&candidate).await?;
    }

    Ok(top.len())
}
