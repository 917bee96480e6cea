//! Renderer pipeline orchestration.
//!
//! Materializes each (candidate, aspect) pair of a render request:
//! scale and center-crop to the aspect canvas, template captions,
//! watermark, loudness normalization, H.264 encode, upload.

use std::collections::HashMap;
use std::path::PathBuf;

use metrics::counter;
use tracing::{info, warn};

use clipforge_media::{
    build_overlays, transcode, DrawText, FilterChain, FilterGraph, FilterNode, TextShadow, TextX,
    TranscodeSpec,
};
use clipforge_models::{
    AspectRatio, CaptionTemplate, EncodingConfig, JobStatus, Render, VideoId, Word,
};
use clipforge_queue::{RenderMessage, StatusSnapshot};
use clipforge_storage::render_key;

use crate::context::WorkerContext;
use crate::deadline::JobDeadline;
use crate::error::{WorkerError, WorkerResult};
use crate::progress::RenderProgress;
use crate::scratch::ScratchDir;

/// Run one render job end to end.
///
/// Mirrors the analyzer's lifecycle: CAS idempotency guard, terminal
/// failure on any pair error (already-uploaded outputs are preserved),
/// quiet stop on cancellation.
pub async fn run_render(ctx: &WorkerContext, msg: &RenderMessage) -> WorkerResult<()> {
    if !ctx.db.renders().begin_processing(msg.render_id).await? {
        info!(render_id = %msg.render_id, "Render is not pending, dropping message");
        return Ok(());
    }

    let render = ctx
        .db
        .renders()
        .get(msg.render_id)
        .await?
        .ok_or_else(|| WorkerError::job_failed(format!("render {} not found", msg.render_id)))?;

    let deadline = JobDeadline::new(ctx.config.job_hard_timeout);
    let progress = RenderProgress::new(&ctx.db, &ctx.progress, msg.render_id);

    match render_all_pairs(ctx, &render, &progress, &deadline).await {
        Ok(()) => {
            ctx.db.renders().mark_completed(msg.render_id).await?;
            ctx.progress
                .publish(&StatusSnapshot::new(
                    msg.render_id.to_string(),
                    JobStatus::Completed,
                    100,
                ))
                .await
                .ok();
            counter!("clipforge_render_jobs_completed_total").increment(1);
            info!(render_id = %msg.render_id, "Render complete");
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            info!(render_id = %msg.render_id, "Render stopped at cancellation");
            counter!("clipforge_render_jobs_cancelled_total").increment(1);
            Ok(())
        }
        Err(e) => {
            warn!(render_id = %msg.render_id, error = %e, "Render failed");
            ctx.db.renders().mark_failed(msg.render_id).await.ok();
            ctx.progress
                .publish(&StatusSnapshot::new(
                    msg.render_id.to_string(),
                    JobStatus::Failed,
                    render.progress,
                ))
                .await
                .ok();
            counter!("clipforge_render_jobs_failed_total").increment(1);
            Err(e)
        }
    }
}

async fn render_all_pairs(
    ctx: &WorkerContext,
    render: &Render,
    progress: &RenderProgress<'_>,
    deadline: &JobDeadline,
) -> WorkerResult<()> {
    let params = &render.params;
    let scratch = ScratchDir::create(&ctx.config.work_dir, &render.id.to_string())?;

    // Resolve candidates in submission order.
    let mut candidates = Vec::with_capacity(params.candidate_ids.len());
    for id in &params.candidate_ids {
        let candidate = ctx
            .db
            .candidates()
            .get(*id)
            .await?
            .ok_or_else(|| WorkerError::job_failed(format!("candidate {id} not found")))?;
        candidates.push(candidate);
    }

    let total = params.total_pairs();
    let mut completed = 0usize;
    let mut files = render.files.clone();

    // Each distinct source video is downloaded once per job.
    let mut source_cache: HashMap<VideoId, PathBuf> = HashMap::new();
    let mut words_cache: HashMap<VideoId, Vec<Word>> = HashMap::new();

    for candidate in &candidates {
        progress.check_cancelled().await?;

        let source_path = match source_cache.get(&candidate.video_id) {
            Some(path) => path.clone(),
            None => {
                let video = ctx
                    .db
                    .videos()
                    .get(candidate.video_id)
                    .await?
                    .ok_or_else(|| {
                        WorkerError::job_failed(format!("video {} not found", candidate.video_id))
                    })?;
                let path = scratch.file(&format!("source_{}.mp4", candidate.video_id));
                ctx.storage.download_file(&video.source_blob_key, &path).await?;
                source_cache.insert(candidate.video_id, path.clone());
                path
            }
        };

        let words = match words_cache.get(&candidate.video_id) {
            Some(words) => words.clone(),
            None => {
                let words = ctx
                    .db
                    .transcripts()
                    .get_for_video(candidate.video_id)
                    .await?
                    .map(|t| t.words)
                    .unwrap_or_default();
                words_cache.insert(candidate.video_id, words.clone());
                words
            }
        };

        for aspect in &params.outputs {
            progress.check_cancelled().await?;

            let overlays = build_overlays(
                &words,
                params.template,
                *aspect,
                candidate.start_s,
                candidate.end_s,
                params.captions,
            );

            let graph = compose_filter_graph(
                params.template,
                *aspect,
                &overlays,
                &params.watermark,
                params.loudness_lufs(),
            );

            let output_path =
                scratch.file(&format!("{}_{}.mp4", candidate.id, aspect.sanitized()));
            let spec = TranscodeSpec {
                input: source_path.clone(),
                output: output_path.clone(),
                start_s: candidate.start_s,
                duration_s: candidate.duration_s(),
                filter_graph: graph,
                encoding: EncodingConfig::default(),
            };
            transcode(&spec, Some(deadline.remaining()?)).await?;

            let blob_key = render_key(render.id, candidate.id, *aspect);
            ctx.storage
                .upload_file(&output_path, &blob_key, "video/mp4")
                .await?;
            tokio::fs::remove_file(&output_path).await.ok();

            files.insert(candidate.id, *aspect, blob_key);
            completed += 1;
            progress.record_pair(&files, completed, total).await?;
        }
    }

    Ok(())
}

/// Compose the full filter graph for one (candidate, aspect) pair.
///
/// Video chain: scale (fill) -> center crop -> optional manga zoom ->
/// watermark -> captions, into `[v]`. Audio chain: loudnorm ->
/// 48 kHz, into `[a]`. The audio chain never depends on the template,
/// so switching templates cannot change a clip's sound or length.
pub fn compose_filter_graph(
    template: CaptionTemplate,
    aspect: AspectRatio,
    overlays: &[DrawText],
    watermark: &str,
    loudness_lufs: f64,
) -> FilterGraph {
    let (width, height) = aspect.canvas();

    let mut video = FilterChain::from_input("0:v")
        .node(FilterNode::Scale {
            width,
            height,
            fill_then_crop: true,
        })
        .node(FilterNode::Crop { width, height });

    if template == CaptionTemplate::Manga {
        video = video.node(FilterNode::ZoomPan {
            step: 0.0005,
            max_zoom: 1.05,
            out_width: width,
            out_height: height,
        });
    }

    video = video.node(FilterNode::DrawText(DrawText {
        text: watermark.to_string(),
        font_file: None,
        font_size: 24,
        font_color: "white@0.6".to_string(),
        border_width: 0,
        border_color: "black".to_string(),
        x: TextX::Px(20),
        y: 20,
        shadow: Some(TextShadow {
            color: "black@0.5".to_string(),
            x: 2,
            y: 2,
        }),
        enable: None,
    }));

    video = video.nodes(overlays.iter().cloned().map(FilterNode::DrawText));

    let audio = FilterChain::from_input("0:a")
        .node(FilterNode::LoudNorm {
            integrated_lufs: loudness_lufs,
            true_peak_db: -1.0,
            lra: 11.0,
        })
        .node(FilterNode::AFormat { sample_rate: 48000 })
        .into_output("a");

    FilterGraph::new()
        .chain(video.into_output("v"))
        .chain(audio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_scales_to_each_canvas() {
        for (aspect, expected) in [
            (AspectRatio::Vertical, "scale=1080:1920"),
            (AspectRatio::Square, "scale=1080:1080"),
            (AspectRatio::Portrait, "scale=1080:1350"),
        ] {
            let graph =
                compose_filter_graph(CaptionTemplate::Clean, aspect, &[], "@clipforge", -14.0);
            let serialized = graph.serialize();
            assert!(serialized.contains(expected), "{serialized}");
            assert!(serialized.contains("force_original_aspect_ratio=increase"));
        }
    }

    #[test]
    fn manga_gets_zoom_ramp_and_others_do_not() {
        let manga =
            compose_filter_graph(CaptionTemplate::Manga, AspectRatio::Vertical, &[], "@x", -14.0);
        assert!(manga.serialize().contains("zoompan=z='min(zoom+0.0005,1.05)'"));

        for template in [
            CaptionTemplate::Clean,
            CaptionTemplate::Impact,
            CaptionTemplate::Karaoke,
        ] {
            let graph = compose_filter_graph(template, AspectRatio::Vertical, &[], "@x", -14.0);
            assert!(!graph.serialize().contains("zoompan"));
        }
    }

    #[test]
    fn watermark_sits_in_top_left_at_sixty_percent() {
        let graph =
            compose_filter_graph(CaptionTemplate::Clean, AspectRatio::Square, &[], "@myanime", -14.0);
        let serialized = graph.serialize();
        assert!(serialized.contains("drawtext=text='@myanime'"));
        assert!(serialized.contains("fontcolor=white@0.6"));
        assert!(serialized.contains("x=20:y=20"));
    }

    #[test]
    fn audio_chain_is_template_independent() {
        let expected = "[0:a]loudnorm=I=-16:TP=-1:LRA=11,aformat=sample_rates=48000[a]";
        for template in [
            CaptionTemplate::Clean,
            CaptionTemplate::Manga,
            CaptionTemplate::Impact,
            CaptionTemplate::Karaoke,
        ] {
            let graph = compose_filter_graph(template, AspectRatio::Vertical, &[], "@x", -16.0);
            assert!(graph.serialize().ends_with(expected));
        }
    }

    #[test]
    fn caption_overlays_follow_the_watermark() {
        let overlays = vec![DrawText::new("hello")];
        let graph = compose_filter_graph(
            CaptionTemplate::Clean,
            AspectRatio::Vertical,
            &overlays,
            "@wm",
            -14.0,
        );
        let serialized = graph.serialize();
        let wm_pos = serialized.find("text='@wm'").unwrap();
        let caption_pos = serialized.find("text='hello'").unwrap();
        assert!(caption_pos > wm_pos);
    }
}
