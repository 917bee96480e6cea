//! Single-frame extraction for candidate thumbnails.

use std::path::Path;
use std::time::Duration;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Extract one JPEG frame at `t_seconds`.
pub async fn extract_frame(
    video_path: impl AsRef<Path>,
    t_seconds: f64,
    dest_path: impl AsRef<Path>,
    timeout: Option<Duration>,
) -> MediaResult<()> {
    let video_path = video_path.as_ref();
    if !video_path.exists() {
        return Err(MediaError::FileNotFound(video_path.to_path_buf()));
    }

    let cmd = FfmpegCommand::new(video_path, dest_path.as_ref())
        .seek(t_seconds)
        .single_frame()
        .output_arg("-q:v")
        .output_arg("2");

    let runner = match timeout {
        Some(t) => FfmpegRunner::new().with_timeout(t),
        None => FfmpegRunner::new(),
    };
    runner.run(&cmd).await
}
