//! Audio extraction for transcription.

use std::path::Path;
use std::time::Duration;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Extract the audio track as mono 16 kHz PCM WAV, the input format the
/// speech recognizer expects.
pub async fn extract_audio(
    video_path: impl AsRef<Path>,
    dest_path: impl AsRef<Path>,
    timeout: Option<Duration>,
) -> MediaResult<()> {
    let video_path = video_path.as_ref();
    if !video_path.exists() {
        return Err(MediaError::FileNotFound(video_path.to_path_buf()));
    }

    let cmd = FfmpegCommand::new(video_path, dest_path.as_ref())
        .output_arg("-vn")
        .output_arg("-ar")
        .output_arg("16000")
        .output_arg("-ac")
        .output_arg("1");

    let runner = match timeout {
        Some(t) => FfmpegRunner::new().with_timeout(t),
        None => FfmpegRunner::new(),
    };
    runner.run(&cmd).await
}
