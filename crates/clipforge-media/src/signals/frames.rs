//! Downscaled raw-frame streaming from ffmpeg.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::command::check_ffmpeg;
use crate::error::{MediaError, MediaResult};

/// A stream of decoded, downscaled RGB24 frames.
///
/// ffmpeg does the decoding and the every-Nth-frame selection; this side
/// only reads fixed-size frames off its stdout. Frame `k` of the stream
/// corresponds to source frame `k * sample_every`.
pub struct FrameStream {
    child: Child,
    stdout: ChildStdout,
    stderr_tail: JoinHandle<String>,
    frame_len: usize,
}

impl FrameStream {
    /// Spawn ffmpeg decoding `path` into `width`×`height` RGB24 frames,
    /// keeping every `sample_every`-th source frame.
    pub async fn open(
        path: impl AsRef<Path>,
        width: u32,
        height: u32,
        sample_every: u32,
    ) -> MediaResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        check_ffmpeg()?;

        let filter = format!("select=not(mod(n\\,{sample_every})),scale={width}:{height}");
        debug!(video = %path.display(), filter = %filter, "Opening frame stream");

        let mut child = Command::new("ffmpeg")
            .arg("-v")
            .arg("error")
            .arg("-i")
            .arg(path)
            .args(["-vf", &filter, "-vsync", "0", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child.stdout.take().expect("stdout not captured");
        let stderr = child.stderr.take().expect("stderr not captured");
        let stderr_tail = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut tail = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                tail.push(line);
            }
            tail.join("\n")
        });

        Ok(Self {
            child,
            stdout,
            stderr_tail,
            frame_len: (width * height * 3) as usize,
        })
    }

    /// Size in bytes of one frame.
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Read the next frame into `buf` (must be `frame_len` bytes).
    /// Returns `false` at end of stream.
    pub async fn next_frame(&mut self, buf: &mut [u8]) -> MediaResult<bool> {
        debug_assert_eq!(buf.len(), self.frame_len);
        match self.stdout.read_exact(buf).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Wait for ffmpeg to exit and surface a decode failure if any.
    pub async fn finish(mut self) -> MediaResult<()> {
        let status = self.child.wait().await?;
        let stderr = self.stderr_tail.await.unwrap_or_default();
        if status.success() {
            Ok(())
        } else {
            Err(MediaError::toolchain(
                "ffmpeg frame decode failed",
                Some(stderr),
                status.code(),
            ))
        }
    }
}
