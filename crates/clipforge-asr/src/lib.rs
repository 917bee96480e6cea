//! Whisper speech recognition with word-level timestamps.
//!
//! Wraps whisper.cpp via `whisper-rs`. Inference is CPU-bound and runs
//! on a blocking thread; the async surface is a thin shim.

pub mod error;
pub mod transcriber;

pub use error::{AsrError, AsrResult};
pub use transcriber::{transcribe_file, TranscriptOutput, Transcriber, TranscriberConfig};
