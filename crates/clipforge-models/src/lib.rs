//! Shared data models for the ClipForge backend.
//!
//! This crate provides Serde-serializable types for:
//! - Entity identifiers (videos, jobs, candidates, renders, users)
//! - Job lifecycle (kind, status, structured log entries)
//! - Analysis configuration and scoring weights
//! - Transcripts with word-level timings
//! - Scored clip candidates and their feature breakdown
//! - Render parameters, caption templates and aspect ratios
//! - Encoding configuration for the final MP4 output

pub mod candidate;
pub mod config;
pub mod encoding;
pub mod ids;
pub mod job;
pub mod render;
pub mod style;
pub mod transcript;
pub mod video;

// Re-export common types
pub use candidate::{Candidate, FeatureScores};
pub use config::{AnalysisConfig, AnalysisTargets, ScoreWeights};
pub use encoding::EncodingConfig;
pub use ids::{CandidateId, JobId, RenderId, UserId, VideoId};
pub use job::{Job, JobConfig, JobKind, JobStatus, LogEntry};
pub use render::{CaptionsMode, Render, RenderFiles, RenderParams};
pub use style::{AspectRatio, CaptionTemplate};
pub use transcript::{Transcript, Word};
pub use video::Video;
