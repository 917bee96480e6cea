//! Job lifecycle types.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::AnalysisConfig;
use crate::ids::{JobId, VideoId};
use crate::render::RenderParams;

/// Which pipeline a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Analyzer pipeline: signals, scoring, candidates, thumbnails
    Analyze,
    /// Renderer pipeline: stylized MP4 outputs per (candidate, aspect)
    Render,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Analyze => "analyze",
            JobKind::Render => "render",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "analyze" => Ok(JobKind::Analyze),
            "render" => Ok(JobKind::Render),
            other => Err(format!("unknown job kind: {other}")),
        }
    }
}

/// Job processing status.
///
/// Terminal states (`Completed`, `Failed`, `Cancelled`) are absorbing:
/// the persistence layer refuses transitions out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, waiting for a worker
    #[default]
    Pending,
    /// A worker has claimed the job and is running it
    Processing,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
    /// Cancelled by the owner; workers stop at the next milestone
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Check if the job still counts against concurrency limits.
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Processing)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// Pipeline configuration recorded in a job's log, used by the retry
/// endpoint to clone a failed job's parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobConfig {
    Analysis(AnalysisConfig),
    Render(RenderParams),
}

/// One structured entry in a job's log column.
///
/// The log is an append-only list serialized as JSONB; consumers scan it
/// for the latest entry of the variant they care about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEntry {
    /// Failure message from the worker
    Error { message: String },
    /// Parameters the job was submitted with
    Config { config: JobConfig },
    /// This job was created by retrying a failed one
    RetriedFrom { job_id: JobId },
    /// Milestone step tag, written alongside progress
    Step { name: String },
}

impl LogEntry {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn step(name: impl Into<String>) -> Self {
        Self::Step { name: name.into() }
    }
}

/// One attempt at running a pipeline against one video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,
    /// Video the job operates on
    pub video_id: VideoId,
    /// Which pipeline
    pub kind: JobKind,
    /// Current status
    pub status: JobStatus,
    /// Progress percentage, 0-100, monotone while processing
    pub progress: i32,
    /// Structured log entries
    pub logs: Vec<LogEntry>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Create a new pending job.
    pub fn new(video_id: VideoId, kind: JobKind) -> Self {
        Self {
            id: JobId::new(),
            video_id,
            kind,
            status: JobStatus::Pending,
            progress: 0,
            logs: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Latest error message, if the log carries one.
    pub fn last_error(&self) -> Option<&str> {
        self.logs.iter().rev().find_map(|entry| match entry {
            LogEntry::Error { message } => Some(message.as_str()),
            _ => None,
        })
    }

    /// Config recorded at submission, if present.
    pub fn recorded_config(&self) -> Option<&JobConfig> {
        self.logs.iter().rev().find_map(|entry| match entry {
            LogEntry::Config { config } => Some(config),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_terminal() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn log_entry_serde_is_tagged() {
        let entry = LogEntry::error("ffmpeg exploded");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "ffmpeg exploded");

        let step: LogEntry = serde_json::from_value(
            serde_json::json!({"type": "step", "name": "transcribing"}),
        )
        .unwrap();
        assert_eq!(step, LogEntry::step("transcribing"));
    }

    #[test]
    fn job_last_error_scans_backwards() {
        let mut job = Job::new(VideoId::new(), JobKind::Analyze);
        assert!(job.last_error().is_none());
        job.logs.push(LogEntry::step("downloading"));
        job.logs.push(LogEntry::error("first"));
        job.logs.push(LogEntry::error("second"));
        assert_eq!(job.last_error(), Some("second"));
    }
}
