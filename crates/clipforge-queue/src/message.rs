//! Typed queue payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clipforge_models::{AnalysisConfig, JobId, JobKind, RenderId, UserId, VideoId};

/// Message driving one analyzer run.
///
/// The job row already exists in `pending` when this is enqueued; the
/// worker's `pending -> processing` CAS makes redelivery harmless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeMessage {
    /// The job record to drive
    pub job_id: JobId,
    /// Video to analyze
    pub video_id: VideoId,
    /// Analysis configuration, passed by value
    pub config: AnalysisConfig,
    /// When the message was created
    pub created_at: DateTime<Utc>,
}

impl AnalyzeMessage {
    pub fn new(job_id: JobId, video_id: VideoId, config: AnalysisConfig) -> Self {
        Self {
            job_id,
            video_id,
            config,
            created_at: Utc::now(),
        }
    }
}

/// Message driving one render run. The render row is the job record;
/// parameters are loaded from it so a stale message can never render
/// with outdated settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderMessage {
    /// The render record to drive
    pub render_id: RenderId,
    /// Owner, for log context
    pub owner_id: UserId,
    /// When the message was created
    pub created_at: DateTime<Utc>,
}

impl RenderMessage {
    pub fn new(render_id: RenderId, owner_id: UserId) -> Self {
        Self {
            render_id,
            owner_id,
            created_at: Utc::now(),
        }
    }
}

/// Wrapper enum stored on the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueMessage {
    Analyze(AnalyzeMessage),
    Render(RenderMessage),
}

impl QueueMessage {
    /// Which pipeline consumes this message.
    pub fn kind(&self) -> JobKind {
        match self {
            QueueMessage::Analyze(_) => JobKind::Analyze,
            QueueMessage::Render(_) => JobKind::Render,
        }
    }

    /// The driven record's id, for logging.
    pub fn record_id(&self) -> String {
        match self {
            QueueMessage::Analyze(m) => m.job_id.to_string(),
            QueueMessage::Render(m) => m.render_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_serde_roundtrip() {
        let msg = QueueMessage::Analyze(AnalyzeMessage::new(
            JobId::new(),
            VideoId::new(),
            AnalysisConfig::default(),
        ));
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"analyze\""));
        let back: QueueMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn kinds_route_to_pipelines() {
        let analyze = QueueMessage::Analyze(AnalyzeMessage::new(
            JobId::new(),
            VideoId::new(),
            AnalysisConfig::default(),
        ));
        let render = QueueMessage::Render(RenderMessage::new(RenderId::new(), UserId::new()));
        assert_eq!(analyze.kind(), JobKind::Analyze);
        assert_eq!(render.kind(), JobKind::Render);
    }
}
