//! Source video descriptor.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{UserId, VideoId};

/// An uploaded source video.
///
/// Immutable after creation except for `duration_seconds` and
/// `resolution`, which are filled once when the analyzer probes the file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Video {
    /// Unique video ID
    pub id: VideoId,
    /// Owning user
    pub owner_id: UserId,
    /// Object-store key of the uploaded source file
    pub source_blob_key: String,
    /// Display title
    pub title: String,
    /// Duration in seconds, set post-probe
    pub duration_seconds: Option<f64>,
    /// Resolution as "WxH", set post-probe
    pub resolution: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Video {
    /// Create a new video record pointing at an uploaded blob.
    pub fn new(owner_id: UserId, source_blob_key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: VideoId::new(),
            owner_id,
            source_blob_key: source_blob_key.into(),
            title: title.into(),
            duration_seconds: None,
            resolution: None,
            created_at: Utc::now(),
        }
    }
}
