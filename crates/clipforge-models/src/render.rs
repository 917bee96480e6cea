//! Render requests and their outputs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{CandidateId, RenderId, UserId};
use crate::job::JobStatus;
use crate::style::{AspectRatio, CaptionTemplate};

/// Caption toggle carried in render parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaptionsMode {
    #[default]
    On,
    Off,
}

impl CaptionsMode {
    pub fn is_on(&self) -> bool {
        matches!(self, CaptionsMode::On)
    }
}

/// Parameters for one render request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderParams {
    /// Candidates to materialize
    pub candidate_ids: Vec<CandidateId>,
    /// Caption template
    #[serde(default)]
    pub template: CaptionTemplate,
    /// Aspect ratios to produce per candidate
    #[serde(default = "default_outputs")]
    pub outputs: Vec<AspectRatio>,
    /// Watermark text drawn near the top-left corner
    #[serde(default = "default_watermark")]
    pub watermark: String,
    /// Integrated loudness target in LUFS, e.g. "-14"
    #[serde(default = "default_loudness")]
    pub loudness: String,
    /// Caption toggle
    #[serde(default)]
    pub captions: CaptionsMode,
}

fn default_outputs() -> Vec<AspectRatio> {
    vec![AspectRatio::Vertical]
}

fn default_watermark() -> String {
    "@clipforge".to_string()
}

fn default_loudness() -> String {
    "-14".to_string()
}

impl RenderParams {
    /// Total number of (candidate, aspect) pairs this request produces.
    pub fn total_pairs(&self) -> usize {
        self.candidate_ids.len() * self.outputs.len()
    }

    /// Loudness target parsed to a number, falling back to -14 LUFS.
    pub fn loudness_lufs(&self) -> f64 {
        self.loudness.trim().parse().unwrap_or(-14.0)
    }
}

/// Completed output files: candidate id -> aspect label -> blob key.
///
/// Keys use the string forms so the structure round-trips through JSONB
/// and the HTTP surface unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(transparent)]
pub struct RenderFiles(pub BTreeMap<String, BTreeMap<String, String>>);

impl RenderFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed pair.
    pub fn insert(&mut self, candidate_id: CandidateId, aspect: AspectRatio, blob_key: impl Into<String>) {
        self.0
            .entry(candidate_id.to_string())
            .or_default()
            .insert(aspect.as_str().to_string(), blob_key.into());
    }

    /// Look up the blob key for a pair.
    pub fn get(&self, candidate_id: CandidateId, aspect: AspectRatio) -> Option<&str> {
        self.0
            .get(&candidate_id.to_string())
            .and_then(|by_aspect| by_aspect.get(aspect.as_str()))
            .map(String::as_str)
    }

    /// Number of recorded pairs.
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All recorded blob keys, for deletion.
    pub fn blob_keys(&self) -> impl Iterator<Item = &str> {
        self.0
            .values()
            .flat_map(|by_aspect| by_aspect.values())
            .map(String::as_str)
    }
}

/// A render request and its accumulated outputs.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Render {
    /// Unique render ID
    pub id: RenderId,
    /// Owning user
    pub owner_id: UserId,
    /// Submission parameters
    pub params: RenderParams,
    /// Lifecycle status, same state machine as jobs
    pub status: JobStatus,
    /// Completed-pair progress percentage, 0-100
    pub progress: i32,
    /// Uploaded outputs keyed by candidate and aspect
    pub files: RenderFiles,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Render {
    /// Create a new pending render.
    pub fn new(owner_id: UserId, params: RenderParams) -> Self {
        Self {
            id: RenderId::new(),
            owner_id,
            params,
            status: JobStatus::Pending,
            progress: 0,
            files: RenderFiles::new(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_files_roundtrip() {
        let cand = CandidateId::new();
        let mut files = RenderFiles::new();
        files.insert(cand, AspectRatio::Vertical, "renders/r/c_9x16.mp4");
        files.insert(cand, AspectRatio::Square, "renders/r/c_1x1.mp4");

        assert_eq!(files.len(), 2);
        assert_eq!(
            files.get(cand, AspectRatio::Vertical),
            Some("renders/r/c_9x16.mp4")
        );
        assert_eq!(files.get(cand, AspectRatio::Portrait), None);

        let json = serde_json::to_value(&files).unwrap();
        assert!(json[cand.to_string()]["9:16"].is_string());
        let back: RenderFiles = serde_json::from_value(json).unwrap();
        assert_eq!(back, files);
    }

    #[test]
    fn params_pair_count() {
        let params = RenderParams {
            candidate_ids: vec![CandidateId::new(), CandidateId::new()],
            template: CaptionTemplate::Clean,
            outputs: vec![AspectRatio::Vertical, AspectRatio::Square, AspectRatio::Portrait],
            watermark: "@x".into(),
            loudness: "-14".into(),
            captions: CaptionsMode::On,
        };
        assert_eq!(params.total_pairs(), 6);
    }

    #[test]
    fn loudness_parse_falls_back() {
        let mut params = RenderParams {
            candidate_ids: vec![],
            template: CaptionTemplate::Clean,
            outputs: vec![],
            watermark: String::new(),
            loudness: "-16".into(),
            captions: CaptionsMode::Off,
        };
        assert_eq!(params.loudness_lufs(), -16.0);
        params.loudness = "loud".into();
        assert_eq!(params.loudness_lufs(), -14.0);
    }
}
