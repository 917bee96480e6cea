//! Scored clip candidates.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{CandidateId, VideoId};

/// Per-axis scores, each normalized to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct FeatureScores {
    /// Hook phrases and questions in the first 2.5 seconds
    pub speech_hook: f64,
    /// Mean motion intensity over the interval
    pub motion: f64,
    /// Mean audio energy over the interval
    pub audio_peak: f64,
    /// Fraction of requested keywords spoken in the interval
    pub keyword_match: f64,
    /// Penalty-derived score for overlap with earlier candidates
    pub scene_freshness: f64,
}

/// A scored time interval proposed as a clip.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Candidate {
    /// Unique candidate ID
    pub id: CandidateId,
    /// Video the interval belongs to
    pub video_id: VideoId,
    /// Interval start in seconds
    pub start_s: f64,
    /// Interval end in seconds, `> start_s`
    pub end_s: f64,
    /// Composite weighted score in [0, 1]
    pub score: f64,
    /// Per-axis score breakdown
    pub features: FeatureScores,
    /// Object-store key of the midpoint thumbnail
    pub thumb_blob_key: Option<String>,
}

impl Candidate {
    /// Interval length in seconds.
    pub fn duration_s(&self) -> f64 {
        self.end_s - self.start_s
    }

    /// Validate interval bounds against the owning video's duration and
    /// the configured clip length window.
    pub fn is_valid(&self, video_duration_s: f64, clip_min_s: f64, clip_max_s: f64) -> bool {
        let len = self.duration_s();
        self.start_s >= 0.0
            && self.start_s < self.end_s
            && self.end_s <= video_duration_s
            && len >= clip_min_s
            && len <= clip_max_s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(start: f64, end: f64) -> Candidate {
        Candidate {
            id: CandidateId::new(),
            video_id: VideoId::new(),
            start_s: start,
            end_s: end,
            score: 0.5,
            features: FeatureScores::default(),
            thumb_blob_key: None,
        }
    }

    #[test]
    fn valid_interval_within_bounds() {
        assert!(candidate(0.0, 10.0).is_valid(60.0, 7.0, 15.0));
        assert!(candidate(50.0, 60.0).is_valid(60.0, 7.0, 15.0));
    }

    #[test]
    fn invalid_when_outside_video_or_window() {
        assert!(!candidate(55.0, 65.0).is_valid(60.0, 7.0, 15.0));
        assert!(!candidate(0.0, 5.0).is_valid(60.0, 7.0, 15.0));
        assert!(!candidate(0.0, 20.0).is_valid(60.0, 7.0, 15.0));
        assert!(!candidate(10.0, 10.0).is_valid(60.0, 7.0, 15.0));
    }
}
