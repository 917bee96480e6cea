//! Analysis configuration carried inside job payloads.
//!
//! Configuration is passed by value with each job; workers hold no global
//! tuning state.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Clip length targets for candidate enumeration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisTargets {
    /// Minimum acceptable clip length in seconds
    #[serde(default = "default_clip_min")]
    pub clip_min_s: f64,
    /// Maximum acceptable clip length in seconds
    #[serde(default = "default_clip_max")]
    pub clip_max_s: f64,
    /// Preferred clip length in seconds, tried first
    #[serde(default = "default_target")]
    pub target_s: f64,
    /// Upper bound on candidate density per minute of source
    #[serde(default = "default_candidates_per_minute")]
    pub candidates_per_minute: u32,
    /// How many top-scored candidates to keep
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
}

fn default_clip_min() -> f64 {
    7.0
}

fn default_clip_max() -> f64 {
    15.0
}

fn default_target() -> f64 {
    10.0
}

fn default_candidates_per_minute() -> u32 {
    4
}

fn default_max_candidates() -> usize {
    20
}

impl Default for AnalysisTargets {
    fn default() -> Self {
        Self {
            clip_min_s: default_clip_min(),
            clip_max_s: default_clip_max(),
            target_s: default_target(),
            candidates_per_minute: default_candidates_per_minute(),
            max_candidates: default_max_candidates(),
        }
    }
}

/// Weights for the five scoring axes. They need not sum to 1; the
/// defaults do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScoreWeights {
    #[serde(default = "default_speech_hook_weight")]
    pub speech_hook: f64,
    #[serde(default = "default_motion_weight")]
    pub motion: f64,
    #[serde(default = "default_audio_peak_weight")]
    pub audio_peak: f64,
    #[serde(default = "default_keyword_match_weight")]
    pub keyword_match: f64,
    #[serde(default = "default_scene_freshness_weight")]
    pub scene_freshness: f64,
}

fn default_speech_hook_weight() -> f64 {
    0.30
}

fn default_motion_weight() -> f64 {
    0.25
}

fn default_audio_peak_weight() -> f64 {
    0.20
}

fn default_keyword_match_weight() -> f64 {
    0.15
}

fn default_scene_freshness_weight() -> f64 {
    0.10
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            speech_hook: default_speech_hook_weight(),
            motion: default_motion_weight(),
            audio_peak: default_audio_peak_weight(),
            keyword_match: default_keyword_match_weight(),
            scene_freshness: default_scene_freshness_weight(),
        }
    }
}

/// Full configuration for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct AnalysisConfig {
    /// Clip length targets
    #[serde(default)]
    pub targets: AnalysisTargets,
    /// Keywords that boost the keyword_match axis
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Scoring weights
    #[serde(default)]
    pub weights: ScoreWeights,
    /// Speech recognition model size (tiny/base/small/medium/large)
    #[serde(default = "default_whisper_model")]
    pub whisper_model: String,
    /// Language hint; "auto" enables detection
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_whisper_model() -> String {
    "base".to_string()
}

fn default_language() -> String {
    "auto".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        let w = ScoreWeights::default();
        let sum = w.speech_hook + w.motion + w.audio_peak + w.keyword_match + w.scene_freshness;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn config_deserializes_from_empty_object() {
        let config: AnalysisConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.targets.clip_min_s, 7.0);
        assert_eq!(config.targets.max_candidates, 20);
        assert_eq!(config.whisper_model, "base");
        assert_eq!(config.language, "auto");
    }
}
