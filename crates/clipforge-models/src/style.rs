//! Caption templates and output aspect ratios.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Caption style template applied by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaptionTemplate {
    /// White text, subtle outline, one word at a time
    #[default]
    Clean,
    /// Yellow comic-style text with a heavy shadow and a subtle zoom
    Manga,
    /// Per-word emphasis with capitalized words enlarged in red
    Impact,
    /// Persistent gray line with per-word yellow highlight
    Karaoke,
}

impl CaptionTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptionTemplate::Clean => "clean",
            CaptionTemplate::Manga => "manga",
            CaptionTemplate::Impact => "impact",
            CaptionTemplate::Karaoke => "karaoke",
        }
    }

    /// All known templates, for validation messages.
    pub fn all() -> &'static [CaptionTemplate] {
        &[
            CaptionTemplate::Clean,
            CaptionTemplate::Manga,
            CaptionTemplate::Impact,
            CaptionTemplate::Karaoke,
        ]
    }
}

impl fmt::Display for CaptionTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CaptionTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clean" => Ok(CaptionTemplate::Clean),
            "manga" => Ok(CaptionTemplate::Manga),
            "impact" => Ok(CaptionTemplate::Impact),
            "karaoke" => Ok(CaptionTemplate::Karaoke),
            other => Err(format!("unknown caption template: {other}")),
        }
    }
}

/// Output aspect ratio for rendered clips.
///
/// Each aspect maps to a fixed canvas and a caption baseline kept clear
/// of the social platforms' bottom UI band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum AspectRatio {
    /// Vertical 9:16 (TikTok/Reels/Shorts)
    #[default]
    #[serde(rename = "9:16")]
    Vertical,
    /// Square 1:1 (feed posts)
    #[serde(rename = "1:1")]
    Square,
    /// Portrait 4:5 (Instagram feed)
    #[serde(rename = "4:5")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Vertical => "9:16",
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "4:5",
        }
    }

    /// Aspect label with `:` replaced by `x`, safe for object-store keys
    /// and filenames.
    pub fn sanitized(&self) -> &'static str {
        match self {
            AspectRatio::Vertical => "9x16",
            AspectRatio::Square => "1x1",
            AspectRatio::Portrait => "4x5",
        }
    }

    /// Output canvas size in pixels (width, height).
    pub fn canvas(&self) -> (u32, u32) {
        match self {
            AspectRatio::Vertical => (1080, 1920),
            AspectRatio::Square => (1080, 1080),
            AspectRatio::Portrait => (1080, 1350),
        }
    }

    /// Caption baseline y, above the platform UI safe zone.
    pub fn caption_baseline_y(&self) -> u32 {
        match self {
            AspectRatio::Vertical => 1620,
            AspectRatio::Square => 880,
            AspectRatio::Portrait => 1100,
        }
    }

    /// All known aspects, for validation messages.
    pub fn all() -> &'static [AspectRatio] {
        &[AspectRatio::Vertical, AspectRatio::Square, AspectRatio::Portrait]
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "9:16" | "9x16" => Ok(AspectRatio::Vertical),
            "1:1" | "1x1" => Ok(AspectRatio::Square),
            "4:5" | "4x5" => Ok(AspectRatio::Portrait),
            other => Err(format!("unknown aspect ratio: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_serde_uses_colon_form() {
        let json = serde_json::to_string(&AspectRatio::Vertical).unwrap();
        assert_eq!(json, "\"9:16\"");
        let back: AspectRatio = serde_json::from_str("\"4:5\"").unwrap();
        assert_eq!(back, AspectRatio::Portrait);
    }

    #[test]
    fn sanitized_replaces_colon() {
        assert_eq!(AspectRatio::Vertical.sanitized(), "9x16");
        assert_eq!(AspectRatio::Square.sanitized(), "1x1");
        assert_eq!(AspectRatio::Portrait.sanitized(), "4x5");
    }

    #[test]
    fn canvases_match_baselines() {
        for aspect in AspectRatio::all() {
            let (_, h) = aspect.canvas();
            assert!(aspect.caption_baseline_y() < h);
        }
    }

    #[test]
    fn template_parse_roundtrip() {
        for t in CaptionTemplate::all() {
            assert_eq!(CaptionTemplate::from_str(t.as_str()).unwrap(), *t);
        }
        assert!(CaptionTemplate::from_str("vaporwave").is_err());
    }
}
