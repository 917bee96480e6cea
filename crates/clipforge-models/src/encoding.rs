//! Output encoding configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Encoder settings for the final MP4.
///
/// Defaults produce a web-friendly H.264 file: `fast` preset, CRF 23,
/// `high` profile, `yuv420p`, `+faststart`, AAC at 128 kbit/s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingConfig {
    /// Video codec
    pub codec: String,
    /// Encoder preset
    pub preset: String,
    /// Constant rate factor
    pub crf: u8,
    /// H.264 profile
    pub profile: String,
    /// Pixel format
    pub pix_fmt: String,
    /// Container flags
    pub movflags: String,
    /// Audio codec
    pub audio_codec: String,
    /// Audio bitrate
    pub audio_bitrate: String,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            preset: "fast".to_string(),
            crf: 23,
            profile: "high".to_string(),
            pix_fmt: "yuv420p".to_string(),
            movflags: "+faststart".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_output_contract() {
        let enc = EncodingConfig::default();
        assert_eq!(enc.codec, "libx264");
        assert_eq!(enc.crf, 23);
        assert_eq!(enc.pix_fmt, "yuv420p");
        assert_eq!(enc.movflags, "+faststart");
        assert_eq!(enc.audio_bitrate, "128k");
    }
}
