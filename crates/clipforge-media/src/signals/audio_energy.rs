//! Per-second audio energy from the toolchain's RMS-level stream.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use super::{bucket_means, normalize_in_place};
use crate::command::check_ffmpeg;
use crate::error::{MediaError, MediaResult};

const RMS_KEY: &str = "lavfi.astats.Overall.RMS_level";

/// Compute the per-second audio energy signal, normalized to [0, 1].
///
/// Runs ffmpeg's astats/ametadata pair over the extracted audio and
/// buckets the per-frame RMS levels into `⌊duration⌋` seconds. A stream
/// that yields no parsable levels for a non-trivial track is a toolchain
/// failure, never a silent all-zero signal.
pub async fn audio_energy_signal(
    audio_path: impl AsRef<Path>,
    duration_s: f64,
) -> MediaResult<Vec<f64>> {
    let audio_path = audio_path.as_ref();
    if !audio_path.exists() {
        return Err(MediaError::FileNotFound(audio_path.to_path_buf()));
    }
    check_ffmpeg()?;

    let filter = format!("astats=metadata=1:reset=1,ametadata=print:key={RMS_KEY}:file=-");
    let output = Command::new("ffmpeg")
        .arg("-v")
        .arg("error")
        .arg("-i")
        .arg(audio_path)
        .args(["-af", &filter, "-f", "null", "-"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::toolchain(
            "ffmpeg astats failed",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
            output.status.code(),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let levels = parse_rms_levels(&stdout, duration_s)?;

    let mut signal = bucket_means(&levels, duration_s);
    normalize_in_place(&mut signal);

    debug!(seconds = signal.len(), "Audio energy analysis complete");
    Ok(signal)
}

/// Parse the ametadata print stream into absolute dB magnitudes.
///
/// Digital silence reports `-inf`; those frames carry zero energy. Lines
/// that fail to parse at all indicate a format change in the toolchain
/// and fail the extraction.
pub(crate) fn parse_rms_levels(text: &str, duration_s: f64) -> MediaResult<Vec<f64>> {
    let mut levels = Vec::new();
    let mut matched_lines = 0usize;
    let mut parse_failures = 0usize;

    for line in text.lines() {
        if !line.contains(RMS_KEY) {
            continue;
        }
        matched_lines += 1;
        let value = line.rsplit('=').next().unwrap_or("").trim();
        match value.parse::<f64>() {
            Ok(db) if db.is_finite() => levels.push(db.abs()),
            Ok(_) => levels.push(0.0),
            Err(_) => parse_failures += 1,
        }
    }

    if matched_lines > 0 && levels.is_empty() {
        return Err(MediaError::toolchain(
            format!("astats RMS stream unparsable ({parse_failures} bad lines)"),
            None,
            None,
        ));
    }
    if matched_lines == 0 && duration_s >= 1.0 {
        return Err(MediaError::toolchain(
            "astats produced no RMS levels",
            None,
            None,
        ));
    }

    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_db_magnitudes() {
        let text = "\
lavfi.astats.Overall.RMS_level=-23.5
lavfi.astats.Overall.RMS_level=-18.0
frame:1 pts:1024
lavfi.astats.Overall.RMS_level=-30.25
";
        let levels = parse_rms_levels(text, 3.0).unwrap();
        assert_eq!(levels, vec![23.5, 18.0, 30.25]);
    }

    #[test]
    fn silence_maps_to_zero_energy() {
        let text = "lavfi.astats.Overall.RMS_level=-inf\n";
        let levels = parse_rms_levels(text, 2.0).unwrap();
        assert_eq!(levels, vec![0.0]);
    }

    #[test]
    fn unparsable_stream_is_a_toolchain_error() {
        let text = "\
lavfi.astats.Overall.RMS_level=garbage
lavfi.astats.Overall.RMS_level=also garbage
";
        let err = parse_rms_levels(text, 10.0).unwrap_err();
        assert!(matches!(err, MediaError::Toolchain { .. }));
    }

    #[test]
    fn missing_stream_on_long_track_is_an_error() {
        assert!(parse_rms_levels("", 10.0).is_err());
    }

    #[test]
    fn missing_stream_on_subsecond_track_is_empty() {
        let levels = parse_rms_levels("", 0.4).unwrap();
        assert!(levels.is_empty());
    }
}
