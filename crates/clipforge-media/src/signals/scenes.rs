//! Scene boundary detection via hue/saturation histogram differencing.

use std::path::Path;

use tracing::debug;

use super::frames::FrameStream;
use crate::error::MediaResult;

/// Every Nth decoded frame is histogrammed.
pub const SCENE_SAMPLE_EVERY: u32 = 3;

/// L1 distance above which a boundary is emitted.
pub const SCENE_THRESHOLD: f64 = 0.3;

const FRAME_WIDTH: u32 = 160;
const FRAME_HEIGHT: u32 = 90;
const HUE_BINS: usize = 50;
const SAT_BINS: usize = 60;

/// Detect scene boundaries.
///
/// Returns a strictly increasing sequence beginning with `0.0` and
/// ending with `duration_s`. A boundary is the current sample's
/// timestamp, `sampled_frame_index / fps`.
pub async fn detect_scene_boundaries(
    path: impl AsRef<Path>,
    duration_s: f64,
    fps: f64,
    threshold: f64,
) -> MediaResult<Vec<f64>> {
    let mut stream = FrameStream::open(path, FRAME_WIDTH, FRAME_HEIGHT, SCENE_SAMPLE_EVERY).await?;
    let mut buf = vec![0u8; stream.frame_len()];

    let mut boundaries = vec![0.0_f64];
    let mut prev_hist: Option<Vec<f64>> = None;
    let mut sample_index: u64 = 0;

    while stream.next_frame(&mut buf).await? {
        let hist = hue_sat_histogram(&buf);

        if let Some(prev) = &prev_hist {
            let distance = l1_distance(prev, &hist);
            if distance > threshold {
                let timestamp = (sample_index * SCENE_SAMPLE_EVERY as u64) as f64 / fps;
                let last = *boundaries.last().expect("boundaries start non-empty");
                if timestamp > last && timestamp < duration_s {
                    boundaries.push(timestamp);
                }
            }
        }

        prev_hist = Some(hist);
        sample_index += 1;
    }

    stream.finish().await?;

    if duration_s > *boundaries.last().expect("boundaries start non-empty") {
        boundaries.push(duration_s);
    }

    debug!(
        boundaries = boundaries.len(),
        duration_s, "Scene detection complete"
    );
    Ok(boundaries)
}

/// Normalized 2-D hue×saturation histogram of an RGB24 frame.
///
/// Hue lives in [0, 180) and saturation in [0, 256), matching the common
/// byte-range convention, binned 50×60 and normalized to unit sum.
pub(crate) fn hue_sat_histogram(rgb: &[u8]) -> Vec<f64> {
    let mut hist = vec![0.0_f64; HUE_BINS * SAT_BINS];
    let mut pixels = 0usize;

    for px in rgb.chunks_exact(3) {
        let (hue, sat) = rgb_to_hue_sat(px[0], px[1], px[2]);
        let h_bin = ((hue / 180.0 * HUE_BINS as f64) as usize).min(HUE_BINS - 1);
        let s_bin = ((sat / 256.0 * SAT_BINS as f64) as usize).min(SAT_BINS - 1);
        hist[h_bin * SAT_BINS + s_bin] += 1.0;
        pixels += 1;
    }

    if pixels > 0 {
        let total = pixels as f64;
        for v in hist.iter_mut() {
            *v /= total;
        }
    }
    hist
}

/// Hue in [0, 180), saturation in [0, 256).
pub(crate) fn rgb_to_hue_sat(r: u8, g: u8, b: u8) -> (f64, f64) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let sat = if max > 0.0 { delta / max * 255.0 } else { 0.0 };

    let hue_deg = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    (hue_deg / 2.0, sat)
}

/// Sum of absolute differences between two histograms.
pub(crate) fn l1_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(r: u8, g: u8, b: u8) -> Vec<u8> {
        let mut frame = Vec::with_capacity(160 * 90 * 3);
        for _ in 0..160 * 90 {
            frame.extend_from_slice(&[r, g, b]);
        }
        frame
    }

    #[test]
    fn histogram_sums_to_one() {
        let hist = hue_sat_histogram(&solid_frame(200, 30, 30));
        let sum: f64 = hist.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn identical_frames_have_zero_distance() {
        let a = hue_sat_histogram(&solid_frame(10, 200, 10));
        let b = hue_sat_histogram(&solid_frame(10, 200, 10));
        assert_eq!(l1_distance(&a, &b), 0.0);
    }

    #[test]
    fn distinct_colors_exceed_threshold() {
        let red = hue_sat_histogram(&solid_frame(220, 20, 20));
        let blue = hue_sat_histogram(&solid_frame(20, 20, 220));
        assert!(l1_distance(&red, &blue) > SCENE_THRESHOLD);
    }

    #[test]
    fn hue_ranges_match_convention() {
        let (h, s) = rgb_to_hue_sat(255, 0, 0);
        assert!((h - 0.0).abs() < 1e-9);
        assert!((s - 255.0).abs() < 1e-9);

        let (h, _) = rgb_to_hue_sat(0, 255, 0);
        assert!((h - 60.0).abs() < 1e-9);

        let (h, _) = rgb_to_hue_sat(0, 0, 255);
        assert!((h - 120.0).abs() < 1e-9);

        let (h, s) = rgb_to_hue_sat(128, 128, 128);
        assert_eq!(h, 0.0);
        assert_eq!(s, 0.0);
    }
}
