//! Per-second motion intensity via grayscale frame differencing.

use std::path::Path;

use tracing::debug;

use super::frames::FrameStream;
use super::normalize_in_place;
use crate::error::MediaResult;

/// Every Nth decoded frame enters the differencing.
pub const MOTION_SAMPLE_EVERY: u32 = 5;

const FRAME_WIDTH: u32 = 320;
const FRAME_HEIGHT: u32 = 180;

/// Compute the per-second motion signal, normalized to [0, 1].
///
/// Samples are grouped by the integer second of their source frame
/// timestamp; each second's value is the mean absolute grayscale
/// difference of the samples inside it.
pub async fn motion_signal(
    path: impl AsRef<Path>,
    duration_s: f64,
    fps: f64,
) -> MediaResult<Vec<f64>> {
    let seconds = duration_s.floor() as usize;
    let mut sums = vec![0.0_f64; seconds];
    let mut counts = vec![0u32; seconds];

    let mut stream = FrameStream::open(path, FRAME_WIDTH, FRAME_HEIGHT, MOTION_SAMPLE_EVERY).await?;
    let mut buf = vec![0u8; stream.frame_len()];
    let mut prev_gray: Option<Vec<f64>> = None;
    let mut sample_index: u64 = 0;

    while stream.next_frame(&mut buf).await? {
        let gray = grayscale(&buf);

        if let Some(prev) = &prev_gray {
            let diff = mean_abs_diff(prev, &gray);
            let second = ((sample_index * MOTION_SAMPLE_EVERY as u64) as f64 / fps) as usize;
            if second < seconds {
                sums[second] += diff;
                counts[second] += 1;
            }
        }

        prev_gray = Some(gray);
        sample_index += 1;
    }

    stream.finish().await?;

    let mut signal: Vec<f64> = sums
        .iter()
        .zip(counts.iter())
        .map(|(sum, count)| if *count > 0 { sum / *count as f64 } else { 0.0 })
        .collect();
    normalize_in_place(&mut signal);

    debug!(seconds = signal.len(), "Motion analysis complete");
    Ok(signal)
}

/// ITU-R 601 luma per pixel.
pub(crate) fn grayscale(rgb: &[u8]) -> Vec<f64> {
    rgb.chunks_exact(3)
        .map(|px| 0.299 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64)
        .collect()
}

/// Mean absolute difference between two equally sized frames.
pub(crate) fn mean_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .sum::<f64>()
        / a.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grayscale_weights_sum_to_luma() {
        let gray = grayscale(&[255, 255, 255]);
        assert!((gray[0] - 255.0).abs() < 0.01);

        let gray = grayscale(&[0, 0, 0]);
        assert_eq!(gray[0], 0.0);
    }

    #[test]
    fn identical_frames_have_no_motion() {
        let a = vec![100.0; 64];
        assert_eq!(mean_abs_diff(&a, &a), 0.0);
    }

    #[test]
    fn mean_abs_diff_is_symmetric() {
        let a = vec![0.0, 10.0, 20.0];
        let b = vec![5.0, 5.0, 30.0];
        assert_eq!(mean_abs_diff(&a, &b), mean_abs_diff(&b, &a));
        assert!((mean_abs_diff(&a, &b) - (5.0 + 5.0 + 10.0) / 3.0).abs() < 1e-9);
    }
}
