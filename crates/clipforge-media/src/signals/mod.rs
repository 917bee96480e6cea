//! Per-video signal extraction: scene boundaries, motion, audio energy.
//!
//! All pixel work happens on downscaled raw RGB frames streamed out of
//! ffmpeg; nothing decodes the container in-process. Each signal is a
//! per-second series of length `⌊duration⌋`, normalized so the maximum
//! is 1.0 whenever any value is positive.

mod audio_energy;
mod frames;
mod motion;
mod scenes;

pub use audio_energy::audio_energy_signal;
pub use frames::FrameStream;
pub use motion::{motion_signal, MOTION_SAMPLE_EVERY};
pub use scenes::{detect_scene_boundaries, SCENE_SAMPLE_EVERY, SCENE_THRESHOLD};

/// Divide every value by the maximum, leaving an all-zero series alone.
pub(crate) fn normalize_in_place(values: &mut [f64]) {
    let max = values.iter().cloned().fold(0.0_f64, f64::max);
    if max > 0.0 {
        for v in values.iter_mut() {
            *v /= max;
        }
    }
}

/// Group a uniformly sampled value stream into `⌊duration⌋` per-second
/// buckets and take the mean of each; empty buckets yield 0.
pub(crate) fn bucket_means(values: &[f64], duration_s: f64) -> Vec<f64> {
    let seconds = duration_s.floor() as usize;
    if seconds == 0 {
        return Vec::new();
    }

    let per_second = values.len() as f64 / duration_s;
    (0..seconds)
        .map(|i| {
            let start = (i as f64 * per_second) as usize;
            let end = ((i + 1) as f64 * per_second) as usize;
            let bucket = &values[start.min(values.len())..end.min(values.len())];
            if bucket.is_empty() {
                0.0
            } else {
                bucket.iter().sum::<f64>() / bucket.len() as f64
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_scales_max_to_one() {
        let mut values = vec![0.2, 0.5, 0.1];
        normalize_in_place(&mut values);
        assert_eq!(values[1], 1.0);
        assert!((values[0] - 0.4).abs() < 1e-9);
    }

    #[test]
    fn normalize_leaves_zero_series() {
        let mut values = vec![0.0, 0.0];
        normalize_in_place(&mut values);
        assert_eq!(values, vec![0.0, 0.0]);
    }

    #[test]
    fn bucket_means_produces_floor_duration_buckets() {
        let values: Vec<f64> = (0..25).map(|i| i as f64).collect();
        let buckets = bucket_means(&values, 5.2);
        assert_eq!(buckets.len(), 5);
        // Roughly 4.8 samples per bucket, means increase monotonically
        assert!(buckets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn bucket_means_handles_sparse_input() {
        let buckets = bucket_means(&[3.0], 4.0);
        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets[0], 3.0);
        assert_eq!(buckets[1..], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn bucket_means_empty_under_one_second() {
        assert!(bucket_means(&[1.0, 2.0], 0.5).is_empty());
    }
}
