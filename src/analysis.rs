//! Spectrum snapshot math and the band intensity extractor.
//!
//! Everything here is pure: the analysis thread feeds FFT output through
//! `smooth_magnitudes` and `quantize_snapshot`, and the frame loop feeds the
//! resulting byte snapshot through `extract` to obtain the two displacement
//! intensities.

use rustfft::num_complex::Complex;
use std::f32::consts::PI;
use std::ops::Range;

/// Width of the per-bin moving average window (bins i-2..=i+2)
const AVERAGE_WINDOW: isize = 2;

/// Resolved bin-index plan for the extractor.
///
/// Built once from `BandConfig::plan` so the per-frame extraction does no
/// Hz-to-bin arithmetic.
#[derive(Debug, Clone)]
pub struct BandPlan {
    pub low: Range<usize>,
    pub high: Range<usize>,
    /// Bins at or above this index use `high_divisor_above`
    pub high_split: usize,
    pub low_divisor: f32,
    pub high_divisor_below: f32,
    pub high_divisor_above: f32,
}

/// Per-band displacement intensities for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandIntensity {
    pub low: f32,
    pub high: f32,
}

/// Mean of the five bins centered on `center`.
///
/// Out-of-range neighbors (negative or past the end) read as zero, which
/// biases averages near the snapshot edges downward. That boundary policy is
/// kept deliberately; do not clamp to the edge bins.
pub fn window_average(snapshot: &[u8], center: usize) -> f32 {
    let mut sum = 0.0f32;
    for offset in -AVERAGE_WINDOW..=AVERAGE_WINDOW {
        let index = center as isize + offset;
        if index >= 0 && (index as usize) < snapshot.len() {
            sum += snapshot[index as usize] as f32;
        }
    }
    sum / (2 * AVERAGE_WINDOW + 1) as f32
}

/// Extract the low and high band intensities from a byte snapshot.
///
/// Each band is scanned with increasing bin index and the running value is
/// overwritten at every step, so the average centered on the band's last
/// index is what survives. This matches the behavior this visualizer was
/// tuned against; a whole-band aggregate would behave differently.
pub fn extract(snapshot: &[u8], plan: &BandPlan) -> BandIntensity {
    let mut low = 0.0f32;
    let mut high = 0.0f32;

    for i in plan.high.clone() {
        let average = window_average(snapshot, i);
        high = if i >= plan.high_split {
            average / plan.high_divisor_above
        } else {
            average / plan.high_divisor_below
        };
    }

    for i in plan.low.clone() {
        low = window_average(snapshot, i) / plan.low_divisor;
    }

    BandIntensity { low, high }
}

/// Hann window function for FFT analysis
pub fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}

/// Fold a new FFT frame into the running magnitude estimate.
///
/// Magnitudes are normalized by the FFT size and blended with the previous
/// estimate using the analyser's smoothing constant, which damps
/// frame-to-frame flicker the same way a Web Audio analyser does.
pub fn smooth_magnitudes(
    magnitudes: &mut [f32],
    spectrum: &[Complex<f32>],
    fft_size: usize,
    smoothing: f32,
) {
    for (estimate, bin) in magnitudes.iter_mut().zip(spectrum) {
        let magnitude = bin.norm() / fft_size as f32;
        *estimate = smoothing * *estimate + (1.0 - smoothing) * magnitude;
    }
}

/// Quantize smoothed magnitudes into snapshot bytes on a decibel scale.
///
/// `min_db` maps to 0 and `max_db` to 255; values outside the range clamp.
pub fn quantize_snapshot(magnitudes: &[f32], out: &mut [u8], min_db: f32, max_db: f32) {
    for (byte, &magnitude) in out.iter_mut().zip(magnitudes) {
        let db = 20.0 * magnitude.max(1e-12).log10();
        let scaled = 255.0 * (db - min_db) / (max_db - min_db);
        *byte = scaled.clamp(0.0, 255.0) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_plan() -> BandPlan {
        // Matches the 512-bin reference scenario: low [200,220), high
        // [290,330), split at 310.
        BandPlan {
            low: 200..220,
            high: 290..330,
            high_split: 310,
            low_divisor: 75.0,
            high_divisor_below: 150.0,
            high_divisor_above: 75.0,
        }
    }

    #[test]
    fn test_all_zero_snapshot_yields_zero_intensity() {
        let snapshot = vec![0u8; 512];
        let intensity = extract(&snapshot, &test_plan());

        assert_eq!(intensity.low, 0.0);
        assert_eq!(intensity.high, 0.0);
    }

    #[test]
    fn test_constant_snapshot_interior_averages() {
        let snapshot = vec![90u8; 512];
        let intensity = extract(&snapshot, &test_plan());

        // Bands are fully interior, so every moving average equals the bin
        // value. Low divides by 75; the high band's last index (329) sits at
        // or above the split, so it divides by 75 as well.
        assert_eq!(intensity.low, 90.0 / 75.0);
        assert_eq!(intensity.high, 90.0 / 75.0);
    }

    #[test]
    fn test_last_index_average_survives() {
        let plan = test_plan();

        // A spike at an interior bin outside the final five-bin window is
        // overwritten by later scan steps and contributes nothing.
        let mut snapshot = vec![0u8; 512];
        snapshot[209] = 150;
        snapshot[300] = 150;
        let intensity = extract(&snapshot, &plan);
        assert_eq!(intensity.low, 0.0);
        assert_eq!(intensity.high, 0.0);

        // The same spike at each band's last index survives as a 150/5
        // moving average.
        let mut snapshot = vec![0u8; 512];
        snapshot[219] = 150;
        snapshot[329] = 150;
        let intensity = extract(&snapshot, &plan);
        assert_eq!(intensity.low, 30.0 / 75.0);
        assert_eq!(intensity.high, 30.0 / 75.0);
    }

    #[test]
    fn test_high_band_divisor_split() {
        // Two plans identical except for where the band ends relative to the
        // split: ending below it keeps the 150 divisor, ending above it
        // switches to 75, a factor of two on identical input.
        let below = BandPlan {
            high: 290..310,
            ..test_plan()
        };
        let above = BandPlan {
            high: 290..330,
            ..test_plan()
        };
        let snapshot = vec![120u8; 512];

        let from_below = extract(&snapshot, &below).high;
        let from_above = extract(&snapshot, &above).high;

        assert_eq!(from_below, 120.0 / 150.0);
        assert_eq!(from_above, 120.0 / 75.0);
        assert_eq!(from_above / from_below, 2.0);
    }

    #[test]
    fn test_edge_zero_padding_biases_average_down() {
        // A band whose last index is bin 0 only sees three real bins; the
        // two negative neighbors read as zero and drag the average down
        // versus the same values at a fully interior index.
        let snapshot = vec![100u8; 512];

        let edge = window_average(&snapshot, 0);
        let interior = window_average(&snapshot, 256);

        assert_eq!(interior, 100.0);
        assert_eq!(edge, 300.0 / 5.0);
        assert!(edge < interior);

        let edge_plan = BandPlan {
            low: 0..1,
            ..test_plan()
        };
        assert_eq!(extract(&snapshot, &edge_plan).low, 60.0 / 75.0);
    }

    #[test]
    fn test_window_average_past_end_reads_zero() {
        let snapshot = vec![50u8; 4];

        // Center at the last bin: indices 4 and 5 fall off the end.
        assert_eq!(window_average(&snapshot, 3), 150.0 / 5.0);
        // Center entirely past the end still sums the in-range tail.
        assert_eq!(window_average(&snapshot, 5), 50.0 / 5.0);
    }

    #[test]
    fn test_hann_window_shape() {
        let size = 1024;

        // Zero at the edges, unity at the center
        assert!((hann_window(0, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size - 1, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size / 2, size) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_smooth_magnitudes_blends_toward_input() {
        let spectrum = vec![Complex::new(512.0, 0.0); 4];
        let mut magnitudes = vec![0.0f32; 4];

        // fft_size 1024 normalizes the 512.0 bins to 0.5
        smooth_magnitudes(&mut magnitudes, &spectrum, 1024, 0.8);
        for &m in &magnitudes {
            assert!((m - 0.1).abs() < 1e-6);
        }

        // Repeated frames converge toward the normalized magnitude
        for _ in 0..100 {
            smooth_magnitudes(&mut magnitudes, &spectrum, 1024, 0.8);
        }
        for &m in &magnitudes {
            assert!((m - 0.5).abs() < 1e-3);
        }
    }

    #[test]
    fn test_quantize_snapshot_db_mapping() {
        // -100 dB -> 0, -30 dB -> 255, values outside the range clamp
        let magnitudes = [1e-5f32, 10f32.powf(-1.5), 1.0, 0.0];
        let mut out = [0u8; 4];

        quantize_snapshot(&magnitudes, &mut out, -100.0, -30.0);

        assert_eq!(out[0], 0);
        assert_eq!(out[1], 255);
        assert_eq!(out[2], 255);
        assert_eq!(out[3], 0);
    }

    #[test]
    fn test_quantize_snapshot_monotonic() {
        let magnitudes = [1e-5f32, 1e-4, 1e-3, 1e-2];
        let mut out = [0u8; 4];

        quantize_snapshot(&magnitudes, &mut out, -100.0, -30.0);

        assert!(out[0] < out[1]);
        assert!(out[1] < out[2]);
        assert!(out[2] < out[3]);
    }
}
