//! Parameter definitions with documented units and ranges.

use std::ops::Range;

use crate::analysis::BandPlan;

/// Spectrum analyser configuration.
///
/// Mirrors the semantics of a Web-Audio-style analyser: the snapshot it
/// produces holds `fft_size / 2` byte magnitudes on a decibel scale.
#[derive(Debug, Clone)]
pub struct AnalyserConfig {
    /// Audio sample rate (Hz), taken from the loaded track
    pub sample_rate_hz: usize,

    /// FFT window size in samples (must be a power of 2)
    pub fft_size: usize,

    /// Snapshot refresh interval (milliseconds)
    pub update_interval_ms: u64,

    /// Exponential smoothing constant applied to magnitudes between
    /// refreshes, 0.0 = no smoothing, must stay below 1.0
    pub smoothing: f32,

    /// Magnitude mapped to byte 0 (decibels)
    pub min_db: f32,

    /// Magnitude mapped to byte 255 (decibels)
    pub max_db: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 48_000,
            fft_size: 16_384,
            update_interval_ms: 16,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

impl AnalyserConfig {
    /// Number of frequency bins in a snapshot (half the FFT size)
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Convert frequency (Hz) to snapshot bin index
    pub fn hz_to_bin(&self, hz: f32) -> usize {
        ((hz * self.fft_size as f32) / self.sample_rate_hz as f32) as usize
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.fft_size.is_power_of_two() {
            return Err(format!(
                "FFT size must be power of 2, got {}",
                self.fft_size
            ));
        }
        if self.sample_rate_hz == 0 {
            return Err("Sample rate must be > 0".to_string());
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(format!(
                "Smoothing must be in [0, 1), got {}",
                self.smoothing
            ));
        }
        if self.min_db >= self.max_db {
            return Err("min_db must be below max_db".to_string());
        }
        Ok(())
    }
}

/// Frequency band mapping from snapshot bins to displacement intensities.
///
/// The high band is split at `high_split_hz`: bins below the split are
/// normalized with `high_divisor_below`, bins at or above it with
/// `high_divisor_above`.
#[derive(Debug, Clone)]
pub struct BandConfig {
    /// Low band frequency range (Hz), roughly bass
    pub low_range_hz: (f32, f32),

    /// High band frequency range (Hz), upper midrange
    pub high_range_hz: (f32, f32),

    /// Split frequency inside the high band (Hz)
    pub high_split_hz: f32,

    /// Normalization divisor for the low band
    pub low_divisor: f32,

    /// High band divisor below the split
    pub high_divisor_below: f32,

    /// High band divisor at or above the split
    pub high_divisor_above: f32,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            low_range_hz: (60.0, 250.0),
            high_range_hz: (500.0, 2000.0),
            high_split_hz: 1250.0,
            low_divisor: 75.0,
            high_divisor_below: 150.0,
            high_divisor_above: 75.0,
        }
    }
}

impl BandConfig {
    /// Snapshot bin range for the low band
    pub fn low_bins(&self, analyser: &AnalyserConfig) -> Range<usize> {
        analyser.hz_to_bin(self.low_range_hz.0)..analyser.hz_to_bin(self.low_range_hz.1)
    }

    /// Snapshot bin range for the high band
    pub fn high_bins(&self, analyser: &AnalyserConfig) -> Range<usize> {
        analyser.hz_to_bin(self.high_range_hz.0)..analyser.hz_to_bin(self.high_range_hz.1)
    }

    /// Resolve Hz ranges to a concrete bin-index plan for the extractor
    pub fn plan(&self, analyser: &AnalyserConfig) -> BandPlan {
        BandPlan {
            low: self.low_bins(analyser),
            high: self.high_bins(analyser),
            high_split: analyser.hz_to_bin(self.high_split_hz),
            low_divisor: self.low_divisor,
            high_divisor_below: self.high_divisor_below,
            high_divisor_above: self.high_divisor_above,
        }
    }
}

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Field of view (degrees)
    pub fov_degrees: f32,

    /// Near clipping plane
    pub near_plane: f32,

    /// Far clipping plane
    pub far_plane: f32,

    /// Device pixel ratio cap (2.0 keeps HiDPI output bounded)
    pub max_pixel_ratio: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            fov_degrees: 50.0,
            near_plane: 0.1,
            far_plane: 100.0,
            max_pixel_ratio: 2.0,
        }
    }
}

impl RenderConfig {
    pub fn aspect_ratio(&self) -> f32 {
        self.window_width as f32 / self.window_height as f32
    }
}
