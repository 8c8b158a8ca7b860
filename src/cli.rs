//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;

use crate::params::AnalyserConfig;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "Wavepool")]
#[command(about = "Audio-reactive water surfaces with a live tuning panel", long_about = None)]
pub struct Args {
    /// WAV track to play and visualize
    pub track: PathBuf,

    /// FFT transform size in samples (power of 2)
    #[arg(long, value_name = "SAMPLES", default_value = "16384")]
    pub fft_size: usize,

    /// Spectrum smoothing constant (0 disables, must stay below 1)
    #[arg(long, value_name = "FACTOR", default_value = "0.8")]
    pub smoothing: f32,
}

impl Args {
    /// Build the analyser configuration for a track's sample rate
    pub fn analyser_config(&self, sample_rate_hz: u32) -> AnalyserConfig {
        AnalyserConfig {
            sample_rate_hz: sample_rate_hz as usize,
            fft_size: self.fft_size,
            smoothing: self.smoothing,
            ..AnalyserConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["wavepool", "track.wav"]).unwrap();

        assert_eq!(args.track, PathBuf::from("track.wav"));
        assert_eq!(args.fft_size, 16_384);
        assert_eq!(args.smoothing, 0.8);
    }

    #[test]
    fn test_args_overrides() {
        let args = Args::try_parse_from([
            "wavepool",
            "song.wav",
            "--fft-size",
            "4096",
            "--smoothing",
            "0.5",
        ])
        .unwrap();

        let config = args.analyser_config(44_100);
        assert_eq!(config.fft_size, 4096);
        assert_eq!(config.smoothing, 0.5);
        assert_eq!(config.sample_rate_hz, 44_100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_track_argument_required() {
        assert!(Args::try_parse_from(["wavepool"]).is_err());
    }
}
