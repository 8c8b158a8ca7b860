//! Audio playback and spectrum sampling.
//!
//! A cpal output stream plays the decoded track and taps the played samples
//! into a shared buffer; an analysis thread periodically turns that buffer
//! into a byte spectrum snapshot. Playback state is an explicit two-state
//! machine driven by start/pause events rather than a mutable flag shared
//! with event callbacks.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rustfft::{num_complex::Complex, FftPlanner};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::analysis::{hann_window, quantize_snapshot, smooth_magnitudes};
use crate::params::AnalyserConfig;

/// Errors from track loading, stream setup, and sampling
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("spectrum sampler not initialized; start() must be called first")]
    NotInitialized,

    #[error("failed to decode track: {0}")]
    Decode(#[from] hound::Error),

    #[error("unsupported track format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid analyser config: {0}")]
    Config(String),

    #[error("no audio output device found")]
    NoOutputDevice,

    #[error("audio stream error: {0}")]
    Stream(String),
}

/// Playback start/pause events, as emitted by the user toggling playback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started,
    Paused,
}

/// Two-state playback machine gating per-frame spectrum extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Active,
}

impl PlaybackState {
    /// Pure transition function
    pub fn transition(self, event: PlaybackEvent) -> Self {
        match event {
            PlaybackEvent::Started => Self::Active,
            PlaybackEvent::Paused => Self::Idle,
        }
    }

    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

/// A decoded track as interleaved stereo f32 samples
pub struct Track {
    pub samples: Vec<f32>,
    pub sample_rate_hz: u32,
}

impl Track {
    /// Load a WAV file, normalizing to interleaved stereo f32.
    ///
    /// Mono tracks are duplicated to both channels; more than two channels
    /// is rejected.
    pub fn load(path: &Path) -> Result<Self, AudioError> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        let raw: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => {
                reader.samples::<f32>().collect::<Result<_, _>>()?
            }
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()?
            }
        };

        let samples = match spec.channels {
            1 => raw.iter().flat_map(|&s| [s, s]).collect(),
            2 => raw,
            n => {
                return Err(AudioError::UnsupportedFormat(format!(
                    "{} channels (expected mono or stereo)",
                    n
                )))
            }
        };

        Ok(Self {
            samples,
            sample_rate_hz: spec.sample_rate,
        })
    }

    /// Track length in seconds
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / 2.0 / self.sample_rate_hz as f32
    }
}

/// On-demand access to the most recent spectrum snapshot.
///
/// `start()` spawns the analysis pipeline once; calling it again is ignored.
/// `sample_into` is synchronous and non-blocking: it copies whatever the
/// analysis thread last published.
pub struct SpectrumSampler {
    config: AnalyserConfig,
    tap: Arc<Mutex<Vec<f32>>>,
    snapshot: Arc<Mutex<Vec<u8>>>,
    analysis_thread: Option<thread::JoinHandle<()>>,
}

impl SpectrumSampler {
    fn new(config: AnalyserConfig, tap: Arc<Mutex<Vec<f32>>>) -> Self {
        let snapshot = Arc::new(Mutex::new(vec![0u8; config.bin_count()]));
        Self {
            config,
            tap,
            snapshot,
            analysis_thread: None,
        }
    }

    /// Number of bins in a snapshot
    pub fn bin_count(&self) -> usize {
        self.config.bin_count()
    }

    /// Spawn the analysis thread. Repeated calls are ignored.
    pub fn start(&mut self) {
        if self.analysis_thread.is_some() {
            return;
        }
        info!(
            fft_size = self.config.fft_size,
            interval_ms = self.config.update_interval_ms,
            "starting spectrum analysis"
        );
        self.analysis_thread = Some(spawn_analysis_thread(
            self.config.clone(),
            Arc::clone(&self.tap),
            Arc::clone(&self.snapshot),
        ));
    }

    /// Copy the latest snapshot into `out`.
    ///
    /// Fails with `NotInitialized` before `start()`.
    pub fn sample_into(&self, out: &mut [u8]) -> Result<(), AudioError> {
        if self.analysis_thread.is_none() {
            return Err(AudioError::NotInitialized);
        }
        let snapshot = self.snapshot.lock().unwrap();
        let len = out.len().min(snapshot.len());
        out[..len].copy_from_slice(&snapshot[..len]);
        Ok(())
    }
}

/// Spawn the periodic FFT analysis thread
fn spawn_analysis_thread(
    config: AnalyserConfig,
    tap: Arc<Mutex<Vec<f32>>>,
    snapshot: Arc<Mutex<Vec<u8>>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.fft_size);
        let mut fft_buffer = vec![Complex::new(0.0f32, 0.0); config.fft_size];
        let mut magnitudes = vec![0.0f32; config.bin_count()];

        loop {
            thread::sleep(Duration::from_millis(config.update_interval_ms));

            {
                let mut samples = tap.lock().unwrap();
                if samples.len() < config.fft_size {
                    continue;
                }

                for i in 0..config.fft_size {
                    fft_buffer[i] = Complex::new(samples[i] * hann_window(i, config.fft_size), 0.0);
                }

                // 50% overlap between consecutive windows
                samples.drain(0..config.fft_size / 2);
            }

            fft.process(&mut fft_buffer);

            smooth_magnitudes(
                &mut magnitudes,
                &fft_buffer[..config.bin_count()],
                config.fft_size,
                config.smoothing,
            );

            let mut snapshot = snapshot.lock().unwrap();
            quantize_snapshot(&magnitudes, &mut snapshot, config.min_db, config.max_db);
        }
    })
}

/// Audio system managing track playback and spectrum analysis
pub struct AudioSystem {
    playing: Arc<AtomicBool>,
    sampler: SpectrumSampler,

    /// Audio output stream (kept alive)
    _stream: cpal::Stream,
}

impl AudioSystem {
    /// Build the output stream for a decoded track.
    ///
    /// The stream runs immediately but emits silence until playback starts;
    /// the track loops when it reaches the end.
    pub fn new(track: Track, analyser_config: AnalyserConfig) -> Result<Self, AudioError> {
        analyser_config.validate().map_err(AudioError::Config)?;

        let playing = Arc::new(AtomicBool::new(false));
        let playing_cb = Arc::clone(&playing);

        let tap = Arc::new(Mutex::new(Vec::<f32>::new()));
        let tap_cb = Arc::clone(&tap);

        // Keep a bounded backlog so the tap cannot grow without limit if
        // analysis falls behind
        let max_buffered = analyser_config.fft_size * 4;

        let samples = Arc::new(track.samples);
        let mut cursor = 0usize;

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;

        info!(
            device = %device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate = track.sample_rate_hz,
            "audio output ready"
        );

        let config = cpal::StreamConfig {
            channels: 2,
            sample_rate: cpal::SampleRate(track.sample_rate_hz),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !playing_cb.load(Ordering::Relaxed) || samples.is_empty() {
                        data.fill(0.0);
                        return;
                    }

                    let mut tap_buf = tap_cb.lock().unwrap();

                    for frame in data.chunks_exact_mut(2) {
                        let left = samples[cursor];
                        let right = samples[cursor + 1];
                        frame[0] = left;
                        frame[1] = right;

                        // Mono mix feeds the analysis pipeline
                        tap_buf.push(0.5 * (left + right));

                        cursor += 2;
                        if cursor >= samples.len() {
                            cursor = 0; // Loop the track
                        }
                    }

                    if tap_buf.len() > max_buffered {
                        let excess = tap_buf.len() - max_buffered;
                        tap_buf.drain(0..excess);
                    }
                },
                |err| tracing::error!("audio stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        let sampler = SpectrumSampler::new(analyser_config, tap);

        Ok(Self {
            playing,
            sampler,
            _stream: stream,
        })
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Relaxed);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    pub fn sampler(&self) -> &SpectrumSampler {
        &self.sampler
    }

    pub fn sampler_mut(&mut self) -> &mut SpectrumSampler {
        &mut self.sampler
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_transitions() {
        let state = PlaybackState::default();
        assert_eq!(state, PlaybackState::Idle);
        assert!(!state.is_active());

        let state = state.transition(PlaybackEvent::Started);
        assert_eq!(state, PlaybackState::Active);
        assert!(state.is_active());

        // Repeated start is a no-op transition
        let state = state.transition(PlaybackEvent::Started);
        assert_eq!(state, PlaybackState::Active);

        let state = state.transition(PlaybackEvent::Paused);
        assert_eq!(state, PlaybackState::Idle);

        // Pause while idle stays idle
        let state = state.transition(PlaybackEvent::Paused);
        assert_eq!(state, PlaybackState::Idle);
    }

    #[test]
    fn test_sample_before_start_fails() {
        let tap = Arc::new(Mutex::new(Vec::new()));
        let sampler = SpectrumSampler::new(AnalyserConfig::default(), tap);

        let mut out = vec![0u8; sampler.bin_count()];
        assert!(matches!(
            sampler.sample_into(&mut out),
            Err(AudioError::NotInitialized)
        ));
    }

    #[test]
    fn test_sample_after_start_returns_zero_snapshot() {
        let tap = Arc::new(Mutex::new(Vec::new()));
        let mut config = AnalyserConfig::default();
        config.fft_size = 1024;
        let mut sampler = SpectrumSampler::new(config, tap);

        sampler.start();
        // Second start is ignored
        sampler.start();

        // No samples have been tapped, so the snapshot is still all zero
        let mut out = vec![1u8; sampler.bin_count()];
        sampler.sample_into(&mut out).unwrap();
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_track_load_round_trip() {
        let path = std::env::temp_dir().join("wavepool_test_track.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..441 {
            writer.write_sample((i * 64) as i16).unwrap();
        }
        writer.finalize().unwrap();

        let track = Track::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(track.sample_rate_hz, 44_100);
        // Mono duplicated to stereo
        assert_eq!(track.samples.len(), 441 * 2);
        assert_eq!(track.samples[0], track.samples[1]);
        assert!((track.duration_secs() - 0.01).abs() < 1e-3);
    }
}
