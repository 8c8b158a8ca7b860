//! Wavepool library - audio-reactive water surfaces

pub mod analysis;
pub mod audio;
pub mod camera;
pub mod cli;
pub mod panel;
pub mod params;
pub mod rendering;
pub mod surface;
