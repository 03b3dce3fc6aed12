//! Spectral analysis for audio-reactive visuals.
//!
//! Decode PCM into [`audio::SampleBuffer`]s, turn them into power spectra with
//! [`audio::SpectralAnalyzer`], normalize against recent loudness and query
//! frequency ranges for drawing. [`scale`] holds the curves used to map the
//! results onto screen space.

pub mod audio;
pub mod config;
pub mod encode;
pub mod scale;
