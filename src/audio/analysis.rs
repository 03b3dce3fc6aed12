use rayon::prelude::*;
use rustfft::FftPlanner;

use super::bins::{linear_bins, logarithmic_bins};
use super::decode::SampleBuffer;
use super::error::{AudioError, AudioResult};
use super::features::{AnalysisSummary, BandLevel, FrameReport};
use super::normalize::Normalizer;
use super::source::FrameSource;
use super::spectrum::{estimate_spectrum, PowerSpectrum, SpectralAnalyzer};
use crate::config::{BandSpacing, Config};

/// Turns one frame's spectrum into a [`FrameReport`].
///
/// Frames must be fed in playback order: normalization depends on the
/// history of previous frames.
pub struct FrameAnalyzer {
    analyzer: SpectralAnalyzer,
    config: Config,
    bands: Vec<(f32, f32)>,
    frame: usize,
}

impl FrameAnalyzer {
    pub fn new(config: Config) -> Self {
        let bands = band_partition(&config);
        let analyzer = SpectralAnalyzer::new(
            config.analysis.spectrum,
            Normalizer::new(config.normalization.history_cap),
        );
        Self {
            analyzer,
            config,
            bands,
            frame: 0,
        }
    }

    pub fn bands(&self) -> &[(f32, f32)] {
        &self.bands
    }

    /// Analyze, normalize and summarize one buffer.
    pub fn process(&mut self, buffer: &SampleBuffer, time: f32) -> AudioResult<FrameReport> {
        self.analyzer.analyze(buffer, self.config.analysis.weighting)?;
        self.report(time)
    }

    /// Like [`process`](Self::process) for a spectrum that was already estimated.
    pub fn process_spectrum(&mut self, spectrum: PowerSpectrum, time: f32) -> AudioResult<FrameReport> {
        self.analyzer.set_spectrum(spectrum);
        self.report(time)
    }

    pub fn reset(&mut self) {
        self.analyzer.reset_normalization();
        self.frame = 0;
    }

    fn report(&mut self, time: f32) -> AudioResult<FrameReport> {
        let peak_power = self
            .analyzer
            .spectrum()
            .powers
            .iter()
            .copied()
            .fold(0.0f32, f32::max);

        let norm = &self.config.normalization;
        let ceiling = if norm.enabled {
            self.analyzer.normalize(norm.mode, norm.lookback)?
        } else {
            1.0
        };

        let spectrum = self.analyzer.spectrum();
        let scale = &self.config.bands.scale;
        let bands = spectrum
            .list_bin_powers(&self.bands, self.config.bands.average, false)
            .into_iter()
            .map(|((lo, hi), power)| BandLevel {
                lo,
                hi,
                power,
                level: scale.apply(power),
            })
            .collect();

        let (dom_min, dom_max) = self.config.analysis.dominant_range;
        let dominant = spectrum.dominant_frequency(Some(dom_min), Some(dom_max));

        let report = FrameReport {
            frame: self.frame,
            time,
            bands,
            average: spectrum.range_power(None, None, true),
            dominant_freq: dominant.map(|(f, _)| f),
            dominant_power: dominant.map(|(_, p)| p),
            peak_power,
            ceiling,
        };
        self.frame += 1;
        Ok(report)
    }
}

/// Frequency bands reported for every frame.
pub fn band_partition(config: &Config) -> Vec<(f32, f32)> {
    let bands = &config.bands;
    match bands.spacing {
        BandSpacing::Linear => linear_bins(bands.min_freq, bands.max_freq, bands.count),
        BandSpacing::Logarithmic => {
            logarithmic_bins(bands.min_freq, bands.max_freq, bands.count, bands.base)
        }
    }
}

/// Offline analysis of a whole stream at `config.output.fps` frames per second.
pub fn analyze(
    source: &mut dyn FrameSource,
    config: &Config,
) -> AudioResult<(AnalysisSummary, Vec<FrameReport>)> {
    let fps = config.output.fps;
    if fps == 0 {
        return Err(AudioError::NoData("frame rate of zero"));
    }
    let duration = source.duration()?;

    log::info!("Pass 1: Reading frame chunks...");
    let chunks = pass1_read(source, fps)?;

    log::info!("Pass 2: Per-frame spectra ({} frames)...", chunks.len());
    let settings = config.analysis.spectrum;
    let weighting = config.analysis.weighting;
    let spectra: Vec<PowerSpectrum> = chunks
        .par_iter()
        .map_init(FftPlanner::<f32>::new, |planner, chunk| {
            estimate_spectrum(planner, chunk, &settings, weighting)
        })
        .collect::<AudioResult<Vec<_>>>()?;
    drop(chunks);

    log::info!(
        "Pass 3: Normalization & features (normalize={}, lookback={})...",
        config.normalization.enabled,
        config.normalization.lookback
    );
    let bins = spectra.first().map_or(0, |s| s.len());
    let mut frame_analyzer = FrameAnalyzer::new(config.clone());
    let mut reports = Vec::with_capacity(spectra.len());
    for (idx, spectrum) in spectra.into_iter().enumerate() {
        let time = idx as f32 / fps as f32;
        reports.push(frame_analyzer.process_spectrum(spectrum, time)?);
    }

    let loudest = reports
        .iter()
        .filter(|r| r.peak_power > 0.0)
        .max_by(|a, b| a.peak_power.total_cmp(&b.peak_power));

    let summary = AnalysisSummary {
        sample_rate: source.sample_rate(),
        fps,
        frames: reports.len(),
        duration: duration as f32,
        bins,
        loudest_frame: loudest.map(|r| r.frame),
        loudest_dominant_freq: loudest.and_then(|r| r.dominant_freq),
    };

    log::info!(
        "Analysis: {} frames, {} bins/frame, loudest frame {:?} ({:?} Hz)",
        summary.frames,
        summary.bins,
        summary.loudest_frame,
        summary.loudest_dominant_freq
    );

    Ok((summary, reports))
}

/// One `1/fps` chunk per frame, starting at `t = i / fps`, until the stream
/// runs out.
fn pass1_read(source: &mut dyn FrameSource, fps: u32) -> AudioResult<Vec<SampleBuffer>> {
    let rate = source.sample_rate() as u64;
    let chunk_len = (rate / fps as u64) as usize;
    let mut chunks = Vec::new();
    loop {
        let start = chunks.len() as u64 * rate / fps as u64;
        if start >= source.total_frames() {
            break;
        }
        source.seek_frame(start)?;
        match source.read_frames(chunk_len) {
            Ok(chunk) => chunks.push(chunk),
            Err(AudioError::OutOfRange { requested, available }) => {
                log::debug!(
                    "Stopping at frame {}: chunk would end at sample {} of {}",
                    chunks.len(),
                    requested,
                    available
                );
                break;
            }
            Err(err) => return Err(err),
        }
    }
    Ok(chunks)
}
