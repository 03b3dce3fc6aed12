use rustfft::{num_complex::Complex, FftPlanner};
use serde::Deserialize;

use super::bins::BinLayout;
use super::decode::SampleBuffer;
use super::error::{AudioError, AudioResult};
use super::normalize::{NormalizationMode, Normalizer};

/// Window applied to each analysis segment before the FFT.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WindowFunction {
    /// Rectangular window (no tapering).
    #[default]
    Boxcar,
    Hann,
    Hamming,
    Blackman,
}

impl WindowFunction {
    pub fn coefficients(self, size: usize) -> Vec<f32> {
        if size <= 1 {
            return vec![1.0; size];
        }
        let denom = (size - 1) as f32;
        (0..size)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / denom;
                match self {
                    WindowFunction::Boxcar => 1.0,
                    WindowFunction::Hann => 0.5 * (1.0 - phase.cos()),
                    WindowFunction::Hamming => 0.54 - 0.46 * phase.cos(),
                    WindowFunction::Blackman => {
                        0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos()
                    }
                }
            })
            .collect()
    }
}

/// Parameters of the power spectral density estimate.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpectrumSettings {
    pub window: WindowFunction,
    /// Welch segment length in samples. `None` analyzes the whole buffer as a
    /// single periodogram.
    pub segment_len: Option<usize>,
    /// Subtract each segment's mean before transforming.
    pub detrend: bool,
}

impl Default for SpectrumSettings {
    fn default() -> Self {
        Self {
            window: WindowFunction::Boxcar,
            segment_len: None,
            detrend: true,
        }
    }
}

/// Non-negative power per frequency bin.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PowerSpectrum {
    pub powers: Vec<f32>,
    pub layout: BinLayout,
}

impl PowerSpectrum {
    pub fn len(&self) -> usize {
        self.powers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.powers.is_empty()
    }

    pub fn freq_to_bin(&self, freq: f32) -> Option<usize> {
        self.layout.freq_to_bin(freq)
    }

    pub fn bin_to_freq(&self, bin: usize) -> f32 {
        self.layout.bin_to_freq(bin)
    }
}

/// A-weighting gain at `freq` Hz (amplitude, not power).
pub fn a_weighting_gain(freq: f32) -> f32 {
    let f2 = (freq as f64).powi(2);
    let numerator = 12200f64.powi(2) * f2 * f2;
    let denominator = (f2 + 20.6f64.powi(2))
        * ((f2 + 107.7f64.powi(2)) * (f2 + 737.9f64.powi(2))).sqrt()
        * (f2 + 12200f64.powi(2));
    (numerator / denominator) as f32
}

/// Estimate the power spectral density of `buffer`.
///
/// Welch's method with half-overlapping segments and density scaling; the
/// one-sided result is divided by `len(buffer) / 2`. With `apply_weighting`
/// each bin is multiplied by the squared A-weighting gain of its frequency.
pub fn estimate_spectrum(
    planner: &mut FftPlanner<f32>,
    buffer: &SampleBuffer,
    settings: &SpectrumSettings,
    apply_weighting: bool,
) -> AudioResult<PowerSpectrum> {
    let n = buffer.len();
    if n == 0 {
        return Err(AudioError::NoData("cannot analyze an empty buffer"));
    }
    if buffer.sample_rate == 0 {
        return Err(AudioError::NoData("buffer has no sample rate"));
    }

    let seg_len = settings.segment_len.map_or(n, |s| s.clamp(1, n));
    let step = seg_len - seg_len / 2;
    let layout = BinLayout::new(buffer.sample_rate, seg_len);

    let window = settings.window.coefficients(seg_len);
    let window_power: f32 = window.iter().map(|w| w * w).sum();
    let mut powers = vec![0.0f32; layout.bins];
    if window_power <= 0.0 {
        return Ok(PowerSpectrum { powers, layout });
    }
    let scale = 1.0 / (buffer.sample_rate as f32 * window_power);

    let fft = planner.plan_fft_forward(seg_len);
    let mut scratch: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); seg_len];
    let mut segments = 0usize;
    let mut start = 0usize;
    while start + seg_len <= n {
        let segment = &buffer.samples[start..start + seg_len];
        let mean = if settings.detrend {
            segment.iter().sum::<f32>() / seg_len as f32
        } else {
            0.0
        };
        for (slot, (&s, &w)) in scratch.iter_mut().zip(segment.iter().zip(window.iter())) {
            *slot = Complex::new((s - mean) * w, 0.0);
        }
        fft.process(&mut scratch);

        for (power, c) in powers.iter_mut().zip(scratch.iter()) {
            *power += c.norm_sqr() * scale;
        }
        segments += 1;
        start += step;
    }

    // One-sided: fold negative frequencies into positive ones, except DC and
    // (for even lengths) Nyquist which have no mirror.
    let doubled_end = if seg_len % 2 == 0 { layout.bins - 1 } else { layout.bins };
    let norm = 1.0 / (segments as f32 * (n as f32 / 2.0));
    for (k, power) in powers.iter_mut().enumerate() {
        if k > 0 && k < doubled_end {
            *power *= 2.0;
        }
        *power *= norm;
    }

    if apply_weighting {
        for (k, power) in powers.iter_mut().enumerate() {
            let gain = a_weighting_gain(layout.bin_to_freq(k));
            *power *= gain * gain;
        }
    }

    log::trace!(
        "Spectrum: {} samples, {} segment(s) of {}, {} bins",
        n,
        segments,
        seg_len,
        layout.bins
    );

    Ok(PowerSpectrum { powers, layout })
}

/// Owns the current spectrum and its normalization history.
pub struct SpectralAnalyzer {
    planner: FftPlanner<f32>,
    settings: SpectrumSettings,
    spectrum: PowerSpectrum,
    normalizer: Normalizer,
}

impl SpectralAnalyzer {
    pub fn new(settings: SpectrumSettings, normalizer: Normalizer) -> Self {
        Self {
            planner: FftPlanner::new(),
            settings,
            spectrum: PowerSpectrum::default(),
            normalizer,
        }
    }

    pub fn settings(&self) -> &SpectrumSettings {
        &self.settings
    }

    /// Replace the stored spectrum with the analysis of `buffer`.
    ///
    /// On error the previous spectrum is left untouched.
    pub fn analyze(
        &mut self,
        buffer: &SampleBuffer,
        apply_weighting: bool,
    ) -> AudioResult<&PowerSpectrum> {
        self.spectrum = estimate_spectrum(&mut self.planner, buffer, &self.settings, apply_weighting)?;
        Ok(&self.spectrum)
    }

    pub fn spectrum(&self) -> &PowerSpectrum {
        &self.spectrum
    }

    /// Install a spectrum computed elsewhere with [`estimate_spectrum`].
    pub fn set_spectrum(&mut self, spectrum: PowerSpectrum) {
        self.spectrum = spectrum;
    }

    /// Rescale the stored spectrum in place; returns the divisor used.
    pub fn normalize(&mut self, mode: NormalizationMode, lookback: usize) -> AudioResult<f32> {
        self.normalizer.normalize(&mut self.spectrum, mode, lookback)
    }

    pub fn reset_normalization(&mut self) {
        self.normalizer.reset();
    }
}

impl Default for SpectralAnalyzer {
    fn default() -> Self {
        Self::new(SpectrumSettings::default(), Normalizer::default())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sine(freq: f32, sample_rate: u32, len: usize, amplitude: f32) -> SampleBuffer {
        let samples = (0..len)
            .map(|i| {
                amplitude
                    * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin()
            })
            .collect();
        SampleBuffer::from_samples(samples, sample_rate)
    }

    fn peak_bin(spectrum: &PowerSpectrum) -> usize {
        spectrum
            .powers
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |best, (i, &p)| if p > best.1 { (i, p) } else { best })
            .0
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let mut analyzer = SpectralAnalyzer::default();
        let spectrum = analyzer.analyze(&sine(1000.0, 8000, 800, 0.5), false).unwrap();
        assert_eq!(spectrum.len(), 401);
        assert_eq!(spectrum.layout.fft_len, 800);
        // 1000 Hz / (8000 / 800) = bin 100 exactly
        assert_eq!(peak_bin(spectrum), 100);
        assert!(spectrum.powers.iter().all(|&p| p >= 0.0));
    }

    #[test]
    fn detrend_removes_dc() {
        let buffer = SampleBuffer::from_samples(vec![0.25; 64], 1000);
        let mut analyzer = SpectralAnalyzer::default();
        let spectrum = analyzer.analyze(&buffer, false).unwrap();
        assert!(spectrum.powers.iter().all(|&p| p.abs() < 1e-9));

        let raw = SpectrumSettings {
            detrend: false,
            ..SpectrumSettings::default()
        };
        let mut analyzer = SpectralAnalyzer::new(raw, Normalizer::default());
        let spectrum = analyzer.analyze(&buffer, false).unwrap();
        assert!(spectrum.powers[0] > 0.0);
        assert!(spectrum.powers[1..].iter().all(|&p| p.abs() < 1e-9));
    }

    #[test]
    fn welch_segments_shrink_the_spectrum() {
        let settings = SpectrumSettings {
            segment_len: Some(256),
            window: WindowFunction::Hann,
            ..SpectrumSettings::default()
        };
        let mut analyzer = SpectralAnalyzer::new(settings, Normalizer::default());
        let spectrum = analyzer.analyze(&sine(1000.0, 8000, 2048, 0.5), false).unwrap();
        assert_eq!(spectrum.len(), 129);
        assert_eq!(spectrum.layout.fft_len, 256);
        assert_eq!(peak_bin(spectrum), 32);
    }

    #[test]
    fn a_weighting_is_unity_near_1khz() {
        let gain = a_weighting_gain(1000.0);
        // Raw gain at 1 kHz is about -2 dB (the standard adds +2 dB).
        assert!((20.0 * gain.log10() + 2.0).abs() < 0.1, "gain={gain}");
        assert!(a_weighting_gain(50.0) < 0.05);
        assert_eq!(a_weighting_gain(0.0), 0.0);
    }

    #[test]
    fn weighting_scales_by_squared_gain() {
        let buffer = sine(2000.0, 8000, 400, 0.5);
        let mut analyzer = SpectralAnalyzer::default();
        let flat = analyzer.analyze(&buffer, false).unwrap().clone();
        let weighted = analyzer.analyze(&buffer, true).unwrap();
        for k in 1..flat.len() {
            let gain = a_weighting_gain(flat.bin_to_freq(k));
            let expected = flat.powers[k] * gain * gain;
            assert!((weighted.powers[k] - expected).abs() <= expected.abs() * 1e-4 + 1e-12);
        }
    }

    #[test]
    fn window_shapes() {
        assert_eq!(WindowFunction::Boxcar.coefficients(4), vec![1.0; 4]);
        let hann = WindowFunction::Hann.coefficients(5);
        assert!(hann[0].abs() < 1e-6 && (hann[2] - 1.0).abs() < 1e-6);
        let hamming = WindowFunction::Hamming.coefficients(5);
        assert!((hamming[0] - 0.08).abs() < 1e-6);
        let blackman = WindowFunction::Blackman.coefficients(5);
        assert!(blackman[0].abs() < 1e-6 && (blackman[2] - 1.0).abs() < 1e-6);
        assert_eq!(WindowFunction::Hann.coefficients(1), vec![1.0]);
    }

    #[test]
    fn empty_buffer_keeps_previous_spectrum() {
        let mut analyzer = SpectralAnalyzer::default();
        analyzer.analyze(&sine(440.0, 8000, 128, 0.5), false).unwrap();
        let before = analyzer.spectrum().clone();

        let err = analyzer
            .analyze(&SampleBuffer::from_samples(Vec::new(), 8000), false)
            .unwrap_err();
        assert!(matches!(err, AudioError::NoData(_)));
        let err = analyzer
            .analyze(&SampleBuffer::from_samples(vec![0.1; 16], 0), false)
            .unwrap_err();
        assert!(matches!(err, AudioError::NoData(_)));
        assert_eq!(analyzer.spectrum(), &before);
    }
}
