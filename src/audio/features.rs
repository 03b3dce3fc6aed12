use serde::Serialize;

/// Power of one frequency band in a frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BandLevel {
    pub lo: f32,
    pub hi: f32,
    /// Aggregated (normalized) power.
    pub power: f32,
    /// `power` after the configured logarithmic display scale.
    pub level: f32,
}

/// Everything a visualizer needs to draw one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameReport {
    pub frame: usize,
    /// Time in seconds
    pub time: f32,
    pub bands: Vec<BandLevel>,
    /// Mean power over the whole spectrum, DC excluded
    pub average: f32,
    pub dominant_freq: Option<f32>,
    pub dominant_power: Option<f32>,
    /// Loudest bin before normalization
    pub peak_power: f32,
    /// Divisor applied by normalization (1.0 when disabled or silent)
    pub ceiling: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub sample_rate: u32,
    pub fps: u32,
    pub frames: usize,
    pub duration: f32,
    /// Spectrum bins per frame
    pub bins: usize,
    pub loudest_frame: Option<usize>,
    /// Dominant frequency of the loudest frame
    pub loudest_dominant_freq: Option<f32>,
}
