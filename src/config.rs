use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::audio::normalize::{NormalizationMode, DEFAULT_HISTORY_CAP, DEFAULT_LOOKBACK};
use crate::audio::spectrum::SpectrumSettings;
use crate::scale::LogScale;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub normalization: NormalizationConfig,
    #[serde(default)]
    pub bands: BandConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_weighting")]
    pub weighting: bool,
    #[serde(default)]
    pub spectrum: SpectrumSettings,
    /// Range searched for each frame's dominant frequency.
    #[serde(default = "default_dominant_range")]
    pub dominant_range: (f32, f32),
}

#[derive(Debug, Clone, Deserialize)]
pub struct NormalizationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub mode: NormalizationMode,
    #[serde(default = "default_lookback")]
    pub lookback: usize,
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BandSpacing {
    Linear,
    #[default]
    Logarithmic,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BandConfig {
    #[serde(default = "default_band_min")]
    pub min_freq: f32,
    #[serde(default = "default_band_max")]
    pub max_freq: f32,
    #[serde(default = "default_band_count")]
    pub count: usize,
    #[serde(default = "default_band_base")]
    pub base: f32,
    #[serde(default)]
    pub spacing: BandSpacing,
    /// Average bin power per band instead of summing.
    #[serde(default = "default_true")]
    pub average: bool,
    /// Maps band power onto display levels.
    #[serde(default = "default_band_scale")]
    pub scale: LogScale,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { fps: default_fps() }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            weighting: default_weighting(),
            spectrum: SpectrumSettings::default(),
            dominant_range: default_dominant_range(),
        }
    }
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: NormalizationMode::default(),
            lookback: default_lookback(),
            history_cap: default_history_cap(),
        }
    }
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            min_freq: default_band_min(),
            max_freq: default_band_max(),
            count: default_band_count(),
            base: default_band_base(),
            spacing: BandSpacing::default(),
            average: true,
            scale: default_band_scale(),
        }
    }
}

fn default_fps() -> u32 { 30 }
fn default_weighting() -> bool { true }
fn default_true() -> bool { true }
fn default_dominant_range() -> (f32, f32) { (20.0, 20000.0) }
fn default_lookback() -> usize { DEFAULT_LOOKBACK }
fn default_history_cap() -> usize { DEFAULT_HISTORY_CAP }
fn default_band_min() -> f32 { 200.0 }
fn default_band_max() -> f32 { 20000.0 }
fn default_band_count() -> usize { 20 }
fn default_band_base() -> f32 { 2.0 }
fn default_band_scale() -> LogScale {
    LogScale {
        log_window: (0.1, 10.0),
        ..LogScale::default()
    }
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

/// `pulsar.toml` in the working directory, then the per-user config.
pub fn find_config() -> Option<PathBuf> {
    let local = PathBuf::from("pulsar.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("pulsar").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("pulsar").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
