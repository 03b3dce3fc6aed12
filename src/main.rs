mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use cli::{Cli, NormalizeArg};
use pulsar::audio::analysis;
use pulsar::audio::decode::decode_audio;
use pulsar::audio::source::{DecodedSource, FrameSource, WavStream};
use pulsar::audio::{AudioError, NormalizationMode};
use pulsar::config::{self, Config};
use pulsar::encode::jsonl::FrameWriter;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect pulsar.toml / global config
    let config_path = cli.config.clone().or_else(config::find_config);
    let mut cfg = match config_path {
        Some(ref path) => match config::load_config(path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };
    apply_overrides(&cli, &mut cfg);

    let input = cli.input.as_ref().context("Input audio file is required")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    log::info!("pulsar - spectral analysis for audio visualizers");
    log::info!("Input: {}", input.display());
    log::info!("Output: {}", cli.output.display());
    log::info!(
        "{}fps, A-weighting {}, window {:?}, {} bands {:.0}-{:.0}Hz",
        cfg.output.fps,
        if cfg.analysis.weighting { "on" } else { "off" },
        cfg.analysis.spectrum.window,
        cfg.bands.count,
        cfg.bands.min_freq,
        cfg.bands.max_freq
    );

    // 1. Open audio
    let mut source = open_source(input)?;

    // 2. Analyze (3-pass pipeline)
    log::info!("Analyzing audio...");
    let (summary, reports) = analysis::analyze(source.as_mut(), &cfg)
        .with_context(|| format!("Failed to analyze {}", input.display()))?;

    // 3. Write frames
    let mut writer = FrameWriter::new(&cli.output)?;
    let pb = ProgressBar::new(reports.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );
    for report in &reports {
        writer.write_frame(report)?;
        pb.inc(1);
    }
    pb.finish_with_message("Analysis complete");
    writer.finish()?;

    if cli.summary {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    log::info!("Done! {} frames, {:.1}s", summary.frames, summary.duration);
    Ok(())
}

/// CLI values take precedence over the config file.
fn apply_overrides(cli: &Cli, cfg: &mut Config) {
    if let Some(fps) = cli.fps {
        cfg.output.fps = fps;
    }
    if cli.no_weighting {
        cfg.analysis.weighting = false;
    }
    match cli.normalize {
        Some(NormalizeArg::None) => cfg.normalization.enabled = false,
        Some(NormalizeArg::Peak) => {
            cfg.normalization.enabled = true;
            cfg.normalization.mode = NormalizationMode::Peak;
        }
        Some(NormalizeArg::Average) => {
            cfg.normalization.enabled = true;
            cfg.normalization.mode = NormalizationMode::Average;
        }
        None => {}
    }
    if let Some(lookback) = cli.lookback {
        cfg.normalization.lookback = lookback;
    }
    if let Some(window) = cli.window {
        cfg.analysis.spectrum.window = window;
    }
    if cli.segment.is_some() {
        cfg.analysis.spectrum.segment_len = cli.segment;
    }
    if let Some(count) = cli.bands {
        cfg.bands.count = count;
    }
    if let Some(min) = cli.band_min {
        cfg.bands.min_freq = min;
    }
    if let Some(max) = cli.band_max {
        cfg.bands.max_freq = max;
    }
    if let Some(spacing) = cli.spacing {
        cfg.bands.spacing = spacing;
    }
}

/// WAV files are streamed bit-exactly; anything else (or a WAV sample format
/// the streaming reader rejects) is decoded up front with symphonia.
fn open_source(path: &Path) -> Result<Box<dyn FrameSource>> {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("wav"));

    if is_wav {
        let file = File::open(path)
            .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
        match WavStream::open(BufReader::new(file)) {
            Ok(stream) => {
                let spec = stream.spec();
                log::info!(
                    "WAV: {}Hz, {}-bit, {} channel(s), {:.1}s",
                    spec.sample_rate,
                    spec.bits_per_sample,
                    spec.channels,
                    stream.duration().unwrap_or(0.0)
                );
                return Ok(Box::new(stream));
            }
            Err(AudioError::UnsupportedFormat(reason)) => {
                log::warn!("Streaming reader rejected {}: {}", path.display(), reason);
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to read WAV: {}", path.display()))
            }
        }
    }

    log::info!("Decoding audio...");
    let audio = decode_audio(path)?;
    Ok(Box::new(DecodedSource::new(audio)))
}
