use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use pulsar::audio::spectrum::WindowFunction;
use pulsar::config::BandSpacing;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum NormalizeArg {
    None,
    Peak,
    Average,
}

/// Options left unset fall back to the config file, then to built-in defaults.
#[derive(Parser, Debug)]
#[command(name = "pulsar", about = "Frame-by-frame spectral analysis for audio visualizers")]
pub struct Cli {
    /// Input audio file (8/16-bit PCM WAV; other formats are decoded with symphonia)
    pub input: Option<PathBuf>,

    /// Output JSON Lines file, one object per frame ("-" for stdout)
    #[arg(short, long, default_value = "frames.jsonl")]
    pub output: PathBuf,

    /// Config file (default: ./pulsar.toml or ~/.config/pulsar/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Frames per second
    #[arg(long)]
    pub fps: Option<u32>,

    /// Disable A-weighting
    #[arg(long)]
    pub no_weighting: bool,

    /// Normalization mode
    #[arg(long, value_enum)]
    pub normalize: Option<NormalizeArg>,

    /// Number of past frames considered by normalization
    #[arg(long)]
    pub lookback: Option<usize>,

    /// Analysis window function
    #[arg(long, value_enum)]
    pub window: Option<WindowFunction>,

    /// Welch segment length in samples (default: whole frame)
    #[arg(long)]
    pub segment: Option<usize>,

    /// Number of frequency bands per frame
    #[arg(long)]
    pub bands: Option<usize>,

    /// Lowest band frequency in Hz
    #[arg(long)]
    pub band_min: Option<f32>,

    /// Highest band frequency in Hz
    #[arg(long)]
    pub band_max: Option<f32>,

    /// Band spacing
    #[arg(long, value_enum)]
    pub spacing: Option<BandSpacing>,

    /// Print the analysis summary as JSON when done
    #[arg(long)]
    pub summary: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_override_flags() {
        let cli = Cli::try_parse_from([
            "pulsar", "song.wav", "-o", "-", "--no-weighting", "--normalize", "average",
            "--spacing", "linear", "--window", "hann", "--segment", "512", "--summary",
        ])
        .unwrap();
        assert_eq!(cli.input, Some(PathBuf::from("song.wav")));
        assert_eq!(cli.output, PathBuf::from("-"));
        assert!(cli.no_weighting);
        assert_eq!(cli.normalize, Some(NormalizeArg::Average));
        assert_eq!(cli.spacing, Some(BandSpacing::Linear));
        assert_eq!(cli.window, Some(WindowFunction::Hann));
        assert_eq!(cli.segment, Some(512));
        assert!(cli.summary);
    }

    #[test]
    fn defaults_leave_config_alone() {
        let cli = Cli::try_parse_from(["pulsar", "song.wav"]).unwrap();
        assert!(!cli.no_weighting);
        assert_eq!(cli.normalize, None);
        assert_eq!(cli.spacing, None);
        assert_eq!(cli.output, PathBuf::from("frames.jsonl"));
        assert!(Cli::try_parse_from(["pulsar", "song.wav", "--linear-bands"]).is_err());
    }
}
