use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer as SymphoniaBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::error::{AudioError, AudioResult};

/// One analysis window of mono samples in [-1.0, 1.0].
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Channel count of the source the samples were taken from.
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl SampleBuffer {
    /// Decode interleaved PCM bytes, keeping only the first channel.
    ///
    /// `sample_width` is in bytes: 1 = unsigned 8-bit, 2 = signed 16-bit
    /// little-endian. A trailing partial frame is ignored.
    pub fn from_pcm(
        raw: &[u8],
        sample_width: usize,
        channels: u16,
        sample_rate: u32,
    ) -> AudioResult<Self> {
        let (min, max) = sample_range(sample_width)?;
        if channels == 0 {
            return Err(AudioError::UnsupportedFormat("zero channels".into()));
        }

        let stride = sample_width * channels as usize;
        let samples: Vec<f32> = raw
            .chunks(stride)
            .filter(|frame| frame.len() >= sample_width)
            .map(|frame| {
                let raw_value = if sample_width == 1 {
                    frame[0] as f32
                } else {
                    i16::from_le_bytes([frame[0], frame[1]]) as f32
                };
                rescale(raw_value, min, max)
            })
            .collect();

        if samples.is_empty() {
            return Err(AudioError::NoData("empty PCM chunk"));
        }

        Ok(Self {
            samples,
            sample_rate,
            channels,
            bits_per_sample: (sample_width * 8) as u16,
        })
    }

    /// Interleaved integer samples as read by `hound`, keeping the first
    /// channel. Unsigned 8-bit data arrives shifted down by 128.
    pub fn from_interleaved(
        values: &[i32],
        bits_per_sample: u16,
        channels: u16,
        sample_rate: u32,
    ) -> AudioResult<Self> {
        let sample_width = (bits_per_sample as usize + 7) / 8;
        let (min, max) = sample_range(sample_width)?;
        if channels == 0 {
            return Err(AudioError::UnsupportedFormat("zero channels".into()));
        }
        let offset = if sample_width == 1 { 128.0 } else { 0.0 };

        let samples: Vec<f32> = values
            .iter()
            .step_by(channels as usize)
            .map(|&v| rescale(v as f32 + offset, min, max))
            .collect();

        if samples.is_empty() {
            return Err(AudioError::NoData("empty PCM chunk"));
        }

        Ok(Self {
            samples,
            sample_rate,
            channels,
            bits_per_sample: (sample_width * 8) as u16,
        })
    }

    /// Wrap already-decoded mono samples.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            channels: 1,
            bits_per_sample: 32,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Raw value range for a sample width in bytes: unsigned 8-bit or signed 16-bit.
fn sample_range(sample_width: usize) -> AudioResult<(f32, f32)> {
    match sample_width {
        1 => Ok((0.0, 256.0)),
        2 => Ok((-32768.0, 32768.0)),
        other => Err(AudioError::UnsupportedFormat(format!(
            "sample width of {} bytes (only 8-bit and 16-bit PCM are supported)",
            other
        ))),
    }
}

fn rescale(value: f32, min: f32, max: f32) -> f32 {
    2.0 * ((value - min) / (max - min)) - 1.0
}

/// A whole file decoded up front (non-WAV inputs).
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Decode any symphonia-supported file, keeping the first channel only.
pub fn decode_audio(path: &Path) -> Result<DecodedAudio> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Failed to probe audio format")?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .context("No audio tracks found")?;

    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count());
    let sample_rate = track.codec_params.sample_rate.context("Unknown sample rate")?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    let mut first_channel: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(err)) => {
                log::warn!("Skipping undecodable packet: {}", err);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = SymphoniaBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        // Later channels are dropped, not mixed.
        first_channel.extend(sample_buf.samples().iter().step_by(channels.max(1)).copied());
    }

    log::info!(
        "Decoded audio: {} frames, {}Hz, {} channel(s), {:.1}s",
        first_channel.len(),
        sample_rate,
        channels,
        first_channel.len() as f32 / sample_rate as f32
    );

    Ok(DecodedAudio {
        samples: first_channel,
        sample_rate,
        channels: channels as u16,
    })
}
