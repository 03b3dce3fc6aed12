//! Seekable frame sources feeding the analyzer.
//!
//! A "frame" here is one sample per channel at a single instant, as in the
//! WAV format, not a rendered video frame.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use super::decode::{DecodedAudio, SampleBuffer};
use super::error::{AudioError, AudioResult};

/// A positioned stream of audio frames.
pub trait FrameSource {
    fn sample_rate(&self) -> u32;
    fn total_frames(&self) -> u64;
    fn position(&self) -> u64;
    fn seek_frame(&mut self, frame: u64) -> AudioResult<()>;

    /// Read exactly `count` frames starting at the current position.
    ///
    /// Fails with `OutOfRange` instead of returning a short chunk.
    fn read_frames(&mut self, count: usize) -> AudioResult<SampleBuffer>;

    /// Move to `time` seconds. Negative times clamp to the start.
    fn seek(&mut self, time: f64) -> AudioResult<()> {
        let goto = (time.max(0.0) * self.sample_rate() as f64) as u64;
        if goto > self.total_frames() {
            return Err(AudioError::OutOfRange {
                requested: goto,
                available: self.total_frames(),
            });
        }
        self.seek_frame(goto)
    }

    /// Current playback time in seconds.
    fn tell(&self) -> f64 {
        if self.sample_rate() == 0 {
            return 0.0;
        }
        self.position() as f64 / self.sample_rate() as f64
    }

    fn duration(&self) -> AudioResult<f64> {
        if self.total_frames() == 0 || self.sample_rate() == 0 {
            return Err(AudioError::NoData("stream has no frames or no sample rate"));
        }
        Ok(self.total_frames() as f64 / self.sample_rate() as f64)
    }

    /// Read a chunk lasting `seconds` (e.g. `1/fps`).
    fn read_duration(&mut self, seconds: f64) -> AudioResult<SampleBuffer> {
        let count = (seconds * self.sample_rate() as f64) as usize;
        self.read_frames(count)
    }

    fn check_range(&self, count: usize) -> AudioResult<()> {
        let requested = self.position() + count as u64;
        if requested > self.total_frames() {
            return Err(AudioError::OutOfRange {
                requested,
                available: self.total_frames(),
            });
        }
        Ok(())
    }
}

/// Streaming reader over an 8-bit or 16-bit PCM WAV file.
pub struct WavStream<R> {
    reader: hound::WavReader<R>,
    spec: hound::WavSpec,
    total_frames: u64,
    position: u64,
}

impl<R: Read + Seek> WavStream<R> {
    /// Parse the WAV header and position the stream at the first frame.
    ///
    /// A data chunk declaring more frames than the file holds is cut to the
    /// complete frames actually present.
    pub fn open(mut reader: R) -> AudioResult<Self> {
        let file_len = reader.seek(SeekFrom::End(0))?;
        reader.rewind()?;
        // First parse only locates the start of the sample data.
        let mut inner = hound::WavReader::new(reader).map_err(wav_error)?.into_inner();
        let data_start = inner.stream_position()?;
        inner.rewind()?;

        let reader = hound::WavReader::new(inner).map_err(wav_error)?;
        let spec = reader.spec();
        if let hound::SampleFormat::Float = spec.sample_format {
            return Err(AudioError::UnsupportedFormat(format!(
                "{}-bit float WAV (only 8-bit and 16-bit PCM are supported)",
                spec.bits_per_sample
            )));
        }
        if spec.bits_per_sample != 8 && spec.bits_per_sample != 16 {
            return Err(AudioError::UnsupportedFormat(format!(
                "{}-bit WAV (only 8-bit and 16-bit PCM are supported)",
                spec.bits_per_sample
            )));
        }

        let declared = reader.duration() as u64;
        let frame_bytes = (spec.channels as u64 * spec.bits_per_sample as u64 / 8).max(1);
        let available = file_len.saturating_sub(data_start) / frame_bytes;
        if available < declared {
            log::warn!(
                "WAV header declares {} frames but only {} are present",
                declared,
                available
            );
        }
        let total_frames = declared.min(available);

        log::debug!(
            "WAV: {} ch, {}Hz, {}-bit, {} frames",
            spec.channels,
            spec.sample_rate,
            spec.bits_per_sample,
            total_frames
        );
        Ok(Self {
            reader,
            spec,
            total_frames,
            position: 0,
        })
    }

    pub fn spec(&self) -> hound::WavSpec {
        self.spec
    }

    /// The data ran out mid-read (the file shrank after `open`): the stream
    /// now ends at the current position.
    fn truncate(&mut self, count: usize) -> AudioError {
        log::warn!(
            "WAV data ends at frame {} of {} declared",
            self.position,
            self.total_frames
        );
        self.total_frames = self.position;
        AudioError::OutOfRange {
            requested: self.position + count as u64,
            available: self.position,
        }
    }
}

impl<R: Read + Seek> FrameSource for WavStream<R> {
    fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    fn total_frames(&self) -> u64 {
        self.total_frames
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn seek_frame(&mut self, frame: u64) -> AudioResult<()> {
        if frame > self.total_frames {
            return Err(AudioError::OutOfRange {
                requested: frame,
                available: self.total_frames,
            });
        }
        // total_frames came from a u32 duration
        self.reader.seek(frame as u32)?;
        self.position = frame;
        Ok(())
    }

    fn read_frames(&mut self, count: usize) -> AudioResult<SampleBuffer> {
        self.check_range(count)?;
        let wanted = count * self.spec.channels as usize;
        let read: Result<Vec<i32>, hound::Error> =
            self.reader.samples::<i32>().take(wanted).collect();
        let values = match read {
            Ok(values) if values.len() == wanted => values,
            Ok(_) => return Err(self.truncate(count)),
            Err(hound::Error::IoError(err)) if err.kind() == ErrorKind::UnexpectedEof => {
                return Err(self.truncate(count))
            }
            Err(err) => return Err(wav_error(err)),
        };

        let buffer = SampleBuffer::from_interleaved(
            &values,
            self.spec.bits_per_sample,
            self.spec.channels,
            self.spec.sample_rate,
        )?;
        self.position += count as u64;
        Ok(buffer)
    }
}

/// In-memory source over samples decoded up front.
pub struct DecodedSource {
    audio: DecodedAudio,
    position: u64,
}

impl DecodedSource {
    pub fn new(audio: DecodedAudio) -> Self {
        Self { audio, position: 0 }
    }
}

impl FrameSource for DecodedSource {
    fn sample_rate(&self) -> u32 {
        self.audio.sample_rate
    }

    fn total_frames(&self) -> u64 {
        self.audio.samples.len() as u64
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn seek_frame(&mut self, frame: u64) -> AudioResult<()> {
        if frame > self.total_frames() {
            return Err(AudioError::OutOfRange {
                requested: frame,
                available: self.total_frames(),
            });
        }
        self.position = frame;
        Ok(())
    }

    fn read_frames(&mut self, count: usize) -> AudioResult<SampleBuffer> {
        self.check_range(count)?;
        if count == 0 {
            return Err(AudioError::NoData("zero-length read"));
        }
        let start = self.position as usize;
        let samples = self.audio.samples[start..start + count].to_vec();
        self.position += count as u64;
        Ok(SampleBuffer {
            samples,
            sample_rate: self.audio.sample_rate,
            channels: self.audio.channels,
            bits_per_sample: 32,
        })
    }
}

fn wav_error(err: hound::Error) -> AudioError {
    match err {
        hound::Error::IoError(err) => AudioError::Io(err),
        err @ (hound::Error::Unsupported | hound::Error::TooWide) => {
            AudioError::UnsupportedFormat(err.to_string())
        }
        err => AudioError::InvalidWav(err.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    /// Build a PCM WAV file in memory.
    pub(crate) fn wav_bytes(sample_rate: u32, bits: u16, channels: u16, data: &[u8]) -> Vec<u8> {
        let block_align = channels * ((bits + 7) / 8);
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&bits.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn reads_header_and_frames() {
        let data: Vec<u8> = (0..100u8).collect();
        let mut stream = WavStream::open(Cursor::new(wav_bytes(100, 8, 1, &data))).unwrap();
        assert_eq!(stream.sample_rate(), 100);
        assert_eq!(stream.total_frames(), 100);
        assert!((stream.duration().unwrap() - 1.0).abs() < 1e-9);

        let chunk = stream.read_duration(0.1).unwrap();
        assert_eq!(chunk.len(), 10);
        assert_eq!(chunk.samples[0], -1.0);
        assert_eq!(stream.position(), 10);
        assert!((stream.tell() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn skips_unknown_chunks() {
        let mut bytes = wav_bytes(8000, 8, 1, &[128; 8]);
        // Insert a LIST chunk between "fmt " and "data".
        let list = [b'L', b'I', b'S', b'T', 4, 0, 0, 0, 1, 2, 3, 4];
        bytes.splice(36..36, list.iter().copied());
        let mut stream = WavStream::open(Cursor::new(bytes)).unwrap();
        assert_eq!(stream.total_frames(), 8);
        let chunk = stream.read_frames(8).unwrap();
        assert!(chunk.samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn seek_repositions_reads() {
        let data: Vec<u8> = (0..=255u8).collect();
        let mut stream = WavStream::open(Cursor::new(wav_bytes(256, 8, 1, &data))).unwrap();
        stream.seek(0.5).unwrap();
        assert_eq!(stream.position(), 128);
        let chunk = stream.read_frames(1).unwrap();
        assert_eq!(chunk.samples[0], 0.0);

        stream.seek(-3.0).unwrap();
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn reading_past_end_is_out_of_range() {
        let mut stream = WavStream::open(Cursor::new(wav_bytes(8000, 16, 2, &[0; 40]))).unwrap();
        assert_eq!(stream.total_frames(), 10);
        stream.seek_frame(8).unwrap();
        let err = stream.read_frames(3).unwrap_err();
        assert!(matches!(err, AudioError::OutOfRange { requested: 11, available: 10 }));
        // A failed read leaves the position untouched.
        assert_eq!(stream.position(), 8);
        assert!(matches!(stream.seek(2.0), Err(AudioError::OutOfRange { .. })));
    }

    #[test]
    fn rejects_32bit_wav() {
        let result = WavStream::open(Cursor::new(wav_bytes(44100, 32, 1, &[0; 16])));
        assert!(matches!(result, Err(AudioError::UnsupportedFormat(_))));
    }

    #[test]
    fn rejects_non_riff_input() {
        let result = WavStream::open(Cursor::new(b"OggS0000WAVE".to_vec()));
        assert!(matches!(result, Err(AudioError::InvalidWav(_))));
    }

    #[test]
    fn truncated_data_ends_stream() {
        let mut bytes = wav_bytes(100, 8, 1, &[128; 50]);
        // The data chunk still declares 50 frames.
        bytes.truncate(bytes.len() - 20);
        let mut stream = WavStream::open(Cursor::new(bytes)).unwrap();
        assert_eq!(stream.total_frames(), 30);
        assert_eq!(stream.read_frames(20).unwrap().len(), 20);

        let err = stream.read_frames(20).unwrap_err();
        assert!(matches!(err, AudioError::OutOfRange { requested: 40, available: 30 }));
        assert_eq!(stream.position(), 20);

        stream.seek_frame(25).unwrap();
        assert_eq!(stream.read_frames(5).unwrap().samples, vec![0.0; 5]);
    }

    #[test]
    fn partial_trailing_frame_is_dropped() {
        // 16-bit stereo: 3 whole frames plus half of a fourth.
        let mut bytes = wav_bytes(8000, 16, 2, &[0; 16]);
        bytes.truncate(bytes.len() - 2);
        let stream = WavStream::open(Cursor::new(bytes)).unwrap();
        assert_eq!(stream.total_frames(), 3);
    }

    #[test]
    fn stereo_keeps_left_channel() {
        let mut data = Vec::new();
        for (left, right) in [(i16::MIN, 0i16), (0, i16::MAX), (16384, i16::MIN)] {
            data.extend_from_slice(&left.to_le_bytes());
            data.extend_from_slice(&right.to_le_bytes());
        }
        let mut stream = WavStream::open(Cursor::new(wav_bytes(8000, 16, 2, &data))).unwrap();
        assert_eq!(stream.spec().channels, 2);
        let chunk = stream.read_frames(3).unwrap();
        assert_eq!(chunk.samples, vec![-1.0, 0.0, 0.5]);
        assert_eq!(chunk.bits_per_sample, 16);
    }

    #[test]
    fn decoded_source_slices_samples() {
        let audio = DecodedAudio {
            samples: (0..10).map(|i| i as f32 / 10.0).collect(),
            sample_rate: 10,
            channels: 2,
        };
        let mut source = DecodedSource::new(audio);
        source.seek(0.5).unwrap();
        let chunk = source.read_frames(3).unwrap();
        assert_eq!(chunk.samples, vec![0.5, 0.6, 0.7]);
        assert!(source.read_frames(3).is_err());
    }

    #[test]
    fn empty_stream_has_no_duration() {
        let stream = WavStream::open(Cursor::new(wav_bytes(8000, 8, 1, &[]))).unwrap();
        assert!(matches!(stream.duration(), Err(AudioError::NoData(_))));
    }
}
