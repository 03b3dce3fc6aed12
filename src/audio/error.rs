use thiserror::Error;

/// Errors raised while decoding or analyzing audio.
///
/// Every variant aborts the current frame; the caller decides whether to skip
/// the frame or stop.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("requested frames {requested} beyond end of data ({available} frames)")]
    OutOfRange { requested: u64, available: u64 },

    #[error("no data available: {0}")]
    NoData(&'static str),

    #[error("invalid WAV stream: {0}")]
    InvalidWav(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AudioResult<T> = Result<T, AudioError>;
