pub mod aggregate;
pub mod analysis;
pub mod bins;
pub mod decode;
pub mod error;
pub mod features;
pub mod normalize;
pub mod source;
pub mod spectrum;

pub use decode::SampleBuffer;
pub use error::{AudioError, AudioResult};
pub use normalize::{NormalizationMode, Normalizer};
pub use source::{FrameSource, WavStream};
pub use spectrum::{PowerSpectrum, SpectralAnalyzer, SpectrumSettings, WindowFunction};
