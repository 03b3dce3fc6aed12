use serde::Deserialize;
use std::collections::VecDeque;

use super::error::{AudioError, AudioResult};
use super::spectrum::PowerSpectrum;

pub const DEFAULT_HISTORY_CAP: usize = 1 << 24;
/// About five seconds of history at 25 frames per second.
pub const DEFAULT_LOOKBACK: usize = 125;

/// Reference value recorded for each normalized frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationMode {
    /// Loudest bin ends up at (at most) 1.0.
    #[default]
    Peak,
    /// Mean bin power ends up at (at most) 1.0.
    Average,
}

/// Rolling normalization against recent loudness.
///
/// Each call records the frame's reference power, then divides the spectrum
/// by a weighted maximum of the last `lookback` references. Weights ramp
/// linearly from `1/lookback` for the oldest considered entry to `1.0` for
/// the newest, so old peaks fade out instead of dropping off a cliff.
#[derive(Clone, Debug)]
pub struct Normalizer {
    history: VecDeque<f32>,
    capacity: usize,
}

impl Normalizer {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn history(&self) -> &VecDeque<f32> {
        &self.history
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Normalize `spectrum` in place and return the divisor.
    ///
    /// A zero (silent) or non-finite ceiling leaves the spectrum unchanged and
    /// returns 1.0.
    pub fn normalize(
        &mut self,
        spectrum: &mut PowerSpectrum,
        mode: NormalizationMode,
        lookback: usize,
    ) -> AudioResult<f32> {
        if spectrum.is_empty() {
            return Err(AudioError::NoData("cannot normalize an empty spectrum"));
        }

        let reference = match mode {
            NormalizationMode::Peak => spectrum.powers.iter().copied().fold(0.0f32, f32::max),
            NormalizationMode::Average => {
                spectrum.powers.iter().sum::<f32>() / spectrum.len() as f32
            }
        };
        self.push(reference);

        let ceiling = self.weighted_max(lookback);
        if !ceiling.is_finite() || ceiling <= 0.0 {
            log::trace!("Normalization skipped (ceiling={})", ceiling);
            return Ok(1.0);
        }

        let factor = 1.0 / ceiling;
        for power in spectrum.powers.iter_mut() {
            *power *= factor;
        }
        Ok(ceiling)
    }

    fn push(&mut self, reference: f32) {
        self.history.push_back(reference);
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
    }

    /// Maximum of the newest `lookback` entries after linear weighting.
    fn weighted_max(&self, lookback: usize) -> f32 {
        let lookback = lookback.max(1);
        let count = self.history.len().min(lookback);
        if count == 0 {
            return 0.0;
        }
        let first = 1.0 / lookback as f32;
        let step = if count > 1 {
            (1.0 - first) / (count - 1) as f32
        } else {
            0.0
        };
        self.history
            .iter()
            .skip(self.history.len() - count)
            .enumerate()
            .map(|(i, &power)| {
                // A lone entry is the newest one and gets full weight.
                let weight = if count == 1 { 1.0 } else { first + step * i as f32 };
                power * weight
            })
            .fold(0.0f32, f32::max)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}
