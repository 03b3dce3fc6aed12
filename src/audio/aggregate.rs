//! Range and bin queries over a [`PowerSpectrum`].
//!
//! Frequencies are `Option<f32>`: `None` means "unspecified" and falls back to
//! the default bound of each query. A given frequency that maps outside the
//! spectrum falls back the same way. Empty or inverted ranges yield neutral
//! results instead of errors.

use super::spectrum::PowerSpectrum;

impl PowerSpectrum {
    /// Power of the bin holding `freq`.
    pub fn power_at(&self, freq: Option<f32>) -> Option<f32> {
        freq.and_then(|f| self.freq_to_bin(f)).map(|bin| self.powers[bin])
    }

    /// Sum (or mean) of the bins in `[bin(min), bin(max))`.
    ///
    /// The lower bound defaults to bin 1 so the DC component is left out; the
    /// upper bound defaults to the last bin (exclusive).
    pub fn range_power(&self, min_freq: Option<f32>, max_freq: Option<f32>, average: bool) -> f32 {
        let (lo, hi) = self.resolve_range(min_freq, max_freq, 1);
        if hi <= lo {
            return 0.0;
        }
        let total: f32 = self.powers[lo..hi].iter().sum();
        if average {
            total / (hi - lo) as f32
        } else {
            total
        }
    }

    /// `(frequency, power)` for every bin in `[bin(min), bin(max))`, starting
    /// at DC when `min_freq` is unspecified. With `sort`, ordered by ascending
    /// power (stable).
    pub fn list_powers(
        &self,
        min_freq: Option<f32>,
        max_freq: Option<f32>,
        sort: bool,
    ) -> Vec<(f32, f32)> {
        let (lo, hi) = self.resolve_range(min_freq, max_freq, 0);
        if hi <= lo {
            return Vec::new();
        }
        let mut out: Vec<(f32, f32)> = (lo..hi)
            .map(|bin| (self.bin_to_freq(bin), self.powers[bin]))
            .collect();
        if sort {
            out.sort_by(|a, b| a.1.total_cmp(&b.1));
        }
        out
    }

    /// [`range_power`](Self::range_power) for each `(lo, hi)` range.
    pub fn list_bin_powers(
        &self,
        bins: &[(f32, f32)],
        average: bool,
        sort: bool,
    ) -> Vec<((f32, f32), f32)> {
        let mut out: Vec<((f32, f32), f32)> = bins
            .iter()
            .map(|&(lo, hi)| ((lo, hi), self.range_power(Some(lo), Some(hi), average)))
            .collect();
        if sort {
            out.sort_by(|a, b| a.1.total_cmp(&b.1));
        }
        out
    }

    /// Loudest `(frequency, power)` in range. Ties go to the highest frequency.
    pub fn dominant_frequency(
        &self,
        min_freq: Option<f32>,
        max_freq: Option<f32>,
    ) -> Option<(f32, f32)> {
        self.list_powers(min_freq, max_freq, false)
            .into_iter()
            .fold(None, |best: Option<(f32, f32)>, entry| match best {
                Some(b) if b.1 > entry.1 => Some(b),
                _ => Some(entry),
            })
    }

    fn resolve_range(
        &self,
        min_freq: Option<f32>,
        max_freq: Option<f32>,
        default_min: usize,
    ) -> (usize, usize) {
        let lo = min_freq
            .and_then(|f| self.freq_to_bin(f))
            .unwrap_or(default_min);
        let hi = max_freq
            .and_then(|f| self.freq_to_bin(f))
            .unwrap_or(self.len().saturating_sub(1));
        (lo, hi)
    }
}
