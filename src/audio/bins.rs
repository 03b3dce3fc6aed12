//! Frequency ↔ bin mapping and frequency range partitions.

/// Geometry of a one-sided spectrum: the `(sample_rate, fft_len)` snapshot
/// taken at analysis time plus the resulting number of bins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BinLayout {
    pub sample_rate: u32,
    pub fft_len: usize,
    pub bins: usize,
}

impl BinLayout {
    pub fn new(sample_rate: u32, fft_len: usize) -> Self {
        Self {
            sample_rate,
            fft_len,
            bins: if fft_len == 0 { 0 } else { fft_len / 2 + 1 },
        }
    }

    /// Bin holding `freq`, or `None` when the frequency is negative,
    /// non-finite or beyond the last bin.
    pub fn freq_to_bin(&self, freq: f32) -> Option<usize> {
        if !freq.is_finite() || freq < 0.0 || self.sample_rate == 0 {
            return None;
        }
        let pos = freq as f64 / self.sample_rate as f64 * self.fft_len as f64;
        // A bin edge from `bin_to_freq` may land one f32 ulp short of the
        // integer; only that much is snapped up.
        let bin = if pos.ceil() - pos <= pos * f32::EPSILON as f64 {
            pos.ceil()
        } else {
            pos.floor()
        } as usize;
        (bin < self.bins).then_some(bin)
    }

    pub fn bin_to_freq(&self, bin: usize) -> f32 {
        if self.fft_len == 0 {
            return 0.0;
        }
        (bin as f64 * self.sample_rate as f64 / self.fft_len as f64) as f32
    }

    /// Width of one bin in Hz.
    pub fn resolution(&self) -> f32 {
        self.bin_to_freq(1)
    }
}

/// `count` equal-width ranges spanning `[start, stop)`.
pub fn linear_bins(start: f32, stop: f32, count: usize) -> Vec<(f32, f32)> {
    if count == 0 {
        return Vec::new();
    }
    let inc = (stop - start) / count as f32;
    (0..count)
        .map(|i| (i as f32 * inc + start, (i + 1) as f32 * inc + start))
        .collect()
}

/// Geometrically spaced ranges from `start` to `stop`.
///
/// Edge `i` sits at `base^(i·factor) + start` with
/// `factor = log_base(stop - start) / count`; each lower edge is shifted down
/// by one so the first range begins exactly at `start`. Base 2 matches octave
/// spacing. Requires `stop - start > 1` for increasing edges.
pub fn logarithmic_bins(start: f32, stop: f32, count: usize, base: f32) -> Vec<(f32, f32)> {
    if count == 0 {
        return Vec::new();
    }
    let base = base as f64;
    let start = start as f64;
    let factor = (stop as f64 - start).ln() / base.ln() / count as f64;
    (0..count)
        .map(|i| {
            let lo = base.powf(i as f64 * factor) + start - 1.0;
            let hi = base.powf((i + 1) as f64 * factor) + start;
            (lo as f32, hi as f32)
        })
        .collect()
}

/// `base_freq` raised by `octave` octaves.
pub fn octave_to_freq(base_freq: f32, octave: f32) -> f32 {
    base_freq * 2f32.powf(octave)
}

pub fn power_to_db(power: f32) -> f32 {
    10.0 * power.log10()
}
