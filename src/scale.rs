//! Value mapping curves.
//!
//! The curve functions take `x` in [0, 1] and map it onto `[y1, y2]`. None of
//! them fail: keeping arguments inside each function's domain is up to the
//! caller.

/// Straight line from `y1` to `y2`.
pub fn linear(x: f32, y1: f32, y2: f32) -> f32 {
    (y2 - y1) * x + y1
}

/// Exponential curve through `(0, y1)` and `(1, y2)`. Requires `base != 1`.
pub fn exponential(x: f32, y1: f32, y2: f32, base: f32) -> f32 {
    (y2 - y1) / (base - 1.0) * (base.powf(x) - 1.0) + y1
}

/// Logarithmic curve through `(0, y1)` and `(1, y2)`.
///
/// Requires `(base - 1) * x + 1 > 0` and `base != 1`.
pub fn logarithmic(x: f32, y1: f32, y2: f32, base: f32) -> f32 {
    (y2 - y1) * ((base - 1.0) * x + 1.0).log(base) + y1
}

pub fn power(x: f32, y1: f32, y2: f32, exponent: f32) -> f32 {
    (y2 - y1) * x.powf(exponent) + y1
}

/// Affine remap of `val` from `[in_min, in_max]` onto `[out_min, out_max]`.
/// Requires `in_max != in_min`.
pub fn linear_scale(val: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    (val - in_min) / (in_max - in_min) * (out_max - out_min) + out_min
}

/// Compress `val` along a logarithm.
///
/// `val` is first placed within `in_range`, then evaluated on `log_base`
/// between the x positions `log_window = (log_min, log_max)`, and the result
/// is stretched over `out_range`. Without an `out_range` the log window itself
/// is used. Requires `log_min > 0` and a non-empty `in_range`.
pub fn logarithmic_scale(
    val: f32,
    in_range: (f32, f32),
    out_range: Option<(f32, f32)>,
    base: f32,
    log_window: (f32, f32),
) -> f32 {
    let (log_min, log_max) = log_window;
    let (out_min, out_max) = out_range.unwrap_or(log_window);
    let position = (val - in_range.0) / (in_range.1 - in_range.0);
    linear_scale(
        ((log_max - log_min) * position + log_min).log(base),
        log_min.log(base),
        log_max.log(base),
        out_min,
        out_max,
    )
}

/// Reusable parameters for [`logarithmic_scale`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LogScale {
    pub in_range: (f32, f32),
    pub out_range: Option<(f32, f32)>,
    pub base: f32,
    pub log_window: (f32, f32),
}

impl LogScale {
    pub fn apply(&self, val: f32) -> f32 {
        logarithmic_scale(val, self.in_range, self.out_range, self.base, self.log_window)
    }
}

impl Default for LogScale {
    fn default() -> Self {
        Self {
            in_range: (0.0, 1.0),
            out_range: Some((0.0, 1.0)),
            base: 10.0,
            log_window: (1.0, 2.0),
        }
    }
}
