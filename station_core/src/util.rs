//! Small numeric helpers shared by the filters.

/// Index range `[lo, hi)` of the window of up to `size` elements centered on
/// `i`, clamped to `[0, len)`. The window shrinks at the edges; it never wraps
/// or pads.
#[inline]
pub fn centered_window(i: usize, size: usize, len: usize) -> (usize, usize) {
    let half = size.max(1) / 2;
    let lo = i.saturating_sub(half);
    let hi = i.saturating_add(half).saturating_add(1).min(len);
    (lo, hi)
}

/// Arithmetic mean and sample (n - 1) standard deviation.
///
/// Returns `None` for an empty slice. For a single value the standard
/// deviation is `NaN`, which callers treat as zero variance.
pub fn mean_and_sample_stddev(values: impl Iterator<Item = f64> + Clone) -> Option<(f64, f64)> {
    let mut n = 0usize;
    let mut sum = 0.0f64;
    for v in values.clone() {
        n += 1;
        sum += v;
    }
    if n == 0 {
        return None;
    }
    let mean = sum / n as f64;
    if n == 1 {
        return Some((mean, f64::NAN));
    }
    let ss: f64 = values.map(|v| (v - mean) * (v - mean)).sum();
    Some((mean, (ss / (n - 1) as f64).sqrt()))
}

/// Absolute rounding slack for values around `scale`.
#[inline]
pub fn tolerance(scale: f64) -> f64 {
    1e-9 * scale.abs().max(1.0)
}

/// Equality tolerance used when a window has no spread.
#[inline]
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= tolerance(a.abs().max(b.abs()))
}
