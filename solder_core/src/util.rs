//! Small numeric and time helpers shared across solder_core.

use std::time::{SystemTime, UNIX_EPOCH};

/// Round `x` to `decimals` decimal places (ties away from zero).
#[inline]
pub fn round_to(x: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (x * scale).round() / scale
}

/// True when `x` is a finite, strictly positive number.
#[inline]
pub fn is_positive(x: f64) -> bool {
    x.is_finite() && x > 0.0
}

/// Wall-clock milliseconds since the Unix epoch, used for command timestamps.
/// Returns 0 if the system clock is before 1970.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
