//! Trapezoidal move timing.
//!
//! ```text
//!   v ▲    ____________            d ≥ v²/a : t = d/v + v/a
//!     │   /            \           d < v²/a : t = 2·√(d/a)   (triangle)
//!     │  /              \
//!     └─────────────────────► t
//! ```
//!
//! Scaling speed by `k` and acceleration by `k²` stretches a profile to
//! `t / k` without changing its shape (the cruise/ramp split is kept).

use slider_common::hal::driver::MotionLimits;

/// Slack for float noise when converting seconds to whole milliseconds.
const MS_ROUNDING_SLACK: f64 = 1e-6;

/// Minimum traversal time of `distance` steps from rest to rest [s].
///
/// Returns 0 for zero distance or non-positive limits.
pub fn min_move_time(distance: f64, limits: MotionLimits) -> f64 {
    let d = distance.abs();
    let MotionLimits { max_speed: v, max_accel: a } = limits;
    if d == 0.0 || !(v > 0.0) || !(a > 0.0) {
        return 0.0;
    }
    if d >= v * v / a {
        d / v + v / a
    } else {
        2.0 * (d / a).sqrt()
    }
}

/// Seconds rounded up to whole milliseconds, saturating at `u32::MAX`.
#[inline]
pub fn ceil_ms(seconds: f64) -> u32 {
    let ms = (seconds * 1000.0 - MS_ROUNDING_SLACK).ceil();
    if ms <= 0.0 {
        0
    } else if ms >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        ms as u32
    }
}

/// Limits that stretch a move of natural duration `min_time` to `target_time`.
///
/// Never speeds a move up: with `target_time <= min_time` the limits are
/// returned unchanged.
pub fn derate(limits: MotionLimits, min_time: f64, target_time: f64) -> MotionLimits {
    if min_time <= 0.0 || target_time <= min_time {
        return limits;
    }
    let k = min_time / target_time;
    MotionLimits {
        max_speed: limits.max_speed * k,
        max_accel: limits.max_accel * k * k,
    }
}

/// Job duration for the given requested time and per-axis minimum times.
///
/// Returns `(actual_ms, adjusted)`; `adjusted` is true only when a request
/// was given and had to be extended.
pub fn job_duration_ms(requested_ms: Option<u32>, min_times: impl Iterator<Item = f64>) -> (u32, bool) {
    let feasible = min_times.map(ceil_ms).max().unwrap_or(0);
    match requested_ms {
        Some(req) => (req.max(feasible), feasible > req),
        None => (feasible, false),
    }
}
