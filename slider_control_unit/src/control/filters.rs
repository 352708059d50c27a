//! Joystick signal conditioning: rate limiter and 1st-order low-pass.
//!
//! Zero rate or zero cutoff disables the respective stage.
//! Processing order: slew → low-pass.

use core::f64::consts::PI;

// ─── Slew Limiter ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct SlewState {
    prev_output: f64,
}

impl SlewState {
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn output(&self) -> f64 {
        self.prev_output
    }
}

/// Limit the change of `input` to `rate · dt` per sample.
///
/// Returns `input` unchanged when `rate <= 0.0` (disabled).
#[inline]
pub fn slew_apply(state: &mut SlewState, rate: f64, input: f64, dt: f64) -> f64 {
    let output = if rate <= 0.0 {
        input
    } else {
        let step = rate * dt.max(0.0);
        state.prev_output + (input - state.prev_output).clamp(-step, step)
    };
    state.prev_output = output;
    output
}

// ─── Low-Pass Filter (1st-order) ────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct LowPassState {
    prev_output: f64,
}

impl LowPassState {
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One sample through the single-pole low-pass.
///
/// ```text
/// alpha = 2π·fc·dt / (1 + 2π·fc·dt)
/// y[n] = y[n-1] + alpha × (x[n] - y[n-1])
/// ```
///
/// Returns `input` unchanged when `fc <= 0.0` (disabled).
#[inline]
pub fn lowpass_apply(state: &mut LowPassState, fc: f64, input: f64, dt: f64) -> f64 {
    if fc <= 0.0 {
        state.prev_output = input;
        return input;
    }
    if dt <= 0.0 {
        return state.prev_output;
    }

    let omega = 2.0 * PI * fc * dt;
    let alpha = omega / (1.0 + omega);
    let output = state.prev_output + alpha * (input - state.prev_output);
    state.prev_output = output;
    output
}

// ─── Chain ──────────────────────────────────────────────────────────

/// Per-axis conditioning state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditioningState {
    pub slew: SlewState,
    pub lowpass: LowPassState,
}

impl ConditioningState {
    #[inline]
    pub fn apply(&mut self, slew_rate: f64, cutoff_hz: f64, input: f64, dt: f64) -> f64 {
        let limited = slew_apply(&mut self.slew, slew_rate, input, dt);
        lowpass_apply(&mut self.lowpass, cutoff_hz, limited, dt)
    }

    #[inline]
    pub fn reset(&mut self) {
        self.slew.reset();
        self.lowpass.reset();
    }
}
