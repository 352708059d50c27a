//! JoystickShaper: raw jog input → shaped velocity command per axis.
//!
//! ```text
//! r ─► deadzone ─► expo ─► slew ─► low-pass ─► ×slide multiplier ─► out
//! ```
//!
//! The output is a fraction of the axis max speed. [`JoystickShaper::integrate`]
//! turns it into whole-step deltas, carrying the sub-step remainder.

use std::time::Duration;

use slider_common::axis::{AxisArray, AxisId};
use slider_common::control_unit::joystick::JoystickConfig;
use tracing::debug;

use super::filters::ConditioningState;

/// Outputs below this magnitude are treated as zero.
const OUTPUT_EPSILON: f64 = 1e-4;

/// Deadzone and expo stages.
///
/// Continuous at `|r| = deadzone`; odd-symmetric and monotonic in `r`.
#[inline]
pub fn shape_input(raw: f64, deadzone: f64, expo: f64) -> f64 {
    let r = raw.clamp(-1.0, 1.0);
    let mag = r.abs();
    if mag < deadzone {
        return 0.0;
    }
    let rescaled = r.signum() * (mag - deadzone) / (1.0 - deadzone);
    (1.0 - expo) * rescaled + expo * rescaled.powi(3)
}

#[derive(Debug, Clone, Copy, Default)]
struct AxisInput {
    raw: f64,
    /// Time since the last input refresh.
    age: Duration,
    conditioning: ConditioningState,
    output: f64,
    /// Sub-step remainder of the integrated output [steps].
    residual: f64,
}

#[derive(Debug, Clone)]
pub struct JoystickShaper {
    config: JoystickConfig,
    timeout: Duration,
    axes: AxisArray<AxisInput>,
}

impl JoystickShaper {
    pub fn new(config: JoystickConfig, timeout: Duration) -> Self {
        Self { config, timeout, axes: AxisArray::default() }
    }

    #[inline]
    pub fn config(&self) -> &JoystickConfig {
        &self.config
    }

    /// Replace the shaping parameters. Filter state is kept.
    pub fn set_config(&mut self, config: JoystickConfig) {
        debug!(
            "joystick: deadzone {}, expo {}, slew {}/s, filter {} Hz, slide x{}",
            config.deadzone, config.expo, config.slew_per_sec, config.filter_hz,
            config.slide_speed_multiplier
        );
        self.config = config;
    }

    /// Latch raw input for `axis`, clamped to `[-1, 1]`. NaN reads as 0.
    pub fn set_input(&mut self, axis: AxisId, raw: f64) {
        let input = &mut self.axes[axis];
        input.raw = if raw.is_nan() { 0.0 } else { raw.clamp(-1.0, 1.0) };
        input.age = Duration::ZERO;
    }

    /// Drop input and filter state of one axis.
    pub fn clear(&mut self, axis: AxisId) {
        self.axes[axis] = AxisInput::default();
    }

    pub fn clear_all(&mut self) {
        self.axes = AxisArray::default();
    }

    #[inline]
    pub fn raw(&self, axis: AxisId) -> f64 {
        self.axes[axis].raw
    }

    #[inline]
    pub fn output(&self, axis: AxisId) -> f64 {
        self.axes[axis].output
    }

    /// True if the axis has live input or is still decaying.
    #[inline]
    pub fn is_active(&self, axis: AxisId) -> bool {
        let input = &self.axes[axis];
        input.raw != 0.0 || input.output != 0.0
    }

    pub fn any_active(&self) -> bool {
        AxisId::ALL.iter().any(|&a| self.is_active(a))
    }

    /// Run one shaping step for all axes.
    pub fn update(&mut self, dt: Duration) {
        let cfg = self.config;
        let dt_s = dt.as_secs_f64();
        for (axis, input) in self.axes.iter_mut() {
            if input.raw != 0.0 && !self.timeout.is_zero() && input.age >= self.timeout {
                debug!("{axis}: jog input timed out");
                input.raw = 0.0;
            }

            let shaped = shape_input(input.raw, cfg.deadzone, cfg.expo);
            let mut out = input
                .conditioning
                .apply(cfg.slew_per_sec, cfg.filter_hz, shaped, dt_s);
            if axis == AxisId::Slide {
                out *= cfg.slide_speed_multiplier;
            }

            if out.abs() < OUTPUT_EPSILON {
                out = 0.0;
                if input.raw == 0.0 {
                    input.conditioning.reset();
                }
            }
            input.output = out;
            input.age = input.age.saturating_add(dt);
        }
    }

    /// Whole-step displacement for this tick at `max_speed` [steps/s].
    pub fn integrate(&mut self, axis: AxisId, max_speed: f64, dt: Duration) -> i64 {
        let input = &mut self.axes[axis];
        if input.output == 0.0 {
            input.residual = 0.0;
            return 0;
        }
        let travel = input.output * max_speed * dt.as_secs_f64() + input.residual;
        let steps = travel.trunc();
        input.residual = travel - steps;
        steps as i64
    }
}
