//! AxisModel: per-axis position, target, limits and driver settings.
//!
//! Every write is clamped into `[min, max]`, never rejected. The model is
//! purely reactive and emits no events.

use slider_common::axis::{AxisArray, AxisId, AxisValue};
use slider_common::control_unit::command::DriverSettings;
use slider_common::control_unit::config::{AxesConfig, AxisConfig};
use slider_common::hal::driver::MotionLimits;
use tracing::debug;

/// State of one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisState {
    /// Last position reported by the driver [steps].
    pub position: i64,
    /// Commanded position before offsets [steps].
    pub target: i64,
    pub min: i64,
    pub max: i64,
    /// [steps/s]
    pub max_speed: f64,
    /// [steps/s²]
    pub max_accel: f64,
    pub inverted: bool,
    pub driver: DriverSettings,
}

impl AxisState {
    fn from_config(cfg: &AxisConfig) -> Self {
        let home = 0i64.clamp(cfg.min, cfg.max);
        Self {
            position: home,
            target: home,
            min: cfg.min,
            max: cfg.max,
            max_speed: cfg.max_speed,
            max_accel: cfg.max_accel,
            inverted: cfg.inverted,
            driver: cfg.driver(),
        }
    }

    #[inline]
    pub fn clamp(&self, steps: i64) -> i64 {
        steps.clamp(self.min, self.max)
    }

    #[inline]
    pub fn span(&self) -> i64 {
        self.max.saturating_sub(self.min)
    }

    /// Map `steps` onto `[0, 1]` over the limits.
    pub fn normalize(&self, steps: i64) -> f64 {
        let span = self.span();
        if span <= 0 {
            return 0.0;
        }
        (steps.saturating_sub(self.min) as f64 / span as f64).clamp(0.0, 1.0)
    }

    /// Map a normalized value onto clamped steps.
    ///
    /// `+inf` maps to `max`, `-inf` to `min`; NaN yields `None`.
    pub fn denormalize(&self, value: f64) -> Option<i64> {
        if value.is_nan() {
            return None;
        }
        let v = value.clamp(0.0, 1.0);
        Some(self.clamp(self.min.saturating_add((v * self.span() as f64).round() as i64)))
    }

    #[inline]
    pub fn limits(&self) -> MotionLimits {
        MotionLimits { max_speed: self.max_speed, max_accel: self.max_accel }
    }
}

/// Owner of all per-axis position state.
#[derive(Debug, Clone)]
pub struct AxisModel {
    axes: AxisArray<AxisState>,
}

impl AxisModel {
    pub fn from_config(cfg: &AxesConfig) -> Self {
        Self { axes: AxisArray::from_fn(|axis| AxisState::from_config(cfg.get(axis))) }
    }

    #[inline]
    pub fn axis(&self, axis: AxisId) -> &AxisState {
        &self.axes[axis]
    }

    pub fn iter(&self) -> impl Iterator<Item = (AxisId, &AxisState)> {
        self.axes.iter()
    }

    /// Resolve `value` to clamped steps without writing.
    ///
    /// NaN resolves to the current target.
    pub fn resolve(&self, axis: AxisId, value: AxisValue) -> i64 {
        let state = &self.axes[axis];
        match value {
            AxisValue::Steps(steps) => state.clamp(steps),
            AxisValue::Normalized(v) => state.denormalize(v).unwrap_or(state.target),
        }
    }

    /// Clamp `value` into the limits and store it as the target.
    pub fn set_absolute(&mut self, axis: AxisId, value: AxisValue) -> i64 {
        let steps = self.resolve(axis, value);
        self.axes[axis].target = steps;
        steps
    }

    /// Store a raw step target, clamped.
    pub fn set_target(&mut self, axis: AxisId, steps: i64) -> i64 {
        let state = &mut self.axes[axis];
        state.target = state.clamp(steps);
        state.target
    }

    /// Record driver feedback, clamped.
    pub fn update_position(&mut self, axis: AxisId, steps: i64) {
        let state = &mut self.axes[axis];
        state.position = state.clamp(steps);
    }

    /// Replace limits, re-clamping position and target if they now fall outside.
    pub fn set_limits(
        &mut self,
        axis: AxisId,
        min: i64,
        max: i64,
        max_speed: Option<f64>,
        max_accel: Option<f64>,
    ) {
        let state = &mut self.axes[axis];
        state.min = min;
        state.max = max;
        if let Some(v) = max_speed {
            state.max_speed = v;
        }
        if let Some(a) = max_accel {
            state.max_accel = a;
        }
        state.position = state.clamp(state.position);
        state.target = state.clamp(state.target);
        debug!("{axis}: limits [{min}, {max}], speed {}, accel {}", state.max_speed, state.max_accel);
    }

    pub fn set_driver_config(&mut self, axis: AxisId, settings: DriverSettings) {
        self.axes[axis].driver = settings;
    }

    /// Redefine the current position as zero (clamped) and hold it.
    pub fn rebase(&mut self, axis: AxisId) {
        let state = &mut self.axes[axis];
        state.position = state.clamp(0);
        state.target = state.position;
    }

    /// Position as a fraction of the travel, `[0, 1]`.
    #[inline]
    pub fn percent(&self, axis: AxisId) -> f64 {
        let state = &self.axes[axis];
        state.normalize(state.position)
    }

    /// Current positions of all axes.
    pub fn positions(&self) -> AxisArray<i64> {
        self.axes.map(|s| s.position)
    }
}
