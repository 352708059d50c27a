//! Simulation driver implementation.
//!
//! `SimulatedDriver` implements `AxisDriver` for four simulated steppers.
//! Time only advances through `service`, so runs are fully deterministic.

use std::time::Duration;

use slider_common::axis::{AxisArray, AxisId};
use slider_common::control_unit::command::DriverSettings;
use slider_common::control_unit::homing::HomingDirection;
use slider_common::hal::driver::{AxisDriver, DriverError, MotionLimits};
use tracing::{debug, info};

use super::stepper::StepperSimulator;

/// Simulated driver for all four axes.
#[derive(Debug, Clone)]
pub struct SimulatedDriver {
    axes: AxisArray<StepperSimulator>,
    configured: bool,
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDriver {
    /// Driver with negotiated limits, all axes idle at 0.
    pub fn new() -> Self {
        Self {
            axes: AxisArray::from_fn(|_| StepperSimulator::new()),
            configured: true,
        }
    }

    /// Driver whose limits are not negotiated yet.
    pub fn unconfigured() -> Self {
        Self { configured: false, ..Self::new() }
    }

    /// Finish limit negotiation.
    pub fn complete_negotiation(&mut self) {
        if !self.configured {
            info!("simulated driver negotiation complete");
        }
        self.configured = true;
    }

    /// Builder form of [`StepperSimulator::set_hard_stops`].
    pub fn with_hard_stops(mut self, axis: AxisId, min: i64, max: i64) -> Self {
        self.axes[axis].set_hard_stops(min, max);
        self
    }

    /// Simulated stepper of `axis`.
    pub fn stepper(&self, axis: AxisId) -> &StepperSimulator {
        &self.axes[axis]
    }

    /// Mutable simulated stepper of `axis`.
    pub fn stepper_mut(&mut self, axis: AxisId) -> &mut StepperSimulator {
        &mut self.axes[axis]
    }
}

impl AxisDriver for SimulatedDriver {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn apply_driver_config(
        &mut self,
        axis: AxisId,
        settings: &DriverSettings,
        inverted: bool,
    ) -> Result<(), DriverError> {
        if !self.configured {
            return Err(DriverError::NotConfigured);
        }
        self.axes[axis].apply_settings(*settings, inverted);
        debug!(
            "{axis}: microsteps={}, current={}mA, spread_cycle={}, inverted={inverted}",
            settings.microsteps, settings.current_ma, settings.spread_cycle
        );
        Ok(())
    }

    fn move_to(&mut self, axis: AxisId, target: i64, limits: MotionLimits) {
        self.axes[axis].move_to(target, limits);
    }

    fn stop(&mut self, axis: AxisId) {
        self.axes[axis].stop();
    }

    fn position(&self, axis: AxisId) -> i64 {
        self.axes[axis].position()
    }

    fn is_moving(&self, axis: AxisId) -> bool {
        self.axes[axis].is_moving()
    }

    fn set_position(&mut self, axis: AxisId, steps: i64) {
        self.axes[axis].set_position(steps);
    }

    fn try_seek(
        &mut self,
        axis: AxisId,
        direction: HomingDirection,
        speed: f64,
    ) -> Result<(), DriverError> {
        if !self.configured {
            return Err(DriverError::NotConfigured);
        }
        if !(speed > 0.0 && speed.is_finite()) {
            return Err(DriverError::Rejected(format!("seek speed {speed}")));
        }
        self.axes[axis].seek(direction, speed);
        Ok(())
    }

    fn read_stall_flag(&self, axis: AxisId, threshold: u8) -> bool {
        self.axes[axis].stalled(threshold)
    }

    fn service(&mut self, dt: Duration) {
        for (_, stepper) in self.axes.iter_mut() {
            stepper.update(dt);
        }
    }
}
