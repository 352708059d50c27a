//! Axis-driver capability and its error type.
//!
//! Step generation, driver registers and stall sensing sit behind
//! [`AxisDriver`]. Production backends talk to stepper drivers; tests use
//! the deterministic simulated backend.
//!
//! # Timing Contract
//!
//! Every method is called from the control tick and must return without
//! blocking. `move_to` hands a target to the driver, which executes its own
//! trapezoidal profile asynchronously relative to the tick.

use std::time::Duration;

use thiserror::Error;

use crate::axis::AxisId;
use crate::control_unit::command::DriverSettings;
use crate::control_unit::homing::HomingDirection;

/// Error types for driver operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// Driver limits have not been negotiated yet.
    #[error("driver not configured")]
    NotConfigured,

    /// Register write or readback failed.
    #[error("driver communication error: {0}")]
    Communication(String),

    /// Request refused in the current driver state.
    #[error("driver rejected request: {0}")]
    Rejected(String),
}

/// Speed and acceleration bounds for one move [steps/s, steps/s²].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionLimits {
    pub max_speed: f64,
    pub max_accel: f64,
}

/// Interface to the stepper drivers of all four axes.
pub trait AxisDriver: Send {
    /// Backend identifier (e.g. "simulation").
    fn name(&self) -> &'static str;

    /// True once driver limits are negotiated and register writes are accepted.
    fn is_configured(&self) -> bool;

    /// Write microstepping, current and chopper mode.
    ///
    /// # Errors
    /// `DriverError::NotConfigured` before negotiation completes.
    fn apply_driver_config(
        &mut self,
        axis: AxisId,
        settings: &DriverSettings,
        inverted: bool,
    ) -> Result<(), DriverError>;

    /// Start (or retarget) a trapezoidal move to `target` steps.
    fn move_to(&mut self, axis: AxisId, target: i64, limits: MotionLimits);

    /// Decelerate to a halt at the axis's configured acceleration.
    fn stop(&mut self, axis: AxisId);

    /// Current position [steps].
    fn position(&self, axis: AxisId) -> i64;

    fn is_moving(&self, axis: AxisId) -> bool;

    /// Redefine the current position without moving.
    fn set_position(&mut self, axis: AxisId, steps: i64);

    /// Run at constant `speed` in `direction` until stopped.
    ///
    /// # Errors
    /// `DriverError::NotConfigured` or `DriverError::Rejected`.
    fn try_seek(
        &mut self,
        axis: AxisId,
        direction: HomingDirection,
        speed: f64,
    ) -> Result<(), DriverError>;

    /// True if the stall signal crossed `threshold`.
    fn read_stall_flag(&self, axis: AxisId, threshold: u8) -> bool;

    /// Advance backend time. Hardware backends ignore it.
    fn service(&mut self, _dt: Duration) {}
}
