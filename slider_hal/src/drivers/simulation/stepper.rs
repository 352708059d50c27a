//! Stepper axis simulator.
//!
//! Models one stepper driver: trapezoidal point-to-point moves, constant
//! speed seeking, optional mechanical end stops, and a load signal that
//! collapses when the motor is blocked.

use std::time::Duration;

use slider_common::control_unit::command::DriverSettings;
use slider_common::control_unit::homing::HomingDirection;
use slider_common::hal::driver::MotionLimits;
use tracing::trace;

/// Load reading while running freely at seek speed.
pub const FREE_RUN_LOAD: u16 = 300;

/// Below this speed [steps/s] the axis counts as stopped.
const STANDSTILL_SPEED: f64 = 0.5;

/// Seeks reach cruise speed within this time [s].
const SEEK_SPIN_UP_S: f64 = 0.02;

/// What the simulated axis is doing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepperMode {
    /// Holding position.
    Idle,
    /// Trapezoidal move toward the target.
    Positioning,
    /// Constant speed run until stopped.
    Seeking {
        /// Travel direction.
        direction: HomingDirection,
        /// Cruise speed [steps/s].
        speed: f64,
    },
    /// Decelerating to a halt.
    Stopping,
}

/// One simulated stepper axis.
#[derive(Debug, Clone)]
pub struct StepperSimulator {
    position: f64,
    velocity: f64,
    target: f64,
    limits: MotionLimits,
    mode: StepperMode,
    /// Mechanical travel `[min, max]` in driver steps.
    hard_stops: Option<(f64, f64)>,
    blocked: bool,
    settings: Option<(DriverSettings, bool)>,
    move_requests: u64,
}

impl Default for StepperSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl StepperSimulator {
    /// Idle axis at position 0 with no end stops.
    pub fn new() -> Self {
        Self {
            position: 0.0,
            velocity: 0.0,
            target: 0.0,
            limits: MotionLimits { max_speed: 1000.0, max_accel: 1000.0 },
            mode: StepperMode::Idle,
            hard_stops: None,
            blocked: false,
            settings: None,
            move_requests: 0,
        }
    }

    /// Place mechanical end stops at `min` and `max` driver steps.
    pub fn set_hard_stops(&mut self, min: i64, max: i64) {
        self.hard_stops = Some((min as f64, max as f64));
    }

    /// Current position rounded to whole steps.
    pub fn position(&self) -> i64 {
        self.position.round() as i64
    }

    /// Current velocity [steps/s].
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Last commanded target.
    pub fn target(&self) -> i64 {
        self.target.round() as i64
    }

    /// Limits of the last move request.
    pub fn limits(&self) -> MotionLimits {
        self.limits
    }

    /// Current mode.
    pub fn mode(&self) -> StepperMode {
        self.mode
    }

    /// Last applied register settings and inversion flag.
    pub fn settings(&self) -> Option<(DriverSettings, bool)> {
        self.settings
    }

    /// Number of `move_to` calls received.
    pub fn move_requests(&self) -> u64 {
        self.move_requests
    }

    /// True while the axis is pressed against an end stop.
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// True unless idle.
    pub fn is_moving(&self) -> bool {
        self.mode != StepperMode::Idle
    }

    pub(crate) fn apply_settings(&mut self, settings: DriverSettings, inverted: bool) {
        self.settings = Some((settings, inverted));
    }

    pub(crate) fn move_to(&mut self, target: i64, limits: MotionLimits) {
        self.target = target as f64;
        self.limits = limits;
        self.mode = StepperMode::Positioning;
        self.move_requests += 1;
    }

    pub(crate) fn seek(&mut self, direction: HomingDirection, speed: f64) {
        self.mode = StepperMode::Seeking { direction, speed };
        self.blocked = false;
    }

    pub(crate) fn stop(&mut self) {
        if self.mode != StepperMode::Idle {
            self.mode = StepperMode::Stopping;
        }
    }

    pub(crate) fn set_position(&mut self, steps: i64) {
        let shift = steps as f64 - self.position;
        self.position = steps as f64;
        self.target += shift;
        if let Some((min, max)) = self.hard_stops.as_mut() {
            *min += shift;
            *max += shift;
        }
    }

    /// Driver load reading, lower under higher mechanical load.
    ///
    /// Reads zero while blocked and scales with speed while seeking, so
    /// spin-up from standstill also reads low.
    pub fn load(&self) -> u16 {
        match self.mode {
            StepperMode::Seeking { speed, .. } => {
                if self.blocked || speed <= 0.0 {
                    0
                } else {
                    let ratio = (self.velocity.abs() / speed).min(1.0);
                    (f64::from(FREE_RUN_LOAD) * ratio) as u16
                }
            }
            StepperMode::Positioning | StepperMode::Stopping => FREE_RUN_LOAD,
            StepperMode::Idle => u16::MAX,
        }
    }

    /// Stall comparison: load at or below twice the threshold.
    pub fn stalled(&self, threshold: u8) -> bool {
        self.mode != StepperMode::Idle && self.load() <= 2 * u16::from(threshold)
    }

    /// Advance the model by `dt`.
    pub fn update(&mut self, dt: Duration) {
        let dt = dt.as_secs_f64();
        if dt <= 0.0 {
            return;
        }
        match self.mode {
            StepperMode::Idle => {}
            StepperMode::Positioning => self.update_positioning(dt),
            StepperMode::Seeking { direction, speed } => {
                self.ramp_toward(direction.sign() * speed, speed / SEEK_SPIN_UP_S, dt);
                self.position += self.velocity * dt;
            }
            StepperMode::Stopping => {
                self.ramp_toward(0.0, self.limits.max_accel.max(1.0), dt);
                self.position += self.velocity * dt;
                if self.velocity.abs() < STANDSTILL_SPEED {
                    self.halt();
                }
            }
        }
        self.check_hard_stops();
    }

    fn update_positioning(&mut self, dt: f64) {
        let error = self.target - self.position;
        let max_vel = self.limits.max_speed.max(STANDSTILL_SPEED);
        let max_acc = self.limits.max_accel.max(1.0);

        if error.abs() < 0.5 && self.velocity.abs() <= max_acc * dt {
            self.position = self.target;
            self.halt();
            return;
        }

        let stopping_distance = self.velocity * self.velocity / (2.0 * max_acc);
        let desired_velocity = if error.abs() <= stopping_distance {
            error.signum() * (2.0 * max_acc * error.abs()).sqrt().min(max_vel)
        } else {
            error.signum() * max_vel
        };
        self.ramp_toward(desired_velocity, max_acc, dt);
        self.velocity = self.velocity.clamp(-max_vel, max_vel);
        self.position += self.velocity * dt;

        // Crossing the target ends the move.
        if (self.target - self.position).signum() != error.signum() {
            self.position = self.target;
            self.halt();
        }

        trace!(
            "stepper: pos={:.1}, vel={:.1}, target={:.1}",
            self.position, self.velocity, self.target
        );
    }

    fn ramp_toward(&mut self, desired: f64, accel: f64, dt: f64) {
        let max_change = accel * dt;
        self.velocity += (desired - self.velocity).clamp(-max_change, max_change);
    }

    fn halt(&mut self) {
        self.velocity = 0.0;
        self.mode = StepperMode::Idle;
    }

    fn check_hard_stops(&mut self) {
        let Some((min, max)) = self.hard_stops else {
            return;
        };
        if self.position <= min && self.velocity <= 0.0 {
            self.position = min;
            self.velocity = 0.0;
            self.blocked = matches!(self.mode, StepperMode::Seeking { .. });
        } else if self.position >= max && self.velocity >= 0.0 {
            self.position = max;
            self.velocity = 0.0;
            self.blocked = matches!(self.mode, StepperMode::Seeking { .. });
        } else {
            self.blocked = false;
        }
    }
}
