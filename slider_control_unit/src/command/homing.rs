//! Sensorless homing of the slide axis.
//!
//! ## Lifecycle
//!
//! 1. `HomingStart` → [`HomingController::start`] begins a constant-speed
//!    seek toward the configured direction (no-op unless `Idle`).
//! 2. Each tick: [`HomingController::tick`] compares the stall signal
//!    against the threshold once the blanking window has passed.
//! 3. On stall: the driver position is redefined as zero, state → `Done`.
//!    The caller rebases the axis model, clears slide offsets and calls
//!    [`HomingController::finish`] → `Idle`.
//! 4. A seek exceeding `max_seek_ms` or `max_seek_steps` stops the slide
//!    and fails with `Idle` / `Failed{reason}`.
//!
//! While `Seeking`, homing owns the slide axis exclusively.

use std::time::Duration;

use slider_common::axis::AxisId;
use slider_common::control_unit::error::CommandError;
use slider_common::control_unit::homing::{
    HomingConfig, HomingFailReason, HomingOutcome, HomingState,
};
use slider_common::control_unit::telemetry::HomingStatus;
use slider_common::hal::driver::{AxisDriver, DriverError};
use tracing::{info, warn};

/// The homed axis.
pub const HOMING_AXIS: AxisId = AxisId::Slide;

// ─── Tick Result ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingTickResult {
    /// Not homing.
    Idle,
    InProgress,
    /// Stall detected; driver position is now zero.
    Homed,
    Failed(HomingFailReason),
}

// ─── Controller ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HomingController {
    state: HomingState,
    config: HomingConfig,
    threshold: u8,
    elapsed: Duration,
    start_position: i64,
    outcome: HomingOutcome,
}

impl HomingController {
    pub fn new(config: HomingConfig) -> Self {
        Self {
            state: HomingState::Idle,
            threshold: config.threshold,
            config,
            elapsed: Duration::ZERO,
            start_position: 0,
            outcome: HomingOutcome::Never,
        }
    }

    #[inline]
    pub fn state(&self) -> HomingState {
        self.state
    }

    #[inline]
    pub fn is_seeking(&self) -> bool {
        self.state == HomingState::Seeking
    }

    #[inline]
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: u8) {
        info!("homing threshold {} -> {threshold}", self.threshold);
        self.threshold = threshold;
    }

    #[inline]
    pub fn outcome(&self) -> HomingOutcome {
        self.outcome
    }

    pub fn status(&self) -> HomingStatus {
        HomingStatus { state: self.state, threshold: self.threshold, outcome: self.outcome }
    }

    /// Begin seeking. Returns `Ok(false)` (no-op) unless `Idle`.
    ///
    /// # Errors
    /// `ConfigurationNotLoaded` before driver negotiation, `Conflict` if
    /// the driver refuses the seek.
    pub fn start<D: AxisDriver + ?Sized>(&mut self, driver: &mut D) -> Result<bool, CommandError> {
        if self.state != HomingState::Idle {
            return Ok(false);
        }
        if !driver.is_configured() {
            return Err(CommandError::ConfigurationNotLoaded);
        }
        match driver.try_seek(HOMING_AXIS, self.config.direction, self.config.speed) {
            Ok(()) => {}
            Err(DriverError::NotConfigured) => return Err(CommandError::ConfigurationNotLoaded),
            Err(e) => {
                warn!("homing seek refused: {e}");
                self.outcome = HomingOutcome::Failed { reason: HomingFailReason::DriverRejected };
                return Err(CommandError::conflict(format!("homing seek refused: {e}")));
            }
        }
        self.state = HomingState::Seeking;
        self.elapsed = Duration::ZERO;
        self.start_position = driver.position(HOMING_AXIS);
        info!(
            "homing: seeking {:?} at {} steps/s, threshold {}",
            self.config.direction, self.config.speed, self.threshold
        );
        Ok(true)
    }

    /// Supervise one tick of the seek.
    pub fn tick<D: AxisDriver + ?Sized>(&mut self, driver: &mut D, dt: Duration) -> HomingTickResult {
        match self.state {
            HomingState::Idle => return HomingTickResult::Idle,
            HomingState::Done => {
                self.state = HomingState::Idle;
                return HomingTickResult::Idle;
            }
            HomingState::Seeking => {}
        }

        self.elapsed = self.elapsed.saturating_add(dt);
        let blanking = Duration::from_millis(u64::from(self.config.stall_blanking_ms));

        if self.elapsed >= blanking && driver.read_stall_flag(HOMING_AXIS, self.threshold) {
            driver.stop(HOMING_AXIS);
            driver.set_position(HOMING_AXIS, 0);
            self.state = HomingState::Done;
            self.outcome = HomingOutcome::Homed;
            info!("homing: stall after {} ms, slide zeroed", self.elapsed.as_millis());
            return HomingTickResult::Homed;
        }

        let travel = (driver.position(HOMING_AXIS) - self.start_position).abs();
        if self.config.max_seek_steps > 0 && travel >= self.config.max_seek_steps {
            return self.fail(driver, HomingFailReason::TravelExceeded);
        }
        let limit = Duration::from_millis(u64::from(self.config.max_seek_ms));
        if self.config.max_seek_ms > 0 && self.elapsed >= limit {
            return self.fail(driver, HomingFailReason::Timeout);
        }
        HomingTickResult::InProgress
    }

    /// Leave `Done` after the caller applied the new zero.
    pub fn finish(&mut self) {
        if self.state == HomingState::Done {
            self.state = HomingState::Idle;
        }
    }

    /// Stop an active seek. Returns true if one was running.
    pub fn abort<D: AxisDriver + ?Sized>(&mut self, driver: &mut D) -> bool {
        if !self.is_seeking() {
            return false;
        }
        self.fail(driver, HomingFailReason::Aborted);
        true
    }

    fn fail<D: AxisDriver + ?Sized>(&mut self, driver: &mut D, reason: HomingFailReason) -> HomingTickResult {
        driver.stop(HOMING_AXIS);
        self.state = HomingState::Idle;
        self.outcome = HomingOutcome::Failed { reason };
        warn!(
            "homing failed ({reason:?}) after {} ms, {} steps",
            self.elapsed.as_millis(),
            (driver.position(HOMING_AXIS) - self.start_position).abs()
        );
        HomingTickResult::Failed(reason)
    }
}
