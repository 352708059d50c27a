//! Homing types for the slide axis.
//!
//! Defines `HomingState`, `HomingDirection`, `HomingOutcome` and `HomingConfig`.
//! Homing is sensorless: the slide is driven toward its mechanical end stop
//! until the driver's stall signal crosses the configured threshold.

use serde::{Deserialize, Serialize};

/// Homing session state.
///
/// `Done` is transient: the controller rebases the axis and returns to
/// `Idle` within the same tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum HomingState {
    #[default]
    Idle = 0,
    Seeking = 1,
    Done = 2,
}

/// Direction the slide travels while seeking its end stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum HomingDirection {
    Positive = 0,
    #[default]
    Negative = 1,
}

impl HomingDirection {
    /// Sign multiplier for seek velocity.
    #[inline]
    pub const fn sign(&self) -> f64 {
        match self {
            Self::Positive => 1.0,
            Self::Negative => -1.0,
        }
    }
}

/// Why a homing seek ended without finding a stall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomingFailReason {
    /// `max_seek_ms` elapsed.
    Timeout,
    /// `max_seek_steps` travelled.
    TravelExceeded,
    /// The driver refused the seek request.
    DriverRejected,
    /// Cancelled by a stop command.
    Aborted,
}

/// Result of the most recent homing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum HomingOutcome {
    /// No session has completed since startup.
    #[default]
    Never,
    Homed,
    Failed { reason: HomingFailReason },
}

/// Slide homing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomingConfig {
    #[serde(default)]
    pub direction: HomingDirection,
    /// Seek speed [steps/s].
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Initial stall threshold, `[0, 255]`.
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    /// Seek time bound [ms]; 0 disables.
    #[serde(default = "default_max_seek_ms")]
    pub max_seek_ms: u32,
    /// Seek travel bound [steps]; 0 disables.
    #[serde(default)]
    pub max_seek_steps: i64,
    /// Stall flag ignored for this long after the seek starts [ms].
    #[serde(default = "default_blanking_ms")]
    pub stall_blanking_ms: u32,
}

fn default_speed() -> f64 {
    2000.0
}
fn default_threshold() -> u8 {
    40
}
fn default_max_seek_ms() -> u32 {
    30_000
}
fn default_blanking_ms() -> u32 {
    100
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            direction: HomingDirection::default(),
            speed: default_speed(),
            threshold: default_threshold(),
            max_seek_ms: default_max_seek_ms(),
            max_seek_steps: 0,
            stall_blanking_ms: default_blanking_ms(),
        }
    }
}

impl HomingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.speed > 0.0 && self.speed.is_finite()) {
            return Err(format!("homing speed {} must be > 0", self.speed));
        }
        if self.max_seek_steps < 0 {
            return Err(format!("max_seek_steps {} must be >= 0", self.max_seek_steps));
        }
        if self.max_seek_ms == 0 && self.max_seek_steps == 0 {
            return Err("homing needs a bound: set max_seek_ms or max_seek_steps".to_string());
        }
        Ok(())
    }
}
