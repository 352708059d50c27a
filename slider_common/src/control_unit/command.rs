//! Command sum type consumed by the control unit dispatcher.
//!
//! Transport adapters translate wire messages into [`Command`] values and
//! receive a [`CommandOutcome`] or [`CommandError`] back. Stateless checks
//! (index ranges, setpoint ordering, parameter bounds) live in
//! [`Command::validate`]; checks against controller state happen in the
//! dispatcher.

use serde::{Deserialize, Serialize};

use crate::axis::{AxisArray, AxisId, AxisValue, validate_limits};
use crate::consts::{CURRENT_MA_MAX, MICROSTEPS_MAX, STALL_THRESHOLD_MAX};
use crate::control_unit::bank::{
    AutoEndBehavior, Bank, DirectPoint, InterpPoint, validate_bank_index, validate_direct_points,
    validate_preset_index, validate_setpoints,
};
use crate::control_unit::error::CommandError;
use crate::control_unit::joystick::JoystickConfig;
use crate::control_unit::telemetry::StatusSnapshot;

/// Transport class a command arrived on.
///
/// Decides what happens to a rejected command: datagram inputs are dropped
/// silently, request/response inputs get the error back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportClass {
    #[default]
    Datagram,
    RequestResponse,
}

/// Axes cleared by `OffsetZero`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZeroMask {
    #[serde(default = "yes")]
    pub pan: bool,
    #[serde(default = "yes")]
    pub tilt: bool,
    #[serde(default)]
    pub zoom: bool,
    #[serde(default)]
    pub slide: bool,
}

fn yes() -> bool {
    true
}

impl Default for ZeroMask {
    /// Pan and tilt only.
    fn default() -> Self {
        Self { pan: true, tilt: true, zoom: false, slide: false }
    }
}

impl ZeroMask {
    pub const ALL: Self = Self { pan: true, tilt: true, zoom: true, slide: true };

    #[inline]
    pub const fn contains(&self, axis: AxisId) -> bool {
        match axis {
            AxisId::Pan => self.pan,
            AxisId::Tilt => self.tilt,
            AxisId::Zoom => self.zoom,
            AxisId::Slide => self.slide,
        }
    }
}

/// Stepper driver register settings for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverSettings {
    /// Power of two in `1..=256`.
    pub microsteps: u16,
    /// RMS current [mA], `0..=2000`.
    pub current_ma: u16,
    /// SpreadCycle chopper (true) or StealthChop (false).
    pub spread_cycle: bool,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self { microsteps: 16, current_ma: 800, spread_cycle: false }
    }
}

impl DriverSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.microsteps == 0 || self.microsteps > MICROSTEPS_MAX || !self.microsteps.is_power_of_two() {
            return Err(format!(
                "microsteps {} must be a power of two in 1..={MICROSTEPS_MAX}",
                self.microsteps
            ));
        }
        if self.current_ma > CURRENT_MA_MAX {
            return Err(format!("current_ma {} exceeds {CURRENT_MA_MAX}", self.current_ma));
        }
        Ok(())
    }
}

/// Timing result of a synchronized move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveReport {
    pub actual_duration_ms: u32,
    pub requested_duration_ms: u32,
    /// True when the request was extended to a feasible duration.
    pub duration_adjusted: bool,
}

/// Transport-agnostic controller command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Individual move of one axis.
    AbsoluteMove { axis: AxisId, value: AxisValue },
    /// Time-matched move of several axes.
    SynchronizedMove {
        targets: AxisArray<Option<AxisValue>>,
        #[serde(default)]
        duration_ms: Option<u32>,
    },
    /// Raw joystick input, `[-1, 1]`. Values outside are clamped.
    Jog { axis: AxisId, speed: f64 },
    JoystickConfig(JoystickConfig),
    /// Write the given preset fields, leaving the others untouched.
    PresetSet {
        index: u8,
        positions: AxisArray<Option<AxisValue>>,
    },
    /// Capture the current absolute positions into a preset.
    PresetStore { index: u8 },
    /// Synchronized move to a stored preset.
    PresetRecall {
        index: u8,
        #[serde(default)]
        duration_ms: Option<u32>,
    },
    InterpSetpoints { points: Vec<InterpPoint> },
    /// Load a direct sequence and start auto mode from fraction 0.
    InterpSequence { points: Vec<DirectPoint>, duration_ms: u32 },
    /// Replace direct sequence points without resetting the fraction.
    InterpSequenceUpdate {
        points: Vec<DirectPoint>,
        #[serde(default)]
        duration_ms: Option<u32>,
    },
    InterpAuto {
        enable: bool,
        #[serde(default)]
        duration_ms: Option<u32>,
        #[serde(default)]
        end_behavior: Option<AutoEndBehavior>,
    },
    InterpGoto { fraction: f64 },
    /// Fraction velocity [1/s].
    InterpJog { speed: f64 },
    BankSelect { index: u8 },
    /// Persist the active bank, optionally under another index.
    BankSave {
        #[serde(default)]
        index: Option<u8>,
    },
    /// Read a bank without activating it.
    BankGet { index: u8 },
    OffsetZero(ZeroMask),
    OffsetAdd { deltas: AxisArray<i64> },
    OffsetSet { values: AxisArray<Option<i64>> },
    OffsetBake,
    OffsetResetAll,
    HomingStart,
    HomingThreshold { value: i32 },
    DriverConfig {
        axis_id: u8,
        microsteps: u16,
        current_ma: u16,
        spread_cycle: bool,
    },
    AxisLimits {
        axis: AxisId,
        min: i64,
        max: i64,
        #[serde(default)]
        max_speed: Option<f64>,
        #[serde(default)]
        max_accel: Option<f64>,
    },
    /// Halt all motion: cancel jobs, jogs, auto mode and homing.
    Stop,
    Status,
}

impl Command {
    /// Command name used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AbsoluteMove { .. } => "absolute_move",
            Self::SynchronizedMove { .. } => "synchronized_move",
            Self::Jog { .. } => "jog",
            Self::JoystickConfig(_) => "joystick_config",
            Self::PresetSet { .. } => "preset_set",
            Self::PresetStore { .. } => "preset_store",
            Self::PresetRecall { .. } => "preset_recall",
            Self::InterpSetpoints { .. } => "interp_setpoints",
            Self::InterpSequence { .. } => "interp_sequence",
            Self::InterpSequenceUpdate { .. } => "interp_sequence_update",
            Self::InterpAuto { .. } => "interp_auto",
            Self::InterpGoto { .. } => "interp_goto",
            Self::InterpJog { .. } => "interp_jog",
            Self::BankSelect { .. } => "bank_select",
            Self::BankSave { .. } => "bank_save",
            Self::BankGet { .. } => "bank_get",
            Self::OffsetZero(_) => "offset_zero",
            Self::OffsetAdd { .. } => "offset_add",
            Self::OffsetSet { .. } => "offset_set",
            Self::OffsetBake => "offset_bake",
            Self::OffsetResetAll => "offset_reset_all",
            Self::HomingStart => "homing_start",
            Self::HomingThreshold { .. } => "homing_threshold",
            Self::DriverConfig { .. } => "driver_config",
            Self::AxisLimits { .. } => "axis_limits",
            Self::Stop => "stop",
            Self::Status => "status",
        }
    }

    /// True if the command writes a target on `axis`.
    pub fn targets_axis(&self, axis: AxisId) -> bool {
        match self {
            Self::AbsoluteMove { axis: a, .. } | Self::Jog { axis: a, .. } => *a == axis,
            Self::SynchronizedMove { targets, .. } => targets[axis].is_some(),
            Self::OffsetAdd { deltas } => deltas[axis] != 0,
            Self::OffsetSet { values } => values[axis].is_some(),
            Self::OffsetZero(mask) => mask.contains(axis),
            Self::DriverConfig { axis_id, .. } => *axis_id == axis as u8,
            Self::AxisLimits { axis: a, .. } => *a == axis,
            _ => false,
        }
    }

    /// Structural validation, independent of controller state.
    ///
    /// Continuous inputs (positions, jog speeds, offsets) are not checked
    /// here: they are clamped when applied.
    pub fn validate(&self) -> Result<(), CommandError> {
        let check = |r: Result<(), String>| r.map_err(CommandError::Validation);
        match self {
            Self::SynchronizedMove { targets, .. } if targets.is_empty() => {
                Err(CommandError::validation("synchronized move without targets"))
            }
            Self::JoystickConfig(cfg) => check(cfg.validate()),
            Self::PresetSet { index, .. }
            | Self::PresetStore { index }
            | Self::PresetRecall { index, .. } => check(validate_preset_index(*index)),
            Self::InterpSetpoints { points } => check(validate_setpoints(points)),
            Self::InterpSequence { points, .. } | Self::InterpSequenceUpdate { points, .. } => {
                check(validate_direct_points(points))
            }
            Self::InterpGoto { fraction } if !fraction.is_finite() => {
                Err(CommandError::validation(format!("fraction {fraction} is not finite")))
            }
            Self::BankSelect { index } | Self::BankGet { index } | Self::BankSave { index: Some(index) } => {
                check(validate_bank_index(*index))
            }
            Self::HomingThreshold { value } => {
                if (0..=i32::from(STALL_THRESHOLD_MAX)).contains(value) {
                    Ok(())
                } else {
                    Err(CommandError::validation(format!(
                        "homing threshold {value} out of range 0..={STALL_THRESHOLD_MAX}"
                    )))
                }
            }
            Self::DriverConfig { axis_id, microsteps, current_ma, spread_cycle } => {
                AxisId::try_from(*axis_id).map_err(|e| CommandError::Validation(e.to_string()))?;
                check(
                    DriverSettings {
                        microsteps: *microsteps,
                        current_ma: *current_ma,
                        spread_cycle: *spread_cycle,
                    }
                    .validate(),
                )
            }
            Self::AxisLimits { min, max, max_speed, max_accel, .. } => {
                check(validate_limits(*min, *max))?;
                for (name, v) in [("max_speed", max_speed), ("max_accel", max_accel)] {
                    if let Some(v) = v
                        && !(*v > 0.0 && v.is_finite())
                    {
                        return Err(CommandError::validation(format!("{name} {v} must be > 0")));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Successful command result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", content = "data", rename_all = "snake_case")]
pub enum CommandOutcome {
    Ack,
    Move(MoveReport),
    Bank(Box<Bank>),
    Status(Box<StatusSnapshot>),
}
