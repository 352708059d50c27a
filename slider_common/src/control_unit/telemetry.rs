//! Telemetry payloads: on-demand status snapshot and pushed position ticks.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::axis::{AxisArray, AxisId};
use crate::control_unit::bank::AutoEndBehavior;
use crate::control_unit::command::{DriverSettings, MoveReport};
use crate::control_unit::homing::{HomingOutcome, HomingState};

bitflags! {
    /// Active motion sources.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ModeFlags: u8 {
        /// At least one axis has non-zero joystick input.
        const JOGGING     = 0x01;
        /// A synchronized move job is active.
        const SYNC_MOVE   = 0x02;
        /// Interpolation auto mode is running.
        const INTERP_AUTO = 0x04;
        /// Interpolation fraction is being jogged.
        const INTERP_JOG  = 0x08;
        /// Slide homing seek in progress.
        const HOMING      = 0x10;
    }
}

/// Where the interpolation engine takes its setpoints from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpSource {
    /// No usable setpoints loaded.
    #[default]
    None,
    /// Setpoints of the active bank.
    Bank,
    /// Direct sequence.
    Sequence,
}

/// Per-axis state reported in [`StatusSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisStatus {
    pub position: i64,
    pub target: i64,
    /// Commanded absolute output (target + baseline + offset, clamped).
    pub output: i64,
    /// Position mapped onto `[0, 1]`.
    pub normalized: f64,
    /// Position mapped onto `[0, 100]`.
    pub percent: f64,
    pub min: i64,
    pub max: i64,
    pub max_speed: f64,
    pub max_accel: f64,
    pub inverted: bool,
    pub driver: DriverSettings,
    /// Live (latched) offset [steps].
    pub offset: i64,
    /// Baked offset baseline [steps].
    pub baseline: i64,
    pub moving: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpStatus {
    pub source: InterpSource,
    pub fraction: f64,
    pub point_count: usize,
    pub auto_enabled: bool,
    pub auto_duration_ms: u32,
    pub end_behavior: AutoEndBehavior,
    /// Interpolation jog velocity [1/s].
    pub jog_speed: f64,
}

/// Progress of the active synchronized move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncJobStatus {
    pub report: MoveReport,
    pub progress: f64,
    pub elapsed_ms: u32,
    pub remaining_ms: u32,
    pub members: AxisArray<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomingStatus {
    pub state: HomingState,
    pub threshold: u8,
    pub outcome: HomingOutcome,
}

/// Control loop timing summary.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CycleSummary {
    pub cycle_count: u64,
    pub overruns: u64,
    pub avg_cycle_us: f64,
    pub max_cycle_us: f64,
}

/// Full controller state, produced on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub device_name: String,
    pub axes: AxisArray<AxisStatus>,
    pub interp: InterpStatus,
    pub mode: ModeFlags,
    pub active_bank: u8,
    pub homing: HomingStatus,
    pub sync_job: Option<SyncJobStatus>,
    pub driver_configured: bool,
    pub cycle: CycleSummary,
    pub timestamp_ms: u64,
}

impl StatusSnapshot {
    #[inline]
    pub fn axis(&self, axis: AxisId) -> &AxisStatus {
        &self.axes[axis]
    }
}

/// Position of one axis in a [`PositionTick`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisPosition {
    pub steps: i64,
    pub normalized: f64,
}

/// Pushed position sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionTick {
    pub axes: AxisArray<AxisPosition>,
    pub timestamp_ms: u64,
}
