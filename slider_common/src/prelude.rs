//! Prelude module for common re-exports.
//!
//! ```rust
//! use slider_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Axes ───────────────────────────────────────────────────────────
pub use crate::axis::{AxisArray, AxisId, AxisValue};

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::control_unit::config::ControllerConfig;

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{AXIS_COUNT, BANK_COUNT, CYCLE_TIME_US, PRESET_COUNT};

// ─── Commands & Telemetry ───────────────────────────────────────────
pub use crate::control_unit::command::{Command, CommandOutcome, MoveReport, TransportClass};
pub use crate::control_unit::error::CommandError;
pub use crate::control_unit::telemetry::{PositionTick, StatusSnapshot};

// ─── Capabilities ───────────────────────────────────────────────────
pub use crate::hal::driver::{AxisDriver, DriverError, MotionLimits};
pub use crate::hal::storage::{BankStorage, StorageError};

/// Default control tick period as Duration.
pub const DEFAULT_CYCLE_TIME: Duration = Duration::from_micros(CYCLE_TIME_US as u64);
