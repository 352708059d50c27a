//! Configuration structures for the control unit.
//!
//! All config types use `serde::Deserialize` for TOML loading. Every section
//! is optional and falls back to its `Default`; numeric parameters are
//! bounds-checked by [`ControllerConfig::validate`].

use serde::{Deserialize, Serialize};

use crate::axis::{AxisArray, AxisId, validate_limits};
use crate::config::{ConfigError, SharedConfig};
use crate::consts::{
    COMMAND_QUEUE_CAPACITY, CYCLE_TIME_US, CYCLE_TIME_US_MAX, CYCLE_TIME_US_MIN,
    DEFAULT_BANK_FILE, TELEMETRY_INTERVAL_MS,
};

use super::bank::AutoEndBehavior;
use super::command::DriverSettings;
use super::homing::HomingConfig;
use super::joystick::JoystickConfig;

// ─── Top-Level Config ───────────────────────────────────────────────

/// Complete controller configuration.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// device_name = "slider-a"
///
/// [cycle]
/// cycle_time_us = 10000
///
/// [axes.pan]
/// min = 0
/// max = 100000
/// max_speed = 25000.0
/// max_accel = 50000.0
///
/// [homing]
/// direction = "negative"
/// max_seek_ms = 20000
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub axes: AxesConfig,
    #[serde(default)]
    pub joystick: JoystickSection,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub interp: InterpConfig,
    #[serde(default)]
    pub homing: HomingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl ControllerConfig {
    /// Validate every section.
    ///
    /// # Errors
    ///
    /// `ConfigError::ValidationError` naming the first offending parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let wrap = |section: &str| {
            let section = section.to_string();
            move |msg: String| ConfigError::ValidationError(format!("[{section}] {msg}"))
        };
        self.shared.validate()?;
        self.cycle.validate().map_err(wrap("cycle"))?;
        for axis in AxisId::ALL {
            self.axes
                .get(axis)
                .validate()
                .map_err(wrap(&format!("axes.{axis}")))?;
        }
        self.joystick.shaping.validate().map_err(wrap("joystick"))?;
        self.interp.validate().map_err(wrap("interp"))?;
        self.homing.validate().map_err(wrap("homing"))?;
        if self.storage.bank_file.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "[storage] bank_file cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ─── Cycle ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Control tick period [µs].
    #[serde(default = "default_cycle_time_us")]
    pub cycle_time_us: u32,
    /// Position telemetry interval [ms].
    #[serde(default = "default_telemetry_interval")]
    pub telemetry_interval_ms: u32,
    /// Inbound command queue capacity.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_cycle_time_us() -> u32 {
    CYCLE_TIME_US
}
fn default_telemetry_interval() -> u32 {
    TELEMETRY_INTERVAL_MS
}
fn default_queue_capacity() -> usize {
    COMMAND_QUEUE_CAPACITY
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            cycle_time_us: default_cycle_time_us(),
            telemetry_interval_ms: default_telemetry_interval(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl CycleConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.cycle_time_us < CYCLE_TIME_US_MIN || self.cycle_time_us > CYCLE_TIME_US_MAX {
            return Err(format!(
                "cycle_time_us {} out of range [{}, {}]",
                self.cycle_time_us, CYCLE_TIME_US_MIN, CYCLE_TIME_US_MAX
            ));
        }
        if u64::from(self.telemetry_interval_ms) * 1000 < u64::from(self.cycle_time_us) {
            return Err(format!(
                "telemetry_interval_ms {} shorter than one cycle",
                self.telemetry_interval_ms
            ));
        }
        if self.queue_capacity == 0 {
            return Err("queue_capacity must be > 0".to_string());
        }
        Ok(())
    }
}

// ─── Axes ───────────────────────────────────────────────────────────

/// Per-axis limits and driver settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    #[serde(default)]
    pub min: i64,
    #[serde(default = "default_max")]
    pub max: i64,
    /// [steps/s]
    #[serde(default = "default_max_speed")]
    pub max_speed: f64,
    /// [steps/s²]
    #[serde(default = "default_max_accel")]
    pub max_accel: f64,
    /// Reverse motor direction.
    #[serde(default)]
    pub inverted: bool,
    #[serde(default = "default_microsteps")]
    pub microsteps: u16,
    #[serde(default = "default_current_ma")]
    pub current_ma: u16,
    #[serde(default)]
    pub spread_cycle: bool,
}

fn default_max() -> i64 {
    100_000
}
fn default_max_speed() -> f64 {
    25_000.0
}
fn default_max_accel() -> f64 {
    50_000.0
}
fn default_microsteps() -> u16 {
    DriverSettings::default().microsteps
}
fn default_current_ma() -> u16 {
    DriverSettings::default().current_ma
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            min: 0,
            max: default_max(),
            max_speed: default_max_speed(),
            max_accel: default_max_accel(),
            inverted: false,
            microsteps: default_microsteps(),
            current_ma: default_current_ma(),
            spread_cycle: false,
        }
    }
}

impl AxisConfig {
    #[inline]
    pub const fn driver(&self) -> DriverSettings {
        DriverSettings {
            microsteps: self.microsteps,
            current_ma: self.current_ma,
            spread_cycle: self.spread_cycle,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_limits(self.min, self.max)?;
        if !(self.max_speed > 0.0 && self.max_speed.is_finite()) {
            return Err(format!("max_speed {} must be > 0", self.max_speed));
        }
        if !(self.max_accel > 0.0 && self.max_accel.is_finite()) {
            return Err(format!("max_accel {} must be > 0", self.max_accel));
        }
        self.driver().validate()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AxesConfig {
    #[serde(default)]
    pub pan: AxisConfig,
    #[serde(default)]
    pub tilt: AxisConfig,
    #[serde(default)]
    pub zoom: AxisConfig,
    #[serde(default)]
    pub slide: AxisConfig,
}

impl AxesConfig {
    pub const fn get(&self, axis: AxisId) -> &AxisConfig {
        match axis {
            AxisId::Pan => &self.pan,
            AxisId::Tilt => &self.tilt,
            AxisId::Zoom => &self.zoom,
            AxisId::Slide => &self.slide,
        }
    }

    pub fn to_array(&self) -> AxisArray<AxisConfig> {
        AxisArray::from_fn(|axis| *self.get(axis))
    }
}

// ─── Joystick / Motion / Interp / Storage ───────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JoystickSection {
    /// Initial shaping parameters.
    #[serde(flatten)]
    pub shaping: JoystickConfig,
    /// Jog input not refreshed within this window reads as zero [ms]; 0 disables.
    #[serde(default = "default_input_timeout")]
    pub input_timeout_ms: u32,
}

fn default_input_timeout() -> u32 {
    500
}

impl Default for JoystickSection {
    fn default() -> Self {
        Self {
            shaping: JoystickConfig::default(),
            input_timeout_ms: default_input_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Individual moves and jogs cancel an axis's synchronized job
    /// membership. When false they are rejected as a conflict instead.
    #[serde(default = "default_auto_cancel")]
    pub auto_cancel: bool,
}

fn default_auto_cancel() -> bool {
    true
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self { auto_cancel: default_auto_cancel() }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InterpConfig {
    /// Auto mode behaviour at fraction 1.
    #[serde(default)]
    pub end_behavior: AutoEndBehavior,
    /// Auto duration when `InterpAuto` omits one [ms].
    #[serde(default = "default_auto_duration")]
    pub default_auto_duration_ms: u32,
}

fn default_auto_duration() -> u32 {
    10_000
}

impl Default for InterpConfig {
    fn default() -> Self {
        Self {
            end_behavior: AutoEndBehavior::default(),
            default_auto_duration_ms: default_auto_duration(),
        }
    }
}

impl InterpConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.default_auto_duration_ms == 0 {
            return Err("default_auto_duration_ms must be > 0".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Bank file path.
    #[serde(default = "default_bank_file")]
    pub bank_file: String,
}

fn default_bank_file() -> String {
    DEFAULT_BANK_FILE.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { bank_file: default_bank_file() }
    }
}
