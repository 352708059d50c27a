//! System-wide constants for the slider workspace.
//!
//! Single source of truth for numeric limits and default paths.

use static_assertions::const_assert;

/// Number of motion axes (pan, tilt, zoom, slide).
pub const AXIS_COUNT: usize = 4;

/// Presets stored per bank.
pub const PRESET_COUNT: usize = 10;

/// Number of banks.
pub const BANK_COUNT: usize = 10;

/// Minimum number of interpolation setpoints.
pub const MIN_INTERP_POINTS: usize = 2;

/// Maximum number of interpolation setpoints.
pub const MAX_INTERP_POINTS: usize = 6;

/// Default control tick period in microseconds (100 Hz).
pub const CYCLE_TIME_US: u32 = 10_000;

/// Allowed tick period range [µs].
pub const CYCLE_TIME_US_MIN: u32 = 1_000;
pub const CYCLE_TIME_US_MAX: u32 = 100_000;

/// Position telemetry cadence (5 Hz).
pub const TELEMETRY_INTERVAL_MS: u32 = 200;

/// Default capacity of the inbound command queue.
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Largest supported microstep divisor.
pub const MICROSTEPS_MAX: u16 = 256;

/// Largest supported RMS motor current [mA].
pub const CURRENT_MA_MAX: u16 = 2000;

/// Largest step magnitude of an axis limit (32-bit driver position register).
pub const AXIS_STEPS_MAX: i64 = i32::MAX as i64;

/// Largest stall threshold accepted by the driver.
pub const STALL_THRESHOLD_MAX: u8 = 255;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/slider/slider.toml";

/// Default bank storage file.
pub const DEFAULT_BANK_FILE: &str = "/var/lib/slider/banks.bin";

const_assert!(MIN_INTERP_POINTS <= MAX_INTERP_POINTS);
const_assert!(MAX_INTERP_POINTS <= PRESET_COUNT);
const_assert!(CYCLE_TIME_US >= CYCLE_TIME_US_MIN && CYCLE_TIME_US <= CYCLE_TIME_US_MAX);
