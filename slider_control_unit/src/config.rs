//! Configuration loading for the control unit.
//!
//! Reads one TOML file into `ControllerConfig`, validates every section and
//! derives the timing values the cycle runner needs.

use std::path::Path;
use std::time::Duration;

use slider_common::config::{ConfigError, ConfigLoader};
use slider_common::control_unit::config::ControllerConfig;
use tracing::debug;

/// Validated configuration bundle, ready for runtime use.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub controller: ControllerConfig,
    /// Tick period.
    pub cycle_time: Duration,
    /// Position telemetry period.
    pub telemetry_interval: Duration,
}

impl LoadedConfig {
    /// Validate `controller` and derive timing values.
    ///
    /// # Errors
    /// `ConfigError::ValidationError` if any section is out of bounds.
    pub fn new(controller: ControllerConfig) -> Result<Self, ConfigError> {
        controller.validate()?;
        Ok(Self {
            cycle_time: Duration::from_micros(u64::from(controller.cycle.cycle_time_us)),
            telemetry_interval: Duration::from_millis(u64::from(
                controller.cycle.telemetry_interval_ms,
            )),
            controller,
        })
    }
}

/// Load and validate the controller configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    debug!("loading configuration from {}", path.display());
    LoadedConfig::new(ControllerConfig::load(path)?)
}

/// Load and validate the controller configuration from a TOML string.
pub fn load_config_from_str(toml: &str) -> Result<LoadedConfig, ConfigError> {
    LoadedConfig::new(ControllerConfig::from_toml(toml)?)
}
