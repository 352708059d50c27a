//! Joystick input-shaping parameters.

use serde::{Deserialize, Serialize};

/// Bounds for [`JoystickConfig`] fields.
pub const DEADZONE_MAX: f64 = 0.5;
pub const EXPO_MAX: f64 = 0.95;
pub const SLIDE_MULTIPLIER_MIN: f64 = 0.1;
pub const SLIDE_MULTIPLIER_MAX: f64 = 3.0;

/// Input-shaping parameters applied to raw jog input each tick.
///
/// `slew_per_sec` and `filter_hz` disable their stage when zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JoystickConfig {
    /// Dead band around centre, `[0, 0.5]`.
    #[serde(default = "default_deadzone")]
    pub deadzone: f64,
    /// Cubic blend factor, `[0, 0.95]`.
    #[serde(default = "default_expo")]
    pub expo: f64,
    /// Maximum output change per second (full scale = 1.0).
    #[serde(default = "default_slew")]
    pub slew_per_sec: f64,
    /// Low-pass cutoff [Hz].
    #[serde(default = "default_filter_hz")]
    pub filter_hz: f64,
    /// Extra gain on the slide axis, `[0.1, 3.0]`.
    #[serde(default = "default_slide_multiplier")]
    pub slide_speed_multiplier: f64,
}

fn default_deadzone() -> f64 {
    0.05
}
fn default_expo() -> f64 {
    0.3
}
fn default_slew() -> f64 {
    4.0
}
fn default_filter_hz() -> f64 {
    8.0
}
fn default_slide_multiplier() -> f64 {
    1.0
}

impl Default for JoystickConfig {
    fn default() -> Self {
        Self {
            deadzone: default_deadzone(),
            expo: default_expo(),
            slew_per_sec: default_slew(),
            filter_hz: default_filter_hz(),
            slide_speed_multiplier: default_slide_multiplier(),
        }
    }
}

impl JoystickConfig {
    /// Check every field against its documented range.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=DEADZONE_MAX).contains(&self.deadzone) {
            return Err(format!("deadzone {} out of range [0, {DEADZONE_MAX}]", self.deadzone));
        }
        if !(0.0..=EXPO_MAX).contains(&self.expo) {
            return Err(format!("expo {} out of range [0, {EXPO_MAX}]", self.expo));
        }
        if !(self.slew_per_sec >= 0.0 && self.slew_per_sec.is_finite()) {
            return Err(format!("slew_per_sec {} must be >= 0", self.slew_per_sec));
        }
        if !(self.filter_hz >= 0.0 && self.filter_hz.is_finite()) {
            return Err(format!("filter_hz {} must be >= 0", self.filter_hz));
        }
        if !(SLIDE_MULTIPLIER_MIN..=SLIDE_MULTIPLIER_MAX).contains(&self.slide_speed_multiplier) {
            return Err(format!(
                "slide_speed_multiplier {} out of range [{SLIDE_MULTIPLIER_MIN}, {SLIDE_MULTIPLIER_MAX}]",
                self.slide_speed_multiplier
            ));
        }
        Ok(())
    }
}
